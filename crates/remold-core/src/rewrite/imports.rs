// Deferred import bookkeeping. Rules record add/remove intents while a file
// is being rewritten; the orchestrator flushes them once at end of pass so
// repeated edits against the same symbol collapse into one consistent
// change, and a still-referenced symbol is never dropped.

use indexmap::IndexMap;
use tracing::debug;

use crate::parser::SymbolTable;
use crate::tree::{NodeId, NodeKind, SyntaxTree};

/// A single deferred effect against the file's import list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEdit {
    Add(String),
    Remove(String),
}

/// Accumulates [`ImportEdit`]s during a pass; applied once by [`flush`] and
/// discarded afterwards.
///
/// [`flush`]: ImportLedger::flush
#[derive(Debug, Default)]
pub struct ImportLedger {
    edits: Vec<ImportEdit>,
}

#[derive(Debug, Default)]
struct Net {
    adds: usize,
    removes: usize,
}

impl ImportLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: impl Into<String>) {
        self.edits.push(ImportEdit::Add(symbol.into()));
    }

    pub fn remove(&mut self, symbol: impl Into<String>) {
        self.edits.push(ImportEdit::Remove(symbol.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply the net effect of all recorded edits to the unit's import list
    /// and return the (possibly new) root. Add/remove pairs on the same
    /// symbol cancel; a surviving add is inserted once; a surviving remove
    /// only lands if the symbol is no longer referenced in the rewritten
    /// tree. The ledger is drained either way.
    pub fn flush(&mut self, tree: &mut SyntaxTree, symbols: &SymbolTable) -> NodeId {
        let mut net: IndexMap<String, Net> = IndexMap::new();
        for edit in self.edits.drain(..) {
            match edit {
                ImportEdit::Add(symbol) => net.entry(symbol).or_default().adds += 1,
                ImportEdit::Remove(symbol) => net.entry(symbol).or_default().removes += 1,
            }
        }

        let root = tree.root();
        let (old_imports, body) = match tree.kind(root) {
            NodeKind::Unit { imports, body } => (imports.clone(), body.clone()),
            _ => return root,
        };
        let present: Vec<String> = tree.import_paths();

        let mut imports = old_imports.clone();
        for (symbol, counts) in &net {
            let is_present = present.iter().any(|path| path == symbol);
            if counts.removes > counts.adds {
                if !is_present {
                    continue;
                }
                if symbols.is_referenced(tree, symbol) {
                    debug!(%symbol, "keeping import, still referenced");
                    continue;
                }
                imports.retain(|&id| {
                    !matches!(tree.kind(id), NodeKind::Import { path } if path == symbol)
                });
                debug!(%symbol, "removed import");
            } else if counts.adds > counts.removes && !is_present {
                let id = tree.alloc(NodeKind::Import {
                    path: symbol.clone(),
                });
                imports.push(id);
                debug!(%symbol, "added import");
            }
        }

        if imports == old_imports {
            return root;
        }
        tree.alloc(NodeKind::Unit { imports, body })
    }
}
