// Precompiled replacement snippets. A template is parsed once per rule via
// the same fragment parser that handles whole files, then bound positionally
// at each application. Binding failures abort the single application and
// leave the target tree untouched; every check runs before any allocation.

use tracing::trace;

use crate::parser::{self, resolve, SymbolTable};
use crate::rewrite::errors::RewriteError;
use crate::rewrite::imports::ImportLedger;
use crate::tree::{NodeId, NodeKind, PlaceholderKind, SyntaxTree, TypeRef};

/// A compiled snippet with N positional capture slots.
///
/// Placeholders are written `#{any(T)}`, `#{any()}` or `#{anyArray(T)}`,
/// mirroring how the snippet's eventual captures are constrained:
/// `any(T)` accepts an expression assignable to `T`, `anyArray` accepts only
/// array-typed expressions.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    snippet: SyntaxTree,
    slots: Vec<PlaceholderKind>,
    imports: Vec<String>,
}

/// Builder mirroring how rules declare templates next to their signatures.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    source: String,
    imports: Vec<String>,
}

impl TemplateBuilder {
    pub fn imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Template, RewriteError> {
        Template::compile(&self.source, self.imports)
    }
}

impl Template {
    pub fn builder(source: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            source: source.into(),
            imports: Vec::new(),
        }
    }

    /// Parse `source` once. Slots are collected in source order; their
    /// ordinals define the capture positions for every later `apply`.
    pub fn compile(
        source: &str,
        imports: Vec<String>,
    ) -> Result<Template, RewriteError> {
        let snippet = parser::parse_fragment(source)
            .map_err(|e| RewriteError::template_parse(e.to_string()))?;

        let mut found: Vec<(usize, PlaceholderKind)> = Vec::new();
        snippet.walk(snippet.root(), &mut |id| {
            if let NodeKind::Placeholder { index, kind } = snippet.kind(id) {
                found.push((*index, kind.clone()));
            }
        });
        found.sort_by_key(|(index, _)| *index);
        if found.iter().enumerate().any(|(i, (index, _))| i != *index) {
            return Err(RewriteError::template_parse(
                "placeholder ordinals are not contiguous",
            ));
        }
        let slots = found.into_iter().map(|(_, kind)| kind).collect();

        Ok(Template {
            source: source.to_string(),
            snippet,
            slots,
            imports,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholder_count(&self) -> usize {
        self.slots.len()
    }

    /// Splice this template into `tree` in place of the node at `at`,
    /// binding `captures` positionally. Returns the replacement root.
    ///
    /// All arity and type checks run before anything is allocated, so a
    /// failed bind leaves the arena exactly as it was. On success the
    /// produced subtree is re-resolved in the surrounding context and the
    /// template's required imports are recorded on the ledger.
    pub fn apply(
        &self,
        tree: &mut SyntaxTree,
        symbols: &SymbolTable,
        at: NodeId,
        captures: &[NodeId],
        ledger: &mut ImportLedger,
    ) -> Result<NodeId, RewriteError> {
        if captures.len() != self.slots.len() {
            return Err(RewriteError::bind_arity(self.slots.len(), captures.len()));
        }
        for (index, (slot, &capture)) in self.slots.iter().zip(captures).enumerate() {
            self.check_slot(index, slot, tree.ty(capture), symbols)?;
        }

        trace!(template = %self.source, at = %at, "applying template");
        let root = tree.graft(&self.snippet, self.snippet.root(), &mut |index| {
            captures[index]
        });
        resolve::resolve_subtree(tree, root, symbols);
        for import in &self.imports {
            ledger.add(import.clone());
        }
        Ok(root)
    }

    fn check_slot(
        &self,
        index: usize,
        slot: &PlaceholderKind,
        actual: &TypeRef,
        symbols: &SymbolTable,
    ) -> Result<(), RewriteError> {
        match slot {
            PlaceholderKind::Expr(None) => Ok(()),
            PlaceholderKind::Expr(Some(required)) => {
                if symbols.assignable(actual, required) {
                    Ok(())
                } else {
                    Err(RewriteError::bind_type(
                        index,
                        &required.to_string(),
                        &actual.to_string(),
                    ))
                }
            }
            PlaceholderKind::Array(constraint) => {
                let element = match actual.element() {
                    Some(element) => element,
                    None => {
                        let required = match constraint {
                            Some(elem) => format!("{elem}[]"),
                            None => "an array type".to_string(),
                        };
                        return Err(RewriteError::bind_type(
                            index,
                            &required,
                            &actual.to_string(),
                        ));
                    }
                };
                match constraint {
                    Some(required) if !symbols.assignable(element, required) => {
                        Err(RewriteError::bind_type(
                            index,
                            &format!("{required}[]"),
                            &actual.to_string(),
                        ))
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}
