// Rewrite orchestration: per-file rule passes and the parallel batch
// runner. Each pass walks the tree bottom-up exactly once, threading the
// context stack through recursion, offering every rebuilt node to the rule,
// and splicing replacements so later siblings and ancestors in the same
// pass observe them. Import edits flush once per file at end of pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::unbounded;
use tracing::{debug, trace};

use crate::parser::{self, SymbolTable};
use crate::rewrite::context::ContextStack;
use crate::rewrite::errors::{RewriteError, RuleDiagnostic};
use crate::rewrite::imports::ImportLedger;
use crate::rewrite::signature::Signature;
use crate::rewrite::template::Template;
use crate::tree::{NodeId, NodeKind, SyntaxTree};
use crate::EngineConfig;

/// Document kind recognized by file-level precondition gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FileKind {
    /// Ordinary source file.
    Source,
    /// Build-script DSL file.
    BuildScript,
}

/// One input file: parsed tree plus the symbol knowledge the resolver used.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub kind: FileKind,
    pub tree: SyntaxTree,
    pub symbols: SymbolTable,
}

impl SourceFile {
    /// Parse and resolve `source` into a ready-to-rewrite file.
    pub fn parse(
        path: impl Into<String>,
        kind: FileKind,
        source: &str,
        symbols: SymbolTable,
    ) -> anyhow::Result<SourceFile> {
        let mut tree = parser::parse_unit(source)?;
        parser::resolve(&mut tree, &symbols);
        Ok(SourceFile {
            path: path.into(),
            kind,
            tree,
            symbols,
        })
    }
}

/// File-level applicability gate, evaluated once per file before any
/// node-level scanning. A failed gate means the rule does zero traversal
/// work on that file.
#[derive(Debug, Clone)]
pub enum Precondition {
    Always,
    FileKind(FileKind),
    /// The file imports or references the given qualified symbol.
    UsesType(String),
    /// Some node in the file matches the signature.
    UsesMethod(Signature),
    AllOf(Vec<Precondition>),
    AnyOf(Vec<Precondition>),
}

impl Precondition {
    pub fn holds(&self, file: &SourceFile) -> bool {
        match self {
            Precondition::Always => true,
            Precondition::FileKind(kind) => file.kind == *kind,
            Precondition::UsesType(symbol) => {
                file.tree.import_paths().iter().any(|path| path == symbol)
                    || file.symbols.is_referenced(&file.tree, symbol)
            }
            Precondition::UsesMethod(signature) => {
                let mut found = false;
                file.tree.walk(file.tree.root(), &mut |id| {
                    found |= signature.matches(&file.tree, &file.symbols, id);
                });
                found
            }
            Precondition::AllOf(all) => all.iter().all(|p| p.holds(file)),
            Precondition::AnyOf(any) => any.iter().any(|p| p.holds(file)),
        }
    }
}

/// A single rewrite rule: an applicability gate plus a node-level rewrite.
///
/// `rewrite` is offered every node exactly once per pass, after the node's
/// children have been rewritten. Return `Some(replacement)` to splice, or
/// `None` to leave the node alone, the overwhelmingly common outcome.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn precondition(&self) -> Precondition {
        Precondition::Always
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId>;
}

/// Per-pass access handed to a rule: the tree being rewritten, the file's
/// symbols, the context path at the offered node, template application, and
/// deferred import edits.
pub struct Rewriter<'a> {
    tree: &'a mut SyntaxTree,
    symbols: &'a SymbolTable,
    ledger: &'a mut ImportLedger,
    diagnostics: &'a mut Vec<RuleDiagnostic>,
    rule_name: &'static str,
    ctx: ContextStack,
}

impl<'a> Rewriter<'a> {
    pub fn tree(&self) -> &SyntaxTree {
        self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SyntaxTree {
        self.tree
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.symbols
    }

    /// Context stack at the node currently offered to the rule.
    pub fn context(&self) -> &ContextStack {
        &self.ctx
    }

    /// Dotted ancestor path at the offered node, if any ancestor pushed one.
    pub fn nearest_path(&self) -> Option<String> {
        self.ctx.nearest_path().map(str::to_string)
    }

    /// Apply a compiled template at `at`. A bind failure is recorded as a
    /// per-rule diagnostic and answered with `None`; the tree is untouched.
    pub fn apply_template(
        &mut self,
        template: &Template,
        at: NodeId,
        captures: &[NodeId],
    ) -> Option<NodeId> {
        match template.apply(self.tree, self.symbols, at, captures, self.ledger) {
            Ok(root) => Some(root),
            Err(error) => {
                self.fail(at, error);
                None
            }
        }
    }

    pub fn add_import(&mut self, symbol: impl Into<String>) {
        self.ledger.add(symbol);
    }

    pub fn remove_import(&mut self, symbol: impl Into<String>) {
        self.ledger.remove(symbol);
    }

    /// Record a contract violation against the offered node.
    pub fn fail(&mut self, node: NodeId, error: RewriteError) {
        debug!(rule = self.rule_name, node = %node, %error, "rule application aborted");
        self.diagnostics.push(RuleDiagnostic {
            rule: self.rule_name.to_string(),
            node,
            error,
        });
    }

    /// Bottom-up transform of one subtree for one rule. Children first,
    /// then the rebuilt node is offered to the rule with the *enclosing*
    /// context; path entries pushed here are visible to descendants only.
    fn transform(&mut self, rule: &dyn Rule, id: NodeId, ctx: &ContextStack) -> NodeId {
        let child_ctx = match self.tree.kind(id) {
            NodeKind::Call { name, .. } => ctx.push_path(name),
            NodeKind::Assignment { target, .. } => match self.tree.flatten_path(*target) {
                Some(path) => ctx.push_path(&path),
                None => ctx.clone(),
            },
            _ => ctx.clone(),
        };

        let old_children = self.tree.children(id);
        let mut new_children = Vec::with_capacity(old_children.len());
        let mut changed = false;
        for &child in &old_children {
            let new = self.transform(rule, child, &child_ctx);
            changed |= new != child;
            new_children.push(new);
        }

        let rebuilt = if changed {
            let kind = self.tree.kind(id).clone();
            let mut substituted = new_children.into_iter();
            let new_kind = self
                .tree
                .map_children(&kind, |_| substituted.next().expect("child arity"))
                .expect("changed node has children");
            let ty = self.tree.ty(id).clone();
            self.tree.alloc_typed(new_kind, ty)
        } else {
            id
        };

        self.ctx = ctx.clone();
        match rule.rewrite(self, rebuilt) {
            Some(replacement) => {
                trace!(rule = self.rule_name, node = %rebuilt, replacement = %replacement, "spliced");
                replacement
            }
            None => rebuilt,
        }
    }
}

/// Cooperative cancellation flag shared between a batch caller and the
/// workers. Checked between rule applications; a cancelled file keeps its
/// last fully-produced root.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of running the rule batch over one file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FileOutcome {
    /// Whether any rule (or the import flush) produced a new root.
    pub changed: bool,
    /// Per-rule contract violations; never fail the batch.
    pub diagnostics: Vec<RuleDiagnostic>,
    /// Whether the pass was abandoned cooperatively.
    pub cancelled: bool,
}

/// One file's result paired back with the file it was produced from.
#[derive(Debug)]
pub struct BatchResult {
    pub file: SourceFile,
    pub outcome: FileOutcome,
}

/// An ordered batch of rules composed over files. Rules run in registration
/// order; one rule's rewritten output can expose new matches for a later
/// rule in the same batch. That is an ordering contract, not an error.
pub struct Engine {
    rules: Vec<Arc<dyn Rule>>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            rules: Vec::new(),
            config,
        }
    }

    pub fn with_rules(rules: Vec<Arc<dyn Rule>>, config: EngineConfig) -> Self {
        Engine { rules, config }
    }

    pub fn add_rule(&mut self, rule: Arc<dyn Rule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Run the full rule batch over one file, then flush import edits.
    pub fn run_file(&self, file: &mut SourceFile, cancel: &CancelToken) -> FileOutcome {
        let initial_root = file.tree.root();
        let mut ledger = ImportLedger::new();
        let mut diagnostics = Vec::new();
        let mut cancelled = false;

        for rule in &self.rules {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if !rule.precondition().holds(file) {
                trace!(rule = rule.name(), path = %file.path, "precondition not met");
                continue;
            }
            let root = file.tree.root();
            let mut rewriter = Rewriter {
                tree: &mut file.tree,
                symbols: &file.symbols,
                ledger: &mut ledger,
                diagnostics: &mut diagnostics,
                rule_name: rule.name(),
                ctx: ContextStack::new(),
            };
            let new_root = rewriter.transform(rule.as_ref(), root, &ContextStack::new());
            if new_root != root {
                debug!(rule = rule.name(), path = %file.path, "rule produced edits");
                file.tree.set_root(new_root);
            }
        }

        if !cancelled && !ledger.is_empty() {
            let new_root = ledger.flush(&mut file.tree, &file.symbols);
            file.tree.set_root(new_root);
        }

        FileOutcome {
            changed: file.tree.root() != initial_root,
            diagnostics,
            cancelled,
        }
    }

    /// Run the batch over many files on independent worker threads. Each
    /// worker owns its file's tree, context and ledger outright; results
    /// come back in input order.
    pub fn run_batch(&self, files: Vec<SourceFile>, cancel: &CancelToken) -> Vec<BatchResult> {
        if files.is_empty() {
            return Vec::new();
        }
        let workers = self.config.workers.max(1).min(files.len());
        if workers == 1 {
            return files
                .into_iter()
                .map(|mut file| {
                    let outcome = self.run_file(&mut file, cancel);
                    BatchResult { file, outcome }
                })
                .collect();
        }

        let total = files.len();
        let (task_tx, task_rx) = unbounded::<(usize, SourceFile)>();
        let (result_tx, result_rx) = unbounded::<(usize, BatchResult)>();
        for task in files.into_iter().enumerate() {
            task_tx.send(task).expect("task channel open");
        }
        drop(task_tx);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok((index, mut file)) = task_rx.recv() {
                        let outcome = self.run_file(&mut file, cancel);
                        if result_tx.send((index, BatchResult { file, outcome })).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();
        while let Ok((index, result)) = result_rx.recv() {
            results[index] = Some(result);
        }
        results
            .into_iter()
            .map(|slot| slot.expect("every file produces a result"))
            .collect()
    }
}
