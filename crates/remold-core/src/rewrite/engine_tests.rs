use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use pretty_assertions::assert_eq;

use crate::parser::SymbolTable;
use crate::tree::{NodeId, NodeKind, ToSource};
use crate::EngineConfig;

use super::engine::{CancelToken, Engine, FileKind, Precondition, Rewriter, Rule, SourceFile};
use super::template::Template;

fn source_file(source: &str) -> SourceFile {
    SourceFile::parse("input.src", FileKind::Source, source, SymbolTable::new()).unwrap()
}

fn build_file(source: &str) -> SourceFile {
    SourceFile::parse("input.build", FileKind::BuildScript, source, SymbolTable::new()).unwrap()
}

/// Counts every node it is offered; used to observe traversal work.
struct CountingRule {
    gate: Precondition,
    visits: AtomicUsize,
}

impl CountingRule {
    fn new(gate: Precondition) -> Self {
        CountingRule {
            gate,
            visits: AtomicUsize::new(0),
        }
    }
}

impl Rule for CountingRule {
    fn name(&self) -> &'static str {
        "CountingRule"
    }

    fn precondition(&self) -> Precondition {
        self.gate.clone()
    }

    fn rewrite(&self, _rw: &mut Rewriter<'_>, _node: NodeId) -> Option<NodeId> {
        self.visits.fetch_add(1, Ordering::Relaxed);
        None
    }
}

/// Renames identifiers, used to observe rule ordering and composition.
struct RenameRule {
    from: &'static str,
    to: &'static str,
}

impl Rule for RenameRule {
    fn name(&self) -> &'static str {
        "RenameRule"
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId> {
        match rw.tree().kind(node) {
            NodeKind::Identifier(name) if name == self.from => Some(
                rw.tree_mut()
                    .alloc(NodeKind::Identifier(self.to.to_string())),
            ),
            _ => None,
        }
    }
}

/// Applies a two-slot template with a single capture: always a bind error.
struct BrokenBindRule {
    template: Template,
}

impl BrokenBindRule {
    fn new() -> Self {
        BrokenBindRule {
            template: Template::builder("wrap(#{any()}, #{any()})").build().unwrap(),
        }
    }
}

impl Rule for BrokenBindRule {
    fn name(&self) -> &'static str {
        "BrokenBindRule"
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId> {
        match rw.tree().kind(node) {
            NodeKind::Call { name, .. } if name == "work" => {
                rw.apply_template(&self.template, node, &[node])
            }
            _ => None,
        }
    }
}

/// Records the reconstructed ancestor path at every assignment.
struct PathProbeRule {
    seen: Mutex<Vec<Option<String>>>,
}

impl PathProbeRule {
    fn new() -> Self {
        PathProbeRule {
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Rule for PathProbeRule {
    fn name(&self) -> &'static str {
        "PathProbeRule"
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId> {
        if matches!(rw.tree().kind(node), NodeKind::Assignment { .. }) {
            self.seen.lock().unwrap().push(rw.nearest_path());
        }
        None
    }
}

/// Cancels the shared token from inside its own pass.
struct CancelingRule {
    token: CancelToken,
}

impl Rule for CancelingRule {
    fn name(&self) -> &'static str {
        "CancelingRule"
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId> {
        match rw.tree().kind(node) {
            NodeKind::Identifier(name) if name == "alpha" => {
                self.token.cancel();
                Some(
                    rw.tree_mut()
                        .alloc(NodeKind::Identifier("omega".to_string())),
                )
            }
            _ => None,
        }
    }
}

#[test]
fn test_failed_gate_does_zero_traversal_work() {
    let rule = std::sync::Arc::new(CountingRule::new(Precondition::FileKind(
        FileKind::BuildScript,
    )));
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(rule.clone());

    let mut file = source_file("work(alpha)\n");
    let outcome = engine.run_file(&mut file, &CancelToken::new());

    assert!(!outcome.changed);
    assert_eq!(rule.visits.load(Ordering::Relaxed), 0);
}

#[test]
fn test_passing_gate_visits_every_node_once() {
    let rule = std::sync::Arc::new(CountingRule::new(Precondition::Always));
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(rule.clone());

    // unit + call + identifier argument = 3 nodes.
    let mut file = source_file("work(alpha)\n");
    engine.run_file(&mut file, &CancelToken::new());
    assert_eq!(rule.visits.load(Ordering::Relaxed), 3);
}

#[test]
fn test_uses_type_gate_checks_imports_and_references() {
    let gate = Precondition::UsesType("legacy.util.LegacyCodec".to_string());
    assert!(gate.holds(&source_file("import legacy.util.LegacyCodec\nwork()\n")));
    assert!(gate.holds(&source_file("def c = new legacy.util.LegacyCodec()\n")));
    assert!(!gate.holds(&source_file("work(alpha)\n")));
}

#[test]
fn test_rule_output_feeds_later_rules_in_same_batch() {
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(std::sync::Arc::new(RenameRule {
        from: "alpha",
        to: "beta",
    }));
    engine.add_rule(std::sync::Arc::new(RenameRule {
        from: "beta",
        to: "gamma",
    }));

    let mut file = source_file("work(alpha)\n");
    let outcome = engine.run_file(&mut file, &CancelToken::new());
    assert!(outcome.changed);
    assert_eq!(file.tree.to_source(), "work(gamma)\n");
}

#[test]
fn test_rule_order_is_significant() {
    // Reversed registration: the beta rule runs before beta exists.
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(std::sync::Arc::new(RenameRule {
        from: "beta",
        to: "gamma",
    }));
    engine.add_rule(std::sync::Arc::new(RenameRule {
        from: "alpha",
        to: "beta",
    }));

    let mut file = source_file("work(alpha)\n");
    engine.run_file(&mut file, &CancelToken::new());
    assert_eq!(file.tree.to_source(), "work(beta)\n");
}

#[test]
fn test_bind_failure_is_a_diagnostic_not_a_batch_failure() {
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(std::sync::Arc::new(BrokenBindRule::new()));

    let mut file = source_file("work(alpha)\n");
    let before = file.tree.clone();
    let outcome = engine.run_file(&mut file, &CancelToken::new());

    assert!(!outcome.changed);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].rule, "BrokenBindRule");
    // The target node was left exactly as it was.
    assert_eq!(file.tree, before);
}

#[test]
fn test_nested_calls_accumulate_dotted_path() {
    let probe = std::sync::Arc::new(PathProbeRule::new());
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(probe.clone());

    let mut file = build_file("outer {\n    middle {\n        leaf {\n            value = 1\n        }\n    }\n}\nvalue = 2\n");
    engine.run_file(&mut file, &CancelToken::new());

    let seen = probe.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![Some("outer.middle.leaf".to_string()), None]
    );
}

#[test]
fn test_cancellation_keeps_last_fully_produced_root() {
    let token = CancelToken::new();
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(std::sync::Arc::new(CancelingRule {
        token: token.clone(),
    }));
    engine.add_rule(std::sync::Arc::new(RenameRule {
        from: "omega",
        to: "never",
    }));

    let mut file = source_file("work(alpha)\n");
    let outcome = engine.run_file(&mut file, &token);

    // First rule finished and its edit survives; the second never ran.
    assert!(outcome.cancelled);
    assert!(outcome.changed);
    assert_eq!(file.tree.to_source(), "work(omega)\n");
}

#[test]
fn test_outcome_serializes_for_tooling() {
    let mut engine = Engine::new(EngineConfig { workers: 1 });
    engine.add_rule(std::sync::Arc::new(BrokenBindRule::new()));

    let mut file = source_file("work(alpha)\n");
    let outcome = engine.run_file(&mut file, &CancelToken::new());
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("\"rule\":\"BrokenBindRule\""));
}

#[test]
fn test_batch_returns_results_in_input_order() {
    let mut engine = Engine::new(EngineConfig { workers: 4 });
    engine.add_rule(std::sync::Arc::new(RenameRule {
        from: "alpha",
        to: "beta",
    }));

    let files: Vec<SourceFile> = (0..8)
        .map(|i| {
            let source = if i % 2 == 0 { "work(alpha)\n" } else { "work(other)\n" };
            SourceFile::parse(format!("file{i}.src"), FileKind::Source, source, SymbolTable::new())
                .unwrap()
        })
        .collect();

    let results = engine.run_batch(files, &CancelToken::new());
    assert_eq!(results.len(), 8);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.file.path, format!("file{i}.src"));
        assert_eq!(result.outcome.changed, i % 2 == 0);
    }
}
