// Renames deprecated report-configuration properties inside the coverage
// report DSL: `enabled` becomes `required` and `destination` becomes
// `outputLocation`, but only for assignments whose reconstructed ancestor
// path sits at `jacocoTestReport.reports.<type>` depth. The same property
// names anywhere else are left alone.

use crate::rewrite::{FileKind, PathMatcher, Precondition, Rewriter, Rule};
use crate::tree::{NodeId, NodeKind};

const REPORT_TYPES: [&str; 3] = ["xml", "csv", "html"];

pub struct ReportDslDeprecations {
    scope: PathMatcher,
}

impl ReportDslDeprecations {
    pub fn new() -> Self {
        ReportDslDeprecations {
            scope: PathMatcher::new("jacocoTestReport.reports"),
        }
    }

    fn replacement_for(property: &str) -> Option<&'static str> {
        if property.eq_ignore_ascii_case("enabled") {
            Some("required")
        } else if property.eq_ignore_ascii_case("destination") {
            Some("outputLocation")
        } else {
            None
        }
    }
}

impl Default for ReportDslDeprecations {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ReportDslDeprecations {
    fn name(&self) -> &'static str {
        "ReportDslDeprecations"
    }

    fn precondition(&self) -> Precondition {
        Precondition::FileKind(FileKind::BuildScript)
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId> {
        let (target, value) = match rw.tree().kind(node) {
            NodeKind::Assignment { target, value } => (*target, *value),
            _ => return None,
        };
        // A multi-hop target like `reports.xml.enabled` contributes its
        // flattened segments to the path, same as nesting would.
        let flat = rw.tree().flatten_path(target)?;
        let full = match rw.nearest_path() {
            Some(prefix) => format!("{prefix}.{flat}"),
            None => flat,
        };

        let parts: Vec<&str> = full.split('.').collect();
        if parts.len() != 4 || !self.scope.matches_prefix(&full) {
            return None;
        }
        if !REPORT_TYPES
            .iter()
            .any(|report| report.eq_ignore_ascii_case(parts[2]))
        {
            return None;
        }
        let renamed = Self::replacement_for(parts[3])?;

        let new_target = match rw.tree().kind(target).clone() {
            NodeKind::Identifier(_) => rw
                .tree_mut()
                .alloc(NodeKind::Identifier(renamed.to_string())),
            NodeKind::FieldAccess { target: base, .. } => {
                rw.tree_mut().alloc(NodeKind::FieldAccess {
                    target: base,
                    name: renamed.to_string(),
                })
            }
            _ => return None,
        };
        Some(rw.tree_mut().alloc(NodeKind::Assignment {
            target: new_target,
            value,
        }))
    }
}
