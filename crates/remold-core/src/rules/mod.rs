// Built-in migration rules. Each rule is domain data written against the
// public engine API: a signature or path pattern, a replacement template,
// and an applicability gate.

pub mod modern_base64;
pub mod report_dsl;
pub mod tags_pairs;

use std::sync::Arc;

pub use modern_base64::UseModernBase64;
pub use report_dsl::ReportDslDeprecations;
pub use tags_pairs::TagsArrayToPairs;

use crate::rewrite::Rule;

/// The full catalog, in batch order.
pub fn default_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(UseModernBase64::new()),
        Arc::new(ReportDslDeprecations::new()),
        Arc::new(TagsArrayToPairs::new()),
    ]
}
