// The structural rewrite engine: signature matching, traversal context,
// template binding, and the per-file/batch orchestrator.

pub mod context;
pub mod engine;
pub mod errors;
pub mod imports;
pub mod signature;
pub mod template;

pub use context::{ContextEntry, ContextStack, PathMatcher, PATH_KEY};
pub use engine::{
    BatchResult, CancelToken, Engine, FileKind, FileOutcome, Precondition, Rewriter, Rule,
    SourceFile,
};
pub use errors::{RewriteError, RuleDiagnostic};
pub use imports::{ImportEdit, ImportLedger};
pub use signature::{ParamPattern, Signature, CONSTRUCTOR};
pub use template::{Template, TemplateBuilder};





#[cfg(test)]
mod engine_tests;
