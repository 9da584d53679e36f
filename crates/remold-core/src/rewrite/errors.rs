use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::NodeId;

/// Rewrite-specific error types for better per-rule reporting.
///
/// A bind failure is a contract violation by the rule author: it aborts that
/// single application and leaves the target node untouched, but never fails
/// the batch.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RewriteError {
    #[error("template expects {expected} captures, got {actual}")]
    BindArity { expected: usize, actual: usize },

    #[error("capture {index} has type {actual}, placeholder requires {required}")]
    BindType {
        index: usize,
        required: String,
        actual: String,
    },

    #[error("template snippet failed to parse: {message}")]
    TemplateParse { message: String },

    #[error("invalid signature pattern '{pattern}': {message}")]
    SignaturePattern { pattern: String, message: String },
}

impl RewriteError {
    /// Create a bind arity error
    pub fn bind_arity(expected: usize, actual: usize) -> Self {
        Self::BindArity { expected, actual }
    }

    /// Create a bind type error
    pub fn bind_type(index: usize, required: &str, actual: &str) -> Self {
        Self::BindType {
            index,
            required: required.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a template parse error
    pub fn template_parse(message: impl Into<String>) -> Self {
        Self::TemplateParse {
            message: message.into(),
        }
    }

    /// Create a signature pattern error
    pub fn signature_pattern(pattern: &str, message: impl Into<String>) -> Self {
        Self::SignaturePattern {
            pattern: pattern.to_string(),
            message: message.into(),
        }
    }
}

/// One failed rule application, reported to the caller alongside the
/// (otherwise successful) file outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDiagnostic {
    /// Name of the rule whose application failed.
    pub rule: String,
    /// The node the rule was rewriting when it failed.
    pub node: NodeId,
    pub error: RewriteError,
}
