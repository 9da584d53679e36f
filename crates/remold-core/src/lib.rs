//! # Remold Core
//!
//! Core implementation of the remold source-migration engine, including:
//! - Arena syntax tree with structural-sharing edits
//! - Fragment-language parser and type resolver
//! - Signature matcher, context path accumulator, and rewrite templates
//! - Rule orchestrator with deferred import bookkeeping
//!
//! This crate provides the engine that migration rules are written against;
//! the surrounding tooling (CLI, build integration) lives in separate
//! crates.

#![warn(clippy::all)]

pub mod parser;
pub mod rewrite;
pub mod rules;
pub mod tree;

// Re-export commonly used types
pub use parser::{parse_fragment, parse_unit, resolve, SymbolTable};
pub use rewrite::{
    BatchResult, CancelToken, ContextStack, Engine, FileKind, FileOutcome, ImportLedger,
    PathMatcher, Precondition, RewriteError, Rewriter, Rule, RuleDiagnostic, Signature,
    SourceFile, Template,
};
pub use tree::{Node, NodeId, NodeKind, SyntaxTree, ToSource, TypeRef};

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for remold core components
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("remold_core=info".parse().unwrap()),
        )
        .init();
}

/// Core engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker threads for batch runs; each file is owned by one worker.
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Error types for remold core operations
#[derive(thiserror::Error, Debug)]
pub enum RemoldError {
    /// Parser error
    #[error("Parse error: {0}")]
    Parse(#[from] anyhow::Error),

    /// Rewrite engine error
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] rewrite::RewriteError),
}

/// Result type for remold core operations
pub type Result<T> = std::result::Result<T, RemoldError>;
