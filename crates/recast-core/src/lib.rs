//! # Recast Core
//!
//! Semantics-preserving source-to-source rewriting for collection-heavy code:
//! - Persistent syntax trees with resolved types and binding identities
//! - Type oracle answering type-family and binding-identity queries
//! - Pattern / guard / template rules with an anti-recursion gate
//! - Fixpoint traversal driver with import reconciliation
//! - A catalog of Eclipse Collections simplification rules
//!
//! Parsing and printing are the host's job; this crate consumes a resolved
//! tree and produces a rewritten tree plus its import list.

#![warn(clippy::all)]

pub mod ast;
pub mod config;
pub mod oracle;
pub mod rewrite;

// Re-export commonly used types
pub use ast::{Node, NodeKind, SyntaxNode, ToSource};
pub use config::{EngineConfig, TieBreak};
pub use oracle::{FamilySet, OracleConfig, OracleError, TypeFamily, TypeHierarchy, TypeOracle};
pub use rewrite::{
    ec_rules, run_passes, Diagnostic, Guard, NoMatch, Pattern, RewriteEngine, RewriteOutcome,
    RewriteRule, Rule, RuleSet, RuleStats, Template,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for recast components
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "recast_core=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    // A subscriber may already be installed by the embedding application
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Error types for recast core operations
#[derive(thiserror::Error, Debug)]
pub enum RecastError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Type information error surfaced outside a rewrite pass
    #[error("Type oracle error: {0}")]
    Oracle(#[from] OracleError),
}

/// Result type for recast core operations
pub type Result<T> = std::result::Result<T, RecastError>;
