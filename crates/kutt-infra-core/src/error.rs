//! Resource graph error types

use crate::resource::Urn;
use thiserror::Error;

/// Resource graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Provider not found for package: {0}")]
    ProviderNotFound(String),

    #[error("Resource already declared: {0}")]
    DuplicateUrn(Urn),

    #[error("{urn} depends on {dependency}, which was not declared earlier in this pass")]
    UnknownDependency { urn: Urn, dependency: Urn },

    #[error("Stack output already exported: {0}")]
    DuplicateExport(String),

    #[error("{} resource(s) failed to resolve:\n{}", .0.len(), format_failures(.0))]
    Resolution(Vec<ResolutionFailure>),

    #[error("Provider operation failed: {0}")]
    ProviderFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A declaration (or stack output) whose value could not be resolved
#[derive(Debug, Clone)]
pub struct ResolutionFailure {
    /// URN of the failed resource, or `output:<name>` for a stack output
    pub subject: String,

    /// Underlying error message
    pub message: String,
}

fn format_failures(failures: &[ResolutionFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  - {}: {}", f.subject, f.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, GraphError>;
