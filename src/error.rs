//! Error types shared by the calculators, the definition model and the store.
use crate::definition::change::RiskDefinitionChange;
use crate::store::{CategoryRef, DomainId};
use thiserror::Error;

/// Failure reported by a persistence collaborator.
///
/// The engine never retries or recovers from these; they travel to the caller
/// unchanged inside `RiskError::Repository`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },
    #[error("Repository failure: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("No risk value for impact {impact} in category '{category}' ({rows} impact rows)")]
    ImpactOutOfBounds { category: CategoryRef, impact: u32, rows: usize },
    #[error("No risk value for probability {probability} in category '{category}' ({columns} probability columns)")]
    ProbabilityOutOfBounds { category: CategoryRef, probability: u32, columns: usize },
    #[error("Category '{0}' does not support risk values")]
    RiskValuesNotSupported(CategoryRef),
    #[error("Domain '{0}' is not known to the client")]
    UnknownDomain(DomainId),
    #[error("Missing migration steps: {}", format_changes(.changes))]
    UnhandledChanges { changes: Vec<RiskDefinitionChange> },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn format_changes(changes: &[RiskDefinitionChange]) -> String {
    changes.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
}
