//! Defines the message types for the validation module.
use crate::store::CategoryRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

/// The specific category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationKind {
    /// A matrix cell is not one of the definition's risk values.
    UndefinedRiskValue,
    /// Matrix row count differs from the number of impact levels.
    ImpactMismatch,
    /// A matrix row length differs from the number of probability levels.
    ProbabilityMismatch,
    /// A cell is lower than its left or upper neighbour.
    InconsistentMatrix,
    MatrixResized,
    MatrixChanged,
}

/// A structured finding of the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub kind: ValidationKind,
    pub description: String,
    pub categories: Vec<CategoryRef>,
    /// Impact index of the offending cell, if the finding is about one cell.
    pub row: Option<usize>,
    /// Probability index of the offending cell.
    pub column: Option<usize>,
}

impl ValidationMessage {
    pub fn error(kind: ValidationKind, category: CategoryRef, description: String) -> Self {
        Self { severity: Severity::Error, kind, description, categories: vec![category], row: None, column: None }
    }

    pub fn warning(kind: ValidationKind, categories: Vec<CategoryRef>, description: String) -> Self {
        Self { severity: Severity::Warning, kind, description, categories, row: None, column: None }
    }

    pub fn at(mut self, row: usize, column: usize) -> Self {
        self.row = Some(row);
        self.column = Some(column);
        self
    }
}
