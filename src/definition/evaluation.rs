//! evaluation.rs
//! Dry run of a risk definition update: normalizes the candidate's value
//! matrices, diffs it against the current version and validates the result.

use super::change::{self, RiskDefinitionChange, RiskDefinitionChangeEffect};
use super::model::{CategoryDefinition, ProbabilityDefinition, RiskDefinition, RiskValue, ValueMatrix};
use crate::config::EngineConfig;
use crate::error::RiskError;
use crate::validation::{ValidationMessage, Validator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// The candidate with synchronized value matrices.
    pub risk_definition: RiskDefinition,
    pub changes: BTreeSet<RiskDefinitionChange>,
    pub effects: Vec<RiskDefinitionChangeEffect>,
    pub messages: Vec<ValidationMessage>,
}

/// Rebuilds the matrix of `category` to one row per impact level and one column
/// per probability level. Cells that are missing, or rank above `last`, become
/// `last`. A category without impact levels loses its matrix.
///
/// Returns `true` if the matrix dimensions changed.
pub fn sync_risk_matrix(probability: &ProbabilityDefinition, category: &mut CategoryDefinition, last: &RiskValue) -> bool {
    if category.potential_impacts.is_empty() {
        return category.value_matrix.take().is_some();
    }

    let (rows, columns) = (category.potential_impacts.len(), probability.levels.len());
    let old = category.value_matrix.take().unwrap_or_default();
    let resized = old.len() != rows || old.iter().any(|row| row.len() != columns);

    let matrix: ValueMatrix = (0..rows)
        .map(|i| {
            (0..columns)
                .map(|p| match old.get(i).and_then(|row| row.get(p)) {
                    Some(cell) if cell.ordinal_value <= last.ordinal_value => cell.clone(),
                    _ => last.clone(),
                })
                .collect()
        })
        .collect();
    category.value_matrix = Some(matrix);
    resized
}

/// Evaluates `candidate` as the next version of `current`.
///
/// Fails with `RiskError::UnhandledChanges` if a detected change needs a
/// migration step that `config` does not provide.
#[instrument(level = "debug", skip_all, fields(risk_definition = %candidate.id))]
pub fn evaluate(
    current: Option<&RiskDefinition>,
    mut candidate: RiskDefinition,
    config: &EngineConfig,
) -> Result<Evaluation, RiskError> {
    let mut changes = BTreeSet::new();

    if let Some(last) = candidate.risk_values.last().cloned() {
        let probability = candidate.probability.clone();
        for category in candidate.categories.iter_mut().filter(|c| c.is_risk_values_supported()) {
            if sync_risk_matrix(&probability, category, &last) {
                changes.insert(RiskDefinitionChange::RiskMatrixResize { category: category.to_ref() });
            }
        }
    }

    match current {
        Some(current) => changes.extend(change::detect_changes(current, &candidate)),
        None => {
            changes.insert(RiskDefinitionChange::NewRiskDefinition);
        }
    }
    debug!(count = changes.len(), "detected risk definition changes");

    let unhandled: Vec<RiskDefinitionChange> =
        changes.iter().filter(|c| c.requires_migration() && !config.supports(c.kind())).cloned().collect();
    if !unhandled.is_empty() {
        return Err(RiskError::UnhandledChanges { changes: unhandled });
    }

    let messages = Validator::new(&candidate).with_changes(&changes).validate();
    let effects = change::effects(&changes);
    Ok(Evaluation { risk_definition: candidate, changes, effects, messages })
}
