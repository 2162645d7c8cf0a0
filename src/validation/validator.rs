//! The central validator that runs every validation rule over a risk definition.
use super::error::{Severity, ValidationKind, ValidationMessage};
use super::rules::{conformance, monotonic};
use crate::definition::change::{self, RiskDefinitionChange};
use crate::definition::model::RiskDefinition;
use crate::store::CategoryRef;
use std::collections::BTreeSet;

/// Collects all findings for a risk definition, like a linter, instead of
/// stopping at the first one.
///
/// When a change set is attached, resized and changed matrices are reported
/// as warnings as well.
pub struct Validator<'a> {
    rd: &'a RiskDefinition,
    changes: Option<&'a BTreeSet<RiskDefinitionChange>>,
}

impl<'a> Validator<'a> {
    pub fn new(rd: &'a RiskDefinition) -> Self {
        Self { rd, changes: None }
    }

    pub fn with_changes(mut self, changes: &'a BTreeSet<RiskDefinitionChange>) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Errors of the conformance rule come first, then monotonicity warnings,
    /// then the change warnings.
    pub fn validate(&self) -> Vec<ValidationMessage> {
        let mut messages: Vec<ValidationMessage> =
            self.rd.categories.iter().filter_map(|c| conformance::validate_conformance(self.rd, c)).collect();

        messages.extend(self.rd.categories.iter().flat_map(monotonic::validate_monotonic));

        if let Some(changes) = self.changes {
            push_change_warning(
                &mut messages,
                ValidationKind::MatrixResized,
                change::risk_matrix_resize_categories(changes),
                "The following risk matrices have been resized, please adjust the risk values if necessary",
            );
            push_change_warning(
                &mut messages,
                ValidationKind::MatrixChanged,
                change::changed_risk_matrix_categories(changes),
                "Risk matrices have been changed. Please adjust the risk values for the following criteria",
            );
        }
        messages
    }

    pub fn has_errors(&self) -> bool {
        self.validate().iter().any(|m| m.severity == Severity::Error)
    }
}

fn push_change_warning(out: &mut Vec<ValidationMessage>, kind: ValidationKind, categories: Vec<CategoryRef>, text: &str) {
    if categories.is_empty() {
        return;
    }
    let listed: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
    let description = format!("{}: [{}]", text, listed.join(", "));
    out.push(ValidationMessage::warning(kind, categories, description));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::risk_definition;

    #[test]
    fn test_valid_definition_has_no_messages() {
        let rd = risk_definition("rd", &["C1", "C2"]);
        let validator = Validator::new(&rd);
        assert!(validator.validate().is_empty());
        assert!(!validator.has_errors());
    }

    #[test]
    fn test_errors_precede_warnings() {
        let mut rd = risk_definition("rd", &["C1", "C2"]);
        rd.categories[0].potential_impacts.pop();
        if let Some(m) = rd.categories[1].value_matrix.as_mut() {
            m[0][1] = rd.risk_values[0].clone();
            m[0][0] = rd.risk_values[2].clone();
        }

        let messages = Validator::new(&rd).validate();
        assert_eq!(messages[0].severity, Severity::Error);
        assert_eq!(messages[0].kind, ValidationKind::ImpactMismatch);
        assert!(messages[1..].iter().all(|m| m.kind == ValidationKind::InconsistentMatrix));
        assert!(Validator::new(&rd).has_errors());
    }

    #[test]
    fn test_change_warnings_list_categories() {
        let rd = risk_definition("rd", &["C1", "C2"]);
        let changes: BTreeSet<RiskDefinitionChange> = [
            RiskDefinitionChange::RiskMatrixResize { category: CategoryRef::from("C1") },
            RiskDefinitionChange::RiskMatrixDiff { category: CategoryRef::from("C1") },
            RiskDefinitionChange::RiskMatrixDiff { category: CategoryRef::from("C2") },
        ]
        .into_iter()
        .collect();

        let messages = Validator::new(&rd).with_changes(&changes).validate();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, ValidationKind::MatrixResized);
        assert_eq!(
            messages[0].description,
            "The following risk matrices have been resized, please adjust the risk values if necessary: [C1]"
        );
        assert_eq!(messages[1].categories, vec![CategoryRef::from("C1"), CategoryRef::from("C2")]);
        assert!(messages[1].description.ends_with("criteria: [C1, C2]"));
    }
}
