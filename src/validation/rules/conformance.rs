//! Validation rule for value matrix conformance.

use crate::definition::model::{CategoryDefinition, RiskDefinition};
use crate::validation::error::{ValidationKind, ValidationMessage};

/// "The Shape Rule": every cell must be a risk value of the definition (same
/// ordinal and symbol), there must be one row per impact level and one column
/// per probability level. Reports the first violation only.
pub(crate) fn validate_conformance(rd: &RiskDefinition, category: &CategoryDefinition) -> Option<ValidationMessage> {
    let matrix = category.value_matrix.as_ref()?;

    let mut undefined: Vec<String> = matrix
        .iter()
        .flatten()
        .filter(|cell| {
            rd.risk_value_by_ordinal(cell.ordinal_value).map_or(true, |v| v.symbolic_risk != cell.symbolic_risk)
        })
        .map(|cell| format!("{}({})", cell.symbolic_risk, cell.ordinal_value))
        .collect();
    if !undefined.is_empty() {
        undefined.sort();
        undefined.dedup();
        return Some(ValidationMessage::error(
            ValidationKind::UndefinedRiskValue,
            category.to_ref(),
            format!("Invalid risk values for category {}: [{}]", category.id, undefined.join(", ")),
        ));
    }

    if matrix.len() != category.potential_impacts.len() {
        return Some(ValidationMessage::error(
            ValidationKind::ImpactMismatch,
            category.to_ref(),
            format!("Value matrix for category {} does not conform to impacts.", category.id),
        ));
    }

    let columns = rd.probability.levels.len();
    if matrix.iter().any(|row| row.len() != columns) {
        return Some(ValidationMessage::error(
            ValidationKind::ProbabilityMismatch,
            category.to_ref(),
            format!("Value matrix for category {} does not conform to probability.", category.id),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::model::RiskValue;
    use crate::testing::{category, risk_definition};
    use rstest::rstest;

    #[test]
    fn test_conforming_matrix_passes() {
        let rd = risk_definition("rd", &["C1"]);
        assert!(validate_conformance(&rd, &rd.categories[0]).is_none());
    }

    #[test]
    fn test_category_without_matrix_passes() {
        let mut rd = risk_definition("rd", &["C1"]);
        rd.categories[0].value_matrix = None;
        assert!(validate_conformance(&rd, &rd.categories[0]).is_none());
    }

    #[rstest]
    #[case::unknown_symbol(Some("extreme"), None, ValidationKind::UndefinedRiskValue)]
    #[case::too_many_rows(None, Some((4, 2)), ValidationKind::ImpactMismatch)]
    #[case::too_many_columns(None, Some((3, 3)), ValidationKind::ProbabilityMismatch)]
    fn test_violations(#[case] symbol: Option<&str>, #[case] shape: Option<(usize, usize)>, #[case] expected: ValidationKind) {
        let mut rd = risk_definition("rd", &["C1"]);
        if let Some((rows, cols)) = shape {
            let mut resized = category("C1", rows, cols, &rd.risk_values);
            resized.potential_impacts.truncate(3);
            rd.categories[0] = resized;
        }
        if let (Some(symbol), Some(matrix)) = (symbol, rd.categories[0].value_matrix.as_mut()) {
            matrix[0][0] = RiskValue { ordinal_value: 0, ..RiskValue::new(symbol) };
        }

        let msg = validate_conformance(&rd, &rd.categories[0]).unwrap();
        assert_eq!(msg.kind, expected);
        assert_eq!(msg.categories, vec![rd.categories[0].to_ref()]);
    }
}
