//! Validation rule for value matrix consistency.

use crate::definition::model::CategoryDefinition;
use crate::validation::error::{ValidationKind, ValidationMessage};

/// Risk should never drop when impact or probability grows. Every cell lower
/// than its left neighbour, and every cell lower than its upper neighbour,
/// yields one warning.
pub(crate) fn validate_monotonic(category: &CategoryDefinition) -> Vec<ValidationMessage> {
    let mut warnings = Vec::new();
    let Some(matrix) = category.value_matrix.as_ref() else {
        return warnings;
    };

    let warn = |row: usize, column: usize| {
        ValidationMessage::warning(
            ValidationKind::InconsistentMatrix,
            vec![category.to_ref()],
            format!("The risk matrices for the following criteria are inconsistent: [{}]", category.id),
        )
        .at(row, column)
    };

    for (row, cells) in matrix.iter().enumerate() {
        for column in 1..cells.len() {
            let current = cells[column].ordinal_value;
            if current < cells[column - 1].ordinal_value {
                warnings.push(warn(row, column));
            }
            if row > 0 {
                let above = matrix[row - 1].get(column).map(|c| c.ordinal_value);
                if above.map_or(false, |above| current < above) {
                    warnings.push(warn(row, column));
                }
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::risk_definition;

    #[test]
    fn test_ascending_matrix_has_no_warnings() {
        let rd = risk_definition("rd", &["C1"]);
        assert!(validate_monotonic(&rd.categories[0]).is_empty());
    }

    #[test]
    fn test_drop_against_both_neighbours() {
        let rd = risk_definition("rd", &["C1"]);
        let mut cat = rd.categories[0].clone();
        // Row 2 is [high, high]; lowering the right cell breaks both directions.
        if let Some(m) = cat.value_matrix.as_mut() {
            m[2][1] = rd.risk_values[0].clone();
        }

        let warnings = validate_monotonic(&cat);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.row == Some(2) && w.column == Some(1)));
    }

    #[test]
    fn test_first_column_is_not_compared_vertically() {
        let rd = risk_definition("rd", &["C1"]);
        let mut cat = rd.categories[0].clone();
        // [low, medium] / [medium, high] / [low, high]
        if let Some(m) = cat.value_matrix.as_mut() {
            m[2][0] = rd.risk_values[0].clone();
        }
        assert!(validate_monotonic(&cat).is_empty());
    }
}
