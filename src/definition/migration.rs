//! migration.rs
//! Brings stored element values in line with a changed risk definition.

use super::change::{self, RiskDefinitionChange};
use super::model::RiskDefinition;
use crate::store::{CategoryRef, DomainId, Element, ElementType, RiskValues};
use std::collections::BTreeSet;

/// Applies `changes` of `rd` to the values `element` stores for (`domain`, `rd`):
///
/// - removed impact categories are dropped from the impact values,
/// - a changed probability list resets the scenario's potential probability,
/// - removed risk-value categories are dropped from every risk, added ones get
///   an empty entry.
///
/// Returns `true` if the element was modified and needs saving.
pub fn migrate_element(
    element: &mut Element,
    domain: &DomainId,
    rd: &RiskDefinition,
    changes: &BTreeSet<RiskDefinitionChange>,
) -> bool {
    if !change::requires_migration(changes) {
        return false;
    }
    let rd_ref = rd.to_ref();
    let mut modified = false;

    let removed_impacts = change::removed_impact_categories(changes);
    if !removed_impacts.is_empty() {
        if let Some(values) = element.impact_values_mut(domain, &rd_ref) {
            let migrated = std::mem::take(values).without_categories(&removed_impacts);
            modified |= *values != migrated;
            *values = migrated;
        }
    }

    if element.element_type == ElementType::Scenario && change::is_probability_changed(changes) {
        if let Some(per_rd) = element.potential_probability.get_mut(domain) {
            modified |= per_rd.remove(&rd_ref).is_some();
        }
    }

    let removed = change::removed_risk_value_categories(changes);
    let added = change::added_risk_value_categories(changes);
    for risk in &mut element.risks {
        if let Some(values) = risk.values_mut(domain, &rd_ref) {
            modified |= migrate_risk_values(values, &removed, &added);
        }
    }
    modified
}

fn migrate_risk_values(values: &mut RiskValues, removed: &[CategoryRef], added: &[CategoryRef]) -> bool {
    let mut modified = false;
    for category in removed {
        modified |= values.impacts.remove(category).is_some();
        modified |= values.risks.remove(category).is_some();
    }
    for category in added {
        if !values.impacts.contains_key(category) {
            values.impacts.insert(category.clone(), Default::default());
            modified = true;
        }
        if !values.risks.contains_key(category) {
            values.risks.insert(category.clone(), Default::default());
            modified = true;
        }
    }
    modified
}
