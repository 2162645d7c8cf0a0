//! change.rs
//! Structural diff between two versions of a risk definition.
//!
//! `detect_changes` classifies every difference into a closed set of change
//! variants. Each variant knows which effects it has on existing data, and the
//! free functions at the bottom aggregate those effects over a whole change set
//! to decide whether risks must be recalculated, impacts re-inherited, or stored
//! values migrated.

use super::model::{CategoryDefinition, DiscreteValue, RiskDefinition, Translations, ValueMatrix};
use crate::store::CategoryRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// --- Changes ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "changeType")]
pub enum RiskDefinitionChange {
    NewRiskDefinition,
    ImpactLinks,
    TranslationDiff,
    ColorDiff,
    RiskMatrixDiff { category: CategoryRef },
    RiskMatrixAdd { category: CategoryRef },
    RiskMatrixRemove { category: CategoryRef },
    RiskMatrixResize { category: CategoryRef },
    ImplementationStateListResize,
    ImpactListResize { category: CategoryRef },
    /// Carries every category of the previous definition, all of which lose their risk values.
    ProbabilityListResize { categories: Vec<CategoryRef> },
    CategoryListAdd { category: CategoryRef },
    CategoryListRemove { category: CategoryRef },
    RiskValueListResize,
}

/// Payload-free discriminant of a change, used to configure supported migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeKind {
    NewRiskDefinition,
    ImpactLinks,
    TranslationDiff,
    ColorDiff,
    RiskMatrixDiff,
    RiskMatrixAdd,
    RiskMatrixRemove,
    RiskMatrixResize,
    ImplementationStateListResize,
    ImpactListResize,
    ProbabilityListResize,
    CategoryListAdd,
    CategoryListRemove,
    RiskValueListResize,
}

impl ChangeKind {
    /// Kinds whose effects touch stored impact, probability or risk values.
    pub const MIGRATING: [ChangeKind; 6] = [
        ChangeKind::RiskMatrixAdd,
        ChangeKind::RiskMatrixRemove,
        ChangeKind::ImpactListResize,
        ChangeKind::ProbabilityListResize,
        ChangeKind::CategoryListAdd,
        ChangeKind::CategoryListRemove,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::NewRiskDefinition => "NewRiskDefinition",
            ChangeKind::ImpactLinks => "ImpactLinks",
            ChangeKind::TranslationDiff => "TranslationDiff",
            ChangeKind::ColorDiff => "ColorDiff",
            ChangeKind::RiskMatrixDiff => "RiskMatrixDiff",
            ChangeKind::RiskMatrixAdd => "RiskMatrixAdd",
            ChangeKind::RiskMatrixRemove => "RiskMatrixRemove",
            ChangeKind::RiskMatrixResize => "RiskMatrixResize",
            ChangeKind::ImplementationStateListResize => "ImplementationStateListResize",
            ChangeKind::ImpactListResize => "ImpactListResize",
            ChangeKind::ProbabilityListResize => "ProbabilityListResize",
            ChangeKind::CategoryListAdd => "CategoryListAdd",
            ChangeKind::CategoryListRemove => "CategoryListRemove",
            ChangeKind::RiskValueListResize => "RiskValueListResize",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RiskDefinitionChangeEffect {
    RiskRecalculation,
    ImpactInheritanceRecalculation,
    RiskValueCategoryAddition { category: CategoryRef },
    RiskValueCategoryRemoval { category: CategoryRef },
    ImpactCategoryRemoval { category: CategoryRef },
}

impl RiskDefinitionChangeEffect {
    pub fn description(&self) -> String {
        match self {
            Self::RiskRecalculation => "Risk values are recalculated.".into(),
            Self::ImpactInheritanceRecalculation => {
                "Inherited impact values are recalculated for all assets, processes and scopes.".into()
            }
            Self::RiskValueCategoryAddition { category } => {
                format!("Risk values for category '{}' are added to risks.", category)
            }
            Self::RiskValueCategoryRemoval { category } => {
                format!("Risk values for category '{}' are removed from all risks.", category)
            }
            Self::ImpactCategoryRemoval { category } => {
                format!("Impact values for category '{}' are removed from all assets, processes and scopes.", category)
            }
        }
    }
}

impl RiskDefinitionChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::NewRiskDefinition => ChangeKind::NewRiskDefinition,
            Self::ImpactLinks => ChangeKind::ImpactLinks,
            Self::TranslationDiff => ChangeKind::TranslationDiff,
            Self::ColorDiff => ChangeKind::ColorDiff,
            Self::RiskMatrixDiff { .. } => ChangeKind::RiskMatrixDiff,
            Self::RiskMatrixAdd { .. } => ChangeKind::RiskMatrixAdd,
            Self::RiskMatrixRemove { .. } => ChangeKind::RiskMatrixRemove,
            Self::RiskMatrixResize { .. } => ChangeKind::RiskMatrixResize,
            Self::ImplementationStateListResize => ChangeKind::ImplementationStateListResize,
            Self::ImpactListResize { .. } => ChangeKind::ImpactListResize,
            Self::ProbabilityListResize { .. } => ChangeKind::ProbabilityListResize,
            Self::CategoryListAdd { .. } => ChangeKind::CategoryListAdd,
            Self::CategoryListRemove { .. } => ChangeKind::CategoryListRemove,
            Self::RiskValueListResize => ChangeKind::RiskValueListResize,
        }
    }

    /// Categories this change is about.
    pub fn categories(&self) -> Vec<CategoryRef> {
        match self {
            Self::RiskMatrixDiff { category }
            | Self::RiskMatrixAdd { category }
            | Self::RiskMatrixRemove { category }
            | Self::RiskMatrixResize { category }
            | Self::ImpactListResize { category }
            | Self::CategoryListAdd { category }
            | Self::CategoryListRemove { category } => vec![category.clone()],
            Self::ProbabilityListResize { categories } => categories.clone(),
            _ => Vec::new(),
        }
    }

    pub fn effects(&self) -> Vec<RiskDefinitionChangeEffect> {
        use RiskDefinitionChangeEffect as E;
        match self {
            Self::ImpactLinks => vec![E::ImpactInheritanceRecalculation],
            Self::RiskMatrixDiff { .. } => vec![E::RiskRecalculation],
            Self::RiskMatrixAdd { category } | Self::CategoryListAdd { category } => {
                vec![E::RiskRecalculation, E::RiskValueCategoryAddition { category: category.clone() }]
            }
            Self::RiskMatrixRemove { category } => {
                vec![E::RiskRecalculation, E::RiskValueCategoryRemoval { category: category.clone() }]
            }
            Self::ImpactListResize { category } => vec![
                E::RiskValueCategoryRemoval { category: category.clone() },
                E::ImpactCategoryRemoval { category: category.clone() },
            ],
            Self::CategoryListRemove { category } => vec![
                E::RiskRecalculation,
                E::RiskValueCategoryRemoval { category: category.clone() },
                E::ImpactCategoryRemoval { category: category.clone() },
            ],
            Self::ProbabilityListResize { categories } => categories
                .iter()
                .map(|c| E::RiskValueCategoryRemoval { category: c.clone() })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn requires_risk_recalculation(&self) -> bool {
        self.effects().contains(&RiskDefinitionChangeEffect::RiskRecalculation)
    }

    pub fn requires_impact_inheritance_recalculation(&self) -> bool {
        self.effects().contains(&RiskDefinitionChangeEffect::ImpactInheritanceRecalculation)
    }

    pub fn requires_migration(&self) -> bool {
        matches!(self, Self::ProbabilityListResize { .. })
            || self.effects().iter().any(|e| {
                matches!(
                    e,
                    RiskDefinitionChangeEffect::RiskValueCategoryAddition { .. }
                        | RiskDefinitionChangeEffect::RiskValueCategoryRemoval { .. }
                        | RiskDefinitionChangeEffect::ImpactCategoryRemoval { .. }
                )
            })
    }

    pub fn risk_matrix_resize_categories(&self) -> Vec<CategoryRef> {
        match self {
            Self::RiskMatrixResize { category } => vec![category.clone()],
            _ => Vec::new(),
        }
    }

    pub fn changed_risk_matrix_categories(&self) -> Vec<CategoryRef> {
        match self {
            Self::RiskMatrixDiff { category } => vec![category.clone()],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for RiskDefinitionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let categories = self.categories();
        if categories.is_empty() {
            return write!(f, "{}", self.kind());
        }
        let joined: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
        write!(f, "{}({})", self.kind(), joined.join(", "))
    }
}

// --- Aggregates over a change set ---

fn distinct<T: PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// All effects of the change set, deduplicated in order of appearance.
pub fn effects(changes: &BTreeSet<RiskDefinitionChange>) -> Vec<RiskDefinitionChangeEffect> {
    distinct(changes.iter().flat_map(|c| c.effects()))
}

pub fn requires_risk_recalculation(changes: &BTreeSet<RiskDefinitionChange>) -> bool {
    changes.iter().any(|c| c.requires_risk_recalculation())
}

pub fn requires_impact_inheritance_recalculation(changes: &BTreeSet<RiskDefinitionChange>) -> bool {
    changes.iter().any(|c| c.requires_impact_inheritance_recalculation())
}

pub fn requires_migration(changes: &BTreeSet<RiskDefinitionChange>) -> bool {
    is_probability_changed(changes)
        || !removed_impact_categories(changes).is_empty()
        || !removed_risk_value_categories(changes).is_empty()
        || !added_risk_value_categories(changes).is_empty()
}

pub fn is_probability_changed(changes: &BTreeSet<RiskDefinitionChange>) -> bool {
    changes.iter().any(|c| matches!(c, RiskDefinitionChange::ProbabilityListResize { .. }))
}

pub fn removed_impact_categories(changes: &BTreeSet<RiskDefinitionChange>) -> Vec<CategoryRef> {
    distinct(effects(changes).into_iter().filter_map(|e| match e {
        RiskDefinitionChangeEffect::ImpactCategoryRemoval { category } => Some(category),
        _ => None,
    }))
}

pub fn added_risk_value_categories(changes: &BTreeSet<RiskDefinitionChange>) -> Vec<CategoryRef> {
    distinct(effects(changes).into_iter().filter_map(|e| match e {
        RiskDefinitionChangeEffect::RiskValueCategoryAddition { category } => Some(category),
        _ => None,
    }))
}

pub fn removed_risk_value_categories(changes: &BTreeSet<RiskDefinitionChange>) -> Vec<CategoryRef> {
    distinct(effects(changes).into_iter().filter_map(|e| match e {
        RiskDefinitionChangeEffect::RiskValueCategoryRemoval { category } => Some(category),
        _ => None,
    }))
}

pub fn risk_matrix_resize_categories(changes: &BTreeSet<RiskDefinitionChange>) -> Vec<CategoryRef> {
    distinct(changes.iter().flat_map(|c| c.risk_matrix_resize_categories()))
}

pub fn changed_risk_matrix_categories(changes: &BTreeSet<RiskDefinitionChange>) -> Vec<CategoryRef> {
    distinct(changes.iter().flat_map(|c| c.changed_risk_matrix_categories()))
}

// --- Detection ---

/// Classifies every structural difference between `old` and `new`.
/// Identical definitions yield an empty set.
pub fn detect_changes(old: &RiskDefinition, new: &RiskDefinition) -> BTreeSet<RiskDefinitionChange> {
    use RiskDefinitionChange as C;
    let mut changes = BTreeSet::new();

    if old.impact_inheriting_links != new.impact_inheriting_links {
        changes.insert(C::ImpactLinks);
    }

    let (old_states, new_states) = (&old.implementation_state_definition, &new.implementation_state_definition);
    translation_changes(&old_states.translations, &new_states.translations, &mut changes);
    level_changes(&old_states.levels, &new_states.levels, || C::ImplementationStateListResize, &mut changes);

    translation_changes(&old.probability.translations, &new.probability.translations, &mut changes);
    let old_categories = old.category_refs();
    level_changes(
        &old.probability.levels,
        &new.probability.levels,
        || C::ProbabilityListResize { categories: old_categories.clone() },
        &mut changes,
    );

    level_changes(&old.risk_values, &new.risk_values, || C::RiskValueListResize, &mut changes);

    for added in new.categories.iter().filter(|c| old.category(&c.id).is_none()) {
        changes.insert(C::CategoryListAdd { category: added.to_ref() });
    }

    for old_cat in &old.categories {
        match new.category(&old_cat.id) {
            Some(new_cat) => category_changes(old_cat, new_cat, &mut changes),
            None => {
                changes.insert(C::CategoryListRemove { category: old_cat.to_ref() });
            }
        }
    }

    changes
}

fn category_changes(old: &CategoryDefinition, new: &CategoryDefinition, changes: &mut BTreeSet<RiskDefinitionChange>) {
    matrix_changes(old.value_matrix.as_ref(), new.value_matrix.as_ref(), new, changes);
    translation_changes(&old.translations, &new.translations, changes);
    level_changes(
        &old.potential_impacts,
        &new.potential_impacts,
        || RiskDefinitionChange::ImpactListResize { category: new.to_ref() },
        changes,
    );
}

fn matrix_changes(
    old: Option<&ValueMatrix>,
    new: Option<&ValueMatrix>,
    category: &CategoryDefinition,
    changes: &mut BTreeSet<RiskDefinitionChange>,
) {
    let category_ref = category.to_ref();
    match (old, new) {
        (None, None) => {}
        (Some(o), Some(n)) if o.len() == n.len() => {
            for (old_row, new_row) in o.iter().zip(n) {
                level_changes(old_row, new_row, || RiskDefinitionChange::RiskMatrixDiff { category: category_ref.clone() }, changes);
            }
        }
        (Some(o), Some(n)) if n.len() < o.len() => {
            changes.insert(RiskDefinitionChange::RiskMatrixRemove { category: category_ref });
        }
        (_, Some(_)) => {
            changes.insert(RiskDefinitionChange::RiskMatrixAdd { category: category_ref });
        }
        (_, None) => {
            changes.insert(RiskDefinitionChange::RiskMatrixRemove { category: category_ref });
        }
    }
}

fn translation_changes(old: &Translations, new: &Translations, changes: &mut BTreeSet<RiskDefinitionChange>) {
    if old != new {
        changes.insert(RiskDefinitionChange::TranslationDiff);
    }
}

/// Length or ordinal mismatch yields the structural change. Otherwise
/// per-level translation and color differences are reported.
fn level_changes<T: DiscreteValue>(
    old: &[T],
    new: &[T],
    structural: impl Fn() -> RiskDefinitionChange,
    changes: &mut BTreeSet<RiskDefinitionChange>,
) {
    if old.len() != new.len() {
        changes.insert(structural());
        return;
    }
    for (o, n) in old.iter().zip(new) {
        if o.ordinal_value() != n.ordinal_value() {
            changes.insert(structural());
            continue;
        }
        translation_changes(o.translations(), n.translations(), changes);
        if o.html_color() != n.html_color() {
            changes.insert(RiskDefinitionChange::ColorDiff);
        }
    }
}
