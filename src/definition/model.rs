//! model.rs
//! The risk definition of a domain: probability levels, implementation states,
//! impact categories with their value matrices and the ordered risk values.
//!
//! Ordinals are list positions. Constructors renumber levels so that
//! `levels[i].ordinal_value == i` holds for freshly built definitions; definitions
//! deserialized from elsewhere keep whatever ordinals they carry and are checked
//! by the change detector.

use crate::error::RiskError;
use crate::store::{CategoryRef, ImpactRef, ProbabilityRef, RiskDefinitionRef, RiskRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// language -> key -> text
pub type Translations = BTreeMap<String, BTreeMap<String, String>>;

/// Shared view over anything addressed by ordinal (levels and risk values).
pub trait DiscreteValue {
    fn ordinal_value(&self) -> u32;
    fn html_color(&self) -> Option<&str>;
    fn translations(&self) -> &Translations;
}

// --- Levels ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub ordinal_value: u32,
    #[serde(default)]
    pub html_color: Option<String>,
    #[serde(default)]
    pub translations: Translations,
}

pub type ProbabilityLevel = Level;
pub type CategoryLevel = Level;
pub type ImplementationStateLevel = Level;

impl Level {
    pub fn new(html_color: Option<&str>) -> Self {
        Self { ordinal_value: 0, html_color: html_color.map(str::to_string), translations: Translations::new() }
    }

    pub fn with_translation(mut self, lang: &str, key: &str, text: &str) -> Self {
        self.translations.entry(lang.into()).or_default().insert(key.into(), text.into());
        self
    }
}

impl DiscreteValue for Level {
    fn ordinal_value(&self) -> u32 { self.ordinal_value }
    fn html_color(&self) -> Option<&str> { self.html_color.as_deref() }
    fn translations(&self) -> &Translations { &self.translations }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskValue {
    pub ordinal_value: u32,
    pub symbolic_risk: String,
    #[serde(default)]
    pub html_color: Option<String>,
    #[serde(default)]
    pub translations: Translations,
}

impl RiskValue {
    pub fn new(symbolic_risk: impl Into<String>) -> Self {
        Self { ordinal_value: 0, symbolic_risk: symbolic_risk.into(), html_color: None, translations: Translations::new() }
    }

    pub fn to_ref(&self) -> RiskRef {
        RiskRef { ordinal: self.ordinal_value, symbolic_risk: self.symbolic_risk.clone() }
    }
}

impl DiscreteValue for RiskValue {
    fn ordinal_value(&self) -> u32 { self.ordinal_value }
    fn html_color(&self) -> Option<&str> { self.html_color.as_deref() }
    fn translations(&self) -> &Translations { &self.translations }
}

fn renumber<T>(levels: &mut [T], set: impl Fn(&mut T, u32)) {
    for (i, level) in levels.iter_mut().enumerate() {
        set(level, i as u32);
    }
}

// --- Dimensions ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityDefinition {
    pub id: String,
    #[serde(default)]
    pub translations: Translations,
    pub levels: Vec<ProbabilityLevel>,
}

impl ProbabilityDefinition {
    pub fn new(id: impl Into<String>, mut levels: Vec<ProbabilityLevel>) -> Self {
        renumber(&mut levels, |l, i| l.ordinal_value = i);
        Self { id: id.into(), translations: Translations::new(), levels }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationStateDefinition {
    pub id: String,
    #[serde(default)]
    pub translations: Translations,
    pub levels: Vec<ImplementationStateLevel>,
}

impl ImplementationStateDefinition {
    pub fn new(id: impl Into<String>, mut levels: Vec<ImplementationStateLevel>) -> Self {
        renumber(&mut levels, |l, i| l.ordinal_value = i);
        Self { id: id.into(), translations: Translations::new(), levels }
    }
}

/// Value matrix rows are impact levels, columns are probability levels.
pub type ValueMatrix = Vec<Vec<RiskValue>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub id: String,
    #[serde(default)]
    pub translations: Translations,
    pub potential_impacts: Vec<CategoryLevel>,
    /// `None` when the category only carries impacts and no risk values.
    #[serde(default)]
    pub value_matrix: Option<ValueMatrix>,
}

impl CategoryDefinition {
    pub fn new(id: impl Into<String>, mut potential_impacts: Vec<CategoryLevel>, value_matrix: Option<ValueMatrix>) -> Self {
        renumber(&mut potential_impacts, |l, i| l.ordinal_value = i);
        Self { id: id.into(), translations: Translations::new(), potential_impacts, value_matrix }
    }

    pub fn to_ref(&self) -> CategoryRef { CategoryRef::new(self.id.clone()) }

    pub fn is_risk_values_supported(&self) -> bool { self.value_matrix.is_some() }

    pub fn level(&self, ordinal: u32) -> Option<&CategoryLevel> {
        self.potential_impacts.iter().find(|l| l.ordinal_value == ordinal)
    }

    /// Looks up `value_matrix[impact][probability]`.
    pub fn get_risk_value(&self, probability: ProbabilityRef, impact: ImpactRef) -> Result<&RiskValue, RiskError> {
        let matrix = self.value_matrix.as_ref().ok_or_else(|| RiskError::RiskValuesNotSupported(self.to_ref()))?;
        let row = matrix.get(impact.index()).ok_or_else(|| RiskError::ImpactOutOfBounds {
            category: self.to_ref(),
            impact: impact.ordinal(),
            rows: matrix.len(),
        })?;
        row.get(probability.index()).ok_or_else(|| RiskError::ProbabilityOutOfBounds {
            category: self.to_ref(),
            probability: probability.ordinal(),
            columns: row.len(),
        })
    }
}

// --- Risk Definition ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDefinition {
    pub id: String,
    pub probability: ProbabilityDefinition,
    #[serde(default)]
    pub implementation_state_definition: ImplementationStateDefinition,
    pub categories: Vec<CategoryDefinition>,
    pub risk_values: Vec<RiskValue>,
    /// element type -> link types whose targets inherit impacts from their sources.
    #[serde(default)]
    pub impact_inheriting_links: BTreeMap<String, Vec<String>>,
}

impl RiskDefinition {
    pub fn new(
        id: impl Into<String>,
        probability: ProbabilityDefinition,
        categories: Vec<CategoryDefinition>,
        mut risk_values: Vec<RiskValue>,
    ) -> Self {
        renumber(&mut risk_values, |v, i| v.ordinal_value = i);
        Self {
            id: id.into(),
            probability,
            implementation_state_definition: ImplementationStateDefinition::default(),
            categories,
            risk_values,
            impact_inheriting_links: BTreeMap::new(),
        }
    }

    pub fn with_inheriting_links(mut self, element_type: &str, link_types: &[&str]) -> Self {
        self.impact_inheriting_links
            .insert(element_type.into(), link_types.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn to_ref(&self) -> RiskDefinitionRef { RiskDefinitionRef::new(self.id.clone()) }

    pub fn category(&self, id: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_refs(&self) -> Vec<CategoryRef> { self.categories.iter().map(|c| c.to_ref()).collect() }

    /// Union of all link types across element types.
    pub fn inheriting_link_types(&self) -> BTreeSet<String> {
        self.impact_inheriting_links.values().flatten().cloned().collect()
    }

    pub fn has_inheriting_links(&self) -> bool {
        self.impact_inheriting_links.values().any(|links| !links.is_empty())
    }

    pub fn is_inheriting_link_type(&self, link_type: &str) -> bool {
        self.impact_inheriting_links.values().flatten().any(|l| l == link_type)
    }

    pub fn risk_value_by_ordinal(&self, ordinal: u32) -> Option<&RiskValue> {
        self.risk_values.iter().find(|v| v.ordinal_value == ordinal)
    }

    pub fn risk_value_by_symbol(&self, symbolic_risk: &str) -> Option<&RiskValue> {
        self.risk_values.iter().find(|v| v.symbolic_risk == symbolic_risk)
    }
}
