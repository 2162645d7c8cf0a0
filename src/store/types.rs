use crate::definition::model::RiskDefinition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// --- Keys ---

macro_rules! string_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self { Self(s.to_string()) }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }
    };
}

string_key!(
    /// Opaque identity of an element (asset, process, scope, scenario, ...).
    ElementId
);
string_key!(UnitId);
string_key!(DomainId);
string_key!(ClientId);
string_key!(
    /// Reference to a `CategoryDefinition` by its id.
    CategoryRef
);
string_key!(RiskDefinitionRef);

macro_rules! ordinal_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline(always)]
            pub fn ordinal(&self) -> u32 { self.0 }
            #[inline(always)]
            pub fn index(&self) -> usize { self.0 as usize }
        }
    };
}

ordinal_ref!(
    /// An impact level, identified by its position in the category's level list.
    ImpactRef
);
ordinal_ref!(
    /// A probability level, identified by its position in the probability list.
    ProbabilityRef
);

/// A risk value as stored on a risk: ordinal plus its symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RiskRef {
    pub ordinal: u32,
    pub symbolic_risk: String,
}

// --- Organisation ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub owner: ClientId,
    pub risk_definitions: BTreeMap<String, RiskDefinition>,
}

impl Domain {
    pub fn risk_definition(&self, id: &str) -> Option<&RiskDefinition> {
        self.risk_definitions.get(id)
    }

    /// Risk definitions that declare at least one impact-inheriting link type.
    pub fn inheriting_risk_definitions(&self) -> impl Iterator<Item = &RiskDefinition> {
        self.risk_definitions.values().filter(|rd| rd.has_inheriting_links())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub client: ClientId,
    pub domains: BTreeSet<DomainId>,
}

impl Unit {
    pub fn is_associated_with(&self, domain: &DomainId) -> bool { self.domains.contains(domain) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub domains: Vec<Domain>,
}

impl Client {
    pub fn domain(&self, id: &DomainId) -> Option<&Domain> {
        self.domains.iter().find(|d| &d.id == id)
    }
}

// --- Elements ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Asset,
    Control,
    Document,
    Incident,
    Person,
    Process,
    Scenario,
    Scope,
}

impl ElementType {
    /// Element types that carry impact values and can own risks.
    pub fn is_risk_affected(&self) -> bool {
        matches!(self, ElementType::Asset | ElementType::Process | ElementType::Scope)
    }
}

/// A typed outgoing link. The source is the element that owns the link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomLink {
    pub link_type: String,
    pub target: ElementId,
    pub domain: DomainId,
}

/// Impact values of an element for one (domain, risk definition).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactValues {
    /// Entered by a user.
    pub explicit: BTreeMap<CategoryRef, ImpactRef>,
    /// Derived by impact inheritance.
    pub calculated: BTreeMap<CategoryRef, ImpactRef>,
}

impl ImpactValues {
    pub fn with_calculated(calculated: BTreeMap<CategoryRef, ImpactRef>) -> Self {
        Self { explicit: BTreeMap::new(), calculated }
    }

    /// Per category the explicit value if present, otherwise the calculated one.
    pub fn effective(&self) -> BTreeMap<CategoryRef, ImpactRef> {
        let mut effective = self.calculated.clone();
        effective.extend(self.explicit.iter().map(|(c, i)| (c.clone(), *i)));
        effective
    }

    pub fn effective_for(&self, category: &CategoryRef) -> Option<ImpactRef> {
        self.explicit.get(category).or_else(|| self.calculated.get(category)).copied()
    }

    /// Removes the given categories from both the explicit and the calculated map.
    pub fn without_categories(mut self, categories: &[CategoryRef]) -> Self {
        for category in categories {
            self.explicit.remove(category);
            self.calculated.remove(category);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    pub element_type: ElementType,
    pub owner: UnitId,
    #[serde(default)]
    pub domains: BTreeSet<DomainId>,
    #[serde(default)]
    pub links: Vec<CustomLink>,
    #[serde(default)]
    pub impact_values: BTreeMap<DomainId, BTreeMap<RiskDefinitionRef, ImpactValues>>,
    /// Scenario only: potential probability per (domain, risk definition).
    #[serde(default)]
    pub potential_probability: BTreeMap<DomainId, BTreeMap<RiskDefinitionRef, ProbabilityRef>>,
    #[serde(default)]
    pub risks: Vec<Risk>,
}

impl Element {
    pub fn new(id: impl Into<String>, name: impl Into<String>, element_type: ElementType, owner: UnitId) -> Self {
        Self {
            id: ElementId(id.into()),
            name: name.into(),
            element_type,
            owner,
            domains: BTreeSet::new(),
            links: Vec::new(),
            impact_values: BTreeMap::new(),
            potential_probability: BTreeMap::new(),
            risks: Vec::new(),
        }
    }

    pub fn links_in<'a>(&'a self, domain: &'a DomainId) -> impl Iterator<Item = &'a CustomLink> + 'a {
        self.links.iter().filter(move |l| &l.domain == domain)
    }

    pub fn impact_values(&self, domain: &DomainId, rd: &RiskDefinitionRef) -> Option<&ImpactValues> {
        self.impact_values.get(domain)?.get(rd)
    }

    pub fn impact_values_mut(&mut self, domain: &DomainId, rd: &RiskDefinitionRef) -> Option<&mut ImpactValues> {
        self.impact_values.get_mut(domain)?.get_mut(rd)
    }

    pub fn set_impact_values(&mut self, domain: &DomainId, rd: &RiskDefinitionRef, values: ImpactValues) {
        self.impact_values.entry(domain.clone()).or_default().insert(rd.clone(), values);
    }

    pub fn potential_probability(&self, domain: &DomainId, rd: &RiskDefinitionRef) -> Option<ProbabilityRef> {
        self.potential_probability.get(domain)?.get(rd).copied()
    }

    pub fn has_risks(&self) -> bool { !self.risks.is_empty() }
}

// --- Flyweights ---

/// Id-only projection of a link, as returned by the flyweight repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlyweightLink {
    pub link_type: String,
    pub source_id: ElementId,
    pub target_id: ElementId,
}

/// Id-only projection of an element and its inheritance links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyweightElement {
    pub source_id: ElementId,
    pub links: Vec<FlyweightLink>,
}

// --- Risks ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityProvider {
    pub potential: Option<ProbabilityRef>,
    pub specific: Option<ProbabilityRef>,
    pub specific_explanation: Option<String>,
}

impl ProbabilityProvider {
    pub fn effective(&self) -> Option<ProbabilityRef> { self.specific.or(self.potential) }

    /// Returns `true` if the stored value changed.
    pub fn set_potential(&mut self, value: Option<ProbabilityRef>) -> bool {
        let changed = self.potential != value;
        self.potential = value;
        changed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactProvider {
    pub potential: Option<ImpactRef>,
    pub specific: Option<ImpactRef>,
    pub specific_explanation: Option<String>,
}

impl ImpactProvider {
    pub fn effective(&self) -> Option<ImpactRef> { self.specific.or(self.potential) }

    pub fn set_potential(&mut self, value: Option<ImpactRef>) -> bool {
        let changed = self.potential != value;
        self.potential = value;
        changed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminedRisk {
    pub inherent_risk: Option<RiskRef>,
    pub user_defined_residual_risk: Option<RiskRef>,
}

impl DeterminedRisk {
    /// The user-defined residual risk, falling back to the inherent risk.
    pub fn residual_risk(&self) -> Option<&RiskRef> {
        self.user_defined_residual_risk.as_ref().or(self.inherent_risk.as_ref())
    }

    pub fn set_inherent_risk(&mut self, value: Option<RiskRef>) -> bool {
        let changed = self.inherent_risk != value;
        self.inherent_risk = value;
        changed
    }
}

/// Values of a risk for one (domain, risk definition).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskValues {
    pub probability: ProbabilityProvider,
    pub impacts: BTreeMap<CategoryRef, ImpactProvider>,
    pub risks: BTreeMap<CategoryRef, DeterminedRisk>,
}

/// A risk pairs its owning element with a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub scenario: ElementId,
    pub domains: BTreeSet<DomainId>,
    /// Presence of an entry means the risk uses that risk definition.
    pub values: BTreeMap<DomainId, BTreeMap<RiskDefinitionRef, RiskValues>>,
}

impl Risk {
    pub fn new(scenario: ElementId) -> Self {
        Self { scenario, domains: BTreeSet::new(), values: BTreeMap::new() }
    }

    pub fn uses(&self, domain: &DomainId, rd: &RiskDefinitionRef) -> bool {
        self.values.get(domain).map_or(false, |v| v.contains_key(rd))
    }

    pub fn values(&self, domain: &DomainId, rd: &RiskDefinitionRef) -> Option<&RiskValues> {
        self.values.get(domain)?.get(rd)
    }

    pub fn values_mut(&mut self, domain: &DomainId, rd: &RiskDefinitionRef) -> Option<&mut RiskValues> {
        self.values.get_mut(domain)?.get_mut(rd)
    }
}
