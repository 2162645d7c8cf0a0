//! Fixture builders shared by the unit tests.
use crate::definition::model::*;
use crate::store::*;

pub const LINK: &str = "inherits";

pub fn levels(n: usize) -> Vec<Level> { (0..n).map(|_| Level::new(None)).collect() }

pub fn risk_values(symbols: &[&str]) -> Vec<RiskValue> {
    symbols
        .iter()
        .enumerate()
        .map(|(i, s)| RiskValue { ordinal_value: i as u32, ..RiskValue::new(*s) })
        .collect()
}

/// Category with `impacts` impact levels whose matrix cell `[i][p]` is the risk
/// value at `min(i + p, last)`.
pub fn category(id: &str, impacts: usize, probabilities: usize, values: &[RiskValue]) -> CategoryDefinition {
    let last = values.len().saturating_sub(1);
    let matrix = (0..impacts)
        .map(|i| (0..probabilities).map(|p| values[(i + p).min(last)].clone()).collect())
        .collect();
    CategoryDefinition::new(id, levels(impacts), Some(matrix))
}

/// Two probability levels, three impact levels per category, risk values
/// low/medium/high and `LINK` as inheriting link type for assets and processes.
pub fn risk_definition(id: &str, categories: &[&str]) -> RiskDefinition {
    let values = risk_values(&["low", "medium", "high"]);
    RiskDefinition::new(
        id,
        ProbabilityDefinition::new("prob", levels(2)),
        categories.iter().map(|c| category(c, 3, 2, &values)).collect(),
        values,
    )
    .with_inheriting_links("asset", &[LINK])
    .with_inheriting_links("process", &[LINK])
}

pub fn domain_id() -> DomainId { DomainId::from("dom") }
pub fn unit_id() -> UnitId { UnitId::from("unit") }
pub fn client_id() -> ClientId { ClientId::from("client") }
pub fn rd_ref() -> RiskDefinitionRef { RiskDefinitionRef::from("rd") }

pub fn domain(rd: RiskDefinition) -> Domain {
    Domain {
        id: domain_id(),
        name: "Domain".into(),
        owner: client_id(),
        risk_definitions: [(rd.id.clone(), rd)].into_iter().collect(),
    }
}

pub fn client(rd: RiskDefinition) -> Client {
    Client { id: client_id(), name: "Client".into(), domains: vec![domain(rd)] }
}

pub fn unit() -> Unit {
    Unit { id: unit_id(), name: "Unit".into(), client: client_id(), domains: [domain_id()].into_iter().collect() }
}

pub fn element(id: &str, name: &str, element_type: ElementType) -> Element {
    let mut e = Element::new(id, name, element_type, unit_id());
    e.domains.insert(domain_id());
    e
}

pub fn link_to(element: &mut Element, target: &str) {
    element.links.push(CustomLink { link_type: LINK.into(), target: ElementId::from(target), domain: domain_id() });
}

pub fn impacts(pairs: &[(&str, u32)]) -> std::collections::BTreeMap<CategoryRef, ImpactRef> {
    pairs.iter().map(|(c, i)| (CategoryRef::from(*c), ImpactRef(*i))).collect()
}

pub fn with_explicit(mut element: Element, pairs: &[(&str, u32)]) -> Element {
    let values = ImpactValues { explicit: impacts(pairs), calculated: Default::default() };
    element.set_impact_values(&domain_id(), &rd_ref(), values);
    element
}

pub fn calculated(registry: &Registry, id: &str) -> std::collections::BTreeMap<CategoryRef, ImpactRef> {
    registry
        .get(&ElementId::from(id))
        .ok()
        .and_then(|e| e.impact_values(&domain_id(), &rd_ref()).map(|v| v.calculated.clone()))
        .unwrap_or_default()
}

pub fn registry(elements: Vec<Element>) -> Registry {
    let registry = Registry::new();
    registry.add_unit(unit()).unwrap();
    for e in elements {
        registry.insert(e).unwrap();
    }
    registry
}
