//! Risk determination: scenario probability x element impact -> risk value.
//!
//! For every risk of every process of a client, the service copies the
//! scenario's potential probability and the process's effective impacts into the
//! risk, then looks the inherent risk up in the category's value matrix. Missing
//! inputs clear the inherent risk instead of defaulting it.

use super::events::{ChangeEvent, ChangedValues, EventPublisher, RiskAffectingElementChanged, RiskChangedEvent};
use crate::definition::model::RiskDefinition;
use crate::error::{RepositoryError, RiskError};
use crate::store::{
    Client, DeterminedRisk, Element, ElementId, ElementRepository, ElementType, ImpactProvider, ImpactValues,
    ProbabilityRef, RiskValues,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, instrument};

pub struct RiskService<'a> {
    elements: &'a dyn ElementRepository,
    publisher: &'a dyn EventPublisher,
}

impl<'a> RiskService<'a> {
    pub fn new(elements: &'a dyn ElementRepository, publisher: &'a dyn EventPublisher) -> Self {
        Self { elements, publisher }
    }

    /// Re-determines all risk values of the client if `element` can influence them.
    pub fn evaluate_changed_risk_component(&self, element: &Element, client: &Client) -> Result<Vec<Element>, RiskError> {
        match element.element_type {
            ElementType::Process | ElementType::Scenario => self.determine_all_risk_values(client),
            _ => Ok(Vec::new()),
        }
    }

    /// Returns the saved processes whose risks changed.
    #[instrument(skip_all, fields(client = %client.id))]
    pub fn determine_all_risk_values(&self, client: &Client) -> Result<Vec<Element>, RiskError> {
        let processes = self.elements.find_all_having_risks(&client.id)?;
        debug!(processes = processes.len(), "selected processes for risk calculation");

        let scenario_ids: HashSet<ElementId> =
            processes.iter().flat_map(|p| p.risks.iter().map(|r| r.scenario.clone())).collect();
        let scenarios: HashMap<ElementId, Element> = self
            .elements
            .find_by_ids(&client.id, &scenario_ids)?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        let mut saved = Vec::new();
        for mut process in processes {
            if self.determine_process(&mut process, &scenarios, client)? {
                let id = process.id.clone();
                saved.push(self.elements.save(process)?);
                self.publisher
                    .publish(ChangeEvent::RiskAffectingElementChanged(RiskAffectingElementChanged { element: id }));
            }
        }
        info!(changed = saved.len(), "risk values determined");
        Ok(saved)
    }

    fn determine_process(
        &self,
        process: &mut Element,
        scenarios: &HashMap<ElementId, Element>,
        client: &Client,
    ) -> Result<bool, RiskError> {
        let mut process_changed = false;
        let impact_values = process.impact_values.clone();

        for risk in &mut process.risks {
            let scenario = scenarios.get(&risk.scenario).ok_or_else(|| RepositoryError::NotFound {
                entity: "Scenario".into(),
                id: risk.scenario.to_string(),
            })?;

            for domain_id in risk.domains.clone() {
                let domain = client.domain(&domain_id).ok_or_else(|| RiskError::UnknownDomain(domain_id.clone()))?;
                debug!(process = %process.id, scenario = %scenario.id, domain = %domain_id, "determining risk values");

                for rd in domain.risk_definitions.values() {
                    let rd_ref = rd.to_ref();
                    let Some(values) = risk.values_mut(&domain_id, &rd_ref) else {
                        debug!(rd = %rd_ref, "risk definition unused by risk, skipping");
                        continue;
                    };

                    let probability = scenario.potential_probability(&domain_id, &rd_ref);
                    let impacts = impact_values.get(&domain_id).and_then(|m| m.get(&rd_ref));
                    let changes = determine_values(rd, probability, impacts, values)?;
                    if changes.is_empty() {
                        continue;
                    }

                    process_changed = true;
                    let mut event = RiskChangedEvent::new(process.id.clone(), risk.scenario.clone());
                    event.domain = Some(domain_id.clone());
                    event.risk_definition = Some(rd_ref);
                    event.changes = changes;
                    self.publisher.publish(ChangeEvent::RiskChanged(event));
                }
            }
        }
        Ok(process_changed)
    }
}

/// Transfers `probability` and the effective `impacts` into `values` and recomputes
/// the inherent risk of every category that has a value matrix.
pub fn determine_values(
    rd: &RiskDefinition,
    probability: Option<ProbabilityRef>,
    impacts: Option<&ImpactValues>,
    values: &mut RiskValues,
) -> Result<BTreeSet<ChangedValues>, RiskError> {
    let mut changes = BTreeSet::new();

    if values.probability.set_potential(probability) {
        changes.insert(ChangedValues::ProbabilityValuesChanged);
    }
    let effective_probability = values.probability.effective();

    for category in &rd.categories {
        let cr = category.to_ref();
        let impact = impacts.and_then(|i| i.effective_for(&cr));

        if impact.is_some() {
            values.impacts.entry(cr.clone()).or_insert_with(ImpactProvider::default);
        }
        let effective_impact = match values.impacts.get_mut(&cr) {
            Some(provider) => {
                if provider.set_potential(impact) {
                    changes.insert(ChangedValues::ImpactValuesChanged);
                }
                provider.effective()
            }
            None => None,
        };

        if !category.is_risk_values_supported() {
            continue;
        }
        let inherent = match (effective_probability, effective_impact) {
            (Some(p), Some(i)) => Some(category.get_risk_value(p, i)?.to_ref()),
            _ => None,
        };
        if inherent.is_some() {
            values.risks.entry(cr.clone()).or_insert_with(DeterminedRisk::default);
        }
        if let Some(risk) = values.risks.get_mut(&cr) {
            if risk.set_inherent_risk(inherent) {
                changes.insert(ChangedValues::RiskValuesChanged);
            }
        }
    }
    Ok(changes)
}
