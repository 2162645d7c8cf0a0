//! Notifications emitted by the risk service when stored values change.
//!
//! Publishing is fire and forget. The engine defines the trait; the embedding
//! application decides whether events go to a message bus, a log or nowhere.

use crate::store::{DomainId, ElementId, RiskDefinitionRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangedValues {
    ProbabilityValuesChanged,
    ImpactValuesChanged,
    RiskValuesChanged,
    RiskCreated,
    RiskDeleted,
}

/// Change of a single risk under one (domain, risk definition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskChangedEvent {
    pub risk_affected: ElementId,
    pub scenario: ElementId,
    pub domain: Option<DomainId>,
    pub risk_definition: Option<RiskDefinitionRef>,
    pub changes: BTreeSet<ChangedValues>,
}

impl RiskChangedEvent {
    pub fn new(risk_affected: ElementId, scenario: ElementId) -> Self {
        Self { risk_affected, scenario, domain: None, risk_definition: None, changes: BTreeSet::new() }
    }

    pub fn has_changes(&self) -> bool { !self.changes.is_empty() }

    /// Whether listeners working on `domain` must re-evaluate.
    ///
    /// Creation and deletion concern every domain. Value changes only matter
    /// for the domain they happened in.
    pub fn should_reevaluate(&self, domain: &DomainId) -> bool {
        if self.changes.contains(&ChangedValues::RiskCreated) || self.changes.contains(&ChangedValues::RiskDeleted) {
            return true;
        }
        self.domain.as_ref().map_or(true, |d| d == domain)
    }
}

/// One notification per process whose risks changed, regardless of how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAffectingElementChanged {
    pub element: ElementId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChangeEvent {
    RiskChanged(RiskChangedEvent),
    RiskAffectingElementChanged(RiskAffectingElementChanged),
}

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}

/// Drops every event. Used when nothing listens.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl EventPublisher for NoOpEventPublisher {
    fn publish(&self, event: ChangeEvent) {
        tracing::debug!(?event, "NoOpEventPublisher: event dropped");
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self { Self::default() }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn risk_changes(&self) -> Vec<RiskChangedEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChangeEvent::RiskChanged(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, event: ChangeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
