//! Risk computation engine.
//!
//! Propagates potential impacts along impact-inheriting links, determines risk
//! values through per-category matrices and classifies changes to a domain's
//! risk definitions. Persistence and publication are reached only through the
//! traits in `store::repository` and `compute::events`.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod definition;
pub mod display;
pub mod error;
pub mod graph;
pub mod logging;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use compute::{ChangeEvent, EventPublisher, ImpactInheritanceCalculator, NoOpEventPublisher, RiskService};
pub use config::EngineConfig;
pub use definition::{detect_changes, evaluate, migrate_element, RiskDefinition, RiskDefinitionChange};
pub use error::{RepositoryError, RiskError};
pub use store::{ElementRepository, FlyweightRepository, Registry};
