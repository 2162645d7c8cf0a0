//! The calculators: impact inheritance and risk determination.
pub mod events;
pub mod inheritance;
pub mod risk;

pub use events::{ChangeEvent, ChangedValues, EventPublisher, NoOpEventPublisher, RiskChangedEvent};
pub use inheritance::ImpactInheritanceCalculator;
pub use risk::RiskService;
