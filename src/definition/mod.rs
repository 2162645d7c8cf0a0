//! Risk definitions, their structural diff, evaluation of updates and
//! migration of stored values.
pub mod change;
pub mod evaluation;
pub mod migration;
pub mod model;

pub use change::{detect_changes, ChangeKind, RiskDefinitionChange, RiskDefinitionChangeEffect};
pub use evaluation::{evaluate, Evaluation};
pub use migration::migrate_element;
pub use model::{CategoryDefinition, ProbabilityDefinition, RiskDefinition, RiskValue};
