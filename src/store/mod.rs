//! In-memory model of elements, units and domains plus the repository seams.
pub mod registry;
pub mod repository;
pub mod types;

pub use registry::Registry;
pub use repository::{ElementRepository, FlyweightRepository, RepositoryResult};
pub use types::*;
