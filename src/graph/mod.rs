//! Graph views over a unit's impact-inheriting links.
pub mod dag;
pub mod flyweight;

// Re-export key types for convenient access
pub use dag::ElementGraph;
pub use flyweight::{FlyweightComponent, FlyweightGraph};
