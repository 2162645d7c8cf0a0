//! Structural analysis of element graphs.
pub mod topology;

pub use topology::CycleDetector;
