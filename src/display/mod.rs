//! Human-readable renderings of hydrated graphs for logs and audits.
pub mod trace;
