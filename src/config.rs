//! Engine configuration, read from JSON.
//!
//! ```json
//! { "log_filter": "riskgraph_core=debug", "supported_migrations": ["CategoryListAdd"] }
//! ```
use crate::definition::change::ChangeKind;
use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Change kinds for which a migration step exists. Changes that require a
    /// migration and are not listed here are rejected during evaluation.
    pub supported_migrations: BTreeSet<ChangeKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { log_filter: "info".into(), supported_migrations: ChangeKind::MIGRATING.into_iter().collect() }
    }
}

impl EngineConfig {
    pub fn from_json_str(contents: &str) -> Result<Self, RiskError> {
        serde_json::from_str(contents).map_err(|e| RiskError::Config(format!("failed to parse configuration: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, RiskError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| RiskError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }

    pub fn supports(&self, kind: ChangeKind) -> bool { self.supported_migrations.contains(&kind) }
}
