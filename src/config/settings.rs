//! TOML-based planner configuration.
//!
//! Example configuration:
//! ```toml
//! [cost]
//! row_scan_cost = 1.005
//!
//! [optimizer]
//! cost_margin = 1.1
//! verify_tolerance = 1e-7
//!
//! [candidates]
//! prune_over_latency = false
//! ```

use crate::planner::cost::ROW_SCAN_COST;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerSettings {
    pub cost: CostSettings,
    pub optimizer: OptimizerSettings,
    pub candidates: CandidateSettings,
}

/// Cost model settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CostSettings {
    /// Per-row overhead applied to every scan estimate.
    pub row_scan_cost: f64,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            row_scan_cost: ROW_SCAN_COST,
        }
    }
}

/// Optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Phase-2 cost envelope as a multiple of the phase-1 optimum.
    pub cost_margin: f64,

    /// Absolute tolerance for re-verifying solver output.
    pub verify_tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            cost_margin: 1.1,
            verify_tolerance: 1e-7,
        }
    }
}

/// Candidate generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CandidateSettings {
    /// Drop candidates whose cost reaches the query's latency budget.
    pub prune_over_latency: bool,
}

impl PlannerSettings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: PlannerSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TABLESMITH_CONFIG`
    /// 2. `./tablesmith.toml`
    /// 3. `~/.config/tablesmith/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("TABLESMITH_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("tablesmith.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tablesmith").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(PlannerSettings::default())
    }

    /// Reject values the planner cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.cost.row_scan_cost >= 1.0) {
            return Err(SettingsError::InvalidConfig(format!(
                "cost.row_scan_cost must be >= 1, got {}",
                self.cost.row_scan_cost
            )));
        }
        if !(self.optimizer.cost_margin >= 1.0) {
            return Err(SettingsError::InvalidConfig(format!(
                "optimizer.cost_margin must be >= 1, got {}",
                self.optimizer.cost_margin
            )));
        }
        if !(self.optimizer.verify_tolerance > 0.0) {
            return Err(SettingsError::InvalidConfig(format!(
                "optimizer.verify_tolerance must be > 0, got {}",
                self.optimizer.verify_tolerance
            )));
        }
        Ok(())
    }
}
