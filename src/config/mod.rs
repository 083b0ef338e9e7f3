//! Configuration module for tablesmith.
//!
//! Planner tuning knobs loaded from TOML.

mod settings;

pub use settings::{
    CandidateSettings, CostSettings, OptimizerSettings, PlannerSettings, SettingsError,
};
