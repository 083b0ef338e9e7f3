//! # tablesmith
//!
//! A physical-schema design compiler for wide-column stores.
//!
//! ## Architecture
//!
//! Given entities, queries with latency/throughput SLAs and mutations with
//! write-fanout SLAs, tablesmith decides which denormalized tables
//! (partition key + clustering key) must exist:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  DomainModel (arena)                     │
//! │  (entities, selectivity, definitions, queries, SLAs)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner::logical]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Workload (candidates + plan trees)              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner::cost + cache]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Per-candidate scanned-row cost              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner::optimizer, two solves]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     PlanReport                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod cache;
pub mod config;
pub mod model;
pub mod planner;

pub use config::PlannerSettings;
pub use model::{DomainModel, ModelBuilder, ModelError};
pub use planner::{PlanError, PlanReport, PlanResult, SchemaPlanner};
