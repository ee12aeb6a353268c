//! Storage advisor library
//!
//! This crate provides the core functionality for:
//! - Tier catalog and regional pricing
//! - Usage estimation from telemetry, with fallbacks when telemetry is missing
//! - Decision rules for managed disks and storage accounts
//! - Savings aggregation and analysis run orchestration
//! - Observability

pub mod aggregate;
pub mod analysis;
pub mod catalog;
pub mod config;
pub mod cost;
pub mod error;
pub mod models;
pub mod observability;
pub mod providers;
pub mod rules;
pub mod usage;

pub use aggregate::{summarize, GroupTotals, Summary};
pub use analysis::{AnalysisReport, Analyzer, AnalyzerBuilder, RunOutcome, ScopeWarning};
pub use catalog::{StorageClass, TierCatalog, TierSpec};
pub use config::{EngineConfig, EngineContext, RegionSelection};
pub use error::AdvisorError;
pub use models::*;
pub use observability::{AdvisorMetrics, StructuredLogger};
