//! Engine error taxonomy
//!
//! Only configuration failures surface as errors. Partial telemetry loss is
//! absorbed by the usage estimator and scope failures are reported as
//! warnings on the analysis report.

use crate::catalog::StorageClass;
use thiserror::Error;

/// Errors that abort an analysis run
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// A resource or candidate references a tier the catalog does not carry.
    #[error("unknown tier '{0}' requested from the tier catalog")]
    UnknownTier(String),

    /// The catalog has no tiers for the requested storage class.
    #[error("tier catalog has no entries for storage class '{0}'")]
    UnknownClass(StorageClass),

    /// A tier id appears more than once in the catalog.
    #[error("duplicate tier id '{0}' in the tier catalog")]
    DuplicateTier(String),

    /// The pricing tables lack a key the cost model needs.
    #[error("pricing table missing required entry: {0}")]
    MissingPricing(String),

    /// The pricing tables could not be parsed.
    #[error("invalid pricing table: {0}")]
    InvalidPricing(String),

    /// The resource directory could not list scopes at all.
    #[error("resource directory unavailable: {0}")]
    Directory(String),

    /// A threshold or window is out of range.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AdvisorError>;
