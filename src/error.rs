//! Error taxonomy for the rating engine.
//!
//! Computation sentinels ("mileage not found", "fuel included") are not
//! errors; they live on individual quotes as [`ChargeValue`] variants.
//!
//! [`ChargeValue`]: crate::quote::ChargeValue

use thiserror::Error;

/// Failures that abort a quote request or a store operation.
#[derive(Debug, Error)]
pub enum RatingError {
    /// Route is missing required geographic fields or usable mileage.
    #[error("invalid route: {0}")]
    Validation(String),

    /// No predicate mapping exists for the derived granularity code.
    #[error("route could not be classified: {0}")]
    Classification(String),

    /// Mileage/geocoding collaborator unavailable or returned a bad session.
    #[error("mileage service failure: {0}")]
    RoutingUpstream(String),

    /// Lane store unreachable or returned malformed rows.
    #[error("lane store failure: {0}")]
    Persistence(String),
}

impl From<polars::prelude::PolarsError> for RatingError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        RatingError::Persistence(err.to_string())
    }
}

/// Result type alias for rating operations.
pub type Result<T> = std::result::Result<T, RatingError>;
