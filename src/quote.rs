//! Quote result model and its typed value sentinels.
//!
//! The original screens showed literal strings in place of unusable
//! figures; those are kept as serialized forms of one typed value, so a
//! quote row is inspectable in code and unchanged on the wire.

use serde::{Serialize, Serializer};

use crate::reference::ContactInfo;

/// A monetary or mileage figure on a quote, or the sentinel shown in its
/// place. Sentinels are values, not failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargeValue {
    Amount(f64),
    /// No mileage could be computed for this lane.
    MileageNotFound,
    /// Fuel is folded into the base charge.
    Included,
    /// Flat-rated lane; no per-mile figure exists.
    Flat,
    /// The figure could not be computed.
    Error,
}

impl ChargeValue {
    pub fn amount(&self) -> Option<f64> {
        match self {
            ChargeValue::Amount(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, ChargeValue::Amount(_))
    }

    fn sentinel_text(&self) -> &'static str {
        match self {
            ChargeValue::Amount(_) => "",
            ChargeValue::MileageNotFound => "Mileage Not Found!",
            ChargeValue::Included => "INCLUDED",
            ChargeValue::Flat => "FLAT",
            ChargeValue::Error => "ERROR!",
        }
    }

    /// Wrap a raw figure, degrading zero/non-finite to the given sentinel.
    pub fn or_sentinel(value: f64, sentinel: ChargeValue) -> ChargeValue {
        if value == 0.0 || !value.is_finite() {
            sentinel
        } else {
            ChargeValue::Amount(value)
        }
    }
}

impl Serialize for ChargeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChargeValue::Amount(value) => serializer.serialize_f64(*value),
            sentinel => serializer.serialize_str(sentinel.sentinel_text()),
        }
    }
}

/// One carrier's quote for a route. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub code: String,
    pub name: String,
    pub is_customer: bool,
    pub contact: ContactInfo,
    pub base: ChargeValue,
    pub fuel_charge: ChargeValue,
    pub total: ChargeValue,
    pub miles: ChargeValue,
    pub rate_per_mile: ChargeValue,
    pub comments: String,
    /// Set when the quote carries unusable numeric inputs and should be
    /// flagged to the user.
    pub error: bool,
}
