//! Route request model and the specificity classifier.
//!
//! The classifier tags each request with which geographic fields were
//! supplied per side (`C`ity / `S`tate / `Z`ip, in that fixed order), e.g.
//! `CSZ_CS` for a fully specified origin shipping to a city+state
//! destination. The tag is derived once and used only to select which
//! predicate atoms apply.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RatingError, Result};
use crate::ltl::ShipmentLine;

/// One side of a route: as much geography as the caller knows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country: String,
}

impl Endpoint {
    pub fn new(city: &str, state: &str, zip: &str, country: &str) -> Self {
        Endpoint {
            city: city.to_string(),
            state: state.to_string(),
            zip: zip.to_string(),
            country: country.to_string(),
        }
    }

    fn has_any_geo(&self) -> bool {
        !self.city.is_empty() || !self.state.is_empty() || !self.zip.is_empty()
    }
}

/// A quote request as received from the upstream validation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    pub origin: Endpoint,
    pub destination: Endpoint,
    pub ship_date: NaiveDate,
    /// Transport mode code (TLD, REF, CTR, LTL, ...).
    pub mode: String,
    #[serde(default)]
    pub customer: String,
    /// User-supplied household-goods mileage, added to the computed figure.
    #[serde(default)]
    pub hhg_override: f64,
    /// User-supplied practical mileage, added to the computed figure.
    #[serde(default)]
    pub pract_override: f64,
    #[serde(default)]
    pub stop_offs: u32,
    /// Shipment lines for LTL traffic (class, weight, charge).
    #[serde(default)]
    pub shipment_lines: Vec<ShipmentLine>,
}

/// Mileage figures for a request after collaborator lookup, stop-off
/// padding, and user overrides. Which figure applies to a given lane is
/// decided per carrier profile, not per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMiles {
    /// Household-goods miles.
    pub hhg: f64,
    /// Practical miles.
    pub pract: f64,
}

/// Which of city/state/zip one side supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SideFields {
    pub city: bool,
    pub state: bool,
    pub zip: bool,
}

impl SideFields {
    fn of(endpoint: &Endpoint) -> Self {
        SideFields {
            city: !endpoint.city.is_empty(),
            state: !endpoint.state.is_empty(),
            zip: !endpoint.zip.is_empty(),
        }
    }

    fn code(&self, out: &mut String) {
        if self.city {
            out.push('C');
        }
        if self.state {
            out.push('S');
        }
        if self.zip {
            out.push('Z');
        }
    }
}

/// Immutable per-request specificity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Granularity {
    pub origin: SideFields,
    pub destination: SideFields,
}

impl Granularity {
    /// Classify a route. Fails when either side supplies no geography at all.
    pub fn classify(route: &RouteSpec) -> Result<Self> {
        if !route.origin.has_any_geo() {
            return Err(RatingError::Validation(
                "origin must supply at least one of city, state, zip".to_string(),
            ));
        }
        if !route.destination.has_any_geo() {
            return Err(RatingError::Validation(
                "destination must supply at least one of city, state, zip".to_string(),
            ));
        }
        Ok(Granularity {
            origin: SideFields::of(&route.origin),
            destination: SideFields::of(&route.destination),
        })
    }

    /// The classifier code string, e.g. `CSZ_CS`.
    pub fn code(&self) -> String {
        let mut out = String::with_capacity(7);
        self.origin.code(&mut out);
        out.push('_');
        self.destination.code(&mut out);
        out
    }

    /// True when the route carries enough data for a point-to-point mileage
    /// lookup against the mileage collaborator.
    pub fn is_point_to_point(&self) -> bool {
        matches!(
            self.code().as_str(),
            "CSZ_CSZ" | "CS_CSZ" | "CSZ_CS" | "CS_CS" | "Z_Z"
        )
    }
}
