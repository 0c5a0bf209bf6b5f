//! The quote pipeline coordinator.
//!
//! One request runs one synchronous pipeline: classify → resolve miles →
//! compose → query → project → rank. The engine owns the stores and the
//! immutable reference/fuel snapshots and issues exactly one compiled
//! query per request.

use tracing::debug;

use crate::config::RatingSettings;
use crate::error::{RatingError, Result};
use crate::fuel::FuelSchedule;
use crate::ltl::{
    carrier_charge, customer_charge, LtlCarrierCharge, LtlCustomerCharge, LtlProfile, LtlStore,
};
use crate::predicate::compose;
use crate::projector::project;
use crate::quote::Quote;
use crate::rank::rank_quotes;
use crate::reference::ReferenceData;
use crate::route::{Granularity, ResolvedMiles, RouteSpec};
use crate::store::LaneStore;

/// The mileage collaborator contract: household-goods and practical miles
/// for a disambiguated point-to-point route.
pub trait MileageSource: Send + Sync {
    fn miles(&self, route: &RouteSpec) -> Result<(f64, f64)>;
}

/// Fixed mileage figures, for callers operating without the mileage
/// collaborator (and for tests).
#[derive(Debug, Clone, Copy)]
pub struct StaticMileage {
    pub hhg: f64,
    pub pract: f64,
}

impl MileageSource for StaticMileage {
    fn miles(&self, _route: &RouteSpec) -> Result<(f64, f64)> {
        Ok((self.hhg, self.pract))
    }
}

/// One LTL carrier quote: the resolved profile plus its cost figures.
#[derive(Debug, Clone)]
pub struct LtlCarrierQuote {
    pub profile: LtlProfile,
    pub charge: LtlCarrierCharge,
}

/// One LTL customer sell: the customer's own profile plus sell figures.
#[derive(Debug, Clone)]
pub struct LtlCustomerQuote {
    pub profile: LtlProfile,
    pub sell: LtlCustomerCharge,
}

/// Carrier cost and customer sell sides of one LTL request.
#[derive(Debug, Clone)]
pub struct LtlQuoteSet {
    pub carriers: Vec<LtlCarrierQuote>,
    pub customers: Vec<LtlCustomerQuote>,
}

/// The quoting engine. Built once at startup; all state is read-only.
pub struct RatingEngine {
    store: LaneStore,
    ltl_store: LtlStore,
    reference: ReferenceData,
    fuel: FuelSchedule,
    settings: RatingSettings,
    mileage: Box<dyn MileageSource>,
}

impl RatingEngine {
    pub fn new(
        store: LaneStore,
        ltl_store: LtlStore,
        reference: ReferenceData,
        fuel: FuelSchedule,
        settings: RatingSettings,
        mileage: Box<dyn MileageSource>,
    ) -> Self {
        RatingEngine { store, ltl_store, reference, fuel, settings, mileage }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Quote a standard (full-load) route: one quote per carrier with a
    /// matching lane, sorted ascending by base charge.
    pub fn quote(&self, route: &RouteSpec) -> Result<Vec<Quote>> {
        let granularity = Granularity::classify(route)?;
        debug!(code = %granularity.code(), "classified route");

        let miles = self.resolve_miles(route, granularity)?;
        let predicate = compose(
            route,
            granularity,
            &miles,
            &self.reference.precedences,
            &self.settings,
        )?;
        debug!(atoms = predicate.atoms.len(), "composed predicate");

        let hits = self.store.query(&predicate)?;
        debug!(candidates = hits.len(), "lane query returned");

        let rows = hits
            .iter()
            .map(|hit| {
                project(
                    hit,
                    &miles,
                    &route.mode,
                    route.ship_date,
                    &self.reference,
                    &self.fuel,
                    &self.settings,
                )
            })
            .collect();
        Ok(rank_quotes(rows, route.stop_offs, self.settings.accuracy))
    }

    /// Quote an LTL route: cost figures per matching carrier profile and
    /// sell figures per matching customer profile.
    pub fn ltl_quote(&self, route: &RouteSpec) -> Result<LtlQuoteSet> {
        let readiness = self.reference.ltl_ready(&route.customer);
        if let Some(reason) = readiness.reason() {
            return Err(RatingError::Validation(reason.to_string()));
        }
        if route.shipment_lines.is_empty() {
            return Err(RatingError::Validation(
                "LTL quoting needs at least one shipment line".to_string(),
            ));
        }

        let total_weight: f64 = route.shipment_lines.iter().map(|line| line.weight).sum();
        let profiles = self.ltl_store.profiles_for(
            route,
            total_weight,
            &self.reference,
            &self.fuel,
            &self.settings,
        );
        debug!(profiles = profiles.len(), "LTL profiles matched");

        let mut carriers = Vec::new();
        let mut customers = Vec::new();
        for profile in profiles {
            if self.reference.is_customer(&profile.code) {
                let sell = customer_charge(&profile, &route.shipment_lines, self.settings.accuracy);
                customers.push(LtlCustomerQuote { profile, sell });
            } else {
                let charge = carrier_charge(&profile, &route.shipment_lines, self.settings.accuracy);
                carriers.push(LtlCarrierQuote { profile, charge });
            }
        }
        carriers.sort_by(|a, b| {
            a.charge
                .total
                .partial_cmp(&b.charge.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(LtlQuoteSet { carriers, customers })
    }

    /// Mileage resolution: point-to-point routes consult the collaborator,
    /// everything else rides on user-supplied figures. Stop-offs pad both
    /// figures; overrides add on top.
    fn resolve_miles(&self, route: &RouteSpec, granularity: Granularity) -> Result<ResolvedMiles> {
        let (mut hhg, mut pract) = if granularity.is_point_to_point() {
            self.mileage.miles(route)?
        } else {
            (0.0, 0.0)
        };

        if route.stop_offs > 0 {
            hhg += route.stop_offs as f64;
            pract += route.stop_offs as f64;
        }
        if route.hhg_override != 0.0 {
            hhg += route.hhg_override;
        }
        if route.pract_override != 0.0 {
            pract += route.pract_override;
        }

        if hhg == 0.0 && pract == 0.0 {
            return Err(RatingError::Validation(
                "If you are not requesting a City, ST to City, ST route you may wish to \
                 include miles."
                    .to_string(),
            ));
        }
        debug!(hhg, pract, "resolved mileage");
        Ok(ResolvedMiles { hhg, pract })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::PrecedenceTable;
    use crate::route::Endpoint;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    struct FailingMileage;

    impl MileageSource for FailingMileage {
        fn miles(&self, _route: &RouteSpec) -> Result<(f64, f64)> {
            Err(RatingError::RoutingUpstream("invalid session".to_string()))
        }
    }

    fn engine(mileage: Box<dyn MileageSource>) -> RatingEngine {
        let reference = ReferenceData::new(PrecedenceTable::standard());
        let store = LaneStore::new(&[], &reference).unwrap();
        RatingEngine::new(
            store,
            LtlStore::default(),
            reference,
            FuelSchedule::new(),
            RatingSettings::default(),
            mileage,
        )
    }

    fn state_route() -> RouteSpec {
        RouteSpec {
            origin: Endpoint::new("", "IL", "", "USA"),
            destination: Endpoint::new("", "TX", "", "USA"),
            ship_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            mode: "TLD".to_string(),
            customer: String::new(),
            hhg_override: 0.0,
            pract_override: 0.0,
            stop_offs: 0,
            shipment_lines: Vec::new(),
        }
    }

    #[test]
    fn test_non_point_route_without_miles_is_rejected() {
        let engine = engine(Box::new(StaticMileage { hhg: 900.0, pract: 920.0 }));
        let err = engine.quote(&state_route()).unwrap_err();
        assert!(matches!(err, RatingError::Validation(_)));
    }

    #[test]
    fn test_overrides_and_stop_offs_pad_miles() {
        let engine = engine(Box::new(StaticMileage { hhg: 900.0, pract: 920.0 }));
        let mut route = state_route();
        route.hhg_override = 850.0;
        route.pract_override = 880.0;
        route.stop_offs = 2;
        let granularity = Granularity::classify(&route).unwrap();
        let miles = engine.resolve_miles(&route, granularity).unwrap();
        // Non-point-to-point: no collaborator miles, stops + overrides only.
        assert_relative_eq!(miles.hhg, 852.0);
        assert_relative_eq!(miles.pract, 882.0);
    }

    #[test]
    fn test_upstream_failure_propagates() {
        let engine = engine(Box::new(FailingMileage));
        let mut route = state_route();
        route.origin = Endpoint::new("CHICAGO", "IL", "", "USA");
        route.destination = Endpoint::new("DALLAS", "TX", "", "USA");
        let err = engine.quote(&route).unwrap_err();
        assert!(matches!(err, RatingError::RoutingUpstream(_)));
    }

    #[test]
    fn test_ltl_requires_known_ready_customer() {
        let engine = engine(Box::new(StaticMileage { hhg: 0.0, pract: 0.0 }));
        let mut route = state_route();
        route.mode = "LTL".to_string();
        route.customer = "NOPE".to_string();
        let err = engine.ltl_quote(&route).unwrap_err();
        assert!(matches!(err, RatingError::Validation(message) if message.contains("INVALID")));
    }
}
