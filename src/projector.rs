//! Rate and fuel projection for matched lanes.
//!
//! Turns a lane hit into a candidate row with concrete base/fuel/mile
//! figures. The mileage basis comes from the carrier's rate profile, never
//! the request; the fuel table resolution order is profile override, then
//! the lane's table reference, then the configured default.

use chrono::NaiveDate;

use crate::config::RatingSettings;
use crate::fuel::{FuelRate, FuelSchedule};
use crate::reference::{ContactInfo, MileageBasis, ReferenceData};
use crate::route::ResolvedMiles;
use crate::store::LaneHit;

/// A matched lane joined with its computed figures, one per candidate.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub precedence: i32,
    pub code: String,
    pub name: String,
    pub is_customer: bool,
    pub contact: ContactInfo,
    pub base: f64,
    pub fuel: f64,
    pub total: f64,
    pub miles: f64,
    pub rate_per_mile: f64,
    pub note: String,
}

/// Project one lane hit into a candidate row.
pub fn project(
    hit: &LaneHit,
    miles: &ResolvedMiles,
    mode: &str,
    ship_date: NaiveDate,
    reference: &ReferenceData,
    fuel: &FuelSchedule,
    settings: &RatingSettings,
) -> CandidateRow {
    let lane_miles = match reference.mileage_basis(&hit.carrier) {
        MileageBasis::Practical => miles.pract,
        MileageBasis::HouseholdGoods => miles.hhg,
    };

    let base = if hit.flat_rate != 0.0 {
        hit.flat_rate
    } else {
        let computed = hit.rate_per_mile * lane_miles;
        if computed < hit.min_charge {
            hit.min_charge
        } else {
            computed
        }
    };

    let fuel_charge = if hit.fuel_included {
        0.0
    } else {
        let table = fuel_table_for(hit, reference, settings);
        match fuel.bracket(table, mode, ship_date).map(|bracket| bracket.rate()) {
            Some(FuelRate::PerMile(amount)) => amount * lane_miles,
            Some(FuelRate::PctOfBase(pct)) => base * pct,
            // No bracket for this table/price: surfaces as "included".
            None => 0.0,
        }
    };

    CandidateRow {
        precedence: hit.precedence,
        code: hit.carrier.clone(),
        name: reference.name(&hit.carrier).to_string(),
        is_customer: reference.is_customer(&hit.carrier),
        contact: reference.contact(&hit.carrier),
        base,
        fuel: fuel_charge,
        total: base + fuel_charge,
        miles: lane_miles,
        rate_per_mile: hit.rate_per_mile,
        note: hit.note.trim().to_string(),
    }
}

fn fuel_table_for<'a>(
    hit: &'a LaneHit,
    reference: &'a ReferenceData,
    settings: &'a RatingSettings,
) -> &'a str {
    if let Some(profile) = reference.profile(&hit.carrier) {
        if !profile.fuel_table.is_empty() {
            return &profile.fuel_table;
        }
    }
    if !hit.fuel_table.is_empty() {
        return &hit.fuel_table;
    }
    &settings.default_fuel_table
}
