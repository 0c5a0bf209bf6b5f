//! Less-than-truckload discount lanes and charge calculators.
//!
//! LTL pricing is class-based: each shipment line carries a freight class,
//! weight, and tariff charge. A carrier's discount profile removes its
//! discount percentage from every line except those whose class falls
//! inside the FAK (freight-all-kinds) band, where the tariff charge stands
//! as-is. The carrier cost side floors gross at the profile minimum; the
//! customer sell side deliberately does not.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::RatingSettings;
use crate::fuel::FuelSchedule;
use crate::reference::{ContactInfo, ReferenceData};
use crate::route::RouteSpec;
use crate::utils::round_to;

/// One line of an LTL shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub freight_class: f64,
    pub weight: f64,
    /// Tariff charge for the line before any discount.
    pub charge: f64,
}

/// A persisted LTL discount lane joined with its FAK range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtlLaneRecord {
    pub carrier: String,
    pub customer: String,
    /// Fuel table reference; `*DEF` or empty defers to the LTL default.
    #[serde(default)]
    pub fuel_table: String,
    /// Origin states: comma-separated codes, `*INTER`, or `*INTRA`.
    pub org_states: String,
    pub des_states: String,
    #[serde(default)]
    pub org_zip_from: String,
    #[serde(default)]
    pub org_zip_to: String,
    #[serde(default)]
    pub des_zip_from: String,
    #[serde(default)]
    pub des_zip_to: String,
    pub discount_pct: f64,
    pub min_charge: f64,
    pub class_low: f64,
    pub class_high: f64,
    #[serde(default)]
    pub conditions: String,
    #[serde(default)]
    pub weight_from: f64,
    #[serde(default)]
    pub weight_to: f64,
    pub eff_from: NaiveDate,
    pub eff_to: NaiveDate,
    #[serde(default)]
    pub use_fak: bool,
    #[serde(default)]
    pub fak_low: f64,
    #[serde(default)]
    pub fak_high: f64,
}

/// A carrier/customer discount profile resolved for one request.
#[derive(Debug, Clone, Serialize)]
pub struct LtlProfile {
    pub code: String,
    pub name: String,
    pub conditions: String,
    pub contact: ContactInfo,
    pub use_fak: bool,
    pub fak_low: f64,
    pub fak_high: f64,
    /// Discount percentage, e.g. 25.0 for 25%.
    pub discount_pct: f64,
    pub min_charge: f64,
    /// Fuel surcharge as a fraction of gross.
    pub fuel_pct: f64,
    pub class_low: f64,
    pub class_high: f64,
}

impl LtlProfile {
    /// Whether a freight class sits strictly inside the FAK band, where the
    /// tariff charge passes through undiscounted.
    pub fn in_fak_band(&self, freight_class: f64) -> bool {
        self.use_fak && freight_class > self.fak_low && freight_class < self.fak_high
    }
}

/// Per-line detail on the cost side.
#[derive(Debug, Clone, Serialize)]
pub struct LtlLineDetail {
    pub freight_class: f64,
    pub charge: f64,
}

/// Carrier cost figures for an LTL shipment.
#[derive(Debug, Clone, Serialize)]
pub struct LtlCarrierCharge {
    pub base: f64,
    pub gross: f64,
    pub fuel_charge: f64,
    pub discount_total: f64,
    pub total: f64,
    pub lines: Vec<LtlLineDetail>,
}

/// Customer sell figures for an LTL shipment.
#[derive(Debug, Clone, Serialize)]
pub struct LtlCustomerCharge {
    pub total_charge: f64,
    pub total_weight: f64,
    pub gross: f64,
    pub discount_total: f64,
    pub fuel_charge: f64,
    pub total: f64,
}

/// Cost-side calculation: discount non-FAK lines, floor gross at the
/// profile minimum, then add fuel on gross.
pub fn carrier_charge(
    profile: &LtlProfile,
    lines: &[ShipmentLine],
    accuracy: u32,
) -> LtlCarrierCharge {
    let mut base = 0.0;
    let mut gross = 0.0;
    let mut discount_total = 0.0;
    let mut details = Vec::with_capacity(lines.len());

    for line in lines {
        let charge = line.charge;
        if profile.discount_pct != 0.0 && !profile.in_fak_band(line.freight_class) {
            let saved = profile.discount_pct / 100.0 * charge;
            gross += charge - saved;
            discount_total += saved;
            details.push(LtlLineDetail {
                freight_class: line.freight_class,
                charge: charge - saved,
            });
        } else {
            gross += charge;
            details.push(LtlLineDetail {
                freight_class: line.freight_class,
                charge,
            });
        }
        base += charge;
    }

    if gross < profile.min_charge {
        gross = profile.min_charge;
    } else {
        gross = round_to(gross, accuracy);
    }

    let fuel_charge = round_to(gross * profile.fuel_pct, accuracy);
    LtlCarrierCharge {
        base: round_to(base, accuracy),
        gross,
        fuel_charge,
        discount_total: round_to(discount_total, accuracy),
        total: round_to(gross + fuel_charge, accuracy),
        lines: details,
    }
}

/// Sell-side calculation: same discount logic, tracks total weight, and
/// applies no minimum-charge floor.
pub fn customer_charge(
    profile: &LtlProfile,
    lines: &[ShipmentLine],
    accuracy: u32,
) -> LtlCustomerCharge {
    let mut total_charge = 0.0;
    let mut total_weight = 0.0;
    let mut gross = 0.0;
    let mut discount_total = 0.0;

    for line in lines {
        let charge = line.charge;
        if profile.in_fak_band(line.freight_class) {
            gross += charge;
        } else {
            let saved = profile.discount_pct / 100.0 * charge;
            gross += charge - saved;
            discount_total += round_to(saved, accuracy);
        }
        total_charge += charge;
        total_weight += line.weight;
    }

    let fuel_charge = round_to(gross * profile.fuel_pct, accuracy);
    LtlCustomerCharge {
        total_charge,
        total_weight,
        gross,
        discount_total,
        fuel_charge,
        total: round_to(gross + fuel_charge, accuracy),
    }
}

/// The LTL discount lane table.
#[derive(Debug, Clone, Default)]
pub struct LtlStore {
    lanes: Vec<LtlLaneRecord>,
}

impl LtlStore {
    pub fn new(lanes: Vec<LtlLaneRecord>) -> Self {
        LtlStore { lanes }
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn append(&mut self, lane: LtlLaneRecord) {
        self.lanes.push(lane);
    }

    /// Discount profiles applicable to a route for its customer, with fuel
    /// percentages resolved for the ship date.
    pub fn profiles_for(
        &self,
        route: &RouteSpec,
        total_weight: f64,
        reference: &ReferenceData,
        fuel: &FuelSchedule,
        settings: &RatingSettings,
    ) -> Vec<LtlProfile> {
        let ship = route.ship_date;
        self.lanes
            .iter()
            .filter(|lane| lane.customer == route.customer)
            .filter(|lane| lane.eff_from <= ship && lane.eff_to >= ship)
            .filter(|lane| {
                states_match(&lane.org_states, &route.origin.state, &route.destination.state)
                    && states_match(
                        &lane.des_states,
                        &route.destination.state,
                        &route.origin.state,
                    )
            })
            .filter(|lane| {
                zip_covers(&lane.org_zip_from, &lane.org_zip_to, &route.origin.zip)
                    && zip_covers(&lane.des_zip_from, &lane.des_zip_to, &route.destination.zip)
            })
            .filter(|lane| weight_in_band(lane, total_weight))
            .map(|lane| {
                let table = fuel_table_for(lane, reference, settings);
                LtlProfile {
                    code: lane.carrier.clone(),
                    name: reference.name(&lane.carrier).to_string(),
                    conditions: lane.conditions.trim().to_string(),
                    contact: reference.contact(&lane.carrier),
                    use_fak: lane.use_fak,
                    fak_low: lane.fak_low,
                    fak_high: lane.fak_high,
                    discount_pct: lane.discount_pct,
                    min_charge: lane.min_charge,
                    fuel_pct: fuel
                        .pct_for(&table, "LTL", ship)
                        .unwrap_or(0.0),
                    class_low: lane.class_low,
                    class_high: lane.class_high,
                }
            })
            .collect()
    }
}

fn states_match(lane_states: &str, this_side: &str, other_side: &str) -> bool {
    match lane_states {
        "*INTER" => this_side != other_side,
        "*INTRA" => this_side == other_side,
        list => list.split(',').any(|state| state.trim() == this_side),
    }
}

fn zip_covers(from: &str, to: &str, zip: &str) -> bool {
    if zip.is_empty() || (from.is_empty() && to.is_empty()) {
        return true;
    }
    from <= zip && to >= zip
}

fn weight_in_band(lane: &LtlLaneRecord, weight: f64) -> bool {
    if lane.weight_from == 0.0 && lane.weight_to == 0.0 {
        return true;
    }
    lane.weight_from <= weight && lane.weight_to >= weight
}

fn fuel_table_for(
    lane: &LtlLaneRecord,
    reference: &ReferenceData,
    settings: &RatingSettings,
) -> String {
    if let Some(profile) = reference.profile(&lane.carrier) {
        if !profile.fuel_table.is_empty() {
            return profile.fuel_table.clone();
        }
    }
    if !lane.fuel_table.is_empty() && lane.fuel_table != "*DEF" {
        return lane.fuel_table.clone();
    }
    settings.ltl_default_fuel_table.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile() -> LtlProfile {
        LtlProfile {
            code: "LTLC".to_string(),
            name: "LTL CARTAGE".to_string(),
            conditions: String::new(),
            contact: ContactInfo::default(),
            use_fak: true,
            fak_low: 50.0,
            fak_high: 100.0,
            discount_pct: 25.0,
            min_charge: 120.0,
            fuel_pct: 0.2,
            class_low: 50.0,
            class_high: 500.0,
        }
    }

    fn line(class: f64, weight: f64, charge: f64) -> ShipmentLine {
        ShipmentLine { freight_class: class, weight, charge }
    }

    #[test]
    fn test_fak_band_is_open_interval() {
        let profile = profile();
        assert!(profile.in_fak_band(70.0));
        assert!(!profile.in_fak_band(50.0)); // boundary is outside the band
        assert!(!profile.in_fak_band(100.0));
        assert!(!profile.in_fak_band(175.0));
    }

    #[test]
    fn test_carrier_discount_and_fak_pass_through() {
        let charge = carrier_charge(
            &profile(),
            &[line(70.0, 500.0, 200.0), line(175.0, 800.0, 400.0)],
            2,
        );
        // FAK line passes untouched, class-175 line takes 25% off.
        assert_relative_eq!(charge.base, 600.0);
        assert_relative_eq!(charge.gross, 500.0);
        assert_relative_eq!(charge.discount_total, 100.0);
        assert_relative_eq!(charge.fuel_charge, 100.0);
        assert_relative_eq!(charge.total, 600.0);
        assert_relative_eq!(charge.lines[0].charge, 200.0);
        assert_relative_eq!(charge.lines[1].charge, 300.0);
    }

    #[test]
    fn test_carrier_minimum_charge_floor() {
        let low = carrier_charge(&profile(), &[line(175.0, 100.0, 100.0)], 2);
        // 75 after discount sits below the 120 minimum.
        assert_relative_eq!(low.gross, 120.0);

        let at = carrier_charge(&profile(), &[line(175.0, 100.0, 160.0)], 2);
        // Exactly at the floor stays unmodified.
        assert_relative_eq!(at.gross, 120.0);

        let above = carrier_charge(&profile(), &[line(175.0, 100.0, 400.0)], 2);
        assert_relative_eq!(above.gross, 300.0);
    }

    #[test]
    fn test_customer_sell_has_no_floor_and_tracks_weight() {
        let sell = customer_charge(&profile(), &[line(175.0, 650.0, 100.0)], 2);
        assert_relative_eq!(sell.gross, 75.0); // below 120, left alone
        assert_relative_eq!(sell.total_weight, 650.0);
        assert_relative_eq!(sell.total_charge, 100.0);
        assert_relative_eq!(sell.discount_total, 25.0);
        assert_relative_eq!(sell.fuel_charge, 15.0);
        assert_relative_eq!(sell.total, 90.0);
    }

    #[test]
    fn test_zero_discount_passes_everything_through() {
        let mut no_discount = profile();
        no_discount.discount_pct = 0.0;
        let charge = carrier_charge(&no_discount, &[line(175.0, 100.0, 400.0)], 2);
        assert_relative_eq!(charge.gross, 400.0);
        assert_relative_eq!(charge.discount_total, 0.0);
    }

    #[test]
    fn test_state_wildcards() {
        assert!(states_match("*INTER", "IL", "TX"));
        assert!(!states_match("*INTER", "IL", "IL"));
        assert!(states_match("*INTRA", "IL", "IL"));
        assert!(states_match("IL,OH,MI", "OH", "TX"));
        assert!(!states_match("IL,OH,MI", "GA", "TX"));
    }
}
