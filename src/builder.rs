//! Bulk lane authoring.
//!
//! The builder turns one authored entry into the cartesian set of lane
//! records it implies (origin points × destination points, and mileage
//! bands for distance-banded lanes), then appends them to the store.
//! Every entry is isolated: expansion failures and append failures land in
//! that entry's slot of the outcome array and the rest of the batch keeps
//! going.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ltl::LtlLaneRecord;
use crate::reference::ReferenceData;
use crate::store::{LaneRecord, LaneStore};

/// One origin or destination point of an authored entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanePoint {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zip_from: String,
    #[serde(default)]
    pub zip_to: String,
}

impl LanePoint {
    fn has_any_geo(&self) -> bool {
        !self.state.is_empty() || !self.city.is_empty() || !self.zip_from.is_empty()
    }
}

/// Settings shared by every lane an entry expands to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneEntrySettings {
    pub precedence: i32,
    pub mode: String,
    pub carrier: String,
    pub eff_from: NaiveDate,
    pub eff_to: NaiveDate,
    pub org_country: String,
    pub des_country: String,
}

/// Rate figures for an entry; a lane is flat-rated or per-mile, not both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateData {
    #[serde(default)]
    pub flat_rate: f64,
    #[serde(default)]
    pub rate_per_mile: f64,
    #[serde(default)]
    pub min_charge: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaneOptions {
    #[serde(default)]
    pub fuel_included: bool,
    #[serde(default)]
    pub fuel_table: String,
    #[serde(default)]
    pub note: String,
}

/// A distance band for mileage-typed lanes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MileageBand {
    pub miles_from: i64,
    pub miles_to: i64,
}

/// One authored entry from the lane builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneEntry {
    pub settings: LaneEntrySettings,
    #[serde(default)]
    pub rate: RateData,
    #[serde(default)]
    pub options: LaneOptions,
    pub origins: Vec<LanePoint>,
    pub destinations: Vec<LanePoint>,
    /// Mileage bands; empty for geography-typed lanes.
    #[serde(default)]
    pub mileage_bands: Vec<MileageBand>,
}

impl LaneEntry {
    fn validate(&self) -> Result<(), String> {
        if self.settings.carrier.is_empty() {
            return Err("carrier code is required".to_string());
        }
        if self.settings.eff_from > self.settings.eff_to {
            return Err("effective-from date is after effective-to".to_string());
        }
        if self.rate.flat_rate != 0.0 && self.rate.rate_per_mile != 0.0 {
            return Err("a lane is flat-rated or per-mile, not both".to_string());
        }
        if self.origins.is_empty() || self.destinations.is_empty() {
            return Err("at least one origin and one destination point".to_string());
        }
        for point in self.origins.iter().chain(self.destinations.iter()) {
            if !point.has_any_geo() {
                return Err("every point needs a state, city, or zip".to_string());
            }
        }
        Ok(())
    }

    /// The lane records this entry implies.
    pub fn expand(&self) -> Vec<LaneRecord> {
        let bands: &[MileageBand] = if self.mileage_bands.is_empty() {
            &[MileageBand { miles_from: 0, miles_to: 0 }]
        } else {
            &self.mileage_bands
        };
        let mut records =
            Vec::with_capacity(self.origins.len() * self.destinations.len() * bands.len());
        for origin in &self.origins {
            for destination in &self.destinations {
                for band in bands {
                    records.push(self.record(origin, destination, band));
                }
            }
        }
        records
    }

    fn record(&self, origin: &LanePoint, destination: &LanePoint, band: &MileageBand) -> LaneRecord {
        LaneRecord {
            precedence: self.settings.precedence,
            mode: self.settings.mode.clone(),
            carrier: self.settings.carrier.clone(),
            eff_from: self.settings.eff_from,
            eff_to: self.settings.eff_to,
            org_country: self.settings.org_country.clone(),
            org_state: origin.state.clone(),
            org_city: origin.city.clone(),
            org_zip_from: origin.zip_from.clone(),
            org_zip_to: origin.zip_to.clone(),
            des_country: self.settings.des_country.clone(),
            des_state: destination.state.clone(),
            des_city: destination.city.clone(),
            des_zip_from: destination.zip_from.clone(),
            des_zip_to: destination.zip_to.clone(),
            fuel_table: self.options.fuel_table.clone(),
            flat_rate: self.rate.flat_rate,
            rate_per_mile: self.rate.rate_per_mile,
            min_charge: self.rate.min_charge,
            fuel_included: self.options.fuel_included,
            note: self.options.note.clone(),
            miles_from: band.miles_from,
            miles_to: band.miles_to,
        }
    }
}

/// Per-entry outcome of a bulk load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    pub entry: usize,
    pub inserted: usize,
    pub error: Option<String>,
}

/// Expand and append a batch of entries. Entries expand in parallel;
/// each entry's failure is recorded in its own slot and never aborts the
/// rest of the batch.
pub fn load_entries(
    store: &mut LaneStore,
    reference: &ReferenceData,
    entries: &[LaneEntry],
) -> Vec<LoadOutcome> {
    let expanded: Vec<Result<Vec<LaneRecord>, String>> = entries
        .par_iter()
        .map(|entry| entry.validate().map(|_| entry.expand()))
        .collect();

    expanded
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(records) => {
                let mut inserted = 0;
                for record in &records {
                    if let Err(err) = store.append(record, reference) {
                        return LoadOutcome {
                            entry: index,
                            inserted,
                            error: Some(err.to_string()),
                        };
                    }
                    inserted += 1;
                }
                LoadOutcome { entry: index, inserted, error: None }
            }
            Err(err) => LoadOutcome { entry: index, inserted: 0, error: Some(err) },
        })
        .collect()
}

/// Which states an LTL entry covers on one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateSelector {
    /// Any interstate movement.
    Inter,
    /// Any intrastate movement.
    Intra,
    States(Vec<String>),
}

impl StateSelector {
    fn labels(&self) -> Vec<String> {
        match self {
            StateSelector::Inter => vec!["*INTER".to_string()],
            StateSelector::Intra => vec!["*INTRA".to_string()],
            StateSelector::States(states) => states.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipRange {
    pub from: String,
    pub to: String,
}

/// One authored LTL discount entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtlEntry {
    pub carrier: String,
    pub customer: String,
    #[serde(default)]
    pub fuel_table: String,
    pub from_states: StateSelector,
    pub to_states: StateSelector,
    /// Zip ranges; when present they drive the expansion and each range's
    /// state is resolved through the zip→state snapshot.
    #[serde(default)]
    pub origin_zips: Vec<ZipRange>,
    #[serde(default)]
    pub destination_zips: Vec<ZipRange>,
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

impl LtlEntry {
    /// Expand into LTL lane records: zip-range combinations when zips were
    /// supplied, state combinations otherwise.
    pub fn expand(&self, reference: &ReferenceData) -> Result<Vec<LtlLaneRecord>, String> {
        let combos: Vec<(String, ZipRange, String, ZipRange)> =
            if !self.origin_zips.is_empty() || !self.destination_zips.is_empty() {
                if self.origin_zips.is_empty() || self.destination_zips.is_empty() {
                    return Err("zip ranges must cover both sides".to_string());
                }
                let mut combos = Vec::new();
                for origin in &self.origin_zips {
                    let org_state = self.zip_state(origin, reference)?;
                    for destination in &self.destination_zips {
                        let des_state = self.zip_state(destination, reference)?;
                        combos.push((org_state.clone(), origin.clone(), des_state, destination.clone()));
                    }
                }
                combos
            } else {
                let full = ZipRange { from: "00000".to_string(), to: "99999".to_string() };
                let mut combos = Vec::new();
                for from_state in self.from_states.labels() {
                    for to_state in self.to_states.labels() {
                        combos.push((from_state.clone(), full.clone(), to_state, full.clone()));
                    }
                }
                combos
            };

        Ok(combos
            .into_iter()
            .map(|(org_state, org_zip, des_state, des_zip)| LtlLaneRecord {
                carrier: self.carrier.clone(),
                customer: self.customer.clone(),
                fuel_table: self.fuel_table.clone(),
                org_states: org_state,
                des_states: des_state,
                org_zip_from: org_zip.from,
                org_zip_to: org_zip.to,
                des_zip_from: des_zip.from,
                des_zip_to: des_zip.to,
                discount_pct: self.discount_pct,
                min_charge: self.min_charge,
                class_low: self.class_low,
                class_high: self.class_high,
                conditions: self.conditions.clone(),
                weight_from: self.weight_from,
                weight_to: self.weight_to,
                eff_from: self.eff_from,
                eff_to: self.eff_to,
                use_fak: self.use_fak,
                fak_low: self.fak_low,
                fak_high: self.fak_high,
            })
            .collect())
    }

    fn zip_state(&self, range: &ZipRange, reference: &ReferenceData) -> Result<String, String> {
        let zip3 = &range.from[..range.from.len().min(3)];
        reference
            .state_for_zip3(zip3)
            .map(str::to_string)
            .ok_or_else(|| format!("no state on file for zip prefix {zip3}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::PrecedenceTable;

    fn settings() -> LaneEntrySettings {
        LaneEntrySettings {
            precedence: 13,
            mode: "TLD".to_string(),
            carrier: "ABCD".to_string(),
            eff_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            eff_to: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            org_country: "USA".to_string(),
            des_country: "USA".to_string(),
        }
    }

    fn state_point(state: &str) -> LanePoint {
        LanePoint { state: state.to_string(), ..Default::default() }
    }

    #[test]
    fn test_cartesian_expansion() {
        let entry = LaneEntry {
            settings: settings(),
            rate: RateData { rate_per_mile: 2.1, ..Default::default() },
            options: LaneOptions::default(),
            origins: vec![state_point("IL"), state_point("OH")],
            destinations: vec![state_point("TX"), state_point("GA"), state_point("FL")],
            mileage_bands: Vec::new(),
        };
        let records = entry.expand();
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.miles_from == 0 && r.miles_to == 0));
    }

    #[test]
    fn test_mileage_bands_multiply_expansion() {
        let entry = LaneEntry {
            settings: settings(),
            rate: RateData { rate_per_mile: 2.1, ..Default::default() },
            options: LaneOptions::default(),
            origins: vec![state_point("IL")],
            destinations: vec![state_point("TX")],
            mileage_bands: vec![
                MileageBand { miles_from: 0, miles_to: 500 },
                MileageBand { miles_from: 501, miles_to: 1000 },
            ],
        };
        let records = entry.expand();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].miles_from, 501);
    }

    #[test]
    fn test_batch_isolation_on_bad_entry() {
        let reference = ReferenceData::new(PrecedenceTable::standard());
        let mut store = LaneStore::new(&[], &reference).unwrap();

        let good = LaneEntry {
            settings: settings(),
            rate: RateData { rate_per_mile: 2.1, ..Default::default() },
            options: LaneOptions::default(),
            origins: vec![state_point("IL")],
            destinations: vec![state_point("TX")],
            mileage_bands: Vec::new(),
        };
        let mut poisoned = good.clone();
        poisoned.settings.carrier = String::new();

        let outcomes = load_entries(&mut store, &reference, &[good.clone(), poisoned, good]);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].error.is_none());
        assert!(outcomes[1].error.is_some());
        assert!(outcomes[2].error.is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ltl_state_expansion_and_wildcards() {
        let reference = ReferenceData::new(PrecedenceTable::standard());
        let entry = LtlEntry {
            carrier: "LTLC".to_string(),
            customer: "XYZ".to_string(),
            fuel_table: String::new(),
            from_states: StateSelector::States(vec!["IL".to_string(), "OH".to_string()]),
            to_states: StateSelector::States(vec!["TX".to_string()]),
            origin_zips: Vec::new(),
            destination_zips: Vec::new(),
            discount_pct: 25.0,
            min_charge: 120.0,
            class_low: 50.0,
            class_high: 500.0,
            conditions: String::new(),
            weight_from: 0.0,
            weight_to: 0.0,
            eff_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            eff_to: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            use_fak: true,
            fak_low: 50.0,
            fak_high: 100.0,
        };
        let lanes = entry.expand(&reference).unwrap();
        assert_eq!(lanes.len(), 2);
        assert_eq!(lanes[0].org_zip_from, "00000");

        let mut inter = entry.clone();
        inter.from_states = StateSelector::Inter;
        inter.to_states = StateSelector::Inter;
        let lanes = inter.expand(&reference).unwrap();
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].org_states, "*INTER");
    }

    #[test]
    fn test_ltl_zip_expansion_resolves_states() {
        let mut reference = ReferenceData::new(PrecedenceTable::standard());
        reference.add_zip_state("606", "IL");
        reference.add_zip_state("752", "TX");

        let entry = LtlEntry {
            carrier: "LTLC".to_string(),
            customer: "XYZ".to_string(),
            fuel_table: String::new(),
            from_states: StateSelector::States(Vec::new()),
            to_states: StateSelector::States(Vec::new()),
            origin_zips: vec![ZipRange { from: "60601".to_string(), to: "60699".to_string() }],
            destination_zips: vec![ZipRange { from: "75201".to_string(), to: "75299".to_string() }],
            discount_pct: 25.0,
            min_charge: 120.0,
            class_low: 50.0,
            class_high: 500.0,
            conditions: String::new(),
            weight_from: 0.0,
            weight_to: 0.0,
            eff_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            eff_to: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            use_fak: false,
            fak_low: 0.0,
            fak_high: 0.0,
        };
        let lanes = entry.expand(&reference).unwrap();
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].org_states, "IL");
        assert_eq!(lanes[0].des_states, "TX");

        let unmapped = LtlEntry {
            origin_zips: vec![ZipRange { from: "99901".to_string(), to: "99999".to_string() }],
            ..entry
        };
        assert!(unmapped.expand(&reference).is_err());
    }
}
