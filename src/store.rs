//! Lane table storage and the repository read/write contract.
//!
//! Lanes live in a single DataFrame; a composed [`Predicate`] compiles to a
//! lazy filter expression and every quote request issues exactly one query,
//! returning hits ordered ascending by precedence rank. Two columns are
//! joined in from the carrier profiles at build time (`mileage_basis`,
//! `profile_active`) so lane-level constraints can resolve per-carrier
//! facts inside the same query.
//!
//! Maintenance addresses rows by physical record locator (row index), the
//! way the original addressed relative record numbers.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::RatingSettings;
use crate::error::{RatingError, Result};
use crate::predicate::Predicate;
use crate::reference::ReferenceData;
use crate::utils::{from_yyyymmdd, yyyymmdd};

/// A persisted lane definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneRecord {
    pub precedence: i32,
    pub mode: String,
    pub carrier: String,
    pub eff_from: NaiveDate,
    pub eff_to: NaiveDate,
    pub org_country: String,
    pub org_state: String,
    pub org_city: String,
    pub org_zip_from: String,
    pub org_zip_to: String,
    pub des_country: String,
    pub des_state: String,
    pub des_city: String,
    pub des_zip_from: String,
    pub des_zip_to: String,
    /// Fuel table reference; empty defers to profile/default resolution.
    #[serde(default)]
    pub fuel_table: String,
    /// Flat rate; zero means the lane rates per mile.
    #[serde(default)]
    pub flat_rate: f64,
    #[serde(default)]
    pub rate_per_mile: f64,
    #[serde(default)]
    pub min_charge: f64,
    #[serde(default)]
    pub fuel_included: bool,
    #[serde(default)]
    pub note: String,
    /// Applicable mileage band; both zero means unrestricted.
    #[serde(default)]
    pub miles_from: i64,
    #[serde(default)]
    pub miles_to: i64,
}

/// One row returned by a predicate query, already precedence-ordered.
#[derive(Debug, Clone)]
pub struct LaneHit {
    pub precedence: i32,
    pub carrier: String,
    pub flat_rate: f64,
    pub rate_per_mile: f64,
    pub min_charge: f64,
    pub fuel_included: bool,
    pub fuel_table: String,
    pub note: String,
}

/// Optional criteria for maintenance searches over the lane table.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub org_city: Option<String>,
    pub org_state: Option<String>,
    pub org_zip: Option<String>,
    pub org_country: Option<String>,
    pub des_city: Option<String>,
    pub des_state: Option<String>,
    pub des_zip: Option<String>,
    pub des_country: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub precedence: Option<i32>,
    pub carrier: Option<String>,
    pub mode: Option<String>,
    pub miles: Option<i64>,
}

/// The lane repository.
#[derive(Debug, Clone)]
pub struct LaneStore {
    lanes: DataFrame,
}

impl LaneStore {
    /// Build the store from records, joining per-carrier profile columns.
    pub fn new(records: &[LaneRecord], reference: &ReferenceData) -> Result<Self> {
        Ok(LaneStore { lanes: build_frame(records, reference)? })
    }

    /// Load the persisted lane table and re-join profile columns.
    pub fn from_parquet(path: &Path, reference: &ReferenceData) -> anyhow::Result<Self> {
        let df = LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to scan lane table: {:?}", path))?
            .collect()
            .with_context(|| format!("Failed to materialize lane table: {:?}", path))?;
        let records = records_from_frame(&df)
            .with_context(|| format!("Malformed lane table: {:?}", path))?;
        Ok(Self::new(&records, reference)?)
    }

    /// Persist the lane table without the joined profile columns.
    pub fn to_parquet(&self, path: &Path) -> anyhow::Result<()> {
        let mut df = self
            .lanes
            .drop_many(["mileage_basis", "profile_active"]);
        let file = File::create(path)
            .with_context(|| format!("Failed to create lane table file: {:?}", path))?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .with_context(|| "Failed to write lane table parquet")?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lanes.height()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.height() == 0
    }

    /// Execute a composed predicate; hits come back ordered ascending by
    /// precedence rank. Duplicate carriers are NOT collapsed here; the
    /// ranker owns first-wins semantics.
    pub fn query(&self, predicate: &Predicate) -> Result<Vec<LaneHit>> {
        let df = self
            .lanes
            .clone()
            .lazy()
            .filter(predicate.to_expr())
            .sort(["precedence"], Default::default())
            .collect()?;

        let precedence = df.column("precedence")?.i32()?;
        let carrier = df.column("carrier")?.str()?;
        let flat_rate = df.column("flat_rate")?.f64()?;
        let rate_per_mile = df.column("rate_per_mile")?.f64()?;
        let min_charge = df.column("min_charge")?.f64()?;
        let fuel_included = df.column("fuel_included")?.bool()?;
        let fuel_table = df.column("fuel_table")?.str()?;
        let note = df.column("note")?.str()?;

        let mut hits = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            hits.push(LaneHit {
                precedence: precedence.get(i).unwrap_or(0),
                carrier: carrier.get(i).unwrap_or("").to_string(),
                flat_rate: flat_rate.get(i).unwrap_or(0.0),
                rate_per_mile: rate_per_mile.get(i).unwrap_or(0.0),
                min_charge: min_charge.get(i).unwrap_or(0.0),
                fuel_included: fuel_included.get(i).unwrap_or(false),
                fuel_table: fuel_table.get(i).unwrap_or("").to_string(),
                note: note.get(i).unwrap_or("").to_string(),
            });
        }
        Ok(hits)
    }

    /// Maintenance search; results are capped at the configured row limit.
    pub fn search(
        &self,
        criteria: &SearchCriteria,
        settings: &RatingSettings,
    ) -> Result<Vec<LaneRecord>> {
        let mut conditions: Vec<Expr> = Vec::new();

        let eq = |column: &str, value: &Option<String>| -> Option<Expr> {
            value
                .as_ref()
                .map(|v| col(column).eq(lit(v.as_str())))
        };
        for expr in [
            eq("org_city", &criteria.org_city),
            eq("org_state", &criteria.org_state),
            eq("org_country", &criteria.org_country),
            eq("des_city", &criteria.des_city),
            eq("des_state", &criteria.des_state),
            eq("des_country", &criteria.des_country),
            eq("carrier", &criteria.carrier),
            eq("mode", &criteria.mode),
        ]
        .into_iter()
        .flatten()
        {
            conditions.push(expr);
        }
        if let Some(zip) = &criteria.org_zip {
            conditions.push(
                col("org_zip_from")
                    .lt_eq(lit(zip.as_str()))
                    .and(col("org_zip_to").gt_eq(lit(zip.as_str()))),
            );
        }
        if let Some(zip) = &criteria.des_zip {
            conditions.push(
                col("des_zip_from")
                    .lt_eq(lit(zip.as_str()))
                    .and(col("des_zip_to").gt_eq(lit(zip.as_str()))),
            );
        }
        if let Some(date) = criteria.effective_date {
            let code = yyyymmdd(date);
            conditions.push(
                col("eff_from")
                    .lt_eq(lit(code))
                    .and(col("eff_to").gt_eq(lit(code))),
            );
        }
        if let Some(precedence) = criteria.precedence {
            conditions.push(col("precedence").eq(lit(precedence)));
        }
        if let Some(miles) = criteria.miles {
            conditions.push(
                col("miles_from")
                    .lt_eq(lit(miles))
                    .and(col("miles_to").gt_eq(lit(miles))),
            );
        }

        let filter = conditions
            .into_iter()
            .reduce(Expr::and)
            .unwrap_or_else(|| lit(true));
        let df = self
            .lanes
            .clone()
            .lazy()
            .filter(filter)
            .limit(settings.search_row_limit as u32)
            .collect()?;
        records_from_frame(&df)
    }

    /// Append one lane. Profile columns are joined from the snapshot.
    pub fn append(&mut self, record: &LaneRecord, reference: &ReferenceData) -> Result<()> {
        let row = build_frame(std::slice::from_ref(record), reference)?;
        self.lanes.vstack_mut(&row)?;
        Ok(())
    }

    /// Replace the lane at a record locator.
    pub fn update(
        &mut self,
        locator: usize,
        record: &LaneRecord,
        reference: &ReferenceData,
    ) -> Result<()> {
        let mut records = records_from_frame(&self.lanes)?;
        let slot = records.get_mut(locator).ok_or_else(|| {
            RatingError::Persistence(format!("no lane at record locator {locator}"))
        })?;
        *slot = record.clone();
        self.lanes = build_frame(&records, reference)?;
        Ok(())
    }

    /// Delete the lane at a record locator.
    pub fn delete(&mut self, locator: usize) -> Result<()> {
        if locator >= self.lanes.height() {
            return Err(RatingError::Persistence(format!(
                "no lane at record locator {locator}"
            )));
        }
        let mask: BooleanChunked = (0..self.lanes.height()).map(|i| i != locator).collect();
        self.lanes = self.lanes.filter(&mask)?;
        Ok(())
    }

    /// All records in locator order (maintenance listing).
    pub fn records(&self) -> Result<Vec<LaneRecord>> {
        records_from_frame(&self.lanes)
    }
}

fn build_frame(records: &[LaneRecord], reference: &ReferenceData) -> Result<DataFrame> {
    let precedence: Vec<i32> = records.iter().map(|r| r.precedence).collect();
    let mode: Vec<&str> = records.iter().map(|r| r.mode.as_str()).collect();
    let carrier: Vec<&str> = records.iter().map(|r| r.carrier.as_str()).collect();
    let eff_from: Vec<i32> = records.iter().map(|r| yyyymmdd(r.eff_from)).collect();
    let eff_to: Vec<i32> = records.iter().map(|r| yyyymmdd(r.eff_to)).collect();
    let org_country: Vec<&str> = records.iter().map(|r| r.org_country.as_str()).collect();
    let org_state: Vec<&str> = records.iter().map(|r| r.org_state.as_str()).collect();
    let org_city: Vec<&str> = records.iter().map(|r| r.org_city.as_str()).collect();
    let org_zip_from: Vec<&str> = records.iter().map(|r| r.org_zip_from.as_str()).collect();
    let org_zip_to: Vec<&str> = records.iter().map(|r| r.org_zip_to.as_str()).collect();
    let des_country: Vec<&str> = records.iter().map(|r| r.des_country.as_str()).collect();
    let des_state: Vec<&str> = records.iter().map(|r| r.des_state.as_str()).collect();
    let des_city: Vec<&str> = records.iter().map(|r| r.des_city.as_str()).collect();
    let des_zip_from: Vec<&str> = records.iter().map(|r| r.des_zip_from.as_str()).collect();
    let des_zip_to: Vec<&str> = records.iter().map(|r| r.des_zip_to.as_str()).collect();
    let fuel_table: Vec<&str> = records.iter().map(|r| r.fuel_table.as_str()).collect();
    let flat_rate: Vec<f64> = records.iter().map(|r| r.flat_rate).collect();
    let rate_per_mile: Vec<f64> = records.iter().map(|r| r.rate_per_mile).collect();
    let min_charge: Vec<f64> = records.iter().map(|r| r.min_charge).collect();
    let fuel_included: Vec<bool> = records.iter().map(|r| r.fuel_included).collect();
    let note: Vec<&str> = records.iter().map(|r| r.note.as_str()).collect();
    let miles_from: Vec<i64> = records.iter().map(|r| r.miles_from).collect();
    let miles_to: Vec<i64> = records.iter().map(|r| r.miles_to).collect();
    let mileage_basis: Vec<&str> = records
        .iter()
        .map(|r| reference.mileage_basis(&r.carrier).code())
        .collect();
    let profile_active: Vec<bool> = records
        .iter()
        .map(|r| reference.is_active(&r.carrier))
        .collect();

    let df = df! {
        "precedence" => precedence,
        "mode" => mode,
        "carrier" => carrier,
        "eff_from" => eff_from,
        "eff_to" => eff_to,
        "org_country" => org_country,
        "org_state" => org_state,
        "org_city" => org_city,
        "org_zip_from" => org_zip_from,
        "org_zip_to" => org_zip_to,
        "des_country" => des_country,
        "des_state" => des_state,
        "des_city" => des_city,
        "des_zip_from" => des_zip_from,
        "des_zip_to" => des_zip_to,
        "fuel_table" => fuel_table,
        "flat_rate" => flat_rate,
        "rate_per_mile" => rate_per_mile,
        "min_charge" => min_charge,
        "fuel_included" => fuel_included,
        "note" => note,
        "miles_from" => miles_from,
        "miles_to" => miles_to,
        "mileage_basis" => mileage_basis,
        "profile_active" => profile_active,
    }?;
    Ok(df)
}

fn records_from_frame(df: &DataFrame) -> Result<Vec<LaneRecord>> {
    let precedence = df.column("precedence")?.i32()?;
    let mode = df.column("mode")?.str()?;
    let carrier = df.column("carrier")?.str()?;
    let eff_from = df.column("eff_from")?.i32()?;
    let eff_to = df.column("eff_to")?.i32()?;
    let org_country = df.column("org_country")?.str()?;
    let org_state = df.column("org_state")?.str()?;
    let org_city = df.column("org_city")?.str()?;
    let org_zip_from = df.column("org_zip_from")?.str()?;
    let org_zip_to = df.column("org_zip_to")?.str()?;
    let des_country = df.column("des_country")?.str()?;
    let des_state = df.column("des_state")?.str()?;
    let des_city = df.column("des_city")?.str()?;
    let des_zip_from = df.column("des_zip_from")?.str()?;
    let des_zip_to = df.column("des_zip_to")?.str()?;
    let fuel_table = df.column("fuel_table")?.str()?;
    let flat_rate = df.column("flat_rate")?.f64()?;
    let rate_per_mile = df.column("rate_per_mile")?.f64()?;
    let min_charge = df.column("min_charge")?.f64()?;
    let fuel_included = df.column("fuel_included")?.bool()?;
    let note = df.column("note")?.str()?;
    let miles_from = df.column("miles_from")?.i64()?;
    let miles_to = df.column("miles_to")?.i64()?;

    let date = |code: Option<i32>| -> Result<NaiveDate> {
        let code = code.unwrap_or(0);
        from_yyyymmdd(code)
            .ok_or_else(|| RatingError::Persistence(format!("invalid lane date: {code}")))
    };

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        records.push(LaneRecord {
            precedence: precedence.get(i).unwrap_or(0),
            mode: mode.get(i).unwrap_or("").to_string(),
            carrier: carrier.get(i).unwrap_or("").to_string(),
            eff_from: date(eff_from.get(i))?,
            eff_to: date(eff_to.get(i))?,
            org_country: org_country.get(i).unwrap_or("").to_string(),
            org_state: org_state.get(i).unwrap_or("").to_string(),
            org_city: org_city.get(i).unwrap_or("").to_string(),
            org_zip_from: org_zip_from.get(i).unwrap_or("").to_string(),
            org_zip_to: org_zip_to.get(i).unwrap_or("").to_string(),
            des_country: des_country.get(i).unwrap_or("").to_string(),
            des_state: des_state.get(i).unwrap_or("").to_string(),
            des_city: des_city.get(i).unwrap_or("").to_string(),
            des_zip_from: des_zip_from.get(i).unwrap_or("").to_string(),
            des_zip_to: des_zip_to.get(i).unwrap_or("").to_string(),
            fuel_table: fuel_table.get(i).unwrap_or("").to_string(),
            flat_rate: flat_rate.get(i).unwrap_or(0.0),
            rate_per_mile: rate_per_mile.get(i).unwrap_or(0.0),
            min_charge: min_charge.get(i).unwrap_or(0.0),
            fuel_included: fuel_included.get(i).unwrap_or(false),
            note: note.get(i).unwrap_or("").to_string(),
            miles_from: miles_from.get(i).unwrap_or(0),
            miles_to: miles_to.get(i).unwrap_or(0),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::PrecedenceTable;
    use crate::reference::{CarrierProfile, MileageBasis};

    fn reference() -> ReferenceData {
        let mut reference = ReferenceData::new(PrecedenceTable::standard());
        for code in ["ABCD", "WXYZ"] {
            reference.add_profile(CarrierProfile {
                code: code.to_string(),
                name: format!("{code} LINES"),
                active: true,
                mileage_basis: MileageBasis::HouseholdGoods,
                fuel_table: String::new(),
                is_customer: false,
            });
        }
        reference
    }

    fn lane(carrier: &str, org_state: &str, des_state: &str) -> LaneRecord {
        LaneRecord {
            precedence: 13,
            mode: "TLD".to_string(),
            carrier: carrier.to_string(),
            eff_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            eff_to: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            org_country: "USA".to_string(),
            org_state: org_state.to_string(),
            org_city: String::new(),
            org_zip_from: String::new(),
            org_zip_to: String::new(),
            des_country: "USA".to_string(),
            des_state: des_state.to_string(),
            des_city: String::new(),
            des_zip_from: String::new(),
            des_zip_to: String::new(),
            fuel_table: String::new(),
            flat_rate: 1500.0,
            rate_per_mile: 0.0,
            min_charge: 0.0,
            fuel_included: true,
            note: String::new(),
            miles_from: 0,
            miles_to: 0,
        }
    }

    #[test]
    fn test_round_trip_records() {
        let reference = reference();
        let store = LaneStore::new(
            &[lane("ABCD", "IL", "TX"), lane("WXYZ", "OH", "GA")],
            &reference,
        )
        .unwrap();
        let records = store.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].carrier, "ABCD");
        assert_eq!(records[1].des_state, "GA");
    }

    #[test]
    fn test_search_by_state_and_limit() {
        let reference = reference();
        let store = LaneStore::new(
            &[lane("ABCD", "IL", "TX"), lane("WXYZ", "IL", "GA")],
            &reference,
        )
        .unwrap();

        let criteria = SearchCriteria {
            org_state: Some("IL".to_string()),
            des_state: Some("TX".to_string()),
            ..Default::default()
        };
        let found = store.search(&criteria, &RatingSettings::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].carrier, "ABCD");
    }

    #[test]
    fn test_append_update_delete_by_locator() {
        let reference = reference();
        let mut store = LaneStore::new(&[lane("ABCD", "IL", "TX")], &reference).unwrap();

        store.append(&lane("WXYZ", "OH", "GA"), &reference).unwrap();
        assert_eq!(store.len(), 2);

        let mut replacement = lane("WXYZ", "OH", "FL");
        replacement.note = "revised".to_string();
        store.update(1, &replacement, &reference).unwrap();
        assert_eq!(store.records().unwrap()[1].des_state, "FL");

        store.delete(0).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records().unwrap()[0].carrier, "WXYZ");

        assert!(store.delete(7).is_err());
    }
}
