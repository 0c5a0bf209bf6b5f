//! Fuel surcharge schedule: dated price periods and named bracket tables.
//!
//! A surcharge lookup is two steps. First the posted fuel price for the
//! ship date: the latest price period applies once the ship date has
//! reached its start, otherwise the period covering the date. Second the
//! bracket row of the named table (per transport mode) whose price band
//! contains that price; the bracket carries either a per-mile amount or a
//! percentage of base, never both.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

/// One posted fuel price period.
#[derive(Debug, Clone, Copy)]
pub struct FuelPricePeriod {
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub price: f64,
}

/// One row of a fuel table.
#[derive(Debug, Clone, Copy)]
pub struct FuelBracket {
    pub price_low: f64,
    pub price_high: f64,
    /// Fixed surcharge per mile; used when `pct` is zero.
    pub per_mile: f64,
    /// Percentage of base, as a fraction.
    pub pct: f64,
}

/// How a resolved bracket charges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuelRate {
    PerMile(f64),
    PctOfBase(f64),
}

impl FuelBracket {
    pub fn rate(&self) -> FuelRate {
        if self.pct == 0.0 {
            FuelRate::PerMile(self.per_mile)
        } else {
            FuelRate::PctOfBase(self.pct)
        }
    }
}

/// All fuel tables plus the price history, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct FuelSchedule {
    periods: Vec<FuelPricePeriod>,
    tables: FxHashMap<(String, String), Vec<FuelBracket>>,
}

impl FuelSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_period(&mut self, period: FuelPricePeriod) {
        self.periods.push(period);
    }

    pub fn add_bracket(&mut self, table: &str, mode: &str, bracket: FuelBracket) {
        self.tables
            .entry((table.to_string(), mode.to_string()))
            .or_default()
            .push(bracket);
    }

    /// Posted fuel price applicable to a ship date.
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        let latest = self
            .periods
            .iter()
            .max_by_key(|period| period.end)?;
        if latest.begin <= date {
            return Some(latest.price);
        }
        self.periods
            .iter()
            .find(|period| period.begin <= date && period.end >= date)
            .map(|period| period.price)
    }

    /// Bracket of `table`/`mode` matching the ship date's posted price.
    pub fn bracket(&self, table: &str, mode: &str, date: NaiveDate) -> Option<&FuelBracket> {
        let price = self.price_on(date)?;
        self.tables
            .get(&(table.to_string(), mode.to_string()))?
            .iter()
            .find(|bracket| bracket.price_low <= price && bracket.price_high >= price)
    }

    /// Percentage-of-gross figure for LTL profiles.
    pub fn pct_for(&self, table: &str, mode: &str, date: NaiveDate) -> Option<f64> {
        self.bracket(table, mode, date).map(|bracket| bracket.pct)
    }
}
