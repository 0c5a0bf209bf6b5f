//! Candidate deduplication, stop-off amortization, and final ordering.
//!
//! Candidates arrive sorted ascending by precedence rank, so the first row
//! seen for a carrier is its most specific lane and later rows for that
//! carrier are discarded. This encodes the business rule that specific lane
//! definitions override general ones; reordering here changes quoted
//! prices.

use ahash::AHashMap;

use crate::projector::CandidateRow;
use crate::quote::{ChargeValue, Quote};
use crate::utils::round_to;

/// Collapse candidates to one quote per carrier, amortize stop-offs, round,
/// and sort ascending by base. Never fails: unusable rows become
/// error-flagged quotes rather than dropping out of the batch.
pub fn rank_quotes(rows: Vec<CandidateRow>, stop_offs: u32, accuracy: u32) -> Vec<Quote> {
    let mut seen: AHashMap<String, ()> = AHashMap::with_capacity(rows.len());
    let mut quotes = Vec::with_capacity(rows.len());

    for row in rows {
        if seen.insert(row.code.clone(), ()).is_some() {
            continue;
        }
        quotes.push(settle(row, stop_offs, accuracy));
    }

    // Ascending by rounded base; sentinel-valued quotes sort last.
    quotes.sort_by(|a, b| {
        let key_a = a.base.amount().unwrap_or(f64::INFINITY);
        let key_b = b.base.amount().unwrap_or(f64::INFINITY);
        key_a.partial_cmp(&key_b).unwrap_or(std::cmp::Ordering::Equal)
    });
    quotes
}

/// Apply stop-off amortization and rounding to one retained candidate.
fn settle(row: CandidateRow, stop_offs: u32, accuracy: u32) -> Quote {
    let mut base = row.base;
    let mut fuel = row.fuel;
    let mut total = row.total;

    let usable = base.is_finite() && base != 0.0 && row.miles.is_finite() && row.miles != 0.0;

    if usable {
        if stop_offs > 0 {
            let stops = stop_offs as f64;
            let rate = if row.rate_per_mile == 0.0 {
                // Flat-rated lane: derive the implied per-mile rate over the
                // line-haul miles (total miles minus the stop-off padding).
                let line_haul = row.miles - stops;
                if line_haul > 0.0 {
                    base / line_haul
                } else {
                    0.0
                }
            } else {
                row.rate_per_mile
            };
            let stop_cost = rate * stops;
            base += stop_cost;
            // Each stop bills as both a drop and a pickup.
            total += stop_cost * 2.0;
            // One mile-equivalent of fuel per request, not per stop.
            fuel += fuel / row.miles;
        }
        base = round_to(base, accuracy);
        fuel = round_to(fuel, accuracy);
        total = round_to(total, accuracy);
    }

    Quote {
        code: row.code,
        name: row.name,
        is_customer: row.is_customer,
        contact: row.contact,
        base: ChargeValue::or_sentinel(base, ChargeValue::MileageNotFound),
        fuel_charge: ChargeValue::or_sentinel(fuel, ChargeValue::Included),
        total: ChargeValue::or_sentinel(total, ChargeValue::Error),
        miles: ChargeValue::or_sentinel(row.miles, ChargeValue::MileageNotFound),
        rate_per_mile: ChargeValue::or_sentinel(row.rate_per_mile, ChargeValue::Flat),
        comments: row.note,
        error: !usable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ContactInfo;
    use approx::assert_relative_eq;

    fn candidate(code: &str, precedence: i32, base: f64) -> CandidateRow {
        CandidateRow {
            precedence,
            code: code.to_string(),
            name: format!("{code} LINES"),
            is_customer: false,
            contact: ContactInfo::default(),
            base,
            fuel: 120.0,
            total: base + 120.0,
            miles: 500.0,
            rate_per_mile: 0.0,
            note: String::new(),
        }
    }

    #[test]
    fn test_first_row_wins_per_carrier() {
        let rows = vec![
            candidate("ABCD", 2, 1000.0),
            candidate("ABCD", 5, 800.0),
            candidate("WXYZ", 4, 900.0),
        ];
        let quotes = rank_quotes(rows, 0, 2);
        assert_eq!(quotes.len(), 2);
        let abcd = quotes.iter().find(|q| q.code == "ABCD").unwrap();
        // The rank-2 row (base 1000) is retained; rank-5 discarded.
        assert_eq!(abcd.base, ChargeValue::Amount(1000.0));
    }

    #[test]
    fn test_stop_off_amortization_flat_lane() {
        let quotes = rank_quotes(vec![candidate("ABCD", 2, 1000.0)], 2, 3);
        let quote = &quotes[0];

        // Implied rate 1000/498, doubled per stop for drop + pickup.
        let rate = 1000.0 / 498.0;
        let stop_cost = rate * 2.0;
        assert_relative_eq!(
            quote.total.amount().unwrap(),
            round_to(1120.0 + stop_cost * 2.0, 3),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            quote.base.amount().unwrap(),
            round_to(1000.0 + stop_cost, 3),
            epsilon = 1e-9
        );
        // Fuel grows by one mile-equivalent.
        assert_relative_eq!(
            quote.fuel_charge.amount().unwrap(),
            round_to(120.0 + 120.0 / 500.0, 3),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_stop_off_with_explicit_rate() {
        let mut row = candidate("ABCD", 2, 1000.0);
        row.rate_per_mile = 2.5;
        let quotes = rank_quotes(vec![row], 2, 2);
        let quote = &quotes[0];
        assert_relative_eq!(quote.base.amount().unwrap(), 1005.0);
        assert_relative_eq!(quote.total.amount().unwrap(), 1130.0);
    }

    #[test]
    fn test_stop_offs_exceeding_miles_floor_to_zero() {
        let mut row = candidate("ABCD", 2, 1000.0);
        row.miles = 2.0;
        row.total = 1120.0;
        let quotes = rank_quotes(vec![row], 3, 2);
        let quote = &quotes[0];
        // Implied rate floors at zero; only the fuel mile-equivalent moves.
        assert_relative_eq!(quote.base.amount().unwrap(), 1000.0);
        assert_relative_eq!(quote.total.amount().unwrap(), 1120.0);
    }

    #[test]
    fn test_unusable_row_flags_instead_of_dropping() {
        let mut rows = vec![candidate("GOOD", 2, 700.0), candidate("BADC", 3, 0.0)];
        rows[1].fuel = 0.0;
        rows[1].total = 0.0;
        let quotes = rank_quotes(rows, 0, 2);
        assert_eq!(quotes.len(), 2);

        let bad = quotes.iter().find(|q| q.code == "BADC").unwrap();
        assert!(bad.error);
        assert_eq!(bad.base, ChargeValue::MileageNotFound);
        assert_eq!(bad.fuel_charge, ChargeValue::Included);
        assert_eq!(bad.total, ChargeValue::Error);
        assert_eq!(bad.rate_per_mile, ChargeValue::Flat);
    }

    #[test]
    fn test_sorted_ascending_by_base_with_sentinels_last() {
        let rows = vec![
            candidate("MIDD", 2, 900.0),
            candidate("NONE", 2, 0.0),
            candidate("LOWW", 2, 400.0),
            candidate("HIGH", 2, 1500.0),
        ];
        let quotes = rank_quotes(rows, 0, 2);
        let order: Vec<&str> = quotes.iter().map(|q| q.code.as_str()).collect();
        assert_eq!(order, vec!["LOWW", "MIDD", "HIGH", "NONE"]);
    }
}
