//! Specificity categories and the precedence rank table.
//!
//! Every lane is typed with one named specificity category; the table maps
//! each category to an integer rank where a lower rank means a more specific
//! lane. The table is loaded once from the lane store's precedence file and
//! injected as an immutable snapshot; refreshing it means rebuilding the
//! snapshot.

use polars::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{RatingError, Result};

/// Named specificity category of a lane definition.
///
/// `Mileage` is the fallback category for lanes banded by distance rather
/// than geography; it participates in most atoms as the least specific tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    CityStateToCityState,
    Zip6ToZip6,
    Zip6ToZip3,
    Zip3ToZip6,
    Zip3ToCityState,
    CityStateToZip3,
    CityStateToState,
    StateToCityState,
    StateToZip6,
    StateToZip3,
    Zip3ToState,
    StateToState,
    StateZip3ToStateZip3,
    Mileage,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Category::CityStateToCityState,
        Category::Zip6ToZip6,
        Category::Zip6ToZip3,
        Category::Zip3ToZip6,
        Category::Zip3ToCityState,
        Category::CityStateToZip3,
        Category::CityStateToState,
        Category::StateToCityState,
        Category::StateToZip6,
        Category::StateToZip3,
        Category::Zip3ToState,
        Category::StateToState,
        Category::StateZip3ToStateZip3,
        Category::Mileage,
    ];

    /// The description string stored in the precedence file.
    pub fn description(&self) -> &'static str {
        match self {
            Category::CityStateToCityState => "CITY,ST TO CITY,ST",
            Category::Zip6ToZip6 => "ZIP(6) TO ZIP(6)",
            Category::Zip6ToZip3 => "ZIP(6) TO ZIP(3)",
            Category::Zip3ToZip6 => "ZIP(3) TO ZIP(6)",
            Category::Zip3ToCityState => "ZIP(3) TO CITY,ST",
            Category::CityStateToZip3 => "CITY,ST TO ZIP(3)",
            Category::CityStateToState => "CITY,ST TO ST",
            Category::StateToCityState => "ST TO CITY,ST",
            Category::StateToZip6 => "ST TO ZIP(6)",
            Category::StateToZip3 => "ST TO ZIP(3)",
            Category::Zip3ToState => "ZIP(3) TO ST",
            Category::StateToState => "ST TO ST",
            Category::StateZip3ToStateZip3 => "ST,ZIP(3) TO ST,ZIP(3)",
            Category::Mileage => "MILEAGE",
        }
    }

    /// Parse a precedence-file description back into a category.
    pub fn parse(description: &str) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|cat| cat.description() == description.trim())
    }
}

/// Immutable category → rank mapping.
#[derive(Debug, Clone)]
pub struct PrecedenceTable {
    ranks: FxHashMap<Category, i32>,
    descriptions: FxHashMap<i32, &'static str>,
}

impl PrecedenceTable {
    pub fn from_pairs(entries: impl IntoIterator<Item = (Category, i32)>) -> Self {
        let ranks: FxHashMap<Category, i32> = entries.into_iter().collect();
        let descriptions = ranks
            .iter()
            .map(|(cat, rank)| (*rank, cat.description()))
            .collect();
        PrecedenceTable { ranks, descriptions }
    }

    /// Build from the precedence file's frame: `rank` (i32) + `description`.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let ranks = df.column("rank")?.i32()?;
        let descriptions = df.column("description")?.str()?;
        let mut entries = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(rank), Some(desc)) = (ranks.get(i), descriptions.get(i)) else {
                continue;
            };
            let Some(cat) = Category::parse(desc) else {
                return Err(RatingError::Persistence(format!(
                    "unknown precedence category: {desc}"
                )));
            };
            entries.push((cat, rank));
        }
        Ok(Self::from_pairs(entries))
    }

    /// The standard rank seed: more specific categories rank lower, with
    /// distance-banded lanes last.
    pub fn standard() -> Self {
        Self::from_pairs([
            (Category::Zip6ToZip6, 1),
            (Category::Zip6ToZip3, 2),
            (Category::Zip3ToZip6, 3),
            (Category::CityStateToCityState, 4),
            (Category::Zip3ToCityState, 5),
            (Category::CityStateToZip3, 6),
            (Category::StateZip3ToStateZip3, 7),
            (Category::CityStateToState, 8),
            (Category::StateToCityState, 9),
            (Category::StateToZip6, 10),
            (Category::StateToZip3, 11),
            (Category::Zip3ToState, 12),
            (Category::StateToState, 13),
            (Category::Mileage, 90),
        ])
    }

    /// Rank for a category; missing entries are a persistence-level defect.
    pub fn rank(&self, category: Category) -> Result<i32> {
        self.ranks.get(&category).copied().ok_or_else(|| {
            RatingError::Persistence(format!(
                "precedence table has no rank for category {:?}",
                category
            ))
        })
    }

    /// Description for a stored rank, for lane display in maintenance.
    pub fn describe(&self, rank: i32) -> Option<&'static str> {
        self.descriptions.get(&rank).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_round_trip() {
        for cat in Category::ALL {
            assert_eq!(Category::parse(cat.description()), Some(cat));
        }
    }

    #[test]
    fn test_from_dataframe() {
        let df = df! {
            "rank" => &[4i32, 13, 90],
            "description" => &["CITY,ST TO CITY,ST", "ST TO ST", "MILEAGE"]
        }
        .unwrap();
        let table = PrecedenceTable::from_dataframe(&df).unwrap();
        assert_eq!(table.rank(Category::CityStateToCityState).unwrap(), 4);
        assert_eq!(table.rank(Category::Mileage).unwrap(), 90);
        assert_eq!(table.describe(13), Some("ST TO ST"));
        assert!(table.rank(Category::Zip6ToZip6).is_err());
    }
}
