//! Engine settings.
//!
//! Loaded once from a JSON settings file, with defaults matching the
//! production configuration. Injected into the pipeline rather than read
//! from process-global state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable settings for quoting and store maintenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// Monetary rounding accuracy in decimal places (floor of 1).
    pub accuracy: u32,

    /// Message returned when a granularity code has no predicate mapping.
    pub routing_error: String,

    /// Fuel table consulted when neither the carrier profile nor the lane
    /// names one (standard traffic).
    pub default_fuel_table: String,

    /// Fuel table consulted for LTL traffic when no override exists.
    pub ltl_default_fuel_table: String,

    /// Row cap for maintenance searches over the lane table.
    pub search_row_limit: usize,
}

impl Default for RatingSettings {
    fn default() -> Self {
        RatingSettings {
            accuracy: 2,
            routing_error: "Unable to route this request. Please verify the \
                            origin and destination information."
                .to_string(),
            default_fuel_table: "*DEF".to_string(),
            ltl_default_fuel_table: "CFSC".to_string(),
            search_row_limit: 250,
        }
    }
}

impl RatingSettings {
    /// Load settings from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let settings: RatingSettings = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse settings JSON")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RatingSettings::default();
        assert_eq!(settings.accuracy, 2);
        assert_eq!(settings.default_fuel_table, "*DEF");
        assert_eq!(settings.ltl_default_fuel_table, "CFSC");
    }

    #[test]
    fn test_partial_json_falls_back() {
        let settings: RatingSettings = serde_json::from_str(r#"{"accuracy": 3}"#).unwrap();
        assert_eq!(settings.accuracy, 3);
        assert_eq!(settings.search_row_limit, 250);
    }
}
