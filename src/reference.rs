//! Reference data snapshot: carrier profiles, names, contacts, customers,
//! and the zip→state map.
//!
//! Built once at startup from the carrier/customer files and passed into
//! the pipeline by reference. Nothing here mutates after construction;
//! refreshing reference data means building a new snapshot.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::precedence::PrecedenceTable;

/// Which mileage figure a carrier's rates are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MileageBasis {
    Practical,
    HouseholdGoods,
}

impl MileageBasis {
    /// Store code for the basis column ("PM" practical, "HG" household-goods).
    pub fn code(&self) -> &'static str {
        match self {
            MileageBasis::Practical => "PM",
            MileageBasis::HouseholdGoods => "HG",
        }
    }
}

/// A carrier or customer rate profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierProfile {
    pub code: String,
    pub name: String,
    pub active: bool,
    pub mileage_basis: MileageBasis,
    /// Fuel table override; empty means the lane or the default decides.
    #[serde(default)]
    pub fuel_table: String,
    #[serde(default)]
    pub is_customer: bool,
}

/// Dispatch contact details for one carrier code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub extension: String,
    pub email: String,
}

/// Customer registry entry with LTL bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub code: String,
    pub name: String,
    pub is_ltl: bool,
    pub ltl_lanes: usize,
    pub has_fak: bool,
    pub std_lanes: usize,
}

/// Outcome of the LTL readiness check for a customer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LtlReadiness {
    Ready,
    NoLtlLanes,
    NoFakRange,
    NotFlagged,
    UnknownCustomer,
}

impl LtlReadiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, LtlReadiness::Ready)
    }

    /// The user-facing reason a customer cannot be quoted LTL.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            LtlReadiness::Ready => None,
            LtlReadiness::NoLtlLanes => Some("NO LTL LANES FOR THIS CUSTOMER"),
            LtlReadiness::NoFakRange => Some("NO FAK RANGE SET FOR THIS CUSTOMER"),
            LtlReadiness::NotFlagged => Some("CUSTOMER NOT FLAGGED FOR LTL"),
            LtlReadiness::UnknownCustomer => Some("INVALID CUSTOMER CODE"),
        }
    }
}

/// The process-wide read-only reference snapshot.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub precedences: PrecedenceTable,
    profiles: FxHashMap<String, CarrierProfile>,
    contacts: FxHashMap<String, ContactInfo>,
    customers: FxHashMap<String, CustomerRecord>,
    zip_states: FxHashMap<String, String>,
}

impl ReferenceData {
    pub fn new(precedences: PrecedenceTable) -> Self {
        ReferenceData {
            precedences,
            profiles: FxHashMap::default(),
            contacts: FxHashMap::default(),
            customers: FxHashMap::default(),
            zip_states: FxHashMap::default(),
        }
    }

    pub fn add_profile(&mut self, profile: CarrierProfile) {
        self.profiles.insert(profile.code.clone(), profile);
    }

    pub fn add_contact(&mut self, code: &str, contact: ContactInfo) {
        self.contacts.insert(code.to_string(), contact);
    }

    pub fn add_customer(&mut self, customer: CustomerRecord) {
        self.customers.insert(customer.code.clone(), customer);
    }

    pub fn add_zip_state(&mut self, zip3: &str, state: &str) {
        // First writer wins, matching the seeded zip file's dedup rule.
        self.zip_states
            .entry(zip3.to_string())
            .or_insert_with(|| state.to_string());
    }

    pub fn profile(&self, code: &str) -> Option<&CarrierProfile> {
        self.profiles.get(code)
    }

    /// A carrier without an active rate profile never rates.
    pub fn is_active(&self, code: &str) -> bool {
        self.profiles.get(code).map_or(false, |p| p.active)
    }

    /// Basis defaults to household-goods when no profile exists.
    pub fn mileage_basis(&self, code: &str) -> MileageBasis {
        self.profiles
            .get(code)
            .map_or(MileageBasis::HouseholdGoods, |p| p.mileage_basis)
    }

    pub fn name(&self, code: &str) -> &str {
        if let Some(profile) = self.profiles.get(code) {
            return &profile.name;
        }
        self.customers
            .get(code)
            .map_or("Unknown", |c| c.name.as_str())
    }

    pub fn contact(&self, code: &str) -> ContactInfo {
        self.contacts.get(code).cloned().unwrap_or_default()
    }

    pub fn is_customer(&self, code: &str) -> bool {
        self.customers.contains_key(code)
            || self.profiles.get(code).map_or(false, |p| p.is_customer)
    }

    pub fn customers(&self) -> impl Iterator<Item = &CustomerRecord> {
        self.customers.values()
    }

    pub fn ltl_customers(&self) -> impl Iterator<Item = &CustomerRecord> {
        self.customers.values().filter(|c| c.is_ltl)
    }

    pub fn state_for_zip3(&self, zip3: &str) -> Option<&str> {
        self.zip_states.get(zip3).map(String::as_str)
    }

    /// Whether a customer can be quoted LTL, with the blocking reason.
    pub fn ltl_ready(&self, code: &str) -> LtlReadiness {
        let Some(customer) = self.customers.get(code) else {
            return LtlReadiness::UnknownCustomer;
        };
        if !customer.is_ltl {
            return LtlReadiness::NotFlagged;
        }
        if customer.ltl_lanes == 0 {
            return LtlReadiness::NoLtlLanes;
        }
        if !customer.has_fak {
            return LtlReadiness::NoFakRange;
        }
        LtlReadiness::Ready
    }
}
