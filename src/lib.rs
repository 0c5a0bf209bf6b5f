//! Freight lane rating engine.
//!
//! Quotes freight charges for partially specified routes by matching them
//! against rate lanes defined at varying geographic granularity
//! (city+state, state, zip at 3/5/6-digit precision), resolving overlaps
//! through precedence ranks, and computing final figures with fuel
//! surcharges, stop-off amortization, minimum-charge floors, and LTL
//! freight-class discounts.
//!
//! Pipeline per request: classify → resolve miles → compose predicate →
//! query lane store → project rate/fuel → dedup/rank. The lane table lives
//! in a Polars DataFrame and predicates compile to lazy expressions, so
//! every request is a single typed query.

pub mod builder;
pub mod config;
pub mod error;
pub mod fuel;
pub mod ltl;
pub mod precedence;
pub mod predicate;
pub mod projector;
pub mod quote;
pub mod quoter;
pub mod rank;
pub mod reference;
pub mod route;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::RatingSettings;
pub use error::{RatingError, Result};
pub use fuel::{FuelBracket, FuelPricePeriod, FuelSchedule};
pub use ltl::{LtlLaneRecord, LtlProfile, LtlStore, ShipmentLine};
pub use precedence::{Category, PrecedenceTable};
pub use quote::{ChargeValue, Quote};
pub use quoter::{MileageSource, RatingEngine, StaticMileage};
pub use reference::{CarrierProfile, ContactInfo, CustomerRecord, MileageBasis, ReferenceData};
pub use route::{Endpoint, Granularity, ResolvedMiles, RouteSpec};
pub use store::{LaneRecord, LaneStore, SearchCriteria};
