//! Typed match predicate: atoms, composition, and compilation.
//!
//! A quote request compiles to a single predicate: the OR of the atomic
//! geographic match clauses applicable to its granularity code, conjoined
//! with the lane-level constraints (mode, effective dates, mileage band,
//! countries, active profile). The predicate is a plain value: atoms are
//! inspectable for tests and the whole tree compiles to a polars `Expr`
//! for the lane store, so no query text is ever concatenated.
//!
//! Atom legend: `C` city, `S` state, `Z` zip. `CsZ` reads "origin
//! city+state to destination zip".

use polars::prelude::*;
use smallvec::SmallVec;

use crate::config::RatingSettings;
use crate::error::{RatingError, Result};
use crate::precedence::{Category, PrecedenceTable};
use crate::route::{Granularity, ResolvedMiles, RouteSpec};

/// The eleven atomic geographic match clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Atom {
    CsCs,
    ZZ,
    ZCs,
    CsZ,
    CsS,
    SCs,
    SZ5,
    SZ3,
    Z3S,
    SS,
    SzSz,
}

impl Atom {
    /// Precedence categories a lane may be typed with to satisfy this atom.
    pub fn categories(&self) -> &'static [Category] {
        match self {
            Atom::CsCs => &[Category::CityStateToCityState, Category::Mileage],
            Atom::ZZ => &[
                Category::Zip6ToZip6,
                Category::Zip6ToZip3,
                Category::Zip3ToZip6,
                Category::Mileage,
            ],
            Atom::ZCs => &[Category::Zip3ToCityState, Category::Mileage],
            Atom::CsZ => &[Category::CityStateToZip3, Category::Mileage],
            Atom::CsS => &[Category::CityStateToState],
            Atom::SCs => &[Category::StateToCityState],
            Atom::SZ5 => &[Category::StateToZip6, Category::Mileage],
            Atom::SZ3 => &[Category::StateToZip3, Category::Mileage],
            Atom::Z3S => &[Category::Zip3ToState, Category::Mileage],
            Atom::SS => &[Category::StateToState, Category::Mileage],
            Atom::SzSz => &[Category::StateZip3ToStateZip3, Category::Mileage],
        }
    }

    /// Build this atom's match clause for a concrete route.
    pub fn clause(&self, route: &RouteSpec, precs: &PrecedenceTable) -> Result<Clause> {
        let org = &route.origin;
        let des = &route.destination;
        let ranks = self.ranks(precs)?;
        let clause = match self {
            Atom::CsCs => Clause::All(vec![
                Clause::OriginCity(org.city.clone()),
                Clause::OriginState(org.state.clone()),
                Clause::DestCity(des.city.clone()),
                Clause::DestState(des.state.clone()),
                ranks,
            ]),
            Atom::ZZ => Clause::All(vec![
                Clause::Any(
                    zip_levels(&org.zip)
                        .into_iter()
                        .map(Clause::OriginZipCovers)
                        .collect(),
                ),
                Clause::Any(
                    zip_levels(&des.zip)
                        .into_iter()
                        .map(Clause::DestZipCovers)
                        .collect(),
                ),
                ranks,
            ]),
            Atom::ZCs => Clause::All(vec![
                Clause::OriginZipCovers(prefix(&org.zip, 3)),
                Clause::DestCity(des.city.clone()),
                Clause::DestState(des.state.clone()),
                ranks,
            ]),
            Atom::CsZ => Clause::All(vec![
                Clause::DestZipCovers(prefix(&des.zip, 3)),
                Clause::OriginCity(org.city.clone()),
                Clause::OriginState(org.state.clone()),
                ranks,
            ]),
            Atom::CsS => Clause::All(vec![
                Clause::OriginCity(org.city.clone()),
                Clause::OriginState(org.state.clone()),
                Clause::DestState(des.state.clone()),
                ranks,
            ]),
            Atom::SCs => Clause::All(vec![
                Clause::OriginState(org.state.clone()),
                Clause::DestCity(des.city.clone()),
                Clause::DestState(des.state.clone()),
                ranks,
            ]),
            Atom::SZ5 => Clause::All(vec![
                Clause::OriginState(org.state.clone()),
                Clause::DestZipCovers(prefix(&des.zip, 5)),
                ranks,
            ]),
            Atom::SZ3 => Clause::All(vec![
                Clause::OriginState(org.state.clone()),
                Clause::DestZipCovers(prefix(&des.zip, 3)),
                ranks,
            ]),
            Atom::Z3S => Clause::All(vec![
                Clause::DestState(des.state.clone()),
                Clause::OriginZipCovers(prefix(&org.zip, 3)),
                ranks,
            ]),
            Atom::SS => Clause::All(vec![
                Clause::OriginState(org.state.clone()),
                Clause::DestState(des.state.clone()),
                ranks,
            ]),
            Atom::SzSz => Clause::All(vec![
                Clause::OriginState(org.state.clone()),
                Clause::OriginZipCovers(prefix(&org.zip, 3)),
                Clause::DestState(des.state.clone()),
                Clause::DestZipCovers(prefix(&des.zip, 3)),
                ranks,
            ]),
        };
        Ok(clause)
    }

    fn ranks(&self, precs: &PrecedenceTable) -> Result<Clause> {
        let ranks: Result<Vec<i32>> = self
            .categories()
            .iter()
            .map(|cat| precs.rank(*cat))
            .collect();
        Ok(Clause::RankIn(ranks?))
    }
}

/// Zip truncation levels an input zip supports, longest first.
fn zip_levels(zip: &str) -> SmallVec<[String; 3]> {
    let mut levels = SmallVec::new();
    levels.push(zip.to_string());
    if zip.len() == 6 {
        levels.push(zip[..5].to_string());
        levels.push(zip[..3].to_string());
    } else if zip.len() == 5 {
        levels.push(zip[..3].to_string());
    }
    levels
}

fn prefix(zip: &str, len: usize) -> String {
    zip[..zip.len().min(len)].to_string()
}

/// One node of the typed match predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    All(Vec<Clause>),
    Any(Vec<Clause>),
    OriginCity(String),
    OriginState(String),
    DestCity(String),
    DestState(String),
    /// Lane's origin zip range covers the given (possibly truncated) zip.
    OriginZipCovers(String),
    /// Lane's destination zip range covers the given zip.
    DestZipCovers(String),
    /// Lane's precedence rank is one of the given values.
    RankIn(Vec<i32>),
}

impl Clause {
    /// Compile to the lane store's query form.
    pub fn to_expr(&self) -> Expr {
        match self {
            Clause::All(children) => children
                .iter()
                .map(Clause::to_expr)
                .reduce(Expr::and)
                .unwrap_or_else(|| lit(true)),
            Clause::Any(children) => children
                .iter()
                .map(Clause::to_expr)
                .reduce(Expr::or)
                .unwrap_or_else(|| lit(false)),
            Clause::OriginCity(city) => col("org_city").eq(lit(city.as_str())),
            Clause::OriginState(state) => col("org_state").eq(lit(state.as_str())),
            Clause::DestCity(city) => col("des_city").eq(lit(city.as_str())),
            Clause::DestState(state) => col("des_state").eq(lit(state.as_str())),
            Clause::OriginZipCovers(zip) => col("org_zip_from")
                .lt_eq(lit(zip.as_str()))
                .and(col("org_zip_to").gt_eq(lit(zip.as_str()))),
            Clause::DestZipCovers(zip) => col("des_zip_from")
                .lt_eq(lit(zip.as_str()))
                .and(col("des_zip_to").gt_eq(lit(zip.as_str()))),
            Clause::RankIn(ranks) => ranks
                .iter()
                .map(|rank| col("precedence").eq(lit(*rank)))
                .reduce(Expr::or)
                .unwrap_or_else(|| lit(false)),
        }
    }
}

/// Lane-level constraints applied to every atom.
#[derive(Debug, Clone)]
pub struct LaneConstraints {
    pub mode: String,
    /// Ship date in the store's numeric `YYYYMMDD` form.
    pub ship_date: i32,
    pub hhg_miles: f64,
    pub pract_miles: f64,
    pub origin_country: String,
    pub destination_country: String,
}

impl LaneConstraints {
    pub fn to_expr(&self) -> Expr {
        // Miles are basis-dependent: the carrier's rate profile decides
        // whether practical or household-goods miles apply.
        let miles = when(col("mileage_basis").eq(lit("PM")))
            .then(lit(self.pract_miles))
            .otherwise(lit(self.hhg_miles));
        let in_band = col("miles_from")
            .cast(DataType::Float64)
            .lt_eq(miles.clone())
            .and(col("miles_to").cast(DataType::Float64).gt_eq(miles));
        let unbanded = col("miles_from")
            .eq(lit(0i64))
            .and(col("miles_to").eq(lit(0i64)));

        col("mode")
            .eq(lit(self.mode.as_str()))
            .and(col("eff_from").lt_eq(lit(self.ship_date)))
            .and(col("eff_to").gt_eq(lit(self.ship_date)))
            .and(col("org_country").eq(lit(self.origin_country.as_str())))
            .and(col("des_country").eq(lit(self.destination_country.as_str())))
            .and(in_band.or(unbanded))
            .and(col("profile_active").eq(lit(true)))
    }
}

/// A fully composed, compilable match predicate.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub clause: Clause,
    pub constraints: LaneConstraints,
    /// The atoms that went into `clause`, for inspection.
    pub atoms: SmallVec<[Atom; 11]>,
}

impl Predicate {
    pub fn to_expr(&self) -> Expr {
        self.clause.to_expr().and(self.constraints.to_expr())
    }
}

/// Atoms applicable to a granularity code. `None` for unmapped codes.
fn atoms_for(code: &str, dest_zip_len: usize) -> Option<SmallVec<[Atom; 11]>> {
    use Atom::*;
    let wide_zip = dest_zip_len >= 5;
    let mut atoms: SmallVec<[Atom; 11]> = match code {
        "CSZ_CSZ" => {
            SmallVec::from_slice(&[ZZ, CsCs, ZCs, CsZ, SZ3, Z3S, SS, CsS, SCs, SzSz])
        }
        "CSZ_CS" => SmallVec::from_slice(&[CsCs, ZCs, Z3S, SS, CsS, SCs]),
        "CSZ_S" => SmallVec::from_slice(&[Z3S, SS, CsS]),
        "CSZ_Z" => SmallVec::from_slice(&[ZZ, CsZ, SZ3]),
        "CS_CSZ" => SmallVec::from_slice(&[CsCs, CsZ, SZ3, SS, CsS, SCs]),
        "CS_CS" => SmallVec::from_slice(&[CsCs, SS, CsS, SCs]),
        "CS_S" => SmallVec::from_slice(&[SS, CsS]),
        "CS_Z" => SmallVec::from_slice(&[CsZ, SZ3]),
        "S_CSZ" => SmallVec::from_slice(&[SCs, SZ3, SS]),
        "S_CS" => SmallVec::from_slice(&[SCs, SS]),
        "S_S" => SmallVec::from_slice(&[SS]),
        "S_SZ" => SmallVec::from_slice(&[SS, SZ3]),
        "SZ_S" => SmallVec::from_slice(&[SS, Z3S]),
        "S_Z" => SmallVec::from_slice(&[SZ3]),
        "Z_CSZ" => SmallVec::from_slice(&[Z3S, ZCs, ZZ]),
        "Z_CS" => SmallVec::from_slice(&[Z3S, ZCs]),
        "Z_S" => SmallVec::from_slice(&[Z3S]),
        "Z_Z" => SmallVec::from_slice(&[ZZ]),
        "SZ_SZ" => SmallVec::from_slice(&[Z3S, ZZ, SS, SZ3, SzSz]),
        _ => return None,
    };
    // The 5-digit state-to-zip atom joins whenever the destination zip is
    // wide enough and the code already matches on destination zips.
    if wide_zip
        && matches!(
            code,
            "CSZ_CSZ" | "CSZ_Z" | "CS_CSZ" | "CS_Z" | "S_CSZ" | "S_SZ" | "S_Z" | "SZ_SZ"
        )
    {
        atoms.push(SZ5);
    }
    Some(atoms)
}

/// Compose the match predicate for a classified route.
///
/// An unmapped granularity code is unreachable while the classifier stays
/// exhaustive; if it ever happens the configured routing message comes back
/// as a `Classification` error rather than a panic.
pub fn compose(
    route: &RouteSpec,
    granularity: Granularity,
    miles: &ResolvedMiles,
    precs: &PrecedenceTable,
    settings: &RatingSettings,
) -> Result<Predicate> {
    let code = granularity.code();
    let atoms = atoms_for(&code, route.destination.zip.len())
        .ok_or_else(|| RatingError::Classification(settings.routing_error.clone()))?;

    let mut branches = Vec::with_capacity(atoms.len());
    for atom in &atoms {
        branches.push(atom.clause(route, precs)?);
    }

    Ok(Predicate {
        clause: Clause::Any(branches),
        constraints: LaneConstraints {
            mode: route.mode.clone(),
            ship_date: crate::utils::yyyymmdd(route.ship_date),
            hhg_miles: miles.hhg,
            pract_miles: miles.pract,
            origin_country: route.origin.country.clone(),
            destination_country: route.destination.country.clone(),
        },
        atoms,
    })
}
