//! The facility's hourly load requirement and its year-by-year growth trajectory.
use crate::units::{Capacity, Energy};
use indexmap::IndexMap;

/// Number of hours in a (non-leap) year
pub const HOURS_PER_YEAR: usize = 8760;

/// The percentile of hourly load used as the site's design peak
pub const PEAK_LOAD_PERCENTILE: f64 = 98.0;

/// An hourly load profile in MW.
///
/// Nominally this covers a whole year, but the raw profile is kept as read; it is only repaired
/// to a full year when sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile(Vec<f64>);

impl LoadProfile {
    /// Create a new load profile from hourly values in MW
    pub fn new(hourly: Vec<f64>) -> Self {
        Self(hourly)
    }

    /// The hourly values
    pub fn hourly(&self) -> &[f64] {
        &self.0
    }
}

/// Target facility load (MW) for each planning year
pub type LoadTrajectory = IndexMap<u32, Capacity>;

/// The maximum hourly value of a series
pub fn peak(values: &[f64]) -> Capacity {
    Capacity(values.iter().copied().fold(0.0, f64::max))
}

/// Total energy of a series of hourly values
pub fn total_energy(values: &[f64]) -> Energy {
    Energy(values.iter().sum())
}

/// Calculate a percentile of a series using linear interpolation between closest ranks.
///
/// Returns zero for an empty series.
pub fn percentile(values: &[f64], pct: f64) -> Capacity {
    if values.is_empty() {
        return Capacity(0.0);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Capacity(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
