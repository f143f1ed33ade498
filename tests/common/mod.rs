//! Helpers for building models in memory.
#![allow(dead_code)]
use powerplan::equipment::Catalog;
use powerplan::load::{HOURS_PER_YEAR, LoadProfile, LoadTrajectory};
use powerplan::model::{Model, ModelParameters};
use powerplan::optimisation::solver::SolverOptions;
use powerplan::units::{Capacity, Dimensionless};
use std::path::Path;

/// Parameters shared by every in-memory model: one representative week keeps the programs small
const SAMPLING: &str = r#"
[sampling]
weeks = [{ name = "all_year", start_day = 0, weight = 52 }]
"#;

/// Silence logging from the CLI handlers
pub fn quiet() {
    // SAFETY: tests don't read the environment concurrently with this write
    unsafe { std::env::set_var("POWERPLAN_LOG_LEVEL", "off") };
}

/// Parse model parameters, adding the shared sampling settings
pub fn parameters(toml: &str) -> ModelParameters {
    toml::from_str(&format!("{toml}\n{SAMPLING}")).unwrap()
}

/// A load which is the same in every hour
pub fn flat_load(load_mw: f64) -> LoadProfile {
    LoadProfile::new(vec![load_mw; HOURS_PER_YEAR])
}

/// A load cycling between `low` in the night and `high` in the day
pub fn daily_load(low: f64, high: f64) -> LoadProfile {
    LoadProfile::new(
        (0..HOURS_PER_YEAR)
            .map(|hour| if (8..20).contains(&(hour % 24)) { high } else { low })
            .collect(),
    )
}

/// A trajectory with the same facility load in every year
pub fn flat_trajectory(years: &[u32], load_mw: f64) -> LoadTrajectory {
    years
        .iter()
        .map(|&year| (year, Capacity(load_mw)))
        .collect()
}

/// Build a model from its parts, using the default equipment catalog
pub fn model(
    parameters: ModelParameters,
    load: LoadProfile,
    trajectory: Option<LoadTrajectory>,
) -> Model {
    Model::new(
        Path::new("in_memory"),
        parameters,
        load,
        trajectory,
        Catalog::default(),
    )
    .unwrap()
}

/// Solver options with a tight gap, so that results don't depend on where the solver stops
pub fn solver_options() -> SolverOptions {
    SolverOptions {
        time_limit_seconds: 120.0,
        mip_gap: Dimensionless(1e-4),
        verbose: false,
    }
}
