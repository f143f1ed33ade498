//! Capacity expansion planning for the on-site power system of a single facility.
//!
//! A model describes the facility's load, the site limits and the equipment which can be built.
//! For each scenario, a mixed-integer program chooses what to build in each planning year and how
//! to dispatch it, and the results are ranked and written to CSV files.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod equipment;
pub mod finance;
pub mod input;
pub mod load;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod planning;
pub mod sampling;
pub mod scenario;
pub mod settings;
pub mod units;
pub mod workload;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the directory where program configuration is stored
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("powerplan");

    path
}
