//! Code for reading the hourly load profile and the load trajectory.
use super::{input_err_msg, is_sorted_and_unique, read_csv};
use crate::load::{LoadProfile, LoadTrajectory};
use crate::units::Capacity;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, PartialEq, Deserialize)]
struct LoadRow {
    hour: u32,
    load_mw: f64,
}

#[derive(Debug, PartialEq, Deserialize)]
struct TrajectoryRow {
    year: u32,
    load_mw: f64,
}

/// Read the hourly load profile from the specified CSV file.
///
/// Rows must be in hour order. The number of rows is not checked here; profiles which do not cover
/// exactly one year are repaired when sampled.
pub fn read_load_profile(file_path: &Path) -> Result<LoadProfile> {
    let rows: Vec<LoadRow> = read_csv(file_path)?;
    read_load_profile_from_rows(rows).with_context(|| input_err_msg(file_path))
}

fn read_load_profile_from_rows(rows: Vec<LoadRow>) -> Result<LoadProfile> {
    ensure!(
        is_sorted_and_unique(rows.iter().map(|row| row.hour)),
        "Hours must be unique and in ascending order"
    );

    let hourly = rows
        .into_iter()
        .map(|row| {
            ensure!(
                row.load_mw.is_finite() && row.load_mw >= 0.0,
                "Invalid load for hour {}: must be a finite, non-negative number",
                row.hour
            );
            Ok(row.load_mw)
        })
        .collect::<Result<_>>()?;

    Ok(LoadProfile::new(hourly))
}

/// Read the year-by-year target facility load from the specified CSV file.
pub fn read_load_trajectory(file_path: &Path) -> Result<LoadTrajectory> {
    let rows: Vec<TrajectoryRow> = read_csv(file_path)?;
    read_load_trajectory_from_rows(rows).with_context(|| input_err_msg(file_path))
}

fn read_load_trajectory_from_rows(rows: Vec<TrajectoryRow>) -> Result<LoadTrajectory> {
    ensure!(
        is_sorted_and_unique(rows.iter().map(|row| row.year)),
        "Years must be unique and in ascending order"
    );

    rows.into_iter()
        .map(|row| {
            ensure!(
                row.load_mw.is_finite() && row.load_mw >= 0.0,
                "Invalid load for year {}: must be a finite, non-negative number",
                row.year
            );
            Ok((row.year, Capacity(row.load_mw)))
        })
        .collect()
}
