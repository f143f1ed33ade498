//! Planning years and the quantities which vary from one year to the next.
use crate::load::LoadTrajectory;
use crate::model::parameters::GridParameters;
use crate::units::{Capacity, Dimensionless};
use anyhow::{Result, ensure};
use log::info;

/// A year in which capacity decisions are made
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningYear {
    /// Calendar year
    pub year: u32,
    /// Target peak facility load
    pub target_load: Capacity,
    /// Multiplier applied to the load profile's shape to reach the target load
    pub load_factor: Dimensionless,
    /// Whether the grid can be connected in this year
    pub grid_available: bool,
}

/// The first year in which the grid can be used.
///
/// An explicit override takes precedence, then the interconnection year, then the first planning
/// year plus the lead time. A site which already has a grid connection can use it from the start.
pub fn grid_available_year(grid: &GridParameters, first_year: u32, existing_grid: Capacity) -> u32 {
    let year = grid
        .available_year
        .or(grid.interconnection_year)
        .unwrap_or(first_year + grid.lead_time_months / 12);

    if existing_grid > Capacity(0.0) && year > first_year {
        info!(
            "An existing grid connection of {existing_grid} MW is available from {first_year} \
            rather than {year}"
        );
        return first_year;
    }

    year
}

/// Build the sequence of planning years.
///
/// Without a trajectory, the load profile is used unscaled in every year.
pub fn planning_years(
    years: &[u32],
    trajectory: Option<&LoadTrajectory>,
    profile_peak: Capacity,
    grid_year: u32,
) -> Result<Vec<PlanningYear>> {
    years
        .iter()
        .map(|&year| {
            let (target_load, load_factor) = match trajectory {
                Some(trajectory) => {
                    let target = *trajectory.get(&year).ok_or_else(|| {
                        anyhow::anyhow!("Load trajectory has no value for year {year}")
                    })?;
                    ensure!(
                        profile_peak > Capacity(0.0) || target == Capacity(0.0),
                        "Cannot scale an all-zero load profile to {target} MW in {year}"
                    );
                    let factor = if target == Capacity(0.0) {
                        Dimensionless(0.0)
                    } else {
                        target / profile_peak
                    };
                    (target, factor)
                }
                None => (profile_peak, Dimensionless(1.0)),
            };

            Ok(PlanningYear {
                year,
                target_load,
                load_factor,
                grid_available: year >= grid_year,
            })
        })
        .collect()
}
