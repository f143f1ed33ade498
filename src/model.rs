//! The model represents the static input data provided by the user.
use crate::equipment::{Catalog, EquipmentClass};
use crate::load::{LoadProfile, LoadTrajectory};
use anyhow::{Result, ensure};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Hourly facility load
    pub load: LoadProfile,
    /// Target facility load for each year, if load growth is modelled
    pub trajectory: Option<LoadTrajectory>,
    /// Equipment coefficients
    pub catalog: Catalog,
}

impl Model {
    /// Assemble a model from its parts, checking that they are consistent with one another
    pub fn new(
        model_path: &Path,
        parameters: ModelParameters,
        load: LoadProfile,
        trajectory: Option<LoadTrajectory>,
        catalog: Catalog,
    ) -> Result<Self> {
        if let Some(trajectory) = &trajectory {
            check_trajectory(&parameters.years, trajectory)?;
        }
        check_existing_equipment(&parameters, &catalog)?;

        Ok(Self {
            model_path: model_path.to_path_buf(),
            parameters,
            load,
            trajectory,
            catalog,
        })
    }

    /// Planning years
    pub fn years(&self) -> &[u32] {
        &self.parameters.years
    }
}

/// Check that the load trajectory has a value for every planning year
fn check_trajectory(years: &[u32], trajectory: &LoadTrajectory) -> Result<()> {
    for year in years {
        ensure!(
            trajectory.contains_key(year),
            "Load trajectory has no value for year {year}"
        );
    }

    Ok(())
}

/// Check that brownfield equipment fits within the catalog limits and site, and isn't disabled
fn check_existing_equipment(parameters: &ModelParameters, catalog: &Catalog) -> Result<()> {
    let mut footprint = 0.0;
    for class in EquipmentClass::iter() {
        let existing = parameters.existing.quantity(class);
        let spec = catalog.spec(class);
        ensure!(
            existing.is_finite() && existing >= 0.0,
            "Existing quantity of {class} must be a finite, non-negative number"
        );
        ensure!(
            existing <= spec.max_installed,
            "Existing quantity of {class} ({existing}) exceeds the maximum which can be installed \
            ({})",
            spec.max_installed
        );
        footprint += existing * spec.mw_per_decision_unit() * spec.land_acres_per_mw;

        if existing > 0.0 {
            for scenario in &parameters.scenarios {
                ensure!(
                    scenario.is_enabled(class),
                    "Scenario {} disables {class}, but some is already installed",
                    scenario.name
                );
            }
        }
    }

    let land = parameters.site.land_acres.value();
    ensure!(
        footprint <= land,
        "Existing equipment occupies {footprint} acres, but the site only has {land}"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model_parameters};
    use crate::scenario::Scenario;
    use crate::units::{Acres, Capacity};
    use rstest::rstest;

    #[rstest]
    fn test_check_trajectory(model_parameters: ModelParameters) {
        let trajectory: LoadTrajectory = [(2026, Capacity(10.0))].into_iter().collect();
        assert!(check_trajectory(&[2026], &trajectory).is_ok());
        assert_error!(
            check_trajectory(&model_parameters.years, &trajectory),
            "Load trajectory has no value for year 2027"
        );
    }

    #[rstest]
    fn test_check_existing_equipment_disabled(mut model_parameters: ModelParameters) {
        model_parameters.existing.n_recip = 2;
        assert!(check_existing_equipment(&model_parameters, &Catalog::default()).is_ok());

        model_parameters.scenarios = vec![Scenario {
            name: "no_recip".into(),
            recip: false,
            ..Scenario::default()
        }];
        assert_error!(
            check_existing_equipment(&model_parameters, &Catalog::default()),
            "Scenario no_recip disables recip, but some is already installed"
        );
    }

    #[rstest]
    fn test_check_existing_equipment_too_many(mut model_parameters: ModelParameters) {
        model_parameters.existing.n_turbine = 31;
        assert!(check_existing_equipment(&model_parameters, &Catalog::default()).is_err());
    }

    #[rstest]
    fn test_check_existing_equipment_land(mut model_parameters: ModelParameters) {
        model_parameters.site.land_acres = Acres(500.0);
        model_parameters.existing.solar_mw = Capacity(100.0);
        assert!(check_existing_equipment(&model_parameters, &Catalog::default()).is_ok());

        // 200 MW at 4.25 acres/MW
        model_parameters.existing.solar_mw = Capacity(200.0);
        assert_error!(
            check_existing_equipment(&model_parameters, &Catalog::default()),
            "Existing equipment occupies 850 acres, but the site only has 500"
        );
    }
}
