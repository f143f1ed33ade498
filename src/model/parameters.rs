//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::equipment::EquipmentClass;
use crate::input::{deserialise_proportion, input_err_msg, is_sorted_and_unique, read_toml};
use crate::sampling::{
    RepresentativeWeek, SamplingMode, check_representative_weeks, default_representative_weeks,
};
use crate::scenario::Scenario;
use crate::units::{
    Acres, Capacity, Dimensionless, Energy, GasVolume, Money, MoneyPerEnergy, RampRate, Tons,
};
use crate::workload::{
    DrProduct, WorkloadType, check_workload_mix, default_dr_payments, default_flexibilities,
    default_workload_mix,
};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_discount_rate, Dimensionless, 0.08);
define_unit_param_default!(default_land_acres, Acres, 500.0);
define_unit_param_default!(default_nox_tpy, Tons, 99.0);
define_unit_param_default!(default_pue, Dimensionless, 1.25);
define_unit_param_default!(default_grid_capex, Money, 5_000_000.0);
define_unit_param_default!(default_grid_price, MoneyPerEnergy, 75.0);
define_unit_param_default!(default_curtailment_budget, Dimensionless, 0.01);
define_unit_param_default!(default_cooling_flexibility, Dimensionless, 0.25);
define_unit_param_default!(default_unserved_penalty, MoneyPerEnergy, 50_000.0);
define_unit_param_default!(default_mip_gap, Dimensionless, 0.01);
define_param_default!(default_gas_price, f64, 3.5);
define_param_default!(default_lead_time_months, u32, 60);
define_param_default!(default_asset_lifetime, u32, 20);
define_param_default!(default_time_limit, f64, 60.0);
define_param_default!(default_solver_name, String, "highs".into());
define_param_default!(default_true, bool, true);
define_param_default!(default_peak_hours, Vec<u32>, (16..=21).collect());
define_param_default!(default_profile_file, PathBuf, "load_profile.csv".into());
define_param_default!(default_scenarios, Vec<Scenario>, vec![Scenario::default()]);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Planning years, in order
    pub years: Vec<u32>,
    /// Discount rate used for all present-value calculations
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Dimensionless,
    /// Environmental, supply and reliability limits for the site
    #[serde(default)]
    pub site: SiteParameters,
    /// Where to find the load and how to interpret it
    #[serde(default)]
    pub load: LoadParameters,
    /// Share of IT load made up by each type of workload
    #[serde(default = "default_workload_mix")]
    pub workload_mix: IndexMap<WorkloadType, Dimensionless>,
    /// Grid interconnection options
    #[serde(default)]
    pub grid: GridParameters,
    /// Equipment already installed at the site
    #[serde(default)]
    pub existing: ExistingEquipment,
    /// Demand-response options
    #[serde(default)]
    pub demand_response: DemandResponseParameters,
    /// Prices and penalties
    #[serde(default)]
    pub economics: EconomicParameters,
    /// How to sample the hours of the year
    #[serde(default)]
    pub sampling: SamplingParameters,
    /// Solver options
    #[serde(default)]
    pub solver: SolverParameters,
    /// Scenarios to optimise, each independently
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<Scenario>,
}

/// Limits which apply to the site
#[derive(Debug, Deserialize, PartialEq)]
pub struct SiteParameters {
    /// Land available for solar
    #[serde(default = "default_land_acres")]
    pub land_acres: Acres,
    /// Annual NOx cap
    #[serde(default = "default_nox_tpy")]
    pub nox_tpy: Tons,
    /// Daily gas supply cap. If absent, derived from the peak load.
    pub gas_mcf_per_day: Option<GasVolume>,
    /// Annual CO2 cap. Zero or absent means no limit.
    pub co2_tpy: Option<Tons>,
    /// Required system ramp rate. If absent, derived from the peak load.
    pub min_ramp_mw_per_min: Option<RampRate>,
    /// Whether the N-1 reliability criterion must be met
    #[serde(default)]
    pub n_minus_1: bool,
}

impl Default for SiteParameters {
    fn default() -> Self {
        Self {
            land_acres: default_land_acres(),
            nox_tpy: default_nox_tpy(),
            gas_mcf_per_day: None,
            co2_tpy: None,
            min_ramp_mw_per_min: None,
            n_minus_1: false,
        }
    }
}

/// Load-related input
#[derive(Debug, Deserialize, PartialEq)]
pub struct LoadParameters {
    /// CSV file with the hourly load profile, relative to the model directory
    #[serde(default = "default_profile_file")]
    pub profile_file: PathBuf,
    /// CSV file with the target facility load for each year, relative to the model directory
    pub trajectory_file: Option<PathBuf>,
    /// Design power usage effectiveness
    #[serde(default = "default_pue")]
    pub pue: Dimensionless,
}

impl Default for LoadParameters {
    fn default() -> Self {
        Self {
            profile_file: default_profile_file(),
            trajectory_file: None,
            pue: default_pue(),
        }
    }
}

/// Grid interconnection options
#[derive(Debug, Deserialize, PartialEq)]
pub struct GridParameters {
    /// Contractual interconnection year
    pub interconnection_year: Option<u32>,
    /// Lead time to interconnect, used if no interconnection year is given
    #[serde(default = "default_lead_time_months")]
    pub lead_time_months: u32,
    /// Overrides the year from which the grid is available
    pub available_year: Option<u32>,
    /// One-off capital cost of interconnection
    #[serde(default = "default_grid_capex")]
    pub capex: Money,
    /// Price of imported electricity
    #[serde(default = "default_grid_price")]
    pub price_per_mwh: MoneyPerEnergy,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            interconnection_year: None,
            lead_time_months: default_lead_time_months(),
            available_year: None,
            capex: default_grid_capex(),
            price_per_mwh: default_grid_price(),
        }
    }
}

/// Brownfield equipment already installed at the site
#[derive(Debug, Deserialize, PartialEq, Default, Clone)]
#[serde(default)]
pub struct ExistingEquipment {
    /// Number of reciprocating engines
    pub n_recip: u32,
    /// Number of gas turbines
    pub n_turbine: u32,
    /// Battery energy capacity
    pub bess_mwh: Energy,
    /// Solar capacity
    pub solar_mw: Capacity,
    /// Grid import capacity
    pub grid_mw: Capacity,
}

impl ExistingEquipment {
    /// The installed quantity of a class, in the units the class is sized in (whole units for
    /// engines and turbines, MWh for batteries, otherwise MW)
    pub fn quantity(&self, class: EquipmentClass) -> f64 {
        match class {
            EquipmentClass::Recip => self.n_recip as f64,
            EquipmentClass::Turbine => self.n_turbine as f64,
            EquipmentClass::Battery => self.bess_mwh.value(),
            EquipmentClass::Solar => self.solar_mw.value(),
            EquipmentClass::Grid => self.grid_mw.value(),
        }
    }
}

/// Demand-response options
#[derive(Debug, Deserialize, PartialEq)]
pub struct DemandResponseParameters {
    /// Whether any load may be curtailed
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum curtailed energy over a year, as a fraction of required energy
    #[serde(default = "default_curtailment_budget")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub annual_curtailment_budget: Dimensionless,
    /// Fraction of cooling load which may be curtailed in any hour
    #[serde(default = "default_cooling_flexibility")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub cooling_flexibility: Dimensionless,
    /// Hours of the day (0-23) in which DR products are called
    #[serde(default = "default_peak_hours")]
    pub peak_hours: Vec<u32>,
    /// Payment for each DR product, per MW of capacity per hour
    #[serde(default = "default_dr_payments")]
    pub payments: IndexMap<DrProduct, MoneyPerEnergy>,
    /// Fraction of each workload's load which may be curtailed in any hour
    #[serde(default = "default_flexibilities")]
    pub flexibility: IndexMap<WorkloadType, Dimensionless>,
}

impl Default for DemandResponseParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            annual_curtailment_budget: default_curtailment_budget(),
            cooling_flexibility: default_cooling_flexibility(),
            peak_hours: default_peak_hours(),
            payments: default_dr_payments(),
            flexibility: default_flexibilities(),
        }
    }
}

/// Prices and penalties
#[derive(Debug, Deserialize, PartialEq)]
pub struct EconomicParameters {
    /// Price of gas in $/MMBtu
    #[serde(default = "default_gas_price")]
    pub gas_price_per_mmbtu: f64,
    /// Penalty applied to each MWh of unserved energy.
    ///
    /// It must dominate every other cost per MWh, without being so large that the problem
    /// becomes badly conditioned.
    #[serde(default = "default_unserved_penalty")]
    pub unserved_penalty_per_mwh: MoneyPerEnergy,
    /// Lifetime over which capital costs are annualised for reporting
    #[serde(default = "default_asset_lifetime")]
    pub asset_lifetime_years: u32,
}

impl Default for EconomicParameters {
    fn default() -> Self {
        Self {
            gas_price_per_mmbtu: default_gas_price(),
            unserved_penalty_per_mwh: default_unserved_penalty(),
            asset_lifetime_years: default_asset_lifetime(),
        }
    }
}

/// How to sample the hours of the year
#[derive(Debug, Deserialize, PartialEq)]
pub struct SamplingParameters {
    /// Sampling mode
    #[serde(default)]
    pub mode: SamplingMode,
    /// Representative weeks to use in representative mode
    #[serde(default = "default_representative_weeks")]
    pub weeks: Vec<RepresentativeWeek>,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            mode: SamplingMode::default(),
            weeks: default_representative_weeks(),
        }
    }
}

/// Solver options
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct SolverParameters {
    /// The solver to try first
    #[serde(default = "default_solver_name")]
    pub name: String,
    /// Wall-clock time limit for a single solve
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: f64,
    /// Relative optimality gap at which to stop
    #[serde(default = "default_mip_gap")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub mip_gap: Dimensionless,
    /// Whether to show solver output
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            name: default_solver_name(),
            time_limit_seconds: default_time_limit(),
            mip_gap: default_mip_gap(),
            verbose: false,
        }
    }
}

/// Check that the `years` parameter is valid
fn check_years(years: &[u32]) -> Result<()> {
    ensure!(!years.is_empty(), "`years` is empty");

    ensure!(
        is_sorted_and_unique(years),
        "`years` must be composed of unique values in order"
    );

    Ok(())
}

/// Check that the `discount_rate` parameter is valid
fn check_discount_rate(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0),
        "discount_rate must be a finite, non-negative number"
    );

    Ok(())
}

/// Check that the `pue` parameter is valid
fn check_pue(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(1.0),
        "pue must be a finite number no less than 1"
    );

    Ok(())
}

/// Check that the site limits are valid
fn check_site(site: &SiteParameters) -> Result<()> {
    ensure!(
        site.land_acres.is_finite() && site.land_acres >= Acres(0.0),
        "land_acres must be a finite, non-negative number"
    );
    ensure!(
        site.nox_tpy.is_finite() && site.nox_tpy >= Tons(0.0),
        "nox_tpy must be a finite, non-negative number"
    );
    if let Some(gas) = site.gas_mcf_per_day {
        ensure!(
            gas.is_finite() && gas >= GasVolume(0.0),
            "gas_mcf_per_day must be a finite, non-negative number"
        );
    }
    if let Some(co2) = site.co2_tpy {
        ensure!(
            co2.is_finite() && co2 >= Tons(0.0),
            "co2_tpy must be a finite, non-negative number"
        );
    }
    if let Some(ramp) = site.min_ramp_mw_per_min {
        ensure!(
            ramp.is_finite() && ramp >= RampRate(0.0),
            "min_ramp_mw_per_min must be a finite, non-negative number"
        );
    }

    Ok(())
}

/// Check that the `unserved_penalty_per_mwh` parameter is valid
fn check_unserved_penalty(value: MoneyPerEnergy) -> Result<()> {
    ensure!(
        value.is_finite() && value > MoneyPerEnergy(0.0),
        "unserved_penalty_per_mwh must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the demand-response options are valid
fn check_demand_response(dr: &DemandResponseParameters) -> Result<()> {
    ensure!(
        dr.peak_hours.iter().all(|hour| *hour < 24),
        "peak_hours must be between 0 and 23"
    );

    for (workload, flexibility) in &dr.flexibility {
        ensure!(
            (0.0..=1.0).contains(&flexibility.value()),
            "flexibility for {workload} must be between 0 and 1"
        );
    }

    for (product, payment) in &dr.payments {
        ensure!(
            payment.is_finite() && *payment >= MoneyPerEnergy(0.0),
            "payment for {product} must be a finite, non-negative number"
        );
    }

    Ok(())
}

/// Check that the `time_limit_seconds` parameter is valid
fn check_time_limit(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "time_limit_seconds must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that scenario names are present and unique
fn check_scenarios(scenarios: &[Scenario]) -> Result<()> {
    ensure!(!scenarios.is_empty(), "At least one scenario must be defined");

    let mut names = HashSet::new();
    for scenario in scenarios {
        ensure!(!scenario.name.is_empty(), "Scenario names cannot be empty");
        ensure!(
            names.insert(scenario.name.as_str()),
            "Duplicate scenario name: {}",
            scenario.name
        );
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        check_years(&self.years)?;
        check_discount_rate(self.discount_rate)?;
        check_site(&self.site)?;
        check_pue(self.load.pue)?;
        check_workload_mix(&self.workload_mix)?;
        check_demand_response(&self.demand_response)?;

        // curtailment budget, cooling flexibility and mip_gap already validated with
        // deserialise_proportion

        check_unserved_penalty(self.economics.unserved_penalty_per_mwh)?;
        ensure!(
            self.economics.gas_price_per_mmbtu.is_finite()
                && self.economics.gas_price_per_mmbtu >= 0.0,
            "gas_price_per_mmbtu must be a finite, non-negative number"
        );
        if self.sampling.mode == SamplingMode::Representative {
            check_representative_weeks(&self.sampling.weeks)?;
        }
        check_time_limit(self.solver.time_limit_seconds)?;
        check_scenarios(&self.scenarios)?;

        Ok(())
    }

    /// The names of the scenarios, comma-separated
    pub fn scenario_names(&self) -> String {
        self.scenarios.iter().map(|s| &s.name).join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fmt::Display;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Helper function to assert validation result based on expected validity
    fn assert_validation_result<T, U: Display>(
        result: Result<T>,
        expected_valid: bool,
        value: U,
        expected_error_fragment: &str,
    ) {
        if expected_valid {
            assert!(
                result.is_ok(),
                "Expected value {} to be valid, but got error: {:?}",
                value,
                result.err()
            );
        } else {
            assert!(
                result.is_err(),
                "Expected value {value} to be invalid, but it was accepted",
            );
            let error_message = result.err().unwrap().to_string();
            assert!(
                error_message.contains(expected_error_fragment),
                "Error message should mention the validation constraint, got: {error_message}",
            );
        }
    }

    #[test]
    fn test_check_years() {
        // Valid
        assert!(check_years(&[2026]).is_ok());
        assert!(check_years(&[2026, 2027]).is_ok());

        // Invalid
        assert!(check_years(&[]).is_err());
        assert!(check_years(&[2026, 2026]).is_err());
        assert!(check_years(&[2027, 2026]).is_err());
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "years = [2026, 2027]\n\n[site]\nnox_tpy = 50\nn_minus_1 = true\n\n\
                 [[scenarios]]\nname = \"btm_only\"\ngrid = false"
            )
            .unwrap();
        }

        let model_params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(model_params.years, [2026, 2027]);
        assert_eq!(model_params.site.nox_tpy, Tons(50.0));
        assert!(model_params.site.n_minus_1);
        assert_eq!(model_params.site.land_acres, default_land_acres());
        assert_eq!(model_params.load.pue, Dimensionless(1.25));
        assert_eq!(model_params.scenario_names(), "btm_only");
        assert_eq!(model_params.solver.name, "highs");
        assert_eq!(model_params.sampling.weeks.len(), 6);
    }

    #[test]
    fn test_model_params_defaults() {
        let params: ModelParameters = toml::from_str("years = [2030]").unwrap();
        assert!(params.validate().is_ok());
        assert_eq!(params.scenarios, vec![Scenario::default()]);
        assert_eq!(params.demand_response.peak_hours, (16..=21).collect_vec());
        assert_eq!(
            params.economics.unserved_penalty_per_mwh,
            MoneyPerEnergy(50_000.0)
        );
        assert_eq!(params.existing, ExistingEquipment::default());
    }

    #[test]
    fn test_bad_proportion_rejected() {
        let result = toml::from_str::<ModelParameters>(
            "years = [2030]\n[demand_response]\ncooling_flexibility = 1.5",
        );
        assert!(result.is_err());
    }

    #[rstest]
    #[case(1.0, true)] // Valid positive value
    #[case(50_000.0, true)] // Valid default value
    #[case(f64::MAX, true)] // Valid maximum finite value
    #[case(0.0, false)] // Invalid: exactly zero
    #[case(-1.0, false)] // Invalid: negative value
    #[case(f64::INFINITY, false)] // Invalid: infinite value
    #[case(f64::NAN, false)] // Invalid: NaN value
    fn test_check_unserved_penalty(#[case] value: f64, #[case] expected_valid: bool) {
        let result = check_unserved_penalty(MoneyPerEnergy::new(value));

        assert_validation_result(
            result,
            expected_valid,
            value,
            "unserved_penalty_per_mwh must be a finite number greater than zero",
        );
    }

    #[rstest]
    #[case(1.0, true)] // Valid minimum
    #[case(1.25, true)] // Valid default
    #[case(0.99, false)] // Invalid: below 1
    #[case(f64::NAN, false)] // Invalid: NaN value
    fn test_check_pue(#[case] value: f64, #[case] expected_valid: bool) {
        assert_validation_result(
            check_pue(Dimensionless(value)),
            expected_valid,
            value,
            "pue must be a finite number no less than 1",
        );
    }

    #[rstest]
    #[case(60.0, true)]
    #[case(0.1, true)]
    #[case(0.0, false)]
    #[case(-5.0, false)]
    #[case(f64::INFINITY, false)]
    fn test_check_time_limit(#[case] value: f64, #[case] expected_valid: bool) {
        assert_validation_result(
            check_time_limit(value),
            expected_valid,
            value,
            "time_limit_seconds must be a finite number greater than zero",
        );
    }

    #[test]
    fn test_check_scenarios() {
        assert!(check_scenarios(&[]).is_err());
        assert!(check_scenarios(&[Scenario::default()]).is_ok());
        assert!(check_scenarios(&[Scenario::default(), Scenario::default()]).is_err());
    }

    #[test]
    fn test_check_demand_response_peak_hours() {
        let dr = DemandResponseParameters {
            peak_hours: vec![24],
            ..Default::default()
        };
        assert!(check_demand_response(&dr).is_err());
    }
}
