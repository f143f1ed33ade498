//! The module responsible for writing output data to disk.
use crate::optimisation::solution::{Solution, YearResult};
use crate::planning::RankedSolution;
use crate::workload::DrProduct;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;
pub use metadata::write_metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "powerplan_results";

/// The output file name for equipment deployment
const DEPLOYMENT_FILE_NAME: &str = "deployment.csv";

/// The output file name for power coverage
const COVERAGE_FILE_NAME: &str = "coverage.csv";

/// The output file name for emissions
const EMISSIONS_FILE_NAME: &str = "emissions.csv";

/// The output file name for gas usage
const GAS_USAGE_FILE_NAME: &str = "gas_usage.csv";

/// The output file name for demand response capacity
const DEMAND_RESPONSE_FILE_NAME: &str = "demand_response.csv";

/// The output file name for the scenario summary
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for hourly dispatch
const DISPATCH_FILE_NAME: &str = "debug_dispatch.csv";

/// The output file name for constraint counts
const CONSTRAINTS_FILE_NAME: &str = "debug_constraints.csv";

/// Get the default output directory for the model at the specified path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// An existing, non-empty directory is only reused if `allow_overwrite` is set, in which case its
/// contents are deleted.
///
/// # Returns
///
/// Whether an existing directory's contents were deleted
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let is_empty_dir = || -> Result<bool> { Ok(fs::read_dir(output_dir)?.next().is_none()) };

    let overwrite = if output_dir.is_dir() {
        if is_empty_dir()? {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the deployment CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DeploymentRow {
    scenario: String,
    year: u32,
    n_recip: u32,
    n_turbine: u32,
    recip_mw: f64,
    turbine_mw: f64,
    bess_mwh: f64,
    bess_mw: f64,
    solar_mw: f64,
    grid_mw: f64,
    grid_active: bool,
    total_capacity_mw: f64,
}

impl DeploymentRow {
    fn new(scenario: &str, result: &YearResult) -> Self {
        let deployment = &result.deployment;
        Self {
            scenario: scenario.into(),
            year: result.year,
            n_recip: deployment.n_recip,
            n_turbine: deployment.n_turbine,
            recip_mw: deployment.recip_mw.value(),
            turbine_mw: deployment.turbine_mw.value(),
            bess_mwh: deployment.bess_mwh.value(),
            bess_mw: deployment.bess_mw.value(),
            solar_mw: deployment.solar_mw.value(),
            grid_mw: deployment.grid_mw.value(),
            grid_active: deployment.grid_active,
            total_capacity_mw: deployment.total_capacity.value(),
        }
    }
}

/// Represents a row in the coverage CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CoverageRow {
    scenario: String,
    year: u32,
    required_mwh: f64,
    served_mwh: f64,
    unserved_mwh: f64,
    coverage_pct: f64,
    power_gap_mw: f64,
    is_fully_served: bool,
}

/// Represents a row in the emissions CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EmissionsRow {
    scenario: String,
    year: u32,
    nox_tpy: f64,
    nox_limit_tpy: f64,
    nox_utilisation_pct: f64,
    co2_tpy: f64,
    co2_limit_tpy: Option<f64>,
}

/// Represents a row in the gas usage CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GasUsageRow {
    scenario: String,
    year: u32,
    avg_mcf_per_day: f64,
    limit_mcf_per_day: f64,
    utilisation_pct: f64,
}

/// Represents a row in the demand response CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DemandResponseRow {
    scenario: String,
    year: u32,
    product: DrProduct,
    capacity_mw: f64,
}

/// Represents a row in the summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    scenario: String,
    rank: usize,
    solver: String,
    termination: String,
    lcoe: f64,
    total_capex: f64,
    annualised_capex: f64,
    annual_fuel_cost: f64,
    annual_grid_cost: f64,
    annual_dr_revenue: f64,
    years_with_gap: String,
    first_grid_year: Option<u32>,
    score: f64,
    violations: String,
}

impl SummaryRow {
    fn new(ranked: &RankedSolution) -> Self {
        let solution = &ranked.solution;
        let economics = &solution.economics;
        Self {
            scenario: solution.scenario.clone(),
            rank: ranked.rank,
            solver: solution.solver.into(),
            termination: solution.termination.to_string(),
            lcoe: economics.lcoe.value(),
            total_capex: economics.total_capex.value(),
            annualised_capex: economics.annualised_capex.value(),
            annual_fuel_cost: economics.annual_fuel_cost.value(),
            annual_grid_cost: economics.annual_grid_cost.value(),
            annual_dr_revenue: economics.annual_dr_revenue.value(),
            years_with_gap: solution.summary.years_with_gap.iter().join(";"),
            first_grid_year: solution.summary.first_grid_year,
            score: solution.score,
            violations: solution.violations.join("; "),
        }
    }
}

/// Represents a row in the dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct DispatchRow {
    scenario: String,
    year: u32,
    hour: usize,
    load_mw: f64,
    recip_mw: f64,
    turbine_mw: f64,
    solar_mw: f64,
    grid_import_mw: f64,
    charge_mw: f64,
    discharge_mw: f64,
    soc_mwh: f64,
    curtailment_mw: f64,
    unserved_mw: f64,
}

/// Represents a row in the constraints CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ConstraintsRow {
    scenario: String,
    family: String,
    rows: usize,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    dispatch_writer: csv::Writer<File>,
    constraints_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            dispatch_writer: new_writer(DISPATCH_FILE_NAME)?,
            constraints_writer: new_writer(CONSTRAINTS_FILE_NAME)?,
        })
    }

    /// Write all debug info for a solution to output files
    fn write_debug_info(&mut self, solution: &Solution) -> Result<()> {
        for result in &solution.years {
            for record in &result.dispatch {
                self.dispatch_writer.serialize(DispatchRow {
                    scenario: solution.scenario.clone(),
                    year: result.year,
                    hour: record.hour,
                    load_mw: record.load.value(),
                    recip_mw: record.recip.value(),
                    turbine_mw: record.turbine.value(),
                    solar_mw: record.solar.value(),
                    grid_import_mw: record.grid_import.value(),
                    charge_mw: record.charge.value(),
                    discharge_mw: record.discharge.value(),
                    soc_mwh: record.soc.value(),
                    curtailment_mw: record.curtailment.value(),
                    unserved_mw: record.unserved.value(),
                })?;
            }
        }

        for (family, rows) in &solution.rows_per_family {
            self.constraints_writer.serialize(ConstraintsRow {
                scenario: solution.scenario.clone(),
                family: (*family).into(),
                rows: *rows,
            })?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.dispatch_writer.flush()?;
        self.constraints_writer.flush()?;

        Ok(())
    }
}

/// An object for writing solutions to file
pub struct DataWriter {
    deployment_writer: csv::Writer<File>,
    coverage_writer: csv::Writer<File>,
    emissions_writer: csv::Writer<File>,
    gas_usage_writer: csv::Writer<File>,
    demand_response_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            deployment_writer: new_writer(DEPLOYMENT_FILE_NAME)?,
            coverage_writer: new_writer(COVERAGE_FILE_NAME)?,
            emissions_writer: new_writer(EMISSIONS_FILE_NAME)?,
            gas_usage_writer: new_writer(GAS_USAGE_FILE_NAME)?,
            demand_response_writer: new_writer(DEMAND_RESPONSE_FILE_NAME)?,
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write per-year results for a solution
    fn write_years(&mut self, solution: &Solution) -> Result<()> {
        let scenario = solution.scenario.as_str();
        for result in &solution.years {
            self.deployment_writer
                .serialize(DeploymentRow::new(scenario, result))?;

            let coverage = &result.coverage;
            self.coverage_writer.serialize(CoverageRow {
                scenario: scenario.into(),
                year: result.year,
                required_mwh: coverage.required_energy.value(),
                served_mwh: coverage.served_energy.value(),
                unserved_mwh: coverage.unserved_energy.value(),
                coverage_pct: coverage.coverage_pct,
                power_gap_mw: coverage.power_gap.value(),
                is_fully_served: coverage.is_fully_served,
            })?;

            let emissions = &result.emissions;
            self.emissions_writer.serialize(EmissionsRow {
                scenario: scenario.into(),
                year: result.year,
                nox_tpy: emissions.nox.value(),
                nox_limit_tpy: emissions.nox_limit.value(),
                nox_utilisation_pct: emissions.nox_utilisation_pct,
                co2_tpy: emissions.co2.value(),
                co2_limit_tpy: emissions.co2_limit.map(|limit| limit.value()),
            })?;

            self.gas_usage_writer.serialize(GasUsageRow {
                scenario: scenario.into(),
                year: result.year,
                avg_mcf_per_day: result.gas.avg_mcf_per_day.value(),
                limit_mcf_per_day: result.gas.limit_mcf_per_day.value(),
                utilisation_pct: result.gas.utilisation_pct,
            })?;

            for (product, capacity) in &result.demand_response {
                self.demand_response_writer.serialize(DemandResponseRow {
                    scenario: scenario.into(),
                    year: result.year,
                    product: *product,
                    capacity_mw: capacity.value(),
                })?;
            }
        }

        Ok(())
    }

    /// Write a ranked solution to the CSV files
    pub fn write_solution(&mut self, ranked: &RankedSolution) -> Result<()> {
        self.write_years(&ranked.solution)?;
        self.summary_writer.serialize(SummaryRow::new(ranked))?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_debug_info(&ranked.solution)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.deployment_writer.flush()?;
        self.coverage_writer.flush()?;
        self.emissions_writer.flush()?;
        self.gas_usage_writer.flush()?;
        self.demand_response_writer.flush()?;
        self.summary_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::coefficients;
    use crate::optimisation::build;
    use crate::optimisation::coefficients::Coefficients;
    use crate::optimisation::solver::{SolveOutcome, Termination};
    use rstest::{fixture, rstest};
    use tempfile::tempdir;

    /// A ranked solution in which one turbine is built in the final year
    #[fixture]
    fn ranked(coefficients: Coefficients) -> RankedSolution {
        let built = build(&coefficients);
        let mut values = vec![0.0; built.program.columns().len()];
        values[built.variables.capacity[2].n_turbine.index()] = 1.0;
        for (year, dispatch) in coefficients.years.iter().zip(&built.variables.dispatch) {
            for (hour, &load) in dispatch.iter().zip(&year.load) {
                values[hour.unserved.index()] = load;
            }
        }
        let outcome = SolveOutcome {
            solver: "highs",
            termination: Termination::Optimal,
            values: Some(values),
        };

        RankedSolution {
            rank: 1,
            solution: Solution::extract(&coefficients, &built, outcome).unwrap(),
        }
    }

    fn read_rows<T: serde::de::DeserializeOwned>(file_path: &Path) -> Vec<T> {
        csv::Reader::from_path(file_path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[rstest]
    fn test_write_solution(ranked: RankedSolution) {
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_solution(&ranked).unwrap();
            writer.flush().unwrap();
        }

        let deployment: Vec<DeploymentRow> = read_rows(&dir.path().join(DEPLOYMENT_FILE_NAME));
        assert_eq!(deployment.len(), 3);
        assert_eq!(deployment[2], DeploymentRow::new("all_technologies", &ranked.solution.years[2]));
        assert_eq!(deployment[2].n_turbine, 1);
        assert_eq!(deployment[2].turbine_mw, 20.0);

        let coverage: Vec<CoverageRow> = read_rows(&dir.path().join(COVERAGE_FILE_NAME));
        assert!(coverage.iter().all(|row| !row.is_fully_served));

        let dr: Vec<DemandResponseRow> = read_rows(&dir.path().join(DEMAND_RESPONSE_FILE_NAME));
        assert_eq!(dr.len(), 3 * 4);
        assert_eq!(dr[0].product, DrProduct::SpinningReserve);

        let summary: Vec<SummaryRow> = read_rows(&dir.path().join(SUMMARY_FILE_NAME));
        assert_eq!(summary, [SummaryRow::new(&ranked)]);
        assert_eq!(summary[0].termination, "optimal");
        assert_eq!(summary[0].years_with_gap, "2026;2027;2028");

        assert!(!dir.path().join(DISPATCH_FILE_NAME).exists());
    }

    #[rstest]
    fn test_write_debug_info(ranked: RankedSolution) {
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer.write_solution(&ranked).unwrap();
            writer.flush().unwrap();
        }

        let dispatch: Vec<DispatchRow> = read_rows(&dir.path().join(DISPATCH_FILE_NAME));
        let hours = ranked.solution.years[0].dispatch.len();
        assert_eq!(dispatch.len(), 3 * hours);
        assert_eq!(dispatch[0].unserved_mw, dispatch[0].load_mw);

        let constraints: Vec<ConstraintsRow> = read_rows(&dir.path().join(CONSTRAINTS_FILE_NAME));
        assert_eq!(constraints.len(), ranked.solution.rows_per_family.len());
        assert_eq!(constraints[0].family, "brownfield_floor");
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New and empty directories are fine
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Non-empty ones need permission
        fs::write(output_dir.join("summary.csv"), "x").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("summary.csv").exists());
    }
}
