//! Reading solved values back into a deployment plan and its metrics.
use super::coefficients::{Coefficients, YearCoefficients};
use super::fallback::all_unserved_plan;
use super::program::Variable;
use super::solver::{SolveOutcome, Termination};
use super::variables::{CapacityVariables, DispatchVariables};
use super::{BuiltProgram, OptimisationError};
use crate::equipment::EquipmentClass;
use crate::finance::annual_capital_cost;
use crate::load::HOURS_PER_YEAR;
use crate::units::{Capacity, Dimensionless, Energy, GasVolume, Money, MoneyPerEnergy, Tons};
use crate::workload::DrProduct;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::warn;
use strum::IntoEnumIterator;

/// Fraction of required energy which may go unserved with the load still counted as fully served
pub const FULLY_SERVED_TOLERANCE: f64 = 0.01;

/// Average power gap above which a violation is reported
const REPORTED_POWER_GAP: Capacity = Capacity(1.0);

/// Tolerance used when checking dispatch against installed capacity
const DISPATCH_TOLERANCE: f64 = 1e-6;

/// Installed equipment in one year
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentDeployment {
    /// Number of reciprocating engines
    pub n_recip: u32,
    /// Number of gas turbines
    pub n_turbine: u32,
    /// Capacity of reciprocating engines
    pub recip_mw: Capacity,
    /// Capacity of gas turbines
    pub turbine_mw: Capacity,
    /// Battery energy capacity
    pub bess_mwh: Energy,
    /// Battery power capacity
    pub bess_mw: Capacity,
    /// Solar capacity
    pub solar_mw: Capacity,
    /// Grid import capacity
    pub grid_mw: Capacity,
    /// Whether the grid is connected
    pub grid_active: bool,
    /// Capacity which can be relied on: solar derated by its capacity factor and grid counted
    /// only once connected
    pub total_capacity: Capacity,
}

impl EquipmentDeployment {
    /// Installed quantity of a class in the units it is sized in
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

/// How much of the required energy was served in one year
#[derive(Debug, Clone, PartialEq)]
pub struct PowerCoverage {
    /// Energy the facility requires over the year
    pub required_energy: Energy,
    /// Energy served (required less unserved)
    pub served_energy: Energy,
    /// Energy not served
    pub unserved_energy: Energy,
    /// Served energy as a percentage of required energy
    pub coverage_pct: f64,
    /// Average unserved power over the year
    pub power_gap: Capacity,
    /// Whether unserved energy is within tolerance
    pub is_fully_served: bool,
}

impl PowerCoverage {
    /// Coverage given annual required and unserved energy
    pub fn new(required_energy: Energy, unserved_energy: Energy) -> Self {
        let coverage_pct = if required_energy > Energy(0.0) {
            ((1.0 - unserved_energy.value() / required_energy.value()) * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };

        Self {
            required_energy,
            served_energy: Energy((required_energy - unserved_energy).value().max(0.0)),
            unserved_energy,
            coverage_pct,
            power_gap: Capacity(unserved_energy.value() / HOURS_PER_YEAR as f64),
            is_fully_served: unserved_energy.value()
                <= FULLY_SERVED_TOLERANCE * required_energy.value(),
        }
    }
}

/// Annual emissions in one year
#[derive(Debug, Clone, PartialEq)]
pub struct Emissions {
    /// NOx emitted
    pub nox: Tons,
    /// NOx cap
    pub nox_limit: Tons,
    /// NOx emitted as a percentage of the cap
    pub nox_utilisation_pct: f64,
    /// CO2 emitted
    pub co2: Tons,
    /// CO2 cap, if there is one
    pub co2_limit: Option<Tons>,
}

/// Gas use in one year
#[derive(Debug, Clone, PartialEq)]
pub struct GasUsage {
    /// Average daily gas use
    pub avg_mcf_per_day: GasVolume,
    /// Daily gas supply
    pub limit_mcf_per_day: GasVolume,
    /// Average use as a percentage of supply
    pub utilisation_pct: f64,
}

/// Dispatch in one sampled hour
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    /// Hour of the year (0-based)
    pub hour: usize,
    /// Load to be served
    pub load: Capacity,
    /// Output of reciprocating engines
    pub recip: Capacity,
    /// Output of gas turbines
    pub turbine: Capacity,
    /// Output of solar
    pub solar: Capacity,
    /// Import from the grid
    pub grid_import: Capacity,
    /// Battery charging
    pub charge: Capacity,
    /// Battery discharging
    pub discharge: Capacity,
    /// Battery state of charge at the end of the hour
    pub soc: Energy,
    /// Total curtailment of workloads and cooling
    pub curtailment: Capacity,
    /// Unserved load
    pub unserved: Capacity,
}

impl DispatchRecord {
    /// Power supplied by a class (discharge for batteries)
    pub fn output(&self, class: EquipmentClass) -> Capacity {
        match class {
            EquipmentClass::Recip => self.recip,
            EquipmentClass::Turbine => self.turbine,
            EquipmentClass::Battery => self.discharge,
            EquipmentClass::Solar => self.solar,
            EquipmentClass::Grid => self.grid_import,
        }
    }
}

/// Results for one planning year
#[derive(Debug, Clone, PartialEq)]
pub struct YearResult {
    /// Calendar year
    pub year: u32,
    /// Installed equipment
    pub deployment: EquipmentDeployment,
    /// Served and unserved energy
    pub coverage: PowerCoverage,
    /// Emissions
    pub emissions: Emissions,
    /// Gas use
    pub gas: GasUsage,
    /// Capacity sold into each DR product
    pub demand_response: IndexMap<DrProduct, Capacity>,
    /// Annual curtailed energy
    pub curtailment: Energy,
    /// Dispatch in each sampled hour
    pub dispatch: Vec<DispatchRecord>,
}

/// Costs and revenues of the plan
#[derive(Debug, Clone, PartialEq)]
pub struct Economics {
    /// Levelised cost of energy (the objective)
    pub lcoe: MoneyPerEnergy,
    /// Undiscounted capital spent over the horizon
    pub total_capex: Money,
    /// Total capex annualised over the asset lifetime
    pub annualised_capex: Money,
    /// Fuel cost in the final year
    pub annual_fuel_cost: Money,
    /// Grid purchase cost in the final year
    pub annual_grid_cost: Money,
    /// DR revenue in the final year
    pub annual_dr_revenue: Money,
}

/// An overview of the plan across all years
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    /// Last planning year
    pub final_year: u32,
    /// Equipment installed in the final year
    pub final_deployment: EquipmentDeployment,
    /// Coverage in the final year
    pub final_coverage: PowerCoverage,
    /// Years in which load is not fully served
    pub years_with_gap: Vec<u32>,
    /// First year with an active grid connection
    pub first_grid_year: Option<u32>,
}

/// The solution to one scenario.
///
/// A solution is created once per solve and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Name of the scenario
    pub scenario: String,
    /// Solver which produced the solution
    pub solver: &'static str,
    /// Why the solver stopped
    pub termination: Termination,
    /// Results for each year
    pub years: Vec<YearResult>,
    /// Overview across all years
    pub summary: PortfolioSummary,
    /// Costs and revenues
    pub economics: Economics,
    /// Human-readable descriptions of requirements not met
    pub violations: Vec<String>,
    /// 100 if the final year is fully served, otherwise its coverage percentage
    pub score: f64,
    /// Number of rows in each constraint family of the program solved
    pub rows_per_family: IndexMap<&'static str, usize>,
}

/// Check the solver's termination and take its values
fn accept(outcome: SolveOutcome) -> Result<Vec<f64>, OptimisationError> {
    let SolveOutcome {
        solver,
        termination,
        values,
    } = outcome;

    match (&termination, values) {
        (Termination::Infeasible | Termination::Unbounded, _) => {
            Err(OptimisationError::ModelDefect {
                solver,
                termination,
            })
        }
        (
            Termination::Optimal
            | Termination::Feasible
            | Termination::TimeLimit
            | Termination::IterationLimit,
            Some(values),
        ) => {
            if termination != Termination::Optimal {
                warn!("Solver {solver} stopped early ({termination}); solution may not be optimal");
            }
            Ok(values)
        }
        _ => Err(OptimisationError::NoSolution {
            solver,
            termination,
        }),
    }
}

/// Reads variable values
struct Reader<'a> {
    values: &'a [f64],
}

impl Reader<'_> {
    fn get(&self, var: Variable) -> f64 {
        self.values[var.index()]
    }

    fn count(&self, var: Variable) -> u32 {
        self.get(var).round().max(0.0) as u32
    }

    fn deployment(
        &self,
        coefficients: &Coefficients,
        year: &YearCoefficients,
        capacity: &CapacityVariables,
    ) -> EquipmentDeployment {
        let catalog = &coefficients.catalog;
        let n_recip = self.count(capacity.n_recip);
        let n_turbine = self.count(capacity.n_turbine);
        let recip_mw =
            Capacity(n_recip as f64 * catalog.spec(EquipmentClass::Recip).mw_per_decision_unit());
        let turbine_mw = Capacity(
            n_turbine as f64 * catalog.spec(EquipmentClass::Turbine).mw_per_decision_unit(),
        );
        let bess_mw = Capacity(self.get(capacity.bess_mw));
        let solar_mw = Capacity(self.get(capacity.solar_mw));
        let grid_mw = Capacity(self.get(capacity.grid_mw));
        let grid_active = self.get(capacity.grid_active) > 0.5;

        let solar_derate = catalog.spec(EquipmentClass::Solar).availability;
        let grid_counted = if year.planning_year.grid_available {
            grid_mw
        } else {
            Capacity(0.0)
        };

        EquipmentDeployment {
            n_recip,
            n_turbine,
            recip_mw,
            turbine_mw,
            bess_mwh: Energy(self.get(capacity.bess_mwh)),
            bess_mw,
            solar_mw,
            grid_mw,
            grid_active,
            total_capacity: recip_mw + turbine_mw + bess_mw + solar_mw * solar_derate + grid_counted,
        }
    }

    fn dispatch(&self, hour: usize, load: f64, vars: &DispatchVariables) -> DispatchRecord {
        DispatchRecord {
            hour,
            load: Capacity(load),
            recip: Capacity(self.get(vars.gen_recip)),
            turbine: Capacity(self.get(vars.gen_turbine)),
            solar: Capacity(self.get(vars.gen_solar)),
            grid_import: Capacity(self.get(vars.grid_import)),
            charge: Capacity(self.get(vars.charge)),
            discharge: Capacity(self.get(vars.discharge)),
            soc: Energy(self.get(vars.soc)),
            curtailment: Capacity(vars.curtailment().map(|var| self.get(var)).sum()),
            unserved: Capacity(self.get(vars.unserved)),
        }
    }
}

/// Annualised total of a per-MWh rate applied to the output of the thermal classes
fn annual_thermal_total<F>(coefficients: &Coefficients, dispatch: &[DispatchRecord], rate: F) -> f64
where
    F: Fn(EquipmentClass) -> f64,
{
    let scale = coefficients.sample.scale.value();
    let rate = &rate;
    dispatch
        .iter()
        .flat_map(|record| {
            EquipmentClass::iter()
                .filter(|class| class.is_thermal())
                .map(move |class| record.output(class).value() * rate(class))
        })
        .sum::<f64>()
        * scale
}

fn utilisation_pct(value: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        value / limit * 100.0
    } else {
        0.0
    }
}

/// Metrics for one year, given its installed equipment and dispatch
fn year_result(
    coefficients: &Coefficients,
    year: &YearCoefficients,
    deployment: EquipmentDeployment,
    demand_response: IndexMap<DrProduct, Capacity>,
    dispatch: Vec<DispatchRecord>,
) -> YearResult {
    let scale = coefficients.sample.scale.value();
    let catalog = &coefficients.catalog;
    let limits = &coefficients.limits;

    let unserved = Energy(dispatch.iter().map(|record| record.unserved.value()).sum::<f64>() * scale);
    let curtailment =
        Energy(dispatch.iter().map(|record| record.curtailment.value()).sum::<f64>() * scale);

    let nox = Tons(annual_thermal_total(coefficients, &dispatch, |class| {
        catalog.spec(class).nox_tons_per_mwh()
    }));
    let co2 = Tons(annual_thermal_total(coefficients, &dispatch, |class| {
        catalog.spec(class).co2_tons_per_mwh()
    }));
    let gas = GasVolume(
        annual_thermal_total(coefficients, &dispatch, |class| {
            catalog.spec(class).gas_mcf_per_mwh()
        }) / 365.0,
    );

    YearResult {
        year: year.planning_year.year,
        deployment,
        coverage: PowerCoverage::new(year.required_energy, unserved),
        emissions: Emissions {
            nox,
            nox_limit: limits.nox,
            nox_utilisation_pct: utilisation_pct(nox.value(), limits.nox.value()),
            co2,
            co2_limit: limits.co2,
        },
        gas: GasUsage {
            avg_mcf_per_day: gas,
            limit_mcf_per_day: limits.gas_mcf_per_day,
            utilisation_pct: utilisation_pct(gas.value(), limits.gas_mcf_per_day.value()),
        },
        demand_response,
        curtailment,
        dispatch,
    }
}

/// Undiscounted capital spent on additions over the horizon
fn total_capex(coefficients: &Coefficients, years: &[YearResult]) -> Money {
    let catalog = &coefficients.catalog;
    let existing = &coefficients.existing;
    let mut total = Money(0.0);
    let mut previous: Option<&EquipmentDeployment> = None;

    for result in years {
        let deployment = &result.deployment;
        for class in EquipmentClass::iter() {
            let before = previous.map_or(existing.quantity(class), |p| p.quantity(class));
            let added = (deployment.quantity(class) - before).max(0.0);
            total += catalog.spec(class).capex_per_decision_unit() * Dimensionless(added);
        }

        let was_connected = previous.map_or(existing.grid_mw > Capacity(0.0), |p| p.grid_active);
        if deployment.grid_active && !was_connected {
            total += coefficients.prices.grid_capex;
        }
        previous = Some(deployment);
    }

    total
}

/// Costs and revenues of the final year, plus capital over the horizon
fn economics(coefficients: &Coefficients, years: &[YearResult], lcoe: f64) -> Economics {
    let prices = &coefficients.prices;
    let scale = coefficients.sample.scale.value();
    let total_capex = total_capex(coefficients, years);

    let (annual_fuel_cost, annual_grid_cost, annual_dr_revenue) = match years.last() {
        Some(last) => {
            let fuel = annual_thermal_total(coefficients, &last.dispatch, |class| {
                coefficients.catalog.spec(class).fuel_mmbtu_per_mwh() * prices.gas_per_mmbtu
            });
            let grid = last
                .dispatch
                .iter()
                .map(|record| record.grid_import.value())
                .sum::<f64>()
                * scale
                * prices.grid_per_mwh.value();
            let dr = last
                .demand_response
                .iter()
                .map(|(product, capacity)| {
                    capacity.value() * HOURS_PER_YEAR as f64 * prices.dr_payments[product].value()
                })
                .sum();
            (Money(fuel), Money(grid), Money(dr))
        }
        None => Default::default(),
    };

    Economics {
        lcoe: MoneyPerEnergy(lcoe),
        total_capex,
        annualised_capex: annual_capital_cost(
            total_capex,
            coefficients.asset_lifetime_years,
            coefficients.discount_rate,
        ),
        annual_fuel_cost,
        annual_grid_cost,
        annual_dr_revenue,
    }
}

impl Solution {
    /// Interpret a solver's outcome.
    ///
    /// The outcome is accepted if the solver stopped with a solution, even if it is not proven
    /// optimal. If it reached a limit without one, a plan serving no load is used instead.
    /// Unserved energy is reported in the solution, never as an error.
    pub fn extract(
        coefficients: &Coefficients,
        built: &BuiltProgram,
        outcome: SolveOutcome,
    ) -> Result<Self, OptimisationError> {
        let solver = outcome.solver;
        let termination = outcome.termination.clone();
        let values = match accept(outcome) {
            Err(OptimisationError::NoSolution {
                solver,
                termination: termination @ (Termination::TimeLimit | Termination::IterationLimit),
            }) => {
                warn!("Solver {solver} stopped early ({termination}) without a solution");
                all_unserved_plan(&built.program, &built.variables, coefficients)
                    .ok_or(OptimisationError::NoSolution {
                        solver,
                        termination,
                    })?
            }
            result => result?,
        };
        let reader = Reader { values: &values };

        let years: Vec<_> = coefficients
            .years
            .iter()
            .zip(&built.variables.capacity)
            .zip(&built.variables.dispatch)
            .map(|((year, capacity), dispatch)| {
                let deployment = reader.deployment(coefficients, year, capacity);
                let demand_response = capacity
                    .dr_capacity
                    .iter()
                    .map(|(product, var)| (*product, Capacity(reader.get(*var))))
                    .collect();
                let records = coefficients
                    .sample
                    .hours
                    .iter()
                    .zip(&year.load)
                    .zip(dispatch)
                    .map(|((hour, load), vars)| reader.dispatch(*hour, *load, vars))
                    .collect();
                year_result(coefficients, year, deployment, demand_response, records)
            })
            .collect();

        let lcoe = built.program.objective_value(&values);
        let economics = economics(coefficients, &years, lcoe);
        let summary = summarise(&years);
        let mut violations = Vec::new();
        if summary.final_coverage.power_gap > REPORTED_POWER_GAP {
            violations.push(format!(
                "Power gap: {:.1} MW",
                summary.final_coverage.power_gap.value()
            ));
        }
        let score = if summary.final_coverage.is_fully_served {
            100.0
        } else {
            summary.final_coverage.coverage_pct
        };

        Ok(Self {
            scenario: coefficients.scenario.name.clone(),
            solver,
            termination,
            years,
            summary,
            economics,
            violations,
            score,
            rows_per_family: built.program.rows_per_family(),
        })
    }

    /// Results for the last planning year
    pub fn final_year(&self) -> Option<&YearResult> {
        self.years.last()
    }
}

/// Summarise the plan across years. `years` must not be empty.
fn summarise(years: &[YearResult]) -> PortfolioSummary {
    let last = &years[years.len() - 1];
    PortfolioSummary {
        final_year: last.year,
        final_deployment: last.deployment.clone(),
        final_coverage: last.coverage.clone(),
        years_with_gap: years
            .iter()
            .filter(|result| !result.coverage.is_fully_served)
            .map(|result| result.year)
            .collect(),
        first_grid_year: years
            .iter()
            .find(|result| result.deployment.grid_active)
            .map(|result| result.year),
    }
}

/// Recompute the coverage of a year outside the solver.
///
/// Unserved load in each hour is rebuilt from the year's load and the solution's dispatch using
/// the power balance, after checking that dispatch fits within the final year's equipment.
pub fn recompute_coverage(
    coefficients: &Coefficients,
    solution: &Solution,
    year_index: usize,
) -> Result<PowerCoverage> {
    let year = &coefficients.years[year_index];
    let result = &solution.years[year_index];
    let final_deployment = &solution.summary.final_deployment;
    let catalog = &coefficients.catalog;
    ensure!(
        result.dispatch.len() == year.load.len(),
        "Solution has {} dispatch records but {} sampled hours",
        result.dispatch.len(),
        year.load.len()
    );

    let mut unserved = 0.0;
    for (record, &load) in result.dispatch.iter().zip(&year.load) {
        for class in EquipmentClass::iter().filter(|class| *class != EquipmentClass::Battery) {
            let spec = catalog.spec(class);
            let available = final_deployment.quantity(class)
                * spec.mw_per_decision_unit()
                * spec.availability.value();
            ensure!(
                record.output(class).value() <= available + DISPATCH_TOLERANCE,
                "Output of {class} in hour {} exceeds final-year capacity",
                record.hour
            );
        }
        ensure!(
            record.discharge.value().max(record.charge.value())
                <= final_deployment.bess_mw.value() + DISPATCH_TOLERANCE,
            "Battery power in hour {} exceeds final-year capacity",
            record.hour
        );

        let supplied: f64 = EquipmentClass::iter()
            .map(|class| record.output(class).value())
            .sum();
        unserved += (load - record.curtailment.value() + record.charge.value() - supplied).max(0.0);
    }

    Ok(PowerCoverage::new(
        year.required_energy,
        Energy(unserved * coefficients.sample.scale.value()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{coefficients, model};
    use crate::model::Model;
    use crate::optimisation::build;
    use crate::scenario::Scenario;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// An outcome in which nothing is built and all load is unserved
    fn all_unserved(coefficients: &Coefficients, built: &BuiltProgram) -> SolveOutcome {
        let mut values = vec![0.0; built.program.columns().len()];
        for (year, dispatch) in coefficients.years.iter().zip(&built.variables.dispatch) {
            for (hour, &load) in dispatch.iter().zip(&year.load) {
                values[hour.unserved.index()] = load;
            }
        }

        SolveOutcome {
            solver: "test",
            termination: Termination::TimeLimit,
            values: Some(values),
        }
    }

    #[rstest]
    #[case(Termination::Optimal, true)]
    #[case(Termination::Feasible, true)]
    #[case(Termination::TimeLimit, true)]
    #[case(Termination::IterationLimit, true)]
    #[case(Termination::Other("Interrupted".into()), false)]
    fn test_accept(#[case] termination: Termination, #[case] accepted: bool) {
        let outcome = SolveOutcome {
            solver: "test",
            termination,
            values: Some(vec![1.0]),
        };
        assert_eq!(accept(outcome).is_ok(), accepted);
    }

    #[rstest]
    #[case(Termination::Infeasible)]
    #[case(Termination::Unbounded)]
    fn test_accept_model_defect(#[case] termination: Termination) {
        let outcome = SolveOutcome {
            solver: "test",
            termination: termination.clone(),
            values: None,
        };
        assert_eq!(
            accept(outcome),
            Err(OptimisationError::ModelDefect {
                solver: "test",
                termination
            })
        );
    }

    #[test]
    fn test_accept_time_limit_without_values() {
        let outcome = SolveOutcome {
            solver: "test",
            termination: Termination::TimeLimit,
            values: None,
        };
        assert_eq!(
            accept(outcome),
            Err(OptimisationError::NoSolution {
                solver: "test",
                termination: Termination::TimeLimit
            })
        );
    }

    #[rstest]
    #[case(100.0, 0.0, 100.0, true)]
    #[case(100.0, 1.0, 99.0, true)]
    #[case(100.0, 50.0, 50.0, false)]
    #[case(100.0, 150.0, 0.0, false)]
    #[case(0.0, 0.0, 100.0, true)]
    fn test_power_coverage(
        #[case] required: f64,
        #[case] unserved: f64,
        #[case] coverage_pct: f64,
        #[case] is_fully_served: bool,
    ) {
        let coverage = PowerCoverage::new(Energy(required), Energy(unserved));
        assert_approx_eq!(f64, coverage.coverage_pct, coverage_pct);
        assert_eq!(coverage.is_fully_served, is_fully_served);
    }

    #[rstest]
    fn test_extract_all_unserved(coefficients: Coefficients) {
        let built = build(&coefficients);
        let outcome = all_unserved(&coefficients, &built);
        let solution = Solution::extract(&coefficients, &built, outcome).unwrap();

        assert_eq!(solution.termination, Termination::TimeLimit);
        assert_eq!(solution.years.len(), 3);
        for result in &solution.years {
            assert_eq!(result.deployment.total_capacity, Capacity(0.0));
            assert_eq!(result.emissions.nox, Tons(0.0));
            assert!(!result.coverage.is_fully_served);
            assert!(result.coverage.coverage_pct < 1.0);
        }
        assert_eq!(solution.summary.years_with_gap, [2026, 2027, 2028]);
        assert_eq!(solution.summary.first_grid_year, None);
        assert_eq!(solution.violations.len(), 1);
        assert!(solution.violations[0].starts_with("Power gap: "));
        assert_eq!(solution.economics.total_capex, Money(0.0));
    }

    #[rstest]
    fn test_extract_time_limit_without_values(mut model: Model) {
        model.parameters.site.n_minus_1 = true;
        let coefficients = Coefficients::build(&model, &Scenario::default()).unwrap();
        let built = build(&coefficients);
        let outcome = SolveOutcome {
            solver: "highs",
            termination: Termination::TimeLimit,
            values: None,
        };
        let solution = Solution::extract(&coefficients, &built, outcome).unwrap();

        assert_eq!(solution.termination, Termination::TimeLimit);
        assert_eq!(solution.summary.years_with_gap, [2026, 2027, 2028]);
        for result in &solution.years {
            assert!(result.coverage.coverage_pct < 1.0);
            assert_eq!(result.emissions.nox, Tons(0.0));
        }

        // Ramp needs engines before the grid arrives
        assert!(solution.years[0].deployment.n_recip > 0);
    }

    #[rstest]
    fn test_extract_interrupted_without_values(coefficients: Coefficients) {
        let built = build(&coefficients);
        let termination = Termination::Other("Interrupted".into());
        let outcome = SolveOutcome {
            solver: "highs",
            termination: termination.clone(),
            values: None,
        };
        assert_eq!(
            Solution::extract(&coefficients, &built, outcome),
            Err(OptimisationError::NoSolution {
                solver: "highs",
                termination
            })
        );
    }

    #[rstest]
    fn test_extract_metrics(coefficients: Coefficients) {
        let built = build(&coefficients);
        let mut outcome = all_unserved(&coefficients, &built);
        let values = outcome.values.as_mut().unwrap();

        // Two turbines and a grid connection in the final year, serving 10 MW each hour
        let capacity = &built.variables.capacity[2];
        values[capacity.n_turbine.index()] = 2.0;
        values[capacity.grid_active.index()] = 1.0;
        values[capacity.grid_mw.index()] = 50.0;
        for (hour, &load) in built.variables.dispatch[2].iter().zip(&coefficients.years[2].load) {
            values[hour.gen_turbine.index()] = 10.0;
            values[hour.unserved.index()] = load - 10.0;
        }

        let solution = Solution::extract(&coefficients, &built, outcome).unwrap();
        let last = solution.final_year().unwrap();
        assert_eq!(last.deployment.n_turbine, 2);
        assert_eq!(last.deployment.turbine_mw, Capacity(40.0));
        assert_eq!(last.deployment.total_capacity, Capacity(90.0));
        assert_eq!(solution.summary.first_grid_year, Some(2028));

        let turbine = coefficients.catalog.spec(EquipmentClass::Turbine);
        let annual_mwh = 10.0 * HOURS_PER_YEAR as f64;
        assert_approx_eq!(
            f64,
            last.emissions.nox.value(),
            annual_mwh * turbine.nox_tons_per_mwh(),
            epsilon = 1e-6
        );
        assert_approx_eq!(
            f64,
            last.gas.avg_mcf_per_day.value(),
            annual_mwh * turbine.gas_mcf_per_mwh() / 365.0,
            epsilon = 1e-6
        );

        let expected_capex = 2.0 * turbine.capex_per_decision_unit().value() + 5_000_000.0;
        assert_approx_eq!(
            f64,
            solution.economics.total_capex.value(),
            expected_capex,
            epsilon = 1e-3
        );
    }

    #[rstest]
    fn test_recompute_coverage_matches(coefficients: Coefficients) {
        let built = build(&coefficients);
        let outcome = all_unserved(&coefficients, &built);
        let solution = Solution::extract(&coefficients, &built, outcome).unwrap();
        for index in 0..solution.years.len() {
            let coverage = recompute_coverage(&coefficients, &solution, index).unwrap();
            assert_approx_eq!(
                f64,
                coverage.coverage_pct,
                solution.years[index].coverage.coverage_pct,
                epsilon = 1e-9
            );
        }
    }

    #[rstest]
    fn test_recompute_coverage_checks_capacity(model: Model) {
        let coefficients = Coefficients::build(&model, &Scenario::default()).unwrap();
        let built = build(&coefficients);
        let outcome = all_unserved(&coefficients, &built);
        let mut solution = Solution::extract(&coefficients, &built, outcome).unwrap();
        solution.years[0].dispatch[0].turbine = Capacity(5.0);
        assert!(recompute_coverage(&coefficients, &solution, 0).is_err());
    }
}
