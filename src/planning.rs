//! Functionality for running every scenario of a model.
use crate::model::Model;
use crate::optimisation::solution::Solution;
use crate::optimisation::solver::SolverOptions;
use crate::optimisation::{OptimisationError, optimise};
use crate::output::{DataWriter, write_metadata};
use anyhow::{Result, ensure};
use log::{error, info};
use std::cmp::Ordering;
use std::path::Path;

/// A scenario's solution and its place in the ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSolution {
    /// 1 for the best scenario
    pub rank: usize,
    /// The scenario's solution
    pub solution: Solution,
}

/// Order solutions with fully served plans first, then by increasing LCOE
fn compare(a: &Solution, b: &Solution) -> Ordering {
    let served = |solution: &Solution| solution.summary.final_coverage.is_fully_served;
    served(b)
        .cmp(&served(a))
        .then_with(|| a.economics.lcoe.value().total_cmp(&b.economics.lcoe.value()))
}

/// Rank solutions, best first
pub fn rank(mut solutions: Vec<Solution>) -> Vec<RankedSolution> {
    solutions.sort_by(compare);
    solutions
        .into_iter()
        .enumerate()
        .map(|(index, solution)| RankedSolution {
            rank: index + 1,
            solution,
        })
        .collect()
}

/// Optimise every scenario of the model and rank the results.
///
/// A scenario for which the solver finds no solution is logged and left out of the ranking.
/// Running out of solvers, or every scenario failing, is an error.
pub fn solve_scenarios(
    model: &Model,
    solver_name: &str,
    options: &SolverOptions,
) -> Result<Vec<RankedSolution>> {
    let mut solutions = Vec::new();
    for scenario in &model.parameters.scenarios {
        info!("Scenario: {}", scenario.name);
        match optimise(model, scenario, solver_name, options) {
            Ok(solution) => solutions.push(solution),
            Err(err) => match err.downcast_ref::<OptimisationError>() {
                Some(OptimisationError::NoSolverAvailable { .. }) | None => return Err(err),
                Some(_) => error!("Scenario {} failed: {err}", scenario.name),
            },
        }
    }
    ensure!(!solutions.is_empty(), "No scenario could be solved");

    let ranked = rank(solutions);
    for ranked_solution in &ranked {
        let solution = &ranked_solution.solution;
        info!(
            "Rank {}: {} (LCOE {:.2} $/MWh, score {:.1})",
            ranked_solution.rank, solution.scenario, solution.economics.lcoe, solution.score
        );
    }

    Ok(ranked)
}

/// Run the model, writing results to `output_path`.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `solver_name` - The solver to try first
/// * `options` - Options passed to the solver
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. dispatch) to file
pub fn run(
    model: &Model,
    solver_name: &str,
    options: &SolverOptions,
    output_path: &Path,
    debug_model: bool,
) -> Result<Vec<RankedSolution>> {
    write_metadata(output_path, model, solver_name)?;
    let ranked = solve_scenarios(model, solver_name, options)?;

    let mut writer = DataWriter::create(output_path, debug_model)?;
    for ranked_solution in &ranked {
        writer.write_solution(ranked_solution)?;
    }
    writer.flush()?;

    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{coefficients, model};
    use crate::optimisation::build;
    use crate::optimisation::coefficients::Coefficients;
    use crate::optimisation::solver::{SolveOutcome, Termination};
    use crate::scenario::Scenario;
    use crate::units::{Dimensionless, MoneyPerEnergy};
    use rstest::rstest;

    /// A solution in which nothing is built and all load is unserved
    fn unserved_solution(coefficients: &Coefficients) -> Solution {
        let built = build(coefficients);
        let mut values = vec![0.0; built.program.columns().len()];
        for (year, dispatch) in coefficients.years.iter().zip(&built.variables.dispatch) {
            for (hour, &load) in dispatch.iter().zip(&year.load) {
                values[hour.unserved.index()] = load;
            }
        }
        let outcome = SolveOutcome {
            solver: "test",
            termination: Termination::Optimal,
            values: Some(values),
        };

        Solution::extract(coefficients, &built, outcome).unwrap()
    }

    #[rstest]
    fn test_rank(coefficients: Coefficients) {
        let base = unserved_solution(&coefficients);
        let with = |name: &str, lcoe: f64, served: bool| {
            let mut solution = base.clone();
            solution.scenario = name.into();
            solution.economics.lcoe = MoneyPerEnergy(lcoe);
            solution.summary.final_coverage.is_fully_served = served;
            solution
        };

        let ranked = rank(vec![
            with("cheap_gap", 10.0, false),
            with("dear", 90.0, true),
            with("cheap", 60.0, true),
        ]);
        let order: Vec<_> = ranked
            .iter()
            .map(|ranked| (ranked.rank, ranked.solution.scenario.as_str()))
            .collect();
        assert_eq!(order, [(1, "cheap"), (2, "dear"), (3, "cheap_gap")]);
    }

    #[rstest]
    fn test_solve_scenarios(mut model: Model) {
        model.parameters.scenarios = vec![
            Scenario::default(),
            Scenario {
                name: "no_grid".into(),
                grid: false,
                ..Scenario::default()
            },
        ];
        let options = SolverOptions {
            time_limit_seconds: 60.0,
            mip_gap: Dimensionless(0.01),
            verbose: false,
        };

        let ranked = solve_scenarios(&model, "highs", &options).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].solution.scenario, "all_technologies");
    }
}
