//! The capacity expansion program: building it, solving it and reading back a solution.
use crate::model::Model;
use crate::scenario::Scenario;
use crate::units::Energy;
use anyhow::Result;
use itertools::Itertools;
use log::{debug, info};

pub mod coefficients;
pub mod constraints;
pub mod fallback;
pub mod objective;
pub mod program;
pub mod solution;
pub mod solver;
pub mod variables;
use coefficients::Coefficients;
use constraints::add_constraints;
use objective::add_objective;
use program::Program;
use solution::Solution;
use solver::{SolverAttempt, SolverOptions, Termination};
use variables::{VariableMap, add_variables};

/// A failure to obtain a usable solution from a solver
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimisationError {
    /// None of the solvers in the chain could be used
    #[error("No solver is available (tried {})", .attempts.iter().join("; "))]
    NoSolverAvailable {
        /// Each solver tried and why it couldn't be used
        attempts: Vec<SolverAttempt>,
    },
    /// The solver stopped without any usable values
    #[error("Solver {solver} found no solution (termination: {termination})")]
    NoSolution {
        /// The solver which ran
        solver: &'static str,
        /// Why it stopped
        termination: Termination,
    },
    /// The solver reported the program as infeasible or unbounded, which a correctly built
    /// program never is
    #[error("Solver {solver} reported the program as {termination}; this is a bug")]
    ModelDefect {
        /// The solver which ran
        solver: &'static str,
        /// Why it stopped
        termination: Termination,
    },
}

/// A program ready to solve, with the variables needed to interpret its solution
pub struct BuiltProgram {
    /// The program
    pub program: Program,
    /// Its variables
    pub variables: VariableMap,
    /// The discounted energy the objective is levelised over
    pub energy: Energy,
}

/// Build the program for the given coefficients
pub fn build(coefficients: &Coefficients) -> BuiltProgram {
    let mut program = Program::default();
    let variables = add_variables(&mut program, coefficients);
    add_constraints(&mut program, &variables, coefficients);
    let energy = add_objective(&mut program, &variables, coefficients);
    debug!(
        "Built program with {} variables and {} rows",
        program.columns().len(),
        program.rows().len()
    );

    BuiltProgram {
        program,
        variables,
        energy,
    }
}

/// Build, solve and extract the solution for one scenario of a model.
///
/// Every call builds a fresh program. If no solution can be obtained, the returned error wraps an
/// [`OptimisationError`].
pub fn optimise(
    model: &Model,
    scenario: &Scenario,
    solver_name: &str,
    options: &SolverOptions,
) -> Result<Solution> {
    let coefficients = Coefficients::build(model, scenario)?;
    let built = build(&coefficients);
    let outcome = solver::solve(&built.program, solver_name, options)?;
    let solution = Solution::extract(&coefficients, &built, outcome)?;
    info!(
        "Scenario {}: LCOE = {:.2} $/MWh, final-year coverage = {:.1}%",
        scenario.name, solution.economics.lcoe, solution.summary.final_coverage.coverage_pct
    );

    Ok(solution)
}
