//! Solver backends and the fallback chain used to pick one.
use super::OptimisationError;
use super::program::Program;
use crate::model::parameters::SolverParameters;
use crate::units::Dimensionless;
use itertools::Itertools;
use log::{info, warn};
use std::fmt;

pub mod highs;
pub mod microlp;
use highs::HighsBackend;
use microlp::MicrolpBackend;

/// Solvers tried, in order, after the one requested
const FALLBACK_SOLVERS: [&str; 2] = ["highs", "microlp"];

/// Largest bound or row violation allowed in values returned by a solver which stopped early
pub const FEASIBILITY_TOLERANCE: f64 = 1e-5;

/// Why a solver stopped
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// Proven optimal (within the optimality gap)
    Optimal,
    /// A feasible solution without a proof of optimality
    Feasible,
    /// The time limit was reached
    TimeLimit,
    /// The iteration limit was reached
    IterationLimit,
    /// No feasible solution exists
    Infeasible,
    /// The objective is unbounded (or the program is infeasible or unbounded)
    Unbounded,
    /// Any other status, as reported by the solver
    Other(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Feasible => write!(f, "feasible"),
            Self::TimeLimit => write!(f, "time_limit"),
            Self::IterationLimit => write!(f, "iteration_limit"),
            Self::Infeasible => write!(f, "infeasible"),
            Self::Unbounded => write!(f, "unbounded"),
            Self::Other(status) => write!(f, "{status}"),
        }
    }
}

/// Tuning applied to whichever solver runs
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Wall-clock limit for the solve
    pub time_limit_seconds: f64,
    /// Relative optimality gap
    pub mip_gap: Dimensionless,
    /// Whether to show the solver's own output
    pub verbose: bool,
}

impl From<&SolverParameters> for SolverOptions {
    fn from(params: &SolverParameters) -> Self {
        Self {
            time_limit_seconds: params.time_limit_seconds,
            mip_gap: params.mip_gap,
            verbose: params.verbose,
        }
    }
}

/// What a solver returned, uninterpreted
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// The backend which produced the outcome
    pub solver: &'static str,
    /// Why the solver stopped
    pub termination: Termination,
    /// Value of every column, if the solver has a solution
    pub values: Option<Vec<f64>>,
}

/// A backend could not be used
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct Unavailable {
    /// Why not
    pub reason: String,
}

/// A mixed-integer solver
pub trait SolverBackend {
    /// Identifier used to request the backend
    fn name(&self) -> &'static str;

    /// Solve the program.
    ///
    /// An error means that the backend could not be used at all; every other result, including a
    /// failure to find a solution, is an outcome.
    fn solve(&self, program: &Program, options: &SolverOptions) -> Result<SolveOutcome, Unavailable>;
}

/// A backend attempted during a solve and the reason it couldn't be used
#[derive(Debug, Clone, PartialEq)]
pub struct SolverAttempt {
    /// Requested solver identifier
    pub solver: String,
    /// Why it was unavailable
    pub reason: String,
}

impl fmt::Display for SolverAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.solver, self.reason)
    }
}

/// Look up a backend by identifier
fn find_backend(name: &str) -> Option<Box<dyn SolverBackend>> {
    match name {
        "highs" => Some(Box::new(HighsBackend)),
        "microlp" => Some(Box::new(MicrolpBackend)),
        _ => None,
    }
}

/// The solvers to try: the requested one, then the fallbacks, without repeats
pub fn solver_chain(requested: &str) -> Vec<String> {
    [requested.trim().to_ascii_lowercase()]
        .into_iter()
        .chain(FALLBACK_SOLVERS.map(String::from))
        .unique()
        .collect()
}

/// Solve the program with the first available solver in the chain starting at `requested`
pub fn solve(
    program: &Program,
    requested: &str,
    options: &SolverOptions,
) -> Result<SolveOutcome, OptimisationError> {
    let mut attempts = Vec::new();
    for name in solver_chain(requested) {
        let result = find_backend(&name)
            .ok_or_else(|| Unavailable {
                reason: "not supported".into(),
            })
            .and_then(|backend| {
                info!("Solving with {name}");
                backend.solve(program, options)
            });

        match result {
            Ok(outcome) => return Ok(outcome),
            Err(err) => {
                warn!("Solver {name} is unavailable ({err}); trying the next one");
                attempts.push(SolverAttempt {
                    solver: name,
                    reason: err.reason,
                });
            }
        }
    }

    Err(OptimisationError::NoSolverAvailable { attempts })
}

/// Keep the values reported by a solver which stopped early only if they are feasible
pub(crate) fn values_if_feasible(program: &Program, values: Vec<f64>) -> Option<Vec<f64>> {
    let violation = program.max_violation(&values);
    if violation <= FEASIBILITY_TOLERANCE {
        Some(values)
    } else {
        warn!("Discarding solver values which violate the program by {violation}");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimisation::program::VariableKind;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn options() -> SolverOptions {
        SolverOptions {
            time_limit_seconds: 10.0,
            mip_gap: Dimensionless(0.0),
            verbose: false,
        }
    }

    #[rstest]
    #[case("highs", &["highs", "microlp"])]
    #[case("microlp", &["microlp", "highs"])]
    #[case("Gurobi", &["gurobi", "highs", "microlp"])]
    fn test_solver_chain(#[case] requested: &str, #[case] expected: &[&str]) {
        assert_eq!(solver_chain(requested), expected);
    }

    #[test]
    fn test_unknown_solver_falls_back() {
        let mut program = Program::default();
        let x = program.add_column(VariableKind::Integer, 0.0..=10.0);
        program.add_cost(x, -1.0);
        program.add_row("limit", ..=3.5, [(x, 1.0)]);

        let outcome = solve(&program, "cbc", &options()).unwrap();
        assert_ne!(outcome.solver, "cbc");
        assert_eq!(outcome.termination, Termination::Optimal);
        let values = outcome.values.unwrap();
        assert_approx_eq!(f64, values[0], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_values_if_feasible() {
        let mut program = Program::default();
        let x = program.add_column(VariableKind::Continuous, 0.0..=1.0);
        program.add_row("limit", 0.5.., [(x, 1.0)]);
        assert_eq!(values_if_feasible(&program, vec![0.75]), Some(vec![0.75]));
        assert_eq!(values_if_feasible(&program, vec![0.25]), None);
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::TimeLimit.to_string(), "time_limit");
        assert_eq!(Termination::Other("Interrupted".into()).to_string(), "Interrupted");
    }
}
