//! The HiGHS solver backend.
use super::{SolveOutcome, SolverBackend, SolverOptions, Termination, Unavailable, values_if_feasible};
use crate::optimisation::program::{Program, VariableKind};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::debug;

/// Solves programs with HiGHS, linked into the binary
pub struct HighsBackend;

/// Convert a HiGHS model status into a termination condition
fn termination(status: HighsModelStatus) -> Termination {
    match status {
        HighsModelStatus::Optimal => Termination::Optimal,
        HighsModelStatus::ReachedTimeLimit => Termination::TimeLimit,
        HighsModelStatus::ReachedIterationLimit => Termination::IterationLimit,
        HighsModelStatus::Infeasible => Termination::Infeasible,
        HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
            Termination::Unbounded
        }
        status => Termination::Other(format!("{status:?}")),
    }
}

impl SolverBackend for HighsBackend {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn solve(&self, program: &Program, options: &SolverOptions) -> Result<SolveOutcome, Unavailable> {
        let mut problem = Problem::default();
        let columns: Vec<_> = program
            .columns()
            .iter()
            .map(|column| match column.kind {
                VariableKind::Continuous => {
                    problem.add_column(column.cost, column.lower..=column.upper)
                }
                VariableKind::Integer | VariableKind::Binary => {
                    problem.add_integer_column(column.cost, column.lower..=column.upper)
                }
            })
            .collect();
        for row in program.rows() {
            problem.add_row(
                row.lower..=row.upper,
                row.terms
                    .iter()
                    .map(|(var, coeff)| (columns[var.index()], *coeff)),
            );
        }

        let mut model = problem.optimise(Sense::Minimise);
        model.set_option("time_limit", options.time_limit_seconds);
        model.set_option("mip_rel_gap", options.mip_gap.value());
        model.set_option("output_flag", options.verbose);
        debug!(
            "HiGHS options: time_limit = {}, mip_rel_gap = {}, output_flag = {}",
            options.time_limit_seconds, options.mip_gap, options.verbose
        );

        let solved = match model.try_solve() {
            Ok(solved) => solved,
            Err(status) => {
                return Ok(SolveOutcome {
                    solver: self.name(),
                    termination: Termination::Other(format!("{status:?}")),
                    values: None,
                });
            }
        };

        let termination = termination(solved.status());
        let values = match termination {
            Termination::Optimal => Some(solved.get_solution().columns().to_vec()),
            Termination::TimeLimit | Termination::IterationLimit => {
                values_if_feasible(program, solved.get_solution().columns().to_vec())
            }
            _ => None,
        };

        Ok(SolveOutcome {
            solver: self.name(),
            termination,
            values,
        })
    }
}
