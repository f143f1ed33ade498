//! The pure-Rust microlp backend, via good_lp.
//!
//! microlp has no time limit or gap setting, so it is a fallback for small programs rather than
//! a replacement for HiGHS.
use super::{SolveOutcome, SolverBackend, SolverOptions, Unavailable};
use crate::optimisation::program::Program;

/// Solves programs with microlp
pub struct MicrolpBackend;

#[cfg(feature = "solver-microlp")]
impl SolverBackend for MicrolpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, program: &Program, options: &SolverOptions) -> Result<SolveOutcome, Unavailable> {
        use super::Termination;
        use crate::optimisation::program::VariableKind;
        use good_lp::{
            Expression, ProblemVariables, ResolutionError, Solution, SolverModel, constraint,
            microlp, variable,
        };
        use log::debug;

        debug!(
            "microlp ignores time_limit = {} and mip_gap = {}",
            options.time_limit_seconds, options.mip_gap
        );

        let mut vars = ProblemVariables::new();
        let columns: Vec<_> = program
            .columns()
            .iter()
            .map(|column| {
                let mut definition = variable();
                if column.lower.is_finite() {
                    definition = definition.min(column.lower);
                }
                if column.upper.is_finite() {
                    definition = definition.max(column.upper);
                }
                if column.kind != VariableKind::Continuous {
                    definition = definition.integer();
                }
                vars.add(definition)
            })
            .collect();

        let objective: Expression = program
            .columns()
            .iter()
            .zip(&columns)
            .filter(|(column, _)| column.cost != 0.0)
            .map(|(column, var)| column.cost * *var)
            .sum();

        let mut model = vars.minimise(objective).using(microlp);
        for row in program.rows() {
            let expr: Expression = row
                .terms
                .iter()
                .map(|(var, coeff)| *coeff * columns[var.index()])
                .sum();
            if row.lower == row.upper {
                model.add_constraint(constraint!(expr == row.lower));
                continue;
            }
            if row.lower.is_finite() {
                model.add_constraint(constraint!(expr.clone() >= row.lower));
            }
            if row.upper.is_finite() {
                model.add_constraint(constraint!(expr <= row.upper));
            }
        }

        let (termination, values) = match model.solve() {
            Ok(solution) => (
                Termination::Optimal,
                Some(columns.iter().map(|var| solution.value(*var)).collect()),
            ),
            Err(ResolutionError::Infeasible) => (Termination::Infeasible, None),
            Err(ResolutionError::Unbounded) => (Termination::Unbounded, None),
            Err(ResolutionError::Other(msg)) => (Termination::Other(msg.to_string()), None),
            Err(ResolutionError::Str(msg)) => (Termination::Other(msg), None),
        };

        Ok(SolveOutcome {
            solver: self.name(),
            termination,
            values,
        })
    }
}

#[cfg(not(feature = "solver-microlp"))]
impl SolverBackend for MicrolpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, _program: &Program, _options: &SolverOptions) -> Result<SolveOutcome, Unavailable> {
        Err(Unavailable {
            reason: "built without the solver-microlp feature".into(),
        })
    }
}
