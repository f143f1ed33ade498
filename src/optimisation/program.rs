//! A solver-independent mixed-integer linear program.
//!
//! The capacity expansion problem is assembled into a [`Program`] first, then handed to whichever
//! solver backend is available. Keeping our own copy of the program means that solutions can be
//! checked against it, whichever backend produced them.
use indexmap::IndexMap;
use std::ops::{Bound, RangeBounds};

/// A decision variable in the program.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable(usize);

impl Variable {
    /// Index of the column in the program
    pub fn index(self) -> usize {
        self.0
    }
}

/// Whether a variable may take fractional values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Any real value between the bounds
    Continuous,
    /// Integer values between the bounds
    Integer,
    /// Zero or one
    Binary,
}

/// A column of the program
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
    /// Coefficient in the objective
    pub cost: f64,
    /// Integrality
    pub kind: VariableKind,
}

/// A linear constraint `lower <= sum(coeff * var) <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Name of the constraint family the row belongs to
    pub family: &'static str,
    /// Lower bound (may be `-inf`)
    pub lower: f64,
    /// Upper bound (may be `inf`)
    pub upper: f64,
    /// Non-zero coefficients
    pub terms: Vec<(Variable, f64)>,
}

impl Row {
    /// The value of the row's linear expression for the given column values
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.0])
            .sum()
    }
}

/// A minimisation problem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    columns: Vec<Column>,
    rows: Vec<Row>,
    objective_offset: f64,
}

/// Convert a range into a pair of (possibly infinite) bounds
fn to_interval<R: RangeBounds<f64>>(bounds: R) -> (f64, f64) {
    let lower = match bounds.start_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match bounds.end_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::INFINITY,
    };

    (lower, upper)
}

impl Program {
    /// Add a column with zero cost
    pub fn add_column<R: RangeBounds<f64>>(&mut self, kind: VariableKind, bounds: R) -> Variable {
        let (lower, upper) = match kind {
            VariableKind::Binary => {
                let (lower, upper) = to_interval(bounds);
                (lower.max(0.0), upper.min(1.0))
            }
            _ => to_interval(bounds),
        };

        self.columns.push(Column {
            lower,
            upper,
            cost: 0.0,
            kind,
        });

        Variable(self.columns.len() - 1)
    }

    /// Tighten the upper bound of a column
    pub fn cap_upper(&mut self, var: Variable, upper: f64) {
        let column = &mut self.columns[var.0];
        column.upper = column.upper.min(upper);
    }

    /// Add to the objective coefficient of a column
    pub fn add_cost(&mut self, var: Variable, cost: f64) {
        self.columns[var.0].cost += cost;
    }

    /// Add a constant to the objective
    pub fn add_objective_offset(&mut self, value: f64) {
        self.objective_offset += value;
    }

    /// Multiply the whole objective by a constant factor
    pub fn scale_objective(&mut self, factor: f64) {
        for column in &mut self.columns {
            column.cost *= factor;
        }
        self.objective_offset *= factor;
    }

    /// Add a row, dropping zero coefficients
    pub fn add_row<R, I>(&mut self, family: &'static str, bounds: R, terms: I)
    where
        R: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (lower, upper) = to_interval(bounds);
        self.rows.push(Row {
            family,
            lower,
            upper,
            terms: terms.into_iter().filter(|(_, coeff)| *coeff != 0.0).collect(),
        });
    }

    /// The columns, in the order they were added
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows, in the order they were added
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Constant term of the objective
    pub fn objective_offset(&self) -> f64 {
        self.objective_offset
    }

    /// Number of rows in each constraint family, in the order the families were added
    pub fn rows_per_family(&self) -> IndexMap<&'static str, usize> {
        let mut counts = IndexMap::new();
        for row in &self.rows {
            *counts.entry(row.family).or_insert(0) += 1;
        }

        counts
    }

    /// Evaluate the objective for the given column values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective_offset
            + self
                .columns
                .iter()
                .zip(values)
                .map(|(column, value)| column.cost * value)
                .sum::<f64>()
    }

    /// The largest amount by which the given values break a bound, integrality requirement or row.
    ///
    /// Zero means the values are feasible. A wrong number of values is infinitely infeasible.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        if values.len() != self.columns.len() || values.iter().any(|value| !value.is_finite()) {
            return f64::INFINITY;
        }

        let columns = self.columns.iter().zip(values).map(|(column, &value)| {
            let bound = (column.lower - value).max(value - column.upper);
            let integrality = match column.kind {
                VariableKind::Continuous => 0.0,
                _ => (value - value.round()).abs(),
            };
            bound.max(integrality)
        });
        let rows = self.rows.iter().map(|row| {
            let activity = row.activity(values);
            (row.lower - activity).max(activity - row.upper)
        });

        columns.chain(rows).fold(0.0, f64::max)
    }
}
