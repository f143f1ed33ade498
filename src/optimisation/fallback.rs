//! A feasible plan built without a solver, used when a solver stops before finding one.
//!
//! All load goes unserved and nothing is dispatched. Capacity is added on top of the brownfield
//! floors only where the ramp and N-1 requirements call for it, and is carried forward so that it
//! never decreases.
use super::coefficients::{Coefficients, YearCoefficients};
use super::program::Program;
use super::solver::FEASIBILITY_TOLERANCE;
use super::variables::VariableMap;
use crate::equipment::EquipmentClass;
use indexmap::IndexMap;
use log::warn;
use strum::IntoEnumIterator;

/// Installed quantities and grid connection for one year
#[derive(Debug)]
struct Installed {
    quantity: IndexMap<EquipmentClass, f64>,
    grid_active: bool,
}

impl Installed {
    fn existing(coefficients: &Coefficients) -> Self {
        let quantity: IndexMap<_, _> = EquipmentClass::iter()
            .map(|class| (class, coefficients.existing.quantity(class)))
            .collect();
        let grid_active = quantity[&EquipmentClass::Grid] > 0.0;

        Self {
            quantity,
            grid_active,
        }
    }

    /// Add enough of a class to cover `shortfall`, given what one unit of its sizing decision
    /// provides. Returns what is left uncovered.
    fn top_up(
        &mut self,
        coefficients: &Coefficients,
        class: EquipmentClass,
        per_unit: f64,
        shortfall: f64,
    ) -> f64 {
        if shortfall <= 0.0 || per_unit <= 0.0 || !coefficients.is_enabled(class) {
            return shortfall;
        }

        let spec = coefficients.catalog.spec(class);
        let mut room = spec.max_installed - self.quantity[&class];
        if class == EquipmentClass::Grid {
            room = room.min(coefficients.limits.grid_capacity.value() - self.quantity[&class]);
        }
        let mut needed = shortfall / per_unit;
        if spec.unit_capacity.is_some() {
            needed = needed.ceil();
            room = room.floor();
        }
        let added = needed.min(room).max(0.0);
        self.quantity[&class] += added;

        (shortfall - added * per_unit).max(0.0)
    }

    /// Ramp capability of the installed equipment, other than the grid
    fn ramp(&self, coefficients: &Coefficients) -> f64 {
        EquipmentClass::iter()
            .filter(|class| *class != EquipmentClass::Grid)
            .map(|class| self.quantity[&class] * ramp_per_unit(coefficients, class))
            .sum()
    }

    /// Firm capacity counted by the N-1 requirement
    fn firm(&self, coefficients: &Coefficients) -> f64 {
        EquipmentClass::iter()
            .map(|class| self.quantity[&class] * firm_per_unit(coefficients, class))
            .sum()
    }

    /// Raise installed capacity to meet one year's ramp and N-1 requirements
    fn meet_requirements(&mut self, coefficients: &Coefficients, year: &YearCoefficients) {
        if coefficients.is_enabled(EquipmentClass::Grid) && year.planning_year.grid_available {
            self.grid_active = true;
        }

        if !self.grid_active {
            let mut shortfall = year.ramp_required.value() - self.ramp(coefficients);
            for class in [
                EquipmentClass::Recip,
                EquipmentClass::Turbine,
                EquipmentClass::Battery,
            ] {
                shortfall =
                    self.top_up(coefficients, class, ramp_per_unit(coefficients, class), shortfall);
            }
        }

        if coefficients.n_minus_1 {
            let required =
                year.firm_capacity_required.value() + coefficients.largest_unit().value();
            let mut shortfall = required - self.firm(coefficients);
            let classes = if self.grid_active {
                [
                    EquipmentClass::Grid,
                    EquipmentClass::Recip,
                    EquipmentClass::Turbine,
                    EquipmentClass::Battery,
                ]
                .as_slice()
            } else {
                [
                    EquipmentClass::Recip,
                    EquipmentClass::Turbine,
                    EquipmentClass::Battery,
                ]
                .as_slice()
            };
            for class in classes {
                shortfall =
                    self.top_up(coefficients, *class, firm_per_unit(coefficients, *class), shortfall);
            }
        }
    }
}

/// Ramp capability per unit of a class's sizing decision (batteries are sized in MWh)
fn ramp_per_unit(coefficients: &Coefficients, class: EquipmentClass) -> f64 {
    let spec = coefficients.catalog.spec(class);
    match class {
        EquipmentClass::Grid => 0.0,
        EquipmentClass::Battery => {
            spec.ramp_fraction_per_min / coefficients.catalog.battery.duration_hours
        }
        _ => spec.ramp_fraction_per_min * spec.mw_per_decision_unit(),
    }
}

/// Firm capacity per unit of a class's sizing decision
fn firm_per_unit(coefficients: &Coefficients, class: EquipmentClass) -> f64 {
    let spec = coefficients.catalog.spec(class);
    match class {
        EquipmentClass::Solar => 0.0,
        EquipmentClass::Battery => 1.0 / coefficients.catalog.battery.duration_hours,
        _ => spec.mw_per_decision_unit(),
    }
}

/// Build a plan which serves no load but meets every other requirement of the program.
///
/// Returns `None` if the plan breaks a row of the program anyway, for example because the
/// capacity it needs doesn't fit on the site.
pub fn all_unserved_plan(
    program: &Program,
    variables: &VariableMap,
    coefficients: &Coefficients,
) -> Option<Vec<f64>> {
    let battery = &coefficients.catalog.battery;
    let mut values = vec![0.0; program.columns().len()];
    let mut installed = Installed::existing(coefficients);

    for ((year, capacity), dispatch) in coefficients
        .years
        .iter()
        .zip(&variables.capacity)
        .zip(&variables.dispatch)
    {
        installed.meet_requirements(coefficients, year);

        for class in EquipmentClass::iter() {
            values[capacity.installed(class).index()] = installed.quantity[&class];
        }
        let bess_mwh = installed.quantity[&EquipmentClass::Battery];
        values[capacity.bess_mw.index()] = bess_mwh / battery.duration_hours;
        values[capacity.grid_active.index()] = if installed.grid_active { 1.0 } else { 0.0 };

        let soc = battery.initial_soc.value() * bess_mwh;
        for (hour, load) in dispatch.iter().zip(&year.load) {
            values[hour.unserved.index()] = *load;
            values[hour.soc.index()] = soc;
        }
    }

    let violation = program.max_violation(&values);
    if violation > FEASIBILITY_TOLERANCE {
        warn!("Could not build a plan serving no load (violation {violation})");
        return None;
    }

    Some(values)
}
