//! The objective of the capacity expansion program: a levelised cost of energy.
//!
//! Discounted costs (capital, fuel, grid purchases and the unserved energy penalty) less
//! discounted DR revenue are divided by the discounted energy the facility requires. The
//! denominator is fixed before solving, so curtailment can't make the result look cheaper.
use super::coefficients::Coefficients;
use super::program::Program;
use super::variables::VariableMap;
use crate::equipment::EquipmentClass;
use crate::load::HOURS_PER_YEAR;
use crate::units::Energy;
use log::warn;
use strum::IntoEnumIterator;

/// The discount factor of each year and of the year after the horizon (zero)
fn discount_factors_with_end(coefficients: &Coefficients) -> Vec<f64> {
    coefficients
        .years
        .iter()
        .map(|year| year.discount_factor.value())
        .chain([0.0])
        .collect()
}

/// Add capital costs.
///
/// Capital is spent on additions, in the year they are made, so the cost of the installed
/// quantity `x[y]` telescopes to `rate * (df[y] - df[y + 1])`. Equipment which is already there
/// has been paid for, which gives a constant offset.
fn add_capital_costs(program: &mut Program, variables: &VariableMap, coefficients: &Coefficients) {
    let factors = discount_factors_with_end(coefficients);
    let first_factor = factors[0];

    for class in EquipmentClass::iter() {
        let rate = coefficients.catalog.spec(class).capex_per_decision_unit().value();
        for (capacity, window) in variables.capacity.iter().zip(factors.windows(2)) {
            program.add_cost(capacity.installed(class), rate * (window[0] - window[1]));
        }
        program.add_objective_offset(-rate * first_factor * coefficients.existing.quantity(class));
    }

    let connection = coefficients.prices.grid_capex.value();
    for (capacity, window) in variables.capacity.iter().zip(factors.windows(2)) {
        program.add_cost(capacity.grid_active, connection * (window[0] - window[1]));
    }
    if coefficients.existing.grid_mw.value() > 0.0 {
        program.add_objective_offset(-connection * first_factor);
    }
}

/// Add fuel, grid purchase and unserved energy costs, and DR revenue
fn add_operating_costs(
    program: &mut Program,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let scale = coefficients.sample.scale.value();
    let prices = &coefficients.prices;
    let fuel_cost = |class: EquipmentClass| {
        coefficients.catalog.spec(class).fuel_mmbtu_per_mwh() * prices.gas_per_mmbtu
    };

    for ((year, capacity), dispatch) in coefficients
        .years
        .iter()
        .zip(&variables.capacity)
        .zip(&variables.dispatch)
    {
        let factor = year.discount_factor.value();
        for hour in dispatch {
            for class in EquipmentClass::iter().filter(|class| class.is_thermal()) {
                program.add_cost(hour.output(class), scale * fuel_cost(class) * factor);
            }
            program.add_cost(
                hour.grid_import,
                scale * prices.grid_per_mwh.value() * factor,
            );
            program.add_cost(
                hour.unserved,
                scale * prices.unserved_penalty.value() * factor,
            );
        }

        for (product, var) in &capacity.dr_capacity {
            let payment = prices.dr_payments[product].value();
            program.add_cost(*var, -(HOURS_PER_YEAR as f64) * payment * factor);
        }
    }
}

/// Add the objective to the program, returning the energy it is levelised over
pub fn add_objective(
    program: &mut Program,
    variables: &VariableMap,
    coefficients: &Coefficients,
) -> Energy {
    add_capital_costs(program, variables, coefficients);
    add_operating_costs(program, variables, coefficients);

    let mut energy = coefficients.discounted_required_energy();
    if energy <= Energy(0.0) {
        warn!("The facility requires no energy; objective will be total cost rather than LCOE");
        energy = Energy(1.0);
    }
    program.scale_objective(1.0 / energy.value());

    energy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{coefficients, model};
    use crate::model::Model;
    use crate::load::{HOURS_PER_YEAR, LoadProfile};
    use crate::optimisation::variables::add_variables;
    use crate::scenario::Scenario;
    use crate::units::Capacity;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn build(coefficients: &Coefficients) -> (Program, VariableMap, Energy) {
        let mut program = Program::default();
        let variables = add_variables(&mut program, coefficients);
        let energy = add_objective(&mut program, &variables, coefficients);
        (program, variables, energy)
    }

    #[rstest]
    fn test_capex_is_charged_once(coefficients: Coefficients) {
        let (program, variables, energy) = build(&coefficients);

        // Install one turbine in the second year and keep it
        let mut values = vec![0.0; program.columns().len()];
        for capacity in &variables.capacity[1..] {
            values[capacity.n_turbine.index()] = 1.0;
        }

        let rate = 20.0 * 1000.0 * 1300.0;
        let expected = rate * coefficients.years[1].discount_factor.value();
        assert_approx_eq!(
            f64,
            program.objective_value(&values) * energy.value(),
            expected,
            epsilon = 1e-3
        );
    }

    #[rstest]
    fn test_existing_capacity_is_sunk(mut model: Model) {
        model.parameters.existing.solar_mw = Capacity(10.0);
        model.parameters.existing.grid_mw = Capacity(5.0);
        let coefficients = Coefficients::build(&model, &Scenario::default()).unwrap();
        let (program, variables, _) = build(&coefficients);

        let mut values = vec![0.0; program.columns().len()];
        for capacity in &variables.capacity {
            values[capacity.solar_mw.index()] = 10.0;
            values[capacity.grid_mw.index()] = 5.0;
            values[capacity.grid_active.index()] = 1.0;
        }
        assert_approx_eq!(f64, program.objective_value(&values), 0.0, epsilon = 1e-9);
    }

    #[rstest]
    fn test_unserved_energy_is_penalised(coefficients: Coefficients) {
        let (program, variables, energy) = build(&coefficients);
        let hour = &variables.dispatch[0][0];
        let expected = coefficients.sample.scale.value() * 50_000.0 / energy.value();
        assert_approx_eq!(f64, program.columns()[hour.unserved.index()].cost, expected);
    }

    #[rstest]
    fn test_dr_is_revenue(coefficients: Coefficients) {
        let (program, variables, _) = build(&coefficients);
        for var in variables.capacity[0].dr_capacity.values() {
            assert!(program.columns()[var.index()].cost < 0.0);
        }
    }

    #[rstest]
    fn test_zero_energy_denominator(mut model: Model) {
        model.load = LoadProfile::new(vec![0.0; HOURS_PER_YEAR]);
        let coefficients = Coefficients::build(&model, &Scenario::default()).unwrap();
        let (_, _, energy) = build(&coefficients);
        assert_eq!(energy, Energy(1.0));
    }
}
