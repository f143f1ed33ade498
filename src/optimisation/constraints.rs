//! Constraints of the capacity expansion program.
//!
//! Constraints are grouped into families. Each family has a predicate saying whether it applies
//! to a given set of coefficients; the families which apply are added once, at build time.
use super::coefficients::{Coefficients, YearCoefficients};
use super::program::{Program, Variable};
use super::variables::{CapacityVariables, DispatchVariables, VariableMap};
use crate::equipment::EquipmentClass;
use itertools::Itertools;
use log::debug;
use strum::IntoEnumIterator;

/// Days per year, used to convert annual gas use into a daily average
const DAYS_PER_YEAR: f64 = 365.0;

/// A group of related constraints, added together if they apply
struct ConstraintFamily {
    name: &'static str,
    applies: fn(&Coefficients) -> bool,
    add: fn(&mut Program, &'static str, &VariableMap, &Coefficients),
}

fn always(_: &Coefficients) -> bool {
    true
}

fn has_co2_cap(coefficients: &Coefficients) -> bool {
    coefficients.limits.co2.is_some()
}

fn requires_n_minus_1(coefficients: &Coefficients) -> bool {
    coefficients.n_minus_1
}

/// All constraint families, in the order they are added
const FAMILIES: &[ConstraintFamily] = &[
    ConstraintFamily {
        name: "brownfield_floor",
        applies: always,
        add: add_brownfield_floors,
    },
    ConstraintFamily {
        name: "monotonic_capacity",
        applies: always,
        add: add_monotonic_capacity,
    },
    ConstraintFamily {
        name: "storage",
        applies: always,
        add: add_storage,
    },
    ConstraintFamily {
        name: "land_use",
        applies: always,
        add: add_land_use,
    },
    ConstraintFamily {
        name: "grid_gating",
        applies: always,
        add: add_grid_gating,
    },
    ConstraintFamily {
        name: "grid_timing",
        applies: always,
        add: add_grid_timing,
    },
    ConstraintFamily {
        name: "power_balance",
        applies: always,
        add: add_power_balance,
    },
    ConstraintFamily {
        name: "generation_limits",
        applies: always,
        add: add_generation_limits,
    },
    ConstraintFamily {
        name: "nox",
        applies: always,
        add: add_nox_limit,
    },
    ConstraintFamily {
        name: "gas_supply",
        applies: always,
        add: add_gas_supply,
    },
    ConstraintFamily {
        name: "co2",
        applies: has_co2_cap,
        add: add_co2_limit,
    },
    ConstraintFamily {
        name: "ramp",
        applies: always,
        add: add_ramp_capability,
    },
    ConstraintFamily {
        name: "n_minus_1",
        applies: requires_n_minus_1,
        add: add_n_minus_1,
    },
    ConstraintFamily {
        name: "curtailment",
        applies: always,
        add: add_curtailment_limits,
    },
    ConstraintFamily {
        name: "demand_response",
        applies: always,
        add: add_demand_response,
    },
];

/// Add all applicable constraints to the program
pub fn add_constraints(program: &mut Program, variables: &VariableMap, coefficients: &Coefficients) {
    for family in FAMILIES {
        if !(family.applies)(coefficients) {
            debug!("Skipping constraint family {}", family.name);
            continue;
        }

        let before = program.rows().len();
        (family.add)(program, family.name, variables, coefficients);
        debug!(
            "Added {} rows for constraint family {}",
            program.rows().len() - before,
            family.name
        );
    }
}

/// Iterate over years with their sizing variables and their hourly dispatch variables
fn iter_years<'a>(
    variables: &'a VariableMap,
    coefficients: &'a Coefficients,
) -> impl Iterator<
    Item = (
        &'a YearCoefficients,
        &'a CapacityVariables,
        &'a [DispatchVariables],
    ),
> {
    coefficients
        .years
        .iter()
        .zip(&variables.capacity)
        .zip(&variables.dispatch)
        .map(|((year, capacity), dispatch)| (year, capacity, dispatch.as_slice()))
}

/// Terms for the annual total of a per-MWh rate over thermal generation in one year
fn annual_thermal_terms<F>(
    coefficients: &Coefficients,
    dispatch: &[DispatchVariables],
    rate: F,
) -> Vec<(Variable, f64)>
where
    F: Fn(EquipmentClass) -> f64,
{
    let scale = coefficients.sample.scale.value();
    EquipmentClass::iter()
        .filter(|class| class.is_thermal())
        .cartesian_product(dispatch)
        .map(|(class, hour)| (hour.output(class), scale * rate(class)))
        .collect()
}

/// Installed quantities can't fall below what is already there
fn add_brownfield_floors(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    for capacity in &variables.capacity {
        for class in EquipmentClass::iter() {
            let existing = coefficients.existing.quantity(class);
            program.add_row(family, existing.., [(capacity.installed(class), 1.0)]);
        }
    }
}

/// Nothing is decommissioned and a grid connection, once made, is kept
fn add_monotonic_capacity(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    _coefficients: &Coefficients,
) {
    for (previous, current) in variables.capacity.iter().tuple_windows() {
        for class in EquipmentClass::iter() {
            program.add_row(
                family,
                0.0..,
                [
                    (current.installed(class), 1.0),
                    (previous.installed(class), -1.0),
                ],
            );
        }
        program.add_row(
            family,
            0.0..,
            [(current.grid_active, 1.0), (previous.grid_active, -1.0)],
        );
    }
}

/// Battery sizing, state of charge limits and storage dynamics.
///
/// The state of charge starts each year at a fixed fraction of energy capacity and must be back
/// there by the last sampled hour.
fn add_storage(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let battery = &coefficients.catalog.battery;
    let efficiency = battery.efficiency.value();
    let initial_soc = battery.initial_soc.value();

    for (_, capacity, dispatch) in iter_years(variables, coefficients) {
        let energy = capacity.bess_mwh;
        program.add_row(
            family,
            0.0..=0.0,
            [
                (capacity.bess_mw, 1.0),
                (energy, -1.0 / battery.duration_hours),
            ],
        );

        let mut previous_soc = None;
        for hour in dispatch {
            program.add_row(
                family,
                0.0..,
                [(hour.soc, 1.0), (energy, -battery.min_soc.value())],
            );
            program.add_row(family, ..=0.0, [(hour.soc, 1.0), (energy, -1.0)]);
            program.add_row(family, ..=0.0, [(hour.charge, 1.0), (capacity.bess_mw, -1.0)]);
            program.add_row(
                family,
                ..=0.0,
                [(hour.discharge, 1.0), (capacity.bess_mw, -1.0)],
            );

            let flow = [
                (hour.soc, 1.0),
                (hour.charge, -efficiency),
                (hour.discharge, 1.0 / efficiency),
            ];
            match previous_soc {
                None => program.add_row(
                    family,
                    0.0..=0.0,
                    flow.into_iter().chain([(energy, -initial_soc)]),
                ),
                Some(previous) => program.add_row(
                    family,
                    0.0..=0.0,
                    flow.into_iter().chain([(previous, -1.0)]),
                ),
            }
            previous_soc = Some(hour.soc);
        }

        if let Some(last) = previous_soc {
            program.add_row(family, 0.0.., [(last, 1.0), (energy, -initial_soc)]);
        }
    }
}

/// Land-hungry equipment must fit on the site
fn add_land_use(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let land = coefficients.limits.land.value();
    for capacity in &variables.capacity {
        let terms = coefficients.catalog.iter().map(|(class, spec)| {
            (
                capacity.installed(class),
                spec.land_acres_per_mw * spec.mw_per_decision_unit(),
            )
        });
        program.add_row(family, ..=land, terms);
    }
}

/// Grid capacity can only be built once the connection is active (Big-M)
fn add_grid_gating(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let big_m = coefficients.limits.grid_capacity.value();
    for capacity in &variables.capacity {
        program.add_row(
            family,
            ..=0.0,
            [(capacity.grid_mw, 1.0), (capacity.grid_active, -big_m)],
        );
    }
}

/// No grid before it is available
fn add_grid_timing(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    for (year, capacity, _) in iter_years(variables, coefficients) {
        if year.planning_year.grid_available {
            continue;
        }

        program.add_row(family, 0.0..=0.0, [(capacity.grid_active, 1.0)]);
        program.add_row(family, 0.0..=0.0, [(capacity.grid_mw, 1.0)]);
    }
}

/// Supply plus unserved load equals load less curtailment, plus battery charging
fn add_power_balance(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    for (year, _, dispatch) in iter_years(variables, coefficients) {
        for (hour, &load) in dispatch.iter().zip(&year.load) {
            let terms = EquipmentClass::iter()
                .map(|class| (hour.output(class), 1.0))
                .chain([(hour.unserved, 1.0), (hour.charge, -1.0)])
                .chain(hour.curtailment().map(|var| (var, 1.0)));
            program.add_row(family, load..=load, terms);
        }
    }
}

/// Output can't exceed available capacity
fn add_generation_limits(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    for (_, capacity, dispatch) in iter_years(variables, coefficients) {
        for hour in dispatch {
            // Battery output is limited by the storage constraints
            for (class, spec) in coefficients
                .catalog
                .iter()
                .filter(|(class, _)| *class != EquipmentClass::Battery)
            {
                let available = spec.mw_per_decision_unit() * spec.availability.value();
                program.add_row(
                    family,
                    ..=0.0,
                    [
                        (hour.output(class), 1.0),
                        (capacity.installed(class), -available),
                    ],
                );
            }
        }
    }
}

/// Annual NOx emissions within the cap
fn add_nox_limit(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let cap = coefficients.limits.nox.value();
    for (_, _, dispatch) in iter_years(variables, coefficients) {
        let terms = annual_thermal_terms(coefficients, dispatch, |class| {
            coefficients.catalog.spec(class).nox_tons_per_mwh()
        });
        program.add_row(family, ..=cap, terms);
    }
}

/// Average daily gas use within the supply
fn add_gas_supply(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let cap = coefficients.limits.gas_mcf_per_day.value();
    for (_, _, dispatch) in iter_years(variables, coefficients) {
        let terms = annual_thermal_terms(coefficients, dispatch, |class| {
            coefficients.catalog.spec(class).gas_mcf_per_mwh() / DAYS_PER_YEAR
        });
        program.add_row(family, ..=cap, terms);
    }
}

/// Annual CO2 emissions within the cap
fn add_co2_limit(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let Some(cap) = coefficients.limits.co2 else {
        return;
    };

    for (_, _, dispatch) in iter_years(variables, coefficients) {
        let terms = annual_thermal_terms(coefficients, dispatch, |class| {
            coefficients.catalog.spec(class).co2_tons_per_mwh()
        });
        program.add_row(family, ..=cap.value(), terms);
    }
}

/// Installed equipment must be able to ramp fast enough. An active grid connection can follow any
/// ramp.
fn add_ramp_capability(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    for (year, capacity, _) in iter_years(variables, coefficients) {
        let required = year.ramp_required.value();
        let terms = coefficients
            .catalog
            .iter()
            .filter(|(class, _)| *class != EquipmentClass::Grid)
            .map(|(class, spec)| match class {
                EquipmentClass::Battery => (capacity.bess_mw, spec.ramp_fraction_per_min),
                _ => (
                    capacity.installed(class),
                    spec.ramp_fraction_per_min * spec.mw_per_decision_unit(),
                ),
            })
            .chain([(capacity.grid_active, required)]);
        program.add_row(family, required.., terms);
    }
}

/// Firm capacity after losing the largest unit must cover the high-percentile peak
fn add_n_minus_1(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let largest_unit = coefficients.largest_unit().value();
    for (year, capacity, _) in iter_years(variables, coefficients) {
        let catalog = &coefficients.catalog;
        let terms = [
            (
                capacity.n_recip,
                catalog.spec(EquipmentClass::Recip).mw_per_decision_unit(),
            ),
            (
                capacity.n_turbine,
                catalog.spec(EquipmentClass::Turbine).mw_per_decision_unit(),
            ),
            (capacity.bess_mw, 1.0),
            (capacity.grid_mw, 1.0),
        ];
        program.add_row(
            family,
            (year.firm_capacity_required.value() + largest_unit)..,
            terms,
        );
    }
}

/// Curtailment of each load stream is limited by its flexibility, and over the year by a budget
fn add_curtailment_limits(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    let curtailment = &coefficients.curtailment;
    let scale = coefficients.sample.scale.value();

    for (year, _, dispatch) in iter_years(variables, coefficients) {
        for (hour, &load) in dispatch.iter().zip(&year.load) {
            for (workload, var) in &hour.curtail_workload {
                let fraction = curtailment.workload_fractions[workload].value();
                program.add_row(family, ..=fraction * load, [(*var, 1.0)]);
            }
            program.add_row(
                family,
                ..=curtailment.cooling_fraction.value() * load,
                [(hour.curtail_cooling, 1.0)],
            );
        }

        let budget = curtailment.budget.value() * year.required_energy.value();
        let terms = dispatch
            .iter()
            .flat_map(|hour| hour.curtailment())
            .map(|var| (var, scale));
        program.add_row(family, ..=budget, terms);
    }
}

/// Capacity sold into each DR product must be deliverable by curtailment in every peak hour
fn add_demand_response(
    program: &mut Program,
    family: &'static str,
    variables: &VariableMap,
    coefficients: &Coefficients,
) {
    for (_, capacity, dispatch) in iter_years(variables, coefficients) {
        let peak_hours = dispatch
            .iter()
            .zip(&coefficients.peak_hour)
            .filter(|(_, is_peak)| **is_peak)
            .map(|(hour, _)| hour);
        for (dr, hour) in capacity.dr_capacity.values().cartesian_product(peak_hours) {
            let terms = [(*dr, 1.0)]
                .into_iter()
                .chain(hour.curtailment().map(|var| (var, -1.0)));
            program.add_row(family, ..=0.0, terms);
        }
    }
}
