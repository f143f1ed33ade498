//! Decision variables of the capacity expansion program.
use super::coefficients::Coefficients;
use super::program::{Program, Variable, VariableKind};
use crate::equipment::EquipmentClass;
use crate::workload::{DrProduct, WorkloadType};
use indexmap::IndexMap;

/// Sizing decisions for one planning year
#[derive(Debug, Clone)]
pub struct CapacityVariables {
    /// Number of reciprocating engines
    pub n_recip: Variable,
    /// Number of gas turbines
    pub n_turbine: Variable,
    /// Battery energy capacity (MWh)
    pub bess_mwh: Variable,
    /// Battery power capacity (MW)
    pub bess_mw: Variable,
    /// Solar capacity (MW)
    pub solar_mw: Variable,
    /// Grid import capacity (MW)
    pub grid_mw: Variable,
    /// Whether the grid is connected
    pub grid_active: Variable,
    /// Capacity sold into each DR product (MW)
    pub dr_capacity: IndexMap<DrProduct, Variable>,
}

impl CapacityVariables {
    /// The variable holding the installed quantity of a class, in the units it is sized in
    pub fn installed(&self, class: EquipmentClass) -> Variable {
        match class {
            EquipmentClass::Recip => self.n_recip,
            EquipmentClass::Turbine => self.n_turbine,
            EquipmentClass::Battery => self.bess_mwh,
            EquipmentClass::Solar => self.solar_mw,
            EquipmentClass::Grid => self.grid_mw,
        }
    }
}

/// Operating decisions for one sampled hour of one planning year
#[derive(Debug, Clone)]
pub struct DispatchVariables {
    /// Output of reciprocating engines
    pub gen_recip: Variable,
    /// Output of gas turbines
    pub gen_turbine: Variable,
    /// Output of solar
    pub gen_solar: Variable,
    /// Import from the grid
    pub grid_import: Variable,
    /// Battery charging power
    pub charge: Variable,
    /// Battery discharging power
    pub discharge: Variable,
    /// Battery state of charge at the end of the hour
    pub soc: Variable,
    /// Load which is not served
    pub unserved: Variable,
    /// Curtailment of each workload
    pub curtail_workload: IndexMap<WorkloadType, Variable>,
    /// Curtailment of cooling load
    pub curtail_cooling: Variable,
}

impl DispatchVariables {
    /// The variable for power supplied by a class (discharge for batteries)
    pub fn output(&self, class: EquipmentClass) -> Variable {
        match class {
            EquipmentClass::Recip => self.gen_recip,
            EquipmentClass::Turbine => self.gen_turbine,
            EquipmentClass::Battery => self.discharge,
            EquipmentClass::Solar => self.gen_solar,
            EquipmentClass::Grid => self.grid_import,
        }
    }

    /// All curtailment variables for the hour
    pub fn curtailment(&self) -> impl Iterator<Item = Variable> + '_ {
        self.curtail_workload
            .values()
            .copied()
            .chain([self.curtail_cooling])
    }
}

/// The program's variables, indexed by planning year (and sampled hour)
#[derive(Debug, Clone)]
pub struct VariableMap {
    /// Sizing decisions for each year
    pub capacity: Vec<CapacityVariables>,
    /// Operating decisions for each year and sampled hour
    pub dispatch: Vec<Vec<DispatchVariables>>,
}

/// Add a sizing variable for a class, fixed at zero if the scenario disables it
fn add_sizing_variable(
    program: &mut Program,
    coefficients: &Coefficients,
    class: EquipmentClass,
) -> Variable {
    let kind = if coefficients.catalog.spec(class).unit_capacity.is_some() {
        VariableKind::Integer
    } else {
        VariableKind::Continuous
    };
    let upper = if coefficients.is_enabled(class) {
        coefficients.catalog.spec(class).max_installed
    } else {
        0.0
    };

    program.add_column(kind, 0.0..=upper)
}

/// Add all of the variables to the program.
///
/// Variables for classes the scenario disables are fixed at zero, as is DR capacity if there is
/// no peak hour in which it could be called.
pub fn add_variables(program: &mut Program, coefficients: &Coefficients) -> VariableMap {
    let dr_possible = coefficients.has_peak_hours();
    let mut capacity = Vec::with_capacity(coefficients.years.len());
    let mut dispatch = Vec::with_capacity(coefficients.years.len());

    for year in &coefficients.years {
        let grid_active = program.add_column(VariableKind::Binary, 0.0..=1.0);
        if !coefficients.is_enabled(EquipmentClass::Grid) {
            program.cap_upper(grid_active, 0.0);
        }

        capacity.push(CapacityVariables {
            n_recip: add_sizing_variable(program, coefficients, EquipmentClass::Recip),
            n_turbine: add_sizing_variable(program, coefficients, EquipmentClass::Turbine),
            bess_mwh: add_sizing_variable(program, coefficients, EquipmentClass::Battery),
            bess_mw: program.add_column(VariableKind::Continuous, 0.0..),
            solar_mw: add_sizing_variable(program, coefficients, EquipmentClass::Solar),
            grid_mw: add_sizing_variable(program, coefficients, EquipmentClass::Grid),
            grid_active,
            dr_capacity: coefficients
                .prices
                .dr_payments
                .keys()
                .map(|product| {
                    let upper = if dr_possible { f64::INFINITY } else { 0.0 };
                    (*product, program.add_column(VariableKind::Continuous, 0.0..=upper))
                })
                .collect(),
        });

        dispatch.push(
            year.load
                .iter()
                .map(|&load| DispatchVariables {
                    gen_recip: program.add_column(VariableKind::Continuous, 0.0..),
                    gen_turbine: program.add_column(VariableKind::Continuous, 0.0..),
                    gen_solar: program.add_column(VariableKind::Continuous, 0.0..),
                    grid_import: program.add_column(VariableKind::Continuous, 0.0..),
                    charge: program.add_column(VariableKind::Continuous, 0.0..),
                    discharge: program.add_column(VariableKind::Continuous, 0.0..),
                    soc: program.add_column(VariableKind::Continuous, 0.0..),
                    unserved: program.add_column(VariableKind::Continuous, 0.0..=load),
                    curtail_workload: coefficients
                        .curtailment
                        .workload_fractions
                        .keys()
                        .map(|workload| {
                            (*workload, program.add_column(VariableKind::Continuous, 0.0..))
                        })
                        .collect(),
                    curtail_cooling: program.add_column(VariableKind::Continuous, 0.0..),
                })
                .collect(),
        );
    }

    VariableMap { capacity, dispatch }
}
