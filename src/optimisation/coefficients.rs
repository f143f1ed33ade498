//! Numeric coefficients for the capacity expansion program.
//!
//! Everything the program needs from the model and scenario is computed here, indexed by planning
//! year and sampled hour. Building coefficients is a pure function of its inputs.
use crate::equipment::{Catalog, EquipmentClass};
use crate::finance::discount_factors;
use crate::load::{PEAK_LOAD_PERCENTILE, peak, percentile, total_energy};
use crate::model::Model;
use crate::model::parameters::ExistingEquipment;
use crate::sampling::{Sample, sample_hours, to_full_year};
use crate::scenario::Scenario;
use crate::units::{
    Acres, Capacity, Dimensionless, Energy, GasVolume, Money, MoneyPerEnergy, RampRate, Tons,
};
use crate::workload::{DrProduct, WorkloadType};
use crate::year::{PlanningYear, grid_available_year, planning_years};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::warn;
use std::collections::HashSet;
use strum::IntoEnumIterator;

/// Share of the peak load a thermal fleet is assumed to run at when sizing the default gas supply
const DEFAULT_GAS_CAPACITY_FACTOR: f64 = 0.8;

/// Heat rate (MMBtu/MWh) used when sizing the default gas supply
const DEFAULT_GAS_HEAT_RATE: f64 = 7.7;

/// Heat content of gas (MMBtu/MCF) used when sizing the default gas supply
const DEFAULT_GAS_MMBTU_PER_MCF: f64 = 1.03;

/// Default required ramp rate, as a fraction of peak load per minute
const DEFAULT_RAMP_FRACTION: f64 = 0.10;

/// Coefficients which vary by planning year
#[derive(Debug, Clone, PartialEq)]
pub struct YearCoefficients {
    /// The planning year
    pub planning_year: PlanningYear,
    /// Load to serve in each sampled hour (MW)
    pub load: Vec<f64>,
    /// Energy required over the full (unsampled) year
    pub required_energy: Energy,
    /// High-percentile peak of the full year's load
    pub peak_load: Capacity,
    /// Discount factor relative to the first planning year
    pub discount_factor: Dimensionless,
    /// System ramp capability required
    pub ramp_required: RampRate,
    /// Firm capacity required after losing the largest unit, if N-1 applies
    pub firm_capacity_required: Capacity,
}

/// Limits applying to the site in every year
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    /// Annual NOx cap
    pub nox: Tons,
    /// Average daily gas supply
    pub gas_mcf_per_day: GasVolume,
    /// Annual CO2 cap, if any
    pub co2: Option<Tons>,
    /// Land available for solar
    pub land: Acres,
    /// Largest grid connection which can be built, used as the Big-M for grid gating
    pub grid_capacity: Capacity,
}

/// How much load may be curtailed
#[derive(Debug, Clone, PartialEq)]
pub struct Curtailment {
    /// Curtailable fraction of the total facility load, for each workload
    pub workload_fractions: IndexMap<WorkloadType, Dimensionless>,
    /// Curtailable fraction of the total facility load made up by cooling
    pub cooling_fraction: Dimensionless,
    /// Curtailed energy allowed per year, as a fraction of required energy
    pub budget: Dimensionless,
}

/// Prices entering the objective
#[derive(Debug, Clone, PartialEq)]
pub struct Prices {
    /// Gas price in $/MMBtu
    pub gas_per_mmbtu: f64,
    /// Price of grid imports
    pub grid_per_mwh: MoneyPerEnergy,
    /// One-off cost of connecting to the grid
    pub grid_capex: Money,
    /// Penalty on unserved energy
    pub unserved_penalty: MoneyPerEnergy,
    /// Payment for each DR product per MW-hour of capacity
    pub dr_payments: IndexMap<DrProduct, MoneyPerEnergy>,
}

/// All the coefficients for one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    /// Which classes may be deployed
    pub scenario: Scenario,
    /// Equipment coefficients
    pub catalog: Catalog,
    /// Equipment already installed
    pub existing: ExistingEquipment,
    /// Sampled hours and the factor scaling sums over them to annual totals
    pub sample: Sample,
    /// Whether each sampled hour falls within the DR peak window
    pub peak_hour: Vec<bool>,
    /// Per-year coefficients
    pub years: Vec<YearCoefficients>,
    /// First year in which the grid is available
    pub grid_available_year: u32,
    /// Site limits
    pub limits: Limits,
    /// Curtailment limits
    pub curtailment: Curtailment,
    /// Prices
    pub prices: Prices,
    /// Whether the N-1 criterion applies
    pub n_minus_1: bool,
    /// Discount rate
    pub discount_rate: Dimensionless,
    /// Lifetime over which capital is annualised for reporting
    pub asset_lifetime_years: u32,
}

/// Installed capacity (MW) of a class at its upper bound
fn max_capacity(catalog: &Catalog, class: EquipmentClass) -> f64 {
    let spec = catalog.spec(class);
    match class {
        EquipmentClass::Battery => spec.max_installed / catalog.battery.duration_hours,
        _ => spec.max_installed * spec.mw_per_decision_unit(),
    }
}

impl Coefficients {
    /// Compute the coefficients for a scenario of the model
    pub fn build(model: &Model, scenario: &Scenario) -> Result<Self> {
        let params = &model.parameters;
        let first_year = *params.years.first().context("No planning years given")?;

        let full_year = to_full_year(model.load.hourly());
        let base_energy = total_energy(&full_year);
        let base_peak = percentile(&full_year, PEAK_LOAD_PERCENTILE);
        let grid_year = grid_available_year(&params.grid, first_year, params.existing.grid_mw);
        let planning = planning_years(
            &params.years,
            model.trajectory.as_ref(),
            peak(&full_year),
            grid_year,
        )?;

        let sample = sample_hours(params.sampling.mode, &params.sampling.weeks);
        let shape = sample.apply(&full_year);
        let peak_hours: HashSet<u32> = params.demand_response.peak_hours.iter().copied().collect();
        let peak_hour = sample
            .hour_of_day()
            .map(|hour| peak_hours.contains(&hour))
            .collect();

        let discount = discount_factors(&params.years, params.discount_rate);
        let years: Vec<_> = planning
            .into_iter()
            .zip(discount)
            .map(|(planning_year, discount_factor)| {
                let factor = planning_year.load_factor;
                let peak_load = base_peak * factor;
                let ramp_required = params
                    .site
                    .min_ramp_mw_per_min
                    .unwrap_or(RampRate(DEFAULT_RAMP_FRACTION * peak_load.value()));
                let ramp_required = cap_ramp_requirement(
                    &model.catalog,
                    scenario,
                    &planning_year,
                    ramp_required,
                );
                let firm_capacity_required = if params.site.n_minus_1 {
                    cap_firm_requirement(&model.catalog, scenario, &planning_year, peak_load)
                } else {
                    Capacity(0.0)
                };

                YearCoefficients {
                    load: shape.iter().map(|load| load * factor.value()).collect(),
                    required_energy: base_energy * factor,
                    peak_load,
                    discount_factor,
                    ramp_required,
                    firm_capacity_required,
                    planning_year,
                }
            })
            .collect();

        let design_peak = years
            .iter()
            .map(|year| year.peak_load)
            .fold(Capacity(0.0), Capacity::max);
        let limits = Limits {
            nox: params.site.nox_tpy,
            gas_mcf_per_day: params
                .site
                .gas_mcf_per_day
                .unwrap_or_else(|| default_gas_supply(design_peak)),
            co2: params.site.co2_tpy.filter(|co2| *co2 > Tons(0.0)),
            land: params.site.land_acres,
            grid_capacity: Capacity(model.catalog.spec(EquipmentClass::Grid).max_installed),
        };

        Ok(Self {
            scenario: scenario.clone(),
            catalog: model.catalog.clone(),
            existing: params.existing.clone(),
            sample,
            peak_hour,
            years,
            grid_available_year: grid_year,
            limits,
            curtailment: curtailment(model),
            prices: Prices {
                gas_per_mmbtu: params.economics.gas_price_per_mmbtu,
                grid_per_mwh: params.grid.price_per_mwh,
                grid_capex: params.grid.capex,
                unserved_penalty: params.economics.unserved_penalty_per_mwh,
                dr_payments: params.demand_response.payments.clone(),
            },
            n_minus_1: params.site.n_minus_1,
            discount_rate: params.discount_rate,
            asset_lifetime_years: params.economics.asset_lifetime_years,
        })
    }

    /// Whether the scenario allows a class to be deployed
    pub fn is_enabled(&self, class: EquipmentClass) -> bool {
        self.scenario.is_enabled(class)
    }

    /// Whether any DR product can be called in the sampled hours
    pub fn has_peak_hours(&self) -> bool {
        self.peak_hour.iter().any(|is_peak| *is_peak)
    }

    /// The largest single unit among the enabled classes, lost in an N-1 contingency
    pub fn largest_unit(&self) -> Capacity {
        self.catalog
            .largest_unit(EquipmentClass::iter().filter(|class| self.is_enabled(*class)))
            .unwrap_or_default()
    }

    /// Net present value of required energy over the horizon
    pub fn discounted_required_energy(&self) -> Energy {
        self.years
            .iter()
            .map(|year| year.required_energy * year.discount_factor)
            .sum()
    }
}

/// Default daily gas supply, enough to run the peak load at a high capacity factor
fn default_gas_supply(peak_load: Capacity) -> GasVolume {
    GasVolume(
        peak_load.value() * DEFAULT_GAS_CAPACITY_FACTOR * 24.0 * DEFAULT_GAS_HEAT_RATE
            / DEFAULT_GAS_MMBTU_PER_MCF,
    )
}

/// Limit a ramp requirement to what the enabled classes could provide at their upper bounds.
///
/// An available grid connection can follow any ramp.
fn cap_ramp_requirement(
    catalog: &Catalog,
    scenario: &Scenario,
    year: &PlanningYear,
    required: RampRate,
) -> RampRate {
    if scenario.is_enabled(EquipmentClass::Grid) && year.grid_available {
        return required;
    }

    let achievable: f64 = catalog
        .iter()
        .filter(|(class, _)| *class != EquipmentClass::Grid && scenario.is_enabled(*class))
        .map(|(class, spec)| spec.ramp_fraction_per_min * max_capacity(catalog, class))
        .sum();
    if required.value() > achievable {
        warn!(
            "Ramp requirement of {required} MW/min in {} cannot be met by the enabled equipment; \
            using {achievable} MW/min instead",
            year.year
        );
        return RampRate(achievable);
    }

    required
}

/// Limit the N-1 firm capacity requirement to what the enabled classes could provide at their
/// upper bounds
fn cap_firm_requirement(
    catalog: &Catalog,
    scenario: &Scenario,
    year: &PlanningYear,
    required: Capacity,
) -> Capacity {
    let enabled = || EquipmentClass::iter().filter(move |class| scenario.is_enabled(*class));
    let achievable = enabled()
        .filter(|class| match class {
            EquipmentClass::Solar => false,
            EquipmentClass::Grid => year.grid_available,
            _ => true,
        })
        .map(|class| max_capacity(catalog, class))
        .sum::<f64>()
        - catalog.largest_unit(enabled()).unwrap_or_default().value();
    let achievable = Capacity(achievable.max(0.0));

    if required > achievable {
        warn!(
            "N-1 requirement of {required} MW in {} cannot be met by the enabled equipment; \
            using {achievable} MW instead",
            year.year
        );
        return achievable;
    }

    required
}

/// Curtailable shares of load. All zero if demand response is disabled.
fn curtailment(model: &Model) -> Curtailment {
    let params = &model.parameters;
    let dr = &params.demand_response;
    let pue = params.load.pue.value();

    if !dr.enabled {
        return Curtailment {
            workload_fractions: params
                .workload_mix
                .keys()
                .map(|workload| (*workload, Dimensionless(0.0)))
                .collect(),
            cooling_fraction: Dimensionless(0.0),
            budget: Dimensionless(0.0),
        };
    }

    let workload_fractions = params
        .workload_mix
        .iter()
        .map(|(workload, share)| {
            let flexibility = dr
                .flexibility
                .get(workload)
                .copied()
                .unwrap_or_else(|| workload.default_flexibility());
            (*workload, Dimensionless(flexibility.value() * share.value() / pue))
        })
        .collect();

    Curtailment {
        workload_fractions,
        cooling_fraction: Dimensionless(dr.cooling_flexibility.value() * (pue - 1.0) / pue),
        budget: dr.annual_curtailment_budget,
    }
}
