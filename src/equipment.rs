//! The catalog of equipment classes which can be installed at a site.
//!
//! The catalog is an immutable configuration object: it is built once (from defaults, optionally
//! overridden by `equipment.csv`) and passed by reference to whatever needs it.
use crate::units::{Capacity, Dimensionless, Money};
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::{EnumIter, IntoEnumIterator};

/// Heat content of natural gas (BTU per MCF)
pub const GAS_HHV_BTU_PER_MCF: f64 = 1_037_000.0;

/// Pounds in a short ton
const LB_PER_TON: f64 = 2000.0;

/// The kinds of equipment which may be deployed
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum EquipmentClass {
    /// Reciprocating gas engines, installed in whole units
    #[string = "recip"]
    Recip,
    /// Gas turbines, installed in whole units
    #[string = "turbine"]
    Turbine,
    /// Battery energy storage
    #[string = "battery"]
    Battery,
    /// Solar PV array
    #[string = "solar"]
    Solar,
    /// Import from the electricity grid
    #[string = "grid"]
    Grid,
}

impl EquipmentClass {
    /// Whether the class burns gas
    pub fn is_thermal(self) -> bool {
        matches!(self, Self::Recip | Self::Turbine)
    }
}

/// Fixed technical and economic coefficients for an equipment class
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentSpec {
    /// Capacity of a single unit, for classes installed in whole units
    pub unit_capacity: Option<Capacity>,
    /// Heat rate in BTU/kWh (zero for non-thermal classes)
    pub heat_rate: f64,
    /// NOx emission rate in lb/MMBtu
    pub nox_rate: f64,
    /// CO2 emission rate in lb/MMBtu
    pub co2_rate: f64,
    /// Fraction of installed capacity available for generation in any hour.
    ///
    /// For solar this is a flat capacity-factor proxy.
    pub availability: Dimensionless,
    /// Ramp capability as a fraction of installed capacity per minute
    pub ramp_fraction_per_min: f64,
    /// Capital cost in $/kW (in $/kWh of energy capacity for batteries)
    pub capex: f64,
    /// Upper bound on the installed quantity (units for whole-unit classes, otherwise MW or MWh)
    pub max_installed: f64,
    /// Land take in acres per MW
    pub land_acres_per_mw: f64,
}

impl EquipmentSpec {
    /// Fuel burn in MMBtu per MWh generated
    pub fn fuel_mmbtu_per_mwh(&self) -> f64 {
        self.heat_rate / 1000.0
    }

    /// NOx emitted in tons per MWh generated
    pub fn nox_tons_per_mwh(&self) -> f64 {
        self.fuel_mmbtu_per_mwh() * self.nox_rate / LB_PER_TON
    }

    /// CO2 emitted in tons per MWh generated
    pub fn co2_tons_per_mwh(&self) -> f64 {
        self.fuel_mmbtu_per_mwh() * self.co2_rate / LB_PER_TON
    }

    /// Gas consumed in MCF per MWh generated
    pub fn gas_mcf_per_mwh(&self) -> f64 {
        self.heat_rate * 1000.0 / GAS_HHV_BTU_PER_MCF
    }

    /// Capacity (MW) provided per unit of the class's sizing decision.
    ///
    /// This is the unit capacity for whole-unit classes and 1 otherwise.
    pub fn mw_per_decision_unit(&self) -> f64 {
        self.unit_capacity.map_or(1.0, Capacity::value)
    }

    /// Capital cost of one unit of the class's sizing decision (a unit, MW or MWh)
    pub fn capex_per_decision_unit(&self) -> Money {
        Money(self.capex * 1000.0 * self.mw_per_decision_unit())
    }
}

/// Operating parameters for battery storage
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryParameters {
    /// Energy capacity divided by power capacity, in hours
    pub duration_hours: f64,
    /// One-way efficiency applied on both charge and discharge
    pub efficiency: Dimensionless,
    /// Minimum state of charge as a fraction of energy capacity
    pub min_soc: Dimensionless,
    /// State of charge at the first sampled hour of each year, as a fraction of energy capacity
    pub initial_soc: Dimensionless,
}

impl Default for BatteryParameters {
    fn default() -> Self {
        Self {
            duration_hours: 4.0,
            efficiency: Dimensionless(0.92),
            min_soc: Dimensionless(0.1),
            initial_soc: Dimensionless(0.5),
        }
    }
}

/// The set of equipment classes available, with their coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    equipment: IndexMap<EquipmentClass, EquipmentSpec>,
    /// Battery operating parameters
    pub battery: BatteryParameters,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            equipment: EquipmentClass::iter()
                .map(|class| (class, default_spec(class)))
                .collect(),
            battery: BatteryParameters::default(),
        }
    }
}

impl Catalog {
    /// Create a catalog from the defaults, replacing the specs of the given classes
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (EquipmentClass, EquipmentSpec)>,
    {
        let mut catalog = Self::default();
        for (class, spec) in overrides {
            catalog.equipment.insert(class, spec);
        }

        catalog
    }

    /// Get the coefficients for an equipment class
    pub fn spec(&self, class: EquipmentClass) -> &EquipmentSpec {
        // Every class is present by construction
        &self.equipment[&class]
    }

    /// Iterate over classes and their coefficients
    pub fn iter(&self) -> impl Iterator<Item = (EquipmentClass, &EquipmentSpec)> {
        self.equipment.iter().map(|(class, spec)| (*class, spec))
    }

    /// The largest single unit among the given classes, if any are installed in whole units
    pub fn largest_unit<I>(&self, classes: I) -> Option<Capacity>
    where
        I: IntoIterator<Item = EquipmentClass>,
    {
        classes
            .into_iter()
            .filter_map(|class| self.spec(class).unit_capacity)
            .reduce(Capacity::max)
    }
}

fn default_spec(class: EquipmentClass) -> EquipmentSpec {
    match class {
        EquipmentClass::Recip => EquipmentSpec {
            unit_capacity: Some(Capacity(5.0)),
            heat_rate: 7700.0,
            nox_rate: 0.099,
            co2_rate: 117.0,
            availability: Dimensionless(0.97),
            ramp_fraction_per_min: 0.5,
            capex: 1650.0,
            max_installed: 100.0,
            land_acres_per_mw: 0.0,
        },
        EquipmentClass::Turbine => EquipmentSpec {
            unit_capacity: Some(Capacity(20.0)),
            heat_rate: 8500.0,
            nox_rate: 0.05,
            co2_rate: 117.0,
            availability: Dimensionless(0.95),
            ramp_fraction_per_min: 0.2,
            capex: 1300.0,
            max_installed: 30.0,
            land_acres_per_mw: 0.0,
        },
        EquipmentClass::Battery => EquipmentSpec {
            unit_capacity: None,
            heat_rate: 0.0,
            nox_rate: 0.0,
            co2_rate: 0.0,
            availability: Dimensionless(1.0),
            // Inverters reach full power in seconds; credited at 10x power capacity per minute
            ramp_fraction_per_min: 10.0,
            capex: 250.0,
            max_installed: 2000.0,
            land_acres_per_mw: 0.0,
        },
        EquipmentClass::Solar => EquipmentSpec {
            unit_capacity: None,
            heat_rate: 0.0,
            nox_rate: 0.0,
            co2_rate: 0.0,
            availability: Dimensionless(0.25),
            ramp_fraction_per_min: 0.0,
            capex: 1000.0,
            max_installed: 500.0,
            land_acres_per_mw: 4.25,
        },
        EquipmentClass::Grid => EquipmentSpec {
            unit_capacity: None,
            heat_rate: 0.0,
            nox_rate: 0.0,
            co2_rate: 0.0,
            availability: Dimensionless(1.0),
            ramp_fraction_per_min: 0.0,
            capex: 0.0,
            max_installed: 500.0,
            land_acres_per_mw: 0.0,
        },
    }
}
