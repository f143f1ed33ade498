//! Scenarios restrict which equipment classes may be deployed.
use crate::equipment::EquipmentClass;
use serde::Deserialize;

/// Name of the scenario used when none are defined
pub const DEFAULT_SCENARIO_NAME: &str = "all_technologies";

fn enabled() -> bool {
    true
}

/// A named set of equipment classes to optimise over.
///
/// A disabled class has its capacity and dispatch fixed at zero.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    /// Scenario name, used to label outputs
    pub name: String,
    /// Whether reciprocating engines may be deployed
    #[serde(default = "enabled")]
    pub recip: bool,
    /// Whether gas turbines may be deployed
    #[serde(default = "enabled")]
    pub turbine: bool,
    /// Whether battery storage may be deployed
    #[serde(default = "enabled")]
    pub battery: bool,
    /// Whether solar may be deployed
    #[serde(default = "enabled")]
    pub solar: bool,
    /// Whether a grid connection may be used
    #[serde(default = "enabled")]
    pub grid: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: DEFAULT_SCENARIO_NAME.into(),
            recip: true,
            turbine: true,
            battery: true,
            solar: true,
            grid: true,
        }
    }
}

impl Scenario {
    /// Whether the given equipment class can be deployed in this scenario
    pub fn is_enabled(&self, class: EquipmentClass) -> bool {
        match class {
            EquipmentClass::Recip => self.recip,
            EquipmentClass::Turbine => self.turbine,
            EquipmentClass::Battery => self.battery,
            EquipmentClass::Solar => self.solar,
            EquipmentClass::Grid => self.grid,
        }
    }
}
