//! Code for reading overrides to the equipment catalog.
use super::{input_err_msg, read_csv_optional};
use crate::equipment::{EquipmentClass, EquipmentSpec};
use crate::units::{Capacity, Dimensionless};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const EQUIPMENT_FILE_NAME: &str = "equipment.csv";

/// A row of `equipment.csv`
#[derive(Debug, PartialEq, Deserialize)]
struct EquipmentRow {
    class: EquipmentClass,
    unit_capacity_mw: Option<f64>,
    heat_rate_btu_per_kwh: f64,
    nox_lb_per_mmbtu: f64,
    co2_lb_per_mmbtu: f64,
    availability: f64,
    ramp_fraction_per_min: f64,
    capex: f64,
    max_installed: f64,
    land_acres_per_mw: f64,
}

impl EquipmentRow {
    fn into_spec(self) -> Result<(EquipmentClass, EquipmentSpec)> {
        let class = self.class;
        ensure!(
            (0.0..=1.0).contains(&self.availability),
            "availability for {class} must be between 0 and 1"
        );
        ensure!(
            [
                self.heat_rate_btu_per_kwh,
                self.nox_lb_per_mmbtu,
                self.co2_lb_per_mmbtu,
                self.ramp_fraction_per_min,
                self.capex,
                self.max_installed,
                self.land_acres_per_mw,
            ]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0),
            "Coefficients for {class} must be finite, non-negative numbers"
        );

        let is_whole_unit = matches!(class, EquipmentClass::Recip | EquipmentClass::Turbine);
        let unit_capacity = match (is_whole_unit, self.unit_capacity_mw) {
            (true, Some(capacity)) => {
                ensure!(
                    capacity.is_finite() && capacity > 0.0,
                    "unit_capacity_mw for {class} must be greater than zero"
                );
                Some(Capacity(capacity))
            }
            (true, None) => anyhow::bail!("unit_capacity_mw must be given for {class}"),
            (false, Some(_)) => anyhow::bail!("{class} is not installed in whole units"),
            (false, None) => None,
        };

        let spec = EquipmentSpec {
            unit_capacity,
            heat_rate: self.heat_rate_btu_per_kwh,
            nox_rate: self.nox_lb_per_mmbtu,
            co2_rate: self.co2_lb_per_mmbtu,
            availability: Dimensionless(self.availability),
            ramp_fraction_per_min: self.ramp_fraction_per_min,
            capex: self.capex,
            max_installed: self.max_installed,
            land_acres_per_mw: self.land_acres_per_mw,
        };

        Ok((class, spec))
    }
}

/// Read equipment catalog overrides from `equipment.csv` in the model directory, if present.
///
/// Each class may appear at most once. Classes which are not listed keep their defaults.
pub fn read_equipment_overrides(model_dir: &Path) -> Result<IndexMap<EquipmentClass, EquipmentSpec>> {
    let file_path = model_dir.join(EQUIPMENT_FILE_NAME);
    let Some(rows) = read_csv_optional::<EquipmentRow>(&file_path)? else {
        return Ok(IndexMap::new());
    };

    read_equipment_overrides_from_rows(rows).with_context(|| input_err_msg(&file_path))
}

fn read_equipment_overrides_from_rows(
    rows: Vec<EquipmentRow>,
) -> Result<IndexMap<EquipmentClass, EquipmentSpec>> {
    let mut overrides = IndexMap::new();
    for row in rows {
        let (class, spec) = row.into_spec()?;
        ensure!(
            overrides.insert(class, spec).is_none(),
            "Duplicate entry for equipment class {class}"
        );
    }

    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn turbine_row() -> EquipmentRow {
        EquipmentRow {
            class: EquipmentClass::Turbine,
            unit_capacity_mw: Some(40.0),
            heat_rate_btu_per_kwh: 9000.0,
            nox_lb_per_mmbtu: 0.05,
            co2_lb_per_mmbtu: 117.0,
            availability: 0.95,
            ramp_fraction_per_min: 0.2,
            capex: 1200.0,
            max_installed: 10.0,
            land_acres_per_mw: 0.0,
        }
    }

    #[test]
    fn test_read_equipment_overrides_missing_file() {
        let dir = tempdir().unwrap();
        assert!(read_equipment_overrides(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_read_equipment_overrides() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(EQUIPMENT_FILE_NAME)).unwrap();
            writeln!(
                file,
                "class,unit_capacity_mw,heat_rate_btu_per_kwh,nox_lb_per_mmbtu,co2_lb_per_mmbtu,\
                 availability,ramp_fraction_per_min,capex,max_installed,land_acres_per_mw\n\
                 solar,,0,0,0,0.3,0,900,300,5"
            )
            .unwrap();
        }

        let overrides = read_equipment_overrides(dir.path()).unwrap();
        let solar = &overrides[&EquipmentClass::Solar];
        assert_eq!(solar.availability, Dimensionless(0.3));
        assert_eq!(solar.unit_capacity, None);
        assert_eq!(solar.land_acres_per_mw, 5.0);
    }

    #[test]
    fn test_duplicate_class() {
        assert_error!(
            read_equipment_overrides_from_rows(vec![turbine_row(), turbine_row()]),
            "Duplicate entry for equipment class turbine"
        );
    }

    #[test]
    fn test_whole_unit_class_needs_unit_capacity() {
        let mut row = turbine_row();
        row.unit_capacity_mw = None;
        assert_error!(
            read_equipment_overrides_from_rows(vec![row]),
            "unit_capacity_mw must be given for turbine"
        );
    }

    #[test]
    fn test_bad_availability() {
        let mut row = turbine_row();
        row.availability = 1.5;
        assert_error!(
            read_equipment_overrides_from_rows(vec![row]),
            "availability for turbine must be between 0 and 1"
        );
    }
}
