//! Workload categories of the facility load and the demand-response products they can support.
use crate::units::{Dimensionless, MoneyPerEnergy};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::{EnumIter, IntoEnumIterator};

/// Tolerance when checking that workload shares sum to one
const SHARE_SUM_TOLERANCE: f64 = 1e-6;

/// A category of IT workload running at the facility
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
pub enum WorkloadType {
    /// Large-model pre-training
    #[string = "pre_training"]
    PreTraining,
    /// Fine-tuning and post-training
    #[string = "fine_tuning"]
    FineTuning,
    /// Queue-based batch inference
    #[string = "batch_inference"]
    BatchInference,
    /// User-facing real-time inference
    #[string = "realtime_inference"]
    RealtimeInference,
    /// Reinforcement learning
    #[string = "rl_training"]
    RlTraining,
    /// Traditional cloud and HPC
    #[string = "cloud_hpc"]
    CloudHpc,
}

impl WorkloadType {
    /// The fraction of this workload's load which can be curtailed in any hour
    pub fn default_flexibility(self) -> Dimensionless {
        Dimensionless(match self {
            Self::PreTraining => 0.30,
            Self::FineTuning => 0.50,
            Self::BatchInference => 0.90,
            Self::RealtimeInference => 0.05,
            Self::RlTraining => 0.40,
            Self::CloudHpc => 0.25,
        })
    }

    /// The share of IT load this workload makes up in the default workload mix
    fn default_share(self) -> Dimensionless {
        Dimensionless(match self {
            Self::PreTraining => 0.40,
            Self::FineTuning => 0.15,
            Self::BatchInference => 0.20,
            Self::RealtimeInference => 0.10,
            Self::RlTraining => 0.05,
            Self::CloudHpc => 0.10,
        })
    }
}

/// A demand-response product the facility can sell curtailable load into
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
pub enum DrProduct {
    /// Spinning reserve
    #[string = "spinning_reserve"]
    SpinningReserve,
    /// Non-spinning reserve
    #[string = "non_spinning_reserve"]
    NonSpinningReserve,
    /// Economic demand response
    #[string = "economic_dr"]
    EconomicDr,
    /// Emergency demand response
    #[string = "emergency_dr"]
    EmergencyDr,
}

impl DrProduct {
    /// Capacity payment in $ per MW per hour of availability
    pub fn default_payment(self) -> MoneyPerEnergy {
        MoneyPerEnergy(match self {
            Self::SpinningReserve => 15.0,
            Self::NonSpinningReserve => 8.0,
            Self::EconomicDr => 5.0,
            Self::EmergencyDr => 3.0,
        })
    }
}

/// The default payment rates for all DR products
pub fn default_dr_payments() -> IndexMap<DrProduct, MoneyPerEnergy> {
    DrProduct::iter()
        .map(|product| (product, product.default_payment()))
        .collect()
}

/// The default flexibility of all workload types
pub fn default_flexibilities() -> IndexMap<WorkloadType, Dimensionless> {
    WorkloadType::iter()
        .map(|workload| (workload, workload.default_flexibility()))
        .collect()
}

/// The default shares of the workload mix
pub fn default_workload_mix() -> IndexMap<WorkloadType, Dimensionless> {
    WorkloadType::iter()
        .map(|workload| (workload, workload.default_share()))
        .collect()
}

/// Check that the workload mix is made up of proportions which sum to one
pub fn check_workload_mix(mix: &IndexMap<WorkloadType, Dimensionless>) -> Result<()> {
    ensure!(!mix.is_empty(), "workload_mix cannot be empty");

    for (workload, share) in mix {
        ensure!(
            (0.0..=1.0).contains(&share.value()),
            "workload_mix share for {workload} must be between 0 and 1"
        );
    }

    let total: f64 = mix.values().map(|share| share.value()).sum();
    ensure!(
        (total - 1.0).abs() <= SHARE_SUM_TOLERANCE,
        "workload_mix shares must sum to 1 (got {total})"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(WorkloadType::RlTraining.to_string(), "rl_training")]
    #[case(DrProduct::NonSpinningReserve.to_string(), "non_spinning_reserve")]
    fn test_labels(#[case] displayed: String, #[case] label: &str) {
        assert_eq!(displayed, label);
    }

    #[test]
    fn test_default_workload_mix_is_valid() {
        let mix = default_workload_mix();
        assert_eq!(mix.len(), 6);
        assert!(check_workload_mix(&mix).is_ok());
    }

    #[test]
    fn test_check_workload_mix_bad_sum() {
        let mut mix = default_workload_mix();
        mix[&WorkloadType::CloudHpc] = Dimensionless(0.2);
        assert!(check_workload_mix(&mix).is_err());
    }

    #[test]
    fn test_check_workload_mix_out_of_range() {
        let mix: IndexMap<_, _> = [
            (WorkloadType::PreTraining, Dimensionless(1.5)),
            (WorkloadType::FineTuning, Dimensionless(-0.5)),
        ]
        .into_iter()
        .collect();
        assert!(check_workload_mix(&mix).is_err());
    }

    #[test]
    fn test_default_payments() {
        let payments = default_dr_payments();
        assert_approx_eq!(
            MoneyPerEnergy,
            payments[&DrProduct::SpinningReserve],
            MoneyPerEnergy(15.0)
        );
        assert_eq!(payments.len(), 4);
    }
}
