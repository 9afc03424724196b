//! Cluster configuration: the single input record of every TCO calculation.
//!
//! Configurations are plain TOML documents. Required fields carry no serde
//! default, so omitting one fails to load with a message naming it.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TcoError};
use crate::network::{NetworkConfig, NetworkPriceOverrides, parse_oversubscription};
use crate::pricing::ServiceModifiers;
use crate::reference::{CoolingType, ReferenceData};
use crate::software::SupportTier;
use crate::storage::{TierShare, default_storage_tiers};
use crate::workload::{
    PERCENT_TOLERANCE, ServiceTier, check_percent, default_service_tiers, validate_service_tiers,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Usable capacity, PB.
    pub total_pb: f64,
    /// Named preset; replaces `tiers` when set.
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default = "default_storage_tiers")]
    pub tiers: Vec<TierShare>,
}

impl StorageConfig {
    /// Tier shares in effect, expanding the preset if one is named.
    pub fn tiers(&self, data: &ReferenceData) -> Result<Vec<TierShare>> {
        match &self.preset {
            Some(id) => data.preset_tiers(id),
            None => Ok(self.tiers.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareChoice {
    pub stack: String,
    #[serde(default)]
    pub support: SupportTier,
}

impl Default for SoftwareChoice {
    fn default() -> Self {
        Self {
            stack: "hybrid-balanced".into(),
            support: SupportTier::Business,
        }
    }
}

/// Values replacing reference-table figures for one configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub gpu_unit_price: Option<f64>,
    pub pue: Option<f64>,
    /// USD per kWh.
    pub energy_rate: Option<f64>,
    pub power_cost_multiplier: Option<f64>,
    pub cooling_capex_per_kw: Option<f64>,
    pub cooling_opex_ratio: Option<f64>,
    pub datacenter_cost_per_mw: Option<f64>,
    pub staff_multiplier: Option<f64>,
    pub maintenance_percent: Option<f64>,
    pub bandwidth_cost_per_gpu: Option<f64>,
    /// Replaces the software stack's annual cost.
    pub software_license_cost_per_gpu: Option<f64>,
    pub storage_ops_cost_per_gb_month: Option<f64>,
    pub staff_cost_per_fte: Option<f64>,
    pub maintenance_ratio: Option<f64>,
    #[serde(flatten)]
    pub network: NetworkPriceOverrides,
}

/// A GPU cluster to cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub gpu_model: String,
    /// Requested GPUs; rounded up to whole systems.
    pub num_gpus: u64,
    pub cooling: CoolingType,
    /// Planning region id or tariff location.
    pub region: String,
    /// Share of GPU-hours sold, percent.
    pub utilization: f64,
    pub depreciation_years: u32,
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    #[serde(default = "default_service_tiers")]
    pub service_tiers: Vec<ServiceTier>,
    #[serde(default)]
    pub software: SoftwareChoice,
    #[serde(default)]
    pub modifiers: ServiceModifiers,
    #[serde(default)]
    pub overrides: Overrides,
}

impl Configuration {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| TcoError::config(e.message().trim().to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TcoError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks ranges, percentage closure and every reference key.
    ///
    /// Advisory service-tier findings are logged, not returned.
    ///
    /// # Errors
    ///
    /// [`TcoError::Configuration`] for out-of-range values or unsupported
    /// cooling, [`TcoError::Lookup`] for unknown reference keys.
    pub fn validate(&self, data: &ReferenceData) -> Result<()> {
        if self.num_gpus == 0 {
            return Err(TcoError::config("num_gpus must be > 0"));
        }
        if !(0.0..=100.0).contains(&self.utilization) {
            return Err(TcoError::config(format!(
                "utilization must be within [0, 100], got {}",
                self.utilization
            )));
        }
        if self.depreciation_years == 0 {
            return Err(TcoError::config("depreciation_years must be > 0"));
        }
        if !self.storage.total_pb.is_finite() || self.storage.total_pb < 0.0 {
            return Err(TcoError::config("storage.total_pb must be >= 0"));
        }

        let gpu = data.gpu(&self.gpu_model)?;
        if !gpu.supports(self.cooling) {
            return Err(TcoError::config(format!(
                "{} does not support {} cooling",
                gpu.name,
                self.cooling.as_str()
            )));
        }
        data.resolve_region(&self.region)?;
        data.fabric(&self.network.fabric)?;
        parse_oversubscription(&self.network.oversubscription)?;
        data.software_stack(&self.software.stack)?;
        for share in self.storage.tiers(data)? {
            data.storage_tier(&share.id)?;
        }

        for tier in &self.service_tiers {
            check_percent(&tier.id, "cluster_percent", tier.cluster_percent)?;
            check_percent(&tier.id, "training_percent", tier.training_percent)?;
        }
        let tier_sum: f64 = self.service_tiers.iter().map(|t| t.cluster_percent).sum();
        if (tier_sum - 100.0).abs() > PERCENT_TOLERANCE {
            return Err(TcoError::config(format!(
                "service tier cluster shares must sum to 100% (currently {tier_sum:.1}%)"
            )));
        }
        for finding in validate_service_tiers(&self.service_tiers) {
            warn!("{finding}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
gpu_model = "gb200"
num_gpus = 10000
cooling = "liquid"
region = "us-texas"
utilization = 90.0
depreciation_years = 5

[storage]
total_pb = 50.0

[network]
fabric = "infiniband"
topology = "fat-tree"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let c = Configuration::from_toml_str(MINIMAL).unwrap();
        assert_eq!(c.storage.tiers, default_storage_tiers());
        assert_eq!(c.service_tiers.len(), 4);
        assert_eq!(c.software.stack, "hybrid-balanced");
        assert_eq!(c.network.oversubscription, "1:1");
        assert!(!c.network.dpus_enabled);
        assert_eq!(c.overrides, Overrides::default());
        c.validate(&ReferenceData::builtin().unwrap()).unwrap();
    }

    #[test]
    fn missing_field_is_named() {
        let text = MINIMAL.replace("num_gpus = 10000\n", "");
        match Configuration::from_toml_str(&text) {
            Err(TcoError::Configuration(msg)) => assert!(msg.contains("num_gpus"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overrides_include_network_prices() {
        let text = format!("{MINIMAL}\n[overrides]\ngpu_unit_price = 65000.0\nswitch_price = 1.0\n");
        let c = Configuration::from_toml_str(&text).unwrap();
        assert_eq!(c.overrides.gpu_unit_price, Some(65_000.0));
        assert_eq!(c.overrides.network.switch_price, Some(1.0));
    }

    #[test]
    fn validation_failures() {
        let d = ReferenceData::builtin().unwrap();
        let base = Configuration::from_toml_str(MINIMAL).unwrap();

        let mut c = base.clone();
        c.cooling = CoolingType::Air;
        assert!(matches!(c.validate(&d), Err(TcoError::Configuration(_))));

        let mut c = base.clone();
        c.utilization = 120.0;
        assert!(matches!(c.validate(&d), Err(TcoError::Configuration(_))));

        let mut c = base.clone();
        c.gpu_model = "z100".into();
        assert!(matches!(c.validate(&d), Err(TcoError::Lookup { .. })));

        let mut c = base.clone();
        c.service_tiers[0].cluster_percent = 50.0;
        assert!(matches!(c.validate(&d), Err(TcoError::Configuration(_))));

        let mut c = base.clone();
        c.region = "Atlantis".into();
        assert!(matches!(c.validate(&d), Err(TcoError::Lookup { .. })));

        let mut c = base;
        c.utilization = 0.0;
        assert!(c.validate(&d).is_ok());
    }

    #[test]
    fn tier_percentages_are_range_checked() {
        let d = ReferenceData::builtin().unwrap();
        let base = Configuration::from_toml_str(MINIMAL).unwrap();

        // Sums to 100 but holds a negative share.
        let mut c = base.clone();
        for (tier, p) in c.service_tiers.iter_mut().zip([120.0, -20.0, 0.0, 0.0]) {
            tier.cluster_percent = p;
        }
        match c.validate(&d) {
            Err(TcoError::Configuration(msg)) => assert!(msg.contains("cluster_percent"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }

        let mut c = base;
        c.service_tiers[1].training_percent = 150.0;
        match c.validate(&d) {
            Err(TcoError::Configuration(msg)) => assert!(msg.contains("training_percent"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn preset_replaces_tiers() {
        let d = ReferenceData::builtin().unwrap();
        let text = MINIMAL.replace(
            "total_pb = 50.0",
            "total_pb = 50.0\npreset = \"enterprise-balanced\"",
        );
        let c = Configuration::from_toml_str(&text).unwrap();
        let tiers = c.storage.tiers(&d).unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].id, "pure-flashblade");
    }
}
