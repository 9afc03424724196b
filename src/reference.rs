//! Versioned reference tables: hardware specs, vendor prices, tariffs and the
//! cost ratios every calculation reads.
//!
//! The tables ship embedded in the binary (`data/reference.toml`) and can be
//! replaced at runtime with [`ReferenceData::from_file`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TcoError};
use crate::infrastructure::InfrastructureCatalog;
use crate::software::SoftwareCatalog;
use crate::storage::TierShare;
use crate::workload::{PerformanceClass, ServiceKind};

const BUILTIN_TABLES: &str = include_str!("../data/reference.toml");

/// Cooling technology of the GPU halls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoolingType {
    Air,
    Liquid,
}

impl CoolingType {
    pub fn as_str(self) -> &'static str {
        match self {
            CoolingType::Air => "air",
            CoolingType::Liquid => "liquid",
        }
    }
}

/// A figure that differs between air and liquid cooled halls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ByCooling {
    pub air: f64,
    pub liquid: f64,
}

impl ByCooling {
    pub fn get(&self, cooling: CoolingType) -> f64 {
        match cooling {
            CoolingType::Air => self.air,
            CoolingType::Liquid => self.liquid,
        }
    }
}

/// PUE per supported cooling mode. A missing entry means the system cannot
/// be deployed with that cooling.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PueTable {
    pub air: Option<f64>,
    pub liquid: Option<f64>,
}

impl PueTable {
    pub fn get(&self, cooling: CoolingType) -> Option<f64> {
        match cooling {
            CoolingType::Air => self.air,
            CoolingType::Liquid => self.liquid,
        }
    }
}

/// System architecture family; drives rails per GPU and DPU ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuFamily {
    /// Rack-scale NVLink systems (GB200/GB300 NVL72).
    NvlinkRack,
    /// Standard 8-GPU OEM nodes.
    Oem,
    /// Professional workstation cards.
    Workstation,
    Amd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuSpec {
    pub name: String,
    pub vendor: String,
    pub family: GpuFamily,
    pub power_w: f64,
    pub memory_gb: f64,
    pub unit_price: f64,
    /// GPUs per purchasable system (node or rack).
    pub rack_size: u32,
    /// Power draw of one complete system, watts.
    pub rack_power_w: f64,
    /// GPUs sharing one leaf/spine pod of the fabric.
    pub gpus_per_pod: u32,
    pub pue: PueTable,
}

impl GpuSpec {
    pub fn supports(&self, cooling: CoolingType) -> bool {
        self.pue.get(cooling).is_some()
    }

    pub fn supported_cooling(&self) -> Vec<CoolingType> {
        [CoolingType::Air, CoolingType::Liquid]
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }
}

/// Data temperature class of a per-GB vendor offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorTier {
    Hot,
    Warm,
    Cold,
    Archive,
}

/// Storage offer priced per GB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageVendor {
    pub name: String,
    pub tier: VendorTier,
    pub price_per_gb: f64,
    pub power_per_tb_w: f64,
    pub throughput_gbps_per_pb: f64,
}

/// Performance category of a per-PB storage architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageCategory {
    Extreme,
    HighPerformance,
    Balanced,
    CostOptimized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    AllNvme,
    NvmeSsd,
    SsdHdd,
    Hdd,
    Cloud,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::AllNvme => "all-nvme",
            MediaType::NvmeSsd => "nvme-ssd",
            MediaType::SsdHdd => "ssd-hdd",
            MediaType::Hdd => "hdd",
            MediaType::Cloud => "cloud",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CapacityRange {
    pub min: f64,
    pub max: f64,
    pub sweet_spot: f64,
}

/// Storage offer priced per PB with a 5-year cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageArchitecture {
    pub name: String,
    pub category: StorageCategory,
    pub capex_per_pb: f64,
    pub opex_per_pb: f64,
    pub tco_5year_per_pb: f64,
    pub media: MediaType,
    /// Usable / raw capacity after protection overhead.
    pub efficiency: f64,
    pub power_kw_per_pb: f64,
    pub throughput_gbps_per_pb: f64,
    pub iops: String,
    pub latency: String,
    pub capacity_pb: CapacityRange,
    /// Vendors that ship this architecture.
    pub vendors: Vec<String>,
}

/// Node build for one media type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MediaProfile {
    pub drives_per_node: u32,
    pub drive_tb: f64,
    pub node_power_kw: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoragePreset {
    pub name: String,
    pub tiers: Vec<TierShare>,
}

/// Storage architecture serving a workload performance class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassProfile {
    pub architecture: String,
    /// Raw-to-usable factor of the protection scheme (replication or EC).
    pub raw_multiplier: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkFabric {
    pub name: String,
    pub switch_price: f64,
    pub cable_price: f64,
    pub transceiver_price: f64,
    pub bandwidth_per_gpu_gbps: f64,
    pub ports_per_switch: u32,
}

/// Storage demand of 100 GPUs running one kind of work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceFactors {
    pub bandwidth_gbps: f64,
    pub iops: f64,
    pub capacity_tb: f64,
    pub latency_ms: f64,
}

/// Commercial and workload profile of a service tier kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProfile {
    pub name: String,
    /// Multiplier over the raw GPU-hour cost.
    pub price_multiplier: f64,
    /// Annual revenue per fully utilized GPU.
    pub revenue_per_gpu: f64,
    /// List price per GPU-hour used by the basic-config optimizer.
    pub hourly_rate: f64,
    pub training: PerformanceFactors,
    pub inference: PerformanceFactors,
}

/// Legacy planning region with a blended tariff and facility PUE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub rate_usd: f64,
    pub pue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerClass {
    Commercial,
    Industrial,
    Business,
}

/// One published electricity tariff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectricityRate {
    pub location: String,
    pub country: String,
    pub region: Option<String>,
    /// Price per kWh in `currency`.
    pub price: f64,
    pub currency: String,
    /// USD price published with the tariff; takes precedence over conversion.
    pub price_usd: Option<f64>,
    pub customer_class: CustomerClass,
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Electricity {
    pub period: String,
    /// Value of one unit of each currency in USD.
    pub exchange_rates: BTreeMap<String, f64>,
    pub rates: Vec<ElectricityRate>,
}

/// Tariff and PUE resolved for a configured location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRegion {
    pub name: String,
    pub rate_usd: f64,
    pub pue: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FabricBandwidth {
    pub infiniband: f64,
    pub other: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityAssumptions {
    pub hours_per_year: f64,
    pub default_pue: f64,
    pub datacenter_cost_per_mw: f64,
    pub cooling_capex_per_kw: ByCooling,
    /// Cooling OPEX as a share of the power bill.
    pub cooling_opex_ratio: ByCooling,
    pub maintenance_percent: f64,
    pub bandwidth_cost_per_gpu: f64,
    pub storage_ops_cost_per_gb_month: f64,
    pub software_term_years: u32,
    pub reported_bandwidth_tbps_per_gpu: FabricBandwidth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkAssumptions {
    pub switch_power_w: f64,
    pub cable_power_w: f64,
    pub transceiver_power_w: f64,
    pub dpu_unit_price: f64,
    pub dpu_power_w: f64,
    pub intra_pod_cable_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlopsAssumptions {
    pub experiments_per_gpu: f64,
    pub artifact_tb_per_experiment: f64,
    pub dataset_tb_per_gpu: f64,
    pub metadata_tb_per_experiment: f64,
    pub metadata_iops_per_experiment: f64,
    pub artifact_bandwidth_per_gpu: f64,
    pub artifact_bandwidth_cap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadAssumptions {
    pub gpus_per_spine_switch: f64,
    pub tb_per_storage_port: f64,
    pub storage_kw_per_tb: f64,
    pub cooling_tons_per_kw: f64,
    pub tb_per_storage_rack: f64,
    pub vast_license_per_pb: f64,
    pub kubernetes_license_per_gpu: f64,
    pub monitoring_per_gpu: f64,
    pub mlops: MlopsAssumptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedAssumptions {
    pub pue: ByCooling,
    pub cooling_opex_ratio: f64,
    pub staff_cost_per_fte: f64,
    pub gpus_per_staff_unit: f64,
    pub extreme_storage_complexity: f64,
    pub maintenance_ratio: f64,
    pub switch_cost: f64,
    pub storage_port_cost: f64,
    pub power_capex_per_kw: f64,
    pub rack_capex: f64,
    pub license_amortization_years: f64,
    pub horizon_years: u32,
    pub discount_rate: f64,
    pub default_revenue_per_gpu: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoragePremiums {
    pub extreme: f64,
    pub high: f64,
    pub balanced: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompliancePremiums {
    pub hipaa: f64,
    pub fedramp: f64,
    pub secnum: f64,
    pub airgap: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SustainabilityPremiums {
    pub renewable: f64,
    pub carbon: f64,
    pub netzero: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetworkCostPerGpu {
    #[serde(rename = "roce-800")]
    pub roce_800: f64,
    #[serde(rename = "roce-400")]
    pub roce_400: f64,
    pub default: f64,
}

/// Rule-of-thumb figures behind the cluster optimizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OptimizerAssumptions {
    pub gpu_power_share: f64,
    pub average_gpu_kw: f64,
    pub power_overhead: f64,
    pub min_tb_per_gpu: f64,
    pub constrained_tb_per_gpu: f64,
    pub abundant_tb_per_gpu: f64,
    pub storage_capex_per_pb: f64,
    pub facility_capex_per_mw: f64,
    pub default_pue: f64,
    /// USD per kWh.
    pub energy_rate: f64,
    pub gpus_per_fte: f64,
    pub fte_cost: f64,
    pub maintenance_ratio: f64,
    /// Fraction of GPU-hours sold.
    pub utilization: f64,
    pub fallback_gpu_price: f64,
    pub default_gpus_per_node: u32,
    pub nodes_per_rack: f64,
    pub networking_rack_share: f64,
    pub pb_per_storage_rack: f64,
    pub network_cost_per_gpu: NetworkCostPerGpu,
}

/// Price multiplier premiums added on top of the tier multiplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricingAssumptions {
    pub storage: StoragePremiums,
    pub compliance: CompliancePremiums,
    pub sustainability: SustainabilityPremiums,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assumptions {
    pub facility: FacilityAssumptions,
    pub network: NetworkAssumptions,
    pub workload: WorkloadAssumptions,
    pub enhanced: EnhancedAssumptions,
    pub optimizer: OptimizerAssumptions,
    pub pricing: PricingAssumptions,
}

/// The complete, versioned reference data set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceData {
    pub version: String,
    pub assumptions: Assumptions,
    pub gpus: BTreeMap<String, GpuSpec>,
    pub storage_vendors: BTreeMap<String, StorageVendor>,
    pub storage_architectures: BTreeMap<String, StorageArchitecture>,
    pub storage_media: BTreeMap<String, MediaProfile>,
    pub storage_presets: BTreeMap<String, StoragePreset>,
    pub performance_classes: BTreeMap<String, ClassProfile>,
    pub fabrics: BTreeMap<String, NetworkFabric>,
    pub service_profiles: BTreeMap<String, ServiceProfile>,
    pub regions: BTreeMap<String, Region>,
    pub electricity: Electricity,
    pub software: SoftwareCatalog,
    pub infrastructure: InfrastructureCatalog,
}

impl ReferenceData {
    /// Tables embedded at build time.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TABLES)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let data: ReferenceData = toml::from_str(text)?;
        data.validate()?;
        debug!(
            "loaded reference data v{} ({} GPUs, {} storage offers, {} tariffs)",
            data.version,
            data.gpus.len(),
            data.storage_vendors.len() + data.storage_architectures.len(),
            data.electricity.rates.len()
        );
        Ok(data)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TcoError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Cross-table consistency: every id one table names must exist in the
    /// table it points to.
    fn validate(&self) -> Result<()> {
        for (id, gpu) in &self.gpus {
            if gpu.rack_size == 0 {
                return Err(TcoError::config(format!("GPU '{id}' has rack_size 0")));
            }
            if gpu.gpus_per_pod == 0 {
                return Err(TcoError::config(format!("GPU '{id}' has gpus_per_pod 0")));
            }
            if gpu.supported_cooling().is_empty() {
                return Err(TcoError::config(format!(
                    "GPU '{id}' supports no cooling mode"
                )));
            }
        }
        let share = self.assumptions.network.intra_pod_cable_share;
        if !(0.0..=1.0).contains(&share) {
            return Err(TcoError::config(format!(
                "network intra_pod_cable_share must be within [0, 1], got {share}"
            )));
        }
        for (id, arch) in &self.storage_architectures {
            if arch.efficiency <= 0.0 || arch.efficiency > 1.0 {
                return Err(TcoError::config(format!(
                    "storage architecture '{id}' efficiency must be in (0, 1]"
                )));
            }
            if arch.media != MediaType::Cloud {
                self.media(arch.media)?;
            }
        }
        for preset in self.storage_presets.values() {
            for share in &preset.tiers {
                self.storage_architecture(&share.id)?;
            }
        }
        for class in PerformanceClass::ALL {
            let profile = self.performance_class(class)?;
            self.storage_architecture(&profile.architecture)?;
        }
        for kind in ServiceKind::ALL {
            self.service_profile(kind)?;
        }
        self.software.validate()?;
        Ok(())
    }

    pub fn gpu(&self, id: &str) -> Result<&GpuSpec> {
        self.gpus
            .get(id)
            .ok_or_else(|| TcoError::lookup("GPU model", id))
    }

    pub fn storage_vendor(&self, id: &str) -> Result<&StorageVendor> {
        self.storage_vendors
            .get(id)
            .ok_or_else(|| TcoError::lookup("storage vendor", id))
    }

    pub fn storage_architecture(&self, id: &str) -> Result<&StorageArchitecture> {
        self.storage_architectures
            .get(id)
            .ok_or_else(|| TcoError::lookup("storage architecture", id))
    }

    pub fn storage_preset(&self, id: &str) -> Result<&StoragePreset> {
        self.storage_presets
            .get(id)
            .ok_or_else(|| TcoError::lookup("storage preset", id))
    }

    pub fn media(&self, media: MediaType) -> Result<&MediaProfile> {
        self.storage_media
            .get(media.as_str())
            .ok_or_else(|| TcoError::lookup("storage media", media.as_str()))
    }

    pub fn performance_class(&self, class: PerformanceClass) -> Result<&ClassProfile> {
        self.performance_classes
            .get(class.as_str())
            .ok_or_else(|| TcoError::lookup("performance class", class.as_str()))
    }

    pub fn fabric(&self, id: &str) -> Result<&NetworkFabric> {
        self.fabrics
            .get(id)
            .ok_or_else(|| TcoError::lookup("network fabric", id))
    }

    pub fn service_profile(&self, kind: ServiceKind) -> Result<&ServiceProfile> {
        self.service_profiles
            .get(kind.as_str())
            .ok_or_else(|| TcoError::lookup("service profile", kind.as_str()))
    }

    /// Recommended tariff for a datacenter at `location`.
    ///
    /// Tariffs whose location equals or contains `location` (ignoring case)
    /// are candidates. Industrial tariffs win, then commercial or business
    /// ones, in table order.
    pub fn electricity_rate(&self, location: &str) -> Result<&ElectricityRate> {
        let needle = location.trim().to_lowercase();
        if needle.is_empty() {
            return Err(TcoError::config("location must not be empty"));
        }
        let candidates: Vec<&ElectricityRate> = self
            .electricity
            .rates
            .iter()
            .filter(|r| r.location.to_lowercase().contains(&needle))
            .collect();

        candidates
            .iter()
            .find(|r| r.customer_class == CustomerClass::Industrial)
            .or_else(|| {
                candidates.iter().find(|r| {
                    matches!(
                        r.customer_class,
                        CustomerClass::Commercial | CustomerClass::Business
                    )
                })
            })
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| TcoError::lookup("electricity location", location))
    }

    /// USD per kWh of a tariff.
    pub fn rate_usd(&self, rate: &ElectricityRate) -> Result<f64> {
        if let Some(usd) = rate.price_usd {
            return Ok(usd);
        }
        Ok(rate.price * self.usd_per_unit(&rate.currency)?)
    }

    /// Converts a USD/kWh price into `currency`.
    pub fn convert_from_usd(&self, usd: f64, currency: &str) -> Result<f64> {
        Ok(usd / self.usd_per_unit(currency)?)
    }

    fn usd_per_unit(&self, currency: &str) -> Result<f64> {
        if currency.eq_ignore_ascii_case("USD") {
            return Ok(1.0);
        }
        self.electricity
            .exchange_rates
            .get(&currency.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| TcoError::lookup("currency", currency))
    }

    /// Tariff and PUE for a configured region.
    ///
    /// Planning regions carry their own PUE; any other name is resolved as
    /// a tariff location and gets the facility default PUE.
    pub fn resolve_region(&self, name: &str) -> Result<ResolvedRegion> {
        if let Some(region) = self.regions.get(name) {
            return Ok(ResolvedRegion {
                name: region.name.clone(),
                rate_usd: region.rate_usd,
                pue: region.pue,
            });
        }
        let rate = self.electricity_rate(name)?;
        Ok(ResolvedRegion {
            name: rate.location.clone(),
            rate_usd: self.rate_usd(rate)?,
            pue: self.assumptions.facility.default_pue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ReferenceData {
        ReferenceData::builtin().unwrap()
    }

    #[test]
    fn builtin_tables_load() {
        let d = data();
        assert!(!d.version.is_empty());
        assert_eq!(d.gpu("gb200").unwrap().rack_size, 72);
        assert_eq!(d.fabrics.len(), 4);
    }

    #[test]
    fn unknown_keys_are_lookup_errors() {
        let d = data();
        assert!(matches!(d.gpu("z100"), Err(TcoError::Lookup { .. })));
        assert!(matches!(
            d.storage_vendor("nope"),
            Err(TcoError::Lookup { .. })
        ));
        assert!(matches!(d.fabric("token-ring"), Err(TcoError::Lookup { .. })));
    }

    #[test]
    fn supported_cooling_follows_pue_table() {
        let d = data();
        assert_eq!(
            d.gpu("gb200").unwrap().supported_cooling(),
            vec![CoolingType::Liquid]
        );
        assert_eq!(d.gpu("h100-sxm").unwrap().supported_cooling().len(), 2);
    }

    #[test]
    fn recommended_rate_prefers_industrial() {
        let d = data();
        let r = d.electricity_rate("Texas").unwrap();
        assert_eq!(r.customer_class, CustomerClass::Industrial);
        assert!((d.rate_usd(r).unwrap() - 0.0660).abs() < 1e-9);

        let r = d.electricity_rate("Virginia").unwrap();
        assert_eq!(r.location, "Virginia");
    }

    #[test]
    fn foreign_tariffs_convert_to_usd() {
        let d = data();
        let de = d.electricity_rate("Germany").unwrap();
        assert!((d.rate_usd(de).unwrap() - 0.251 * 1.087).abs() < 1e-9);
        // Published USD price wins over conversion.
        let dk = d.electricity_rate("Denmark").unwrap();
        assert!((d.rate_usd(dk).unwrap() - 0.307).abs() < 1e-9);
        let eur = d.convert_from_usd(1.087, "EUR").unwrap();
        assert!((eur - 1.0).abs() < 1e-9);
    }

    #[test]
    fn region_resolution() {
        let d = data();
        let r = d.resolve_region("us-texas").unwrap();
        assert!((r.rate_usd - 0.047).abs() < 1e-12);
        assert!((r.pue - 1.15).abs() < 1e-12);

        let r = d.resolve_region("France").unwrap();
        assert!((r.pue - 1.2).abs() < 1e-12);
        assert!(matches!(
            d.resolve_region("Atlantis"),
            Err(TcoError::Lookup { .. })
        ));
    }

    #[test]
    fn broken_cross_reference_is_rejected() {
        let text = BUILTIN_TABLES.replace(
            "architecture = \"vast-universal\"",
            "architecture = \"vast-missing\"",
        );
        assert!(ReferenceData::from_toml_str(&text).is_err());
    }

    #[test]
    fn cable_share_outside_unit_range_is_rejected() {
        let text = BUILTIN_TABLES.replace(
            "intra_pod_cable_share = 0.7",
            "intra_pod_cable_share = 1.5",
        );
        assert!(matches!(
            ReferenceData::from_toml_str(&text),
            Err(TcoError::Configuration(_))
        ));
    }

    #[test]
    fn pod_size_is_per_model() {
        let d = data();
        assert_eq!(d.gpu("gb200").unwrap().gpus_per_pod, 1008);
        assert_eq!(d.gpu("gb300").unwrap().gpus_per_pod, 1024);
        assert_eq!(d.gpu("gb300").unwrap().family, GpuFamily::NvlinkRack);
    }
}
