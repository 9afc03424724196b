//! Service-tier mix to storage demand.
//!
//! Each service tier takes a share of the cluster and splits its GPUs between
//! training and inference. Per-100-GPU performance factors turn those GPU
//! counts into bandwidth, IOPS and capacity, and the tier kind decides which
//! storage performance classes serve it.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TcoError};
use crate::reference::ReferenceData;

/// Tolerance applied when checking that percentages close to 100.
pub const PERCENT_TOLERANCE: f64 = 0.1;

/// Kind of customer-facing offering a tier sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    BareMetalWhale,
    OrchestratedK8s,
    ManagedMlops,
    InferenceService,
    /// Any other offering; storage classes follow the training share.
    Custom,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::BareMetalWhale,
        ServiceKind::OrchestratedK8s,
        ServiceKind::ManagedMlops,
        ServiceKind::InferenceService,
        ServiceKind::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::BareMetalWhale => "bare-metal-whale",
            ServiceKind::OrchestratedK8s => "orchestrated-k8s",
            ServiceKind::ManagedMlops => "managed-mlops",
            ServiceKind::InferenceService => "inference-service",
            ServiceKind::Custom => "custom",
        }
    }
}

/// Storage performance class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceClass {
    Extreme,
    High,
    Balanced,
    Cost,
}

impl PerformanceClass {
    pub const ALL: [PerformanceClass; 4] = [
        PerformanceClass::Extreme,
        PerformanceClass::High,
        PerformanceClass::Balanced,
        PerformanceClass::Cost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceClass::Extreme => "extreme",
            PerformanceClass::High => "high",
            PerformanceClass::Balanced => "balanced",
            PerformanceClass::Cost => "cost",
        }
    }

    /// Class for a workload with the given training share.
    pub fn for_training_percent(training_percent: f64) -> Self {
        if training_percent > 70.0 {
            PerformanceClass::Extreme
        } else if training_percent > 40.0 {
            PerformanceClass::High
        } else if training_percent > 15.0 {
            PerformanceClass::Balanced
        } else {
            PerformanceClass::Cost
        }
    }
}

/// Percentage of the cluster served by each performance class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub extreme: f64,
    pub high: f64,
    pub balanced: f64,
    pub cost: f64,
}

impl ClassDistribution {
    pub fn get(&self, class: PerformanceClass) -> f64 {
        match class {
            PerformanceClass::Extreme => self.extreme,
            PerformanceClass::High => self.high,
            PerformanceClass::Balanced => self.balanced,
            PerformanceClass::Cost => self.cost,
        }
    }

    fn add(&mut self, class: PerformanceClass, percent: f64) {
        match class {
            PerformanceClass::Extreme => self.extreme += percent,
            PerformanceClass::High => self.high += percent,
            PerformanceClass::Balanced => self.balanced += percent,
            PerformanceClass::Cost => self.cost += percent,
        }
    }

    pub fn total(&self) -> f64 {
        self.extreme + self.high + self.balanced + self.cost
    }
}

/// A service tier: a share of the cluster sold as one kind of offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTier {
    pub id: String,
    pub name: String,
    pub kind: ServiceKind,
    /// Share of the cluster's GPUs, percent.
    pub cluster_percent: f64,
    /// Share of the tier's GPUs running training, percent. The rest infer.
    pub training_percent: f64,
}

impl ServiceTier {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ServiceKind,
        cluster_percent: f64,
        training_percent: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            cluster_percent,
            training_percent,
        }
    }

    pub fn inference_percent(&self) -> f64 {
        100.0 - self.training_percent
    }

    /// Split of the tier's share of the cluster across performance classes.
    fn class_split(&self) -> Vec<(PerformanceClass, f64)> {
        use PerformanceClass::*;
        let p = self.cluster_percent;
        match self.kind {
            ServiceKind::BareMetalWhale => vec![(Extreme, p * 0.6), (High, p * 0.4)],
            ServiceKind::OrchestratedK8s if self.training_percent > 70.0 => {
                vec![(Extreme, p * 0.4), (High, p * 0.6)]
            }
            ServiceKind::OrchestratedK8s => vec![(High, p * 0.7), (Balanced, p * 0.3)],
            ServiceKind::ManagedMlops => {
                vec![(High, p * 0.3), (Balanced, p * 0.5), (Cost, p * 0.2)]
            }
            ServiceKind::InferenceService if self.training_percent > 20.0 => {
                vec![(Balanced, p * 0.6), (Cost, p * 0.4)]
            }
            ServiceKind::InferenceService => vec![(Balanced, p * 0.3), (Cost, p * 0.7)],
            ServiceKind::Custom => vec![(
                PerformanceClass::for_training_percent(self.training_percent),
                p,
            )],
        }
    }
}

/// Tier mix used when none is configured.
pub fn default_service_tiers() -> Vec<ServiceTier> {
    vec![
        ServiceTier::new(
            "tier1_whale",
            "Tier 1: Bare Metal GPU Access",
            ServiceKind::BareMetalWhale,
            20.0,
            80.0,
        ),
        ServiceTier::new(
            "tier2_orchestrated",
            "Tier 2: Orchestrated Kubernetes",
            ServiceKind::OrchestratedK8s,
            30.0,
            65.0,
        ),
        ServiceTier::new(
            "tier3_mlops",
            "Tier 3: Managed MLOps Platform",
            ServiceKind::ManagedMlops,
            35.0,
            55.0,
        ),
        ServiceTier::new(
            "tier4_inference",
            "Tier 4: Inference-as-a-Service",
            ServiceKind::InferenceService,
            15.0,
            10.0,
        ),
    ]
}

/// GPUs assigned to one tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierAllocation {
    pub id: String,
    pub gpus: f64,
    pub training_gpus: f64,
    pub inference_gpus: f64,
}

/// Fractional GPU counts per tier. They sum to `total_gpus` whenever the
/// cluster percentages sum to 100.
pub fn gpu_allocation(tiers: &[ServiceTier], total_gpus: u64) -> Vec<TierAllocation> {
    tiers
        .iter()
        .map(|t| {
            let gpus = t.cluster_percent / 100.0 * total_gpus as f64;
            TierAllocation {
                id: t.id.clone(),
                gpus,
                training_gpus: gpus * t.training_percent / 100.0,
                inference_gpus: gpus * t.inference_percent() / 100.0,
            }
        })
        .collect()
}

/// Aggregate storage demand of a tier mix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageRequirements {
    pub total_bandwidth_gbps: f64,
    pub total_iops: f64,
    pub total_capacity_tb: f64,
    pub distribution: ClassDistribution,
    /// Raw capacity needed per usable TB across the protection schemes.
    pub raw_storage_multiplier: f64,
}

impl StorageRequirements {
    pub fn total_capacity_pb(&self) -> f64 {
        self.total_capacity_tb / 1000.0
    }
}

/// Storage bandwidth, IOPS and capacity needed by `tiers` on a cluster of
/// `total_gpus`, plus the performance-class split serving them.
///
/// Managed MLOps tiers add experiment-tracking overhead on top of their
/// performance factors.
///
/// # Errors
///
/// [`TcoError::Configuration`] when `total_gpus` is zero or a tier's
/// percentages fall outside `[0, 100]`.
pub fn storage_requirements(
    tiers: &[ServiceTier],
    total_gpus: u64,
    data: &ReferenceData,
) -> Result<StorageRequirements> {
    if total_gpus == 0 {
        return Err(TcoError::config("total GPU count must be > 0"));
    }
    for t in tiers {
        check_percent(&t.id, "cluster_percent", t.cluster_percent)?;
        check_percent(&t.id, "training_percent", t.training_percent)?;
    }

    let mlops = &data.assumptions.workload.mlops;
    let mut bandwidth = 0.0;
    let mut iops = 0.0;
    let mut capacity = 0.0;
    let mut distribution = ClassDistribution::default();

    for (tier, alloc) in tiers.iter().zip(gpu_allocation(tiers, total_gpus)) {
        let profile = data.service_profile(tier.kind)?;
        let (train, infer) = (&profile.training, &profile.inference);
        let train_units = alloc.training_gpus / 100.0;
        let infer_units = alloc.inference_gpus / 100.0;

        bandwidth += train_units * train.bandwidth_gbps + infer_units * infer.bandwidth_gbps;
        iops += train_units * train.iops + infer_units * infer.iops;
        capacity += train_units * train.capacity_tb + infer_units * infer.capacity_tb;

        if tier.kind == ServiceKind::ManagedMlops {
            let experiments = alloc.gpus * mlops.experiments_per_gpu;
            let training_ratio = tier.training_percent / 100.0;
            capacity += experiments * mlops.artifact_tb_per_experiment * training_ratio
                + alloc.gpus * mlops.dataset_tb_per_gpu * training_ratio
                + experiments * mlops.metadata_tb_per_experiment;
            iops += experiments * mlops.metadata_iops_per_experiment;
            bandwidth += (alloc.gpus * mlops.artifact_bandwidth_per_gpu)
                .min(mlops.artifact_bandwidth_cap);
        }

        for (class, percent) in tier.class_split() {
            distribution.add(class, percent);
        }
    }

    let mut raw_storage_multiplier = 0.0;
    for class in PerformanceClass::ALL {
        let factor = data.performance_class(class)?.raw_multiplier;
        raw_storage_multiplier += distribution.get(class) / 100.0 * factor;
    }

    Ok(StorageRequirements {
        total_bandwidth_gbps: bandwidth,
        total_iops: iops,
        total_capacity_tb: capacity,
        distribution,
        raw_storage_multiplier,
    })
}

pub(crate) fn check_percent(id: &str, field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(TcoError::config(format!(
            "service tier '{id}': {field} must be within [0, 100], got {value}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNeeds {
    pub minimum_bandwidth_tbps: f64,
    pub infiniband_switches: u64,
    pub storage_network_ports: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerNeeds {
    pub storage_power_kw: f64,
    pub cooling_tons: f64,
    pub additional_racks: u64,
}

/// Annual software licences driven by the storage and cluster size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftwareNeeds {
    pub vast_license: f64,
    pub kubernetes_license: f64,
    pub monitoring_stack: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureRequirements {
    pub network: NetworkNeeds,
    pub power: PowerNeeds,
    pub software: SoftwareNeeds,
}

/// Network, power and licensing needs implied by a storage demand.
pub fn infrastructure_requirements(
    req: &StorageRequirements,
    total_gpus: u64,
    data: &ReferenceData,
) -> InfrastructureRequirements {
    let a = &data.assumptions.workload;
    let capacity_tb = req.total_capacity_tb;
    let storage_power_kw = capacity_tb * a.storage_kw_per_tb;
    let extreme_pb = req.distribution.extreme / 100.0 * req.total_capacity_pb();

    InfrastructureRequirements {
        network: NetworkNeeds {
            minimum_bandwidth_tbps: req.total_bandwidth_gbps / 1000.0,
            infiniband_switches: ceil_u64(total_gpus as f64 / a.gpus_per_spine_switch),
            storage_network_ports: ceil_u64(capacity_tb / a.tb_per_storage_port),
        },
        power: PowerNeeds {
            storage_power_kw,
            cooling_tons: storage_power_kw * a.cooling_tons_per_kw,
            additional_racks: ceil_u64(capacity_tb / a.tb_per_storage_rack),
        },
        software: SoftwareNeeds {
            vast_license: extreme_pb * a.vast_license_per_pb,
            kubernetes_license: total_gpus as f64 * a.kubernetes_license_per_gpu,
            monitoring_stack: total_gpus as f64 * a.monitoring_per_gpu,
        },
    }
}

pub(crate) fn ceil_u64(x: f64) -> u64 {
    if x <= 0.0 { 0 } else { x.ceil() as u64 }
}

/// Storage architecture recommended for one performance class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedStorage {
    pub class: PerformanceClass,
    pub architecture: String,
    pub name: String,
    pub capacity_pb: f64,
    pub rationale: String,
}

/// One architecture per performance class with a non-zero share, sized to
/// that share of the required capacity.
pub fn recommended_architecture(
    req: &StorageRequirements,
    data: &ReferenceData,
) -> Result<Vec<RecommendedStorage>> {
    let total_pb = req.total_capacity_pb();
    let mut out = Vec::new();
    for class in PerformanceClass::ALL {
        let percent = req.distribution.get(class);
        if percent <= 0.0 {
            continue;
        }
        let profile = data.performance_class(class)?;
        let arch = data.storage_architecture(&profile.architecture)?;
        out.push(RecommendedStorage {
            class,
            architecture: profile.architecture.clone(),
            name: arch.name.clone(),
            capacity_pb: total_pb * percent / 100.0,
            rationale: format!("{percent:.1}% {}", profile.rationale),
        });
    }
    Ok(out)
}

/// Advisory findings about a tier mix. An empty list means the mix is sound.
pub fn validate_service_tiers(tiers: &[ServiceTier]) -> Vec<String> {
    let mut warnings = Vec::new();

    let total: f64 = tiers.iter().map(|t| t.cluster_percent).sum();
    if (total - 100.0).abs() > PERCENT_TOLERANCE {
        warnings.push(format!(
            "service tier percentages must sum to 100% (currently {total:.1}%)"
        ));
    }

    for t in tiers {
        if !(0.0..=100.0).contains(&t.training_percent) {
            warnings.push(format!(
                "{}: training share must lie within 0-100% (currently {:.1}%)",
                t.name, t.training_percent
            ));
        }
    }

    let training: f64 = tiers
        .iter()
        .map(|t| t.cluster_percent / 100.0 * t.training_percent / 100.0)
        .sum::<f64>()
        * 100.0;
    if training > 80.0 {
        warnings.push(
            "high training workload (>80%) will require significant high-performance storage investment"
                .into(),
        );
    }
    if training < 20.0 {
        warnings.push(
            "low training workload (<20%) may indicate over-provisioned storage performance tiers"
                .into(),
        );
    }

    warnings
}

/// Sets `shares[index]` to `value` and redistributes the difference over the
/// other shares in proportion to their size, keeping the total at 100.
///
/// Results are rounded to one decimal and clamped to `[0, 100]`.
pub fn rebalance(shares: &[f64], index: usize, value: f64) -> Result<Vec<f64>> {
    if index >= shares.len() {
        return Err(TcoError::config(format!(
            "share index {index} out of range for {} shares",
            shares.len()
        )));
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(TcoError::config(format!(
            "share must be within [0, 100], got {value}"
        )));
    }

    let diff = value - shares[index];
    let sum_others: f64 = shares
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, s)| *s)
        .sum();

    let mut updated: Vec<f64> = shares
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i == index {
                value
            } else if sum_others > 0.0 {
                (s - diff * s / sum_others).max(0.0)
            } else {
                *s
            }
        })
        .collect();

    let total: f64 = updated.iter().sum();
    if total > 0.0 && total != 100.0 {
        for s in &mut updated {
            *s = *s / total * 100.0;
        }
    }
    for s in &mut updated {
        *s = ((*s * 10.0).round() / 10.0).clamp(0.0, 100.0);
    }
    Ok(updated)
}

/// [`rebalance`] applied to the cluster shares of a tier list.
pub fn rebalance_tiers(tiers: &mut [ServiceTier], id: &str, cluster_percent: f64) -> Result<()> {
    let index = tiers
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| TcoError::lookup("service tier", id))?;
    let shares: Vec<f64> = tiers.iter().map(|t| t.cluster_percent).collect();
    for (tier, share) in tiers.iter_mut().zip(rebalance(&shares, index, cluster_percent)?) {
        tier.cluster_percent = share;
    }
    Ok(())
}

impl Display for StorageRequirements {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "Storage bandwidth:  {:.1} GB/s", self.total_bandwidth_gbps)?;
        writeln!(f, "Storage IOPS:       {:.0}", self.total_iops)?;
        writeln!(
            f,
            "Storage capacity:   {:.1} TB ({:.2} PB)",
            self.total_capacity_tb,
            self.total_capacity_pb()
        )?;
        writeln!(
            f,
            "Class split:        extreme {:.1}% | high {:.1}% | balanced {:.1}% | cost {:.1}%",
            self.distribution.extreme,
            self.distribution.high,
            self.distribution.balanced,
            self.distribution.cost
        )?;
        writeln!(f, "Raw multiplier:     {:.3}x", self.raw_storage_multiplier)
    }
}
