//! Basic-config cluster optimizer.
//!
//! A fixed decision table: the cluster is bucketed by scale, two constraint
//! flags are derived from power and storage ratios, and each combination maps
//! to a hard-coded service-tier and storage-tier split. Nothing is searched.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use log::debug;
use serde::Serialize;

use crate::error::{Result, TcoError};
use crate::reference::{OptimizerAssumptions, ReferenceData};
use crate::workload::{ServiceKind, ceil_u64};

/// Ethernet fabric explicitly chosen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Networking {
    Roce800,
    Roce400,
    Roce200,
}

impl FromStr for Networking {
    type Err = TcoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "roce-800" => Ok(Self::Roce800),
            "roce-400" => Ok(Self::Roce400),
            "roce-200" => Ok(Self::Roce200),
            other => Err(TcoError::config(format!(
                "unknown networking '{other}' (expected roce-800, roce-400 or roce-200)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizerInput {
    pub gpus: u64,
    pub power_mw: f64,
    pub storage_pb: f64,
    /// Catalogue id; chosen from the power budget when absent.
    pub gpu_model: Option<String>,
    pub networking: Option<Networking>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Small,
    Medium,
    Large,
    Hyperscale,
}

impl Scale {
    pub fn for_gpus(gpus: u64) -> Self {
        match gpus {
            10_000.. => Self::Hyperscale,
            2000.. => Self::Large,
            500.. => Self::Medium,
            _ => Self::Small,
        }
    }
}

/// GPU picked for the cluster. `id` is `None` for models outside the
/// catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuChoice {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraints {
    pub gpu_power_budget_kw: f64,
    pub max_gpus_from_power: u64,
    pub power_constrained: bool,
    pub storage_per_gpu_tb: f64,
    pub storage_constrained: bool,
    pub scale: Scale,
    pub gpu: GpuChoice,
}

/// Service-tier split, whole percentages. Rounding may leave the sum one
/// point off 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSplit {
    pub bare_metal_whale: f64,
    pub orchestrated_k8s: f64,
    pub managed_mlops: f64,
    pub inference_service: f64,
}

impl ServiceSplit {
    fn shares(&self) -> [(ServiceKind, f64); 4] {
        [
            (ServiceKind::BareMetalWhale, self.bare_metal_whale),
            (ServiceKind::OrchestratedK8s, self.orchestrated_k8s),
            (ServiceKind::ManagedMlops, self.managed_mlops),
            (ServiceKind::InferenceService, self.inference_service),
        ]
    }

    fn normalized(self) -> Self {
        let [a, b, c, d] = normalize([
            self.bare_metal_whale,
            self.orchestrated_k8s,
            self.managed_mlops,
            self.inference_service,
        ]);
        Self {
            bare_metal_whale: a,
            orchestrated_k8s: b,
            managed_mlops: c,
            inference_service: d,
        }
    }
}

/// Storage split across performance tiers, whole percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageSplit {
    pub ultra_high_perf: f64,
    pub high_perf: f64,
    pub medium_perf: f64,
    pub capacity: f64,
    pub object_store: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureRecommendation {
    pub network: String,
    pub cooling: String,
    pub racks: u64,
}

/// Whole-dollar financial summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Financials {
    pub capex: f64,
    pub annual_opex: f64,
    pub annual_revenue: f64,
    pub tco_5year: f64,
    pub roi_percent: f64,
    /// `None` when revenue never covers OPEX.
    pub payback_months: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedConfiguration {
    pub constraints: Constraints,
    pub service_tiers: ServiceSplit,
    pub storage_tiers: StorageSplit,
    pub infrastructure: InfrastructureRecommendation,
    pub financial: Financials,
    pub reasoning: Vec<String>,
}

/// Recommends a tier mix, infrastructure and financial outlook for a site
/// with the given GPU count, power and storage budgets.
///
/// # Errors
///
/// [`TcoError::Configuration`] on zero GPUs, a non-positive power budget or
/// negative storage; [`TcoError::Lookup`] when `gpu_model` is not in the
/// catalogue.
pub fn optimize(input: &OptimizerInput, data: &ReferenceData) -> Result<OptimizedConfiguration> {
    if input.gpus == 0 {
        return Err(TcoError::config("gpus must be > 0"));
    }
    if input.power_mw.is_nan() || input.power_mw <= 0.0 {
        return Err(TcoError::config("power budget must be > 0 MW"));
    }
    if input.storage_pb.is_nan() || input.storage_pb < 0.0 {
        return Err(TcoError::config("storage budget must be >= 0 PB"));
    }
    let a = &data.assumptions.optimizer;
    let power_kw = input.power_mw * 1000.0;
    let gpus = input.gpus as f64;

    let gpu_power_budget_kw = power_kw * a.gpu_power_share;
    let power_constrained = gpus * a.average_gpu_kw > gpu_power_budget_kw;
    let storage_per_gpu_tb = input.storage_pb * 1000.0 / gpus;
    let scale = Scale::for_gpus(input.gpus);
    let gpu = choose_gpu(input, scale, gpu_power_budget_kw, data)?;

    let constraints = Constraints {
        gpu_power_budget_kw,
        max_gpus_from_power: (gpu_power_budget_kw / a.average_gpu_kw).floor() as u64,
        power_constrained,
        storage_per_gpu_tb,
        storage_constrained: storage_per_gpu_tb < a.constrained_tb_per_gpu,
        scale,
        gpu,
    };
    debug!(
        "optimizer: {:?} scale, power constrained {}, {:.1} TB/GPU",
        constraints.scale, constraints.power_constrained, constraints.storage_per_gpu_tb
    );

    let service_tiers = service_split(&constraints);
    let storage_tiers = storage_split(&constraints, &service_tiers, a);
    let infrastructure = InfrastructureRecommendation {
        network: network_recommendation(&constraints, &service_tiers, input.networking),
        cooling: cooling_recommendation(input, scale),
        racks: rack_count(input, data, a)?,
    };
    let financial = financials(input, &constraints, &service_tiers, data)?;
    let reasoning = reasoning(input, &constraints, &service_tiers, a);

    Ok(OptimizedConfiguration {
        constraints,
        service_tiers,
        storage_tiers,
        infrastructure,
        financial,
        reasoning,
    })
}

fn choose_gpu(
    input: &OptimizerInput,
    scale: Scale,
    gpu_power_budget_kw: f64,
    data: &ReferenceData,
) -> Result<GpuChoice> {
    if let Some(id) = &input.gpu_model {
        return Ok(GpuChoice {
            id: Some(id.clone()),
            name: data.gpu(id)?.name.clone(),
        });
    }
    let watts_per_gpu = gpu_power_budget_kw * 1000.0 / input.gpus as f64;
    let catalogued = |id: &str| -> Result<GpuChoice> {
        Ok(GpuChoice {
            id: Some(id.to_string()),
            name: data.gpu(id)?.name.clone(),
        })
    };
    let external = |name: &str| GpuChoice {
        id: None,
        name: name.to_string(),
    };
    Ok(match scale {
        Scale::Hyperscale if watts_per_gpu >= 700.0 => catalogued("h100-sxm")?,
        Scale::Large if watts_per_gpu >= 500.0 => catalogued("h100-pcie")?,
        _ if watts_per_gpu >= 400.0 => external("A100 80GB"),
        _ => external("L40S"),
    })
}

fn service_split(c: &Constraints) -> ServiceSplit {
    let (whale, k8s, mlops, inference) = match c.scale {
        Scale::Hyperscale if !c.power_constrained && !c.storage_constrained => (30.0, 25.0, 30.0, 15.0),
        Scale::Hyperscale if c.storage_constrained => (20.0, 30.0, 20.0, 30.0),
        Scale::Hyperscale => (15.0, 25.0, 35.0, 25.0),
        Scale::Large if !c.storage_constrained => (10.0, 30.0, 40.0, 20.0),
        Scale::Large => (5.0, 25.0, 35.0, 35.0),
        Scale::Medium => (0.0, 25.0, 50.0, 25.0),
        Scale::Small => (0.0, 15.0, 45.0, 40.0),
    };
    let mut split = ServiceSplit {
        bare_metal_whale: whale,
        orchestrated_k8s: k8s,
        managed_mlops: mlops,
        inference_service: inference,
    };
    // Inference-class GPUs shift 30% of the training tiers to inference.
    if c.gpu.name.contains("L40") {
        let shifted = (split.bare_metal_whale + split.orchestrated_k8s) * 0.3;
        split.bare_metal_whale *= 0.7;
        split.orchestrated_k8s *= 0.7;
        split.inference_service += shifted;
    }
    split.normalized()
}

fn storage_split(c: &Constraints, tiers: &ServiceSplit, a: &OptimizerAssumptions) -> StorageSplit {
    let training_intensity = (tiers.bare_metal_whale * 0.8
        + tiers.orchestrated_k8s * 0.65
        + tiers.managed_mlops * 0.55)
        / 100.0;
    let whale = tiers.bare_metal_whale;
    let raw = if c.storage_per_gpu_tb >= a.abundant_tb_per_gpu {
        [if whale > 20.0 { 5.0 } else { 0.0 }, 30.0 * training_intensity, 25.0, 30.0, 15.0]
    } else if c.storage_per_gpu_tb >= a.constrained_tb_per_gpu {
        [if whale > 25.0 { 3.0 } else { 0.0 }, 25.0 * training_intensity, 30.0, 35.0, 10.0]
    } else {
        [0.0, 15.0 * training_intensity, 35.0, 40.0, 10.0]
    };
    let [ultra, high, medium, capacity, object] = normalize(raw);
    StorageSplit {
        ultra_high_perf: ultra,
        high_perf: high,
        medium_perf: medium,
        capacity,
        object_store: object,
    }
}

/// Rescales to whole percentages of the total.
fn normalize<const N: usize>(values: [f64; N]) -> [f64; N] {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return values;
    }
    values.map(|v| (v / total * 100.0).round())
}

fn network_recommendation(c: &Constraints, tiers: &ServiceSplit, chosen: Option<Networking>) -> String {
    match chosen {
        Some(Networking::Roce800) => return "Ethernet 800GbE RoCEv2".into(),
        Some(Networking::Roce400) => return "Ethernet 400GbE RoCEv2".into(),
        Some(Networking::Roce200) => return "Ethernet 200GbE RoCEv2".into(),
        None => {}
    }
    let high_bandwidth = tiers.bare_metal_whale > 20.0
        || tiers.bare_metal_whale + tiers.orchestrated_k8s > 50.0;
    match c.scale {
        Scale::Hyperscale if high_bandwidth => "InfiniBand NDR 400Gb (non-blocking)",
        Scale::Large if high_bandwidth => "InfiniBand HDR 200Gb (2:1 oversubscribed)",
        _ if high_bandwidth => "Ethernet 400GbE RoCEv2",
        _ => "Ethernet 200GbE",
    }
    .into()
}

fn cooling_recommendation(input: &OptimizerInput, scale: Scale) -> String {
    // kW per 8-GPU node.
    let density = input.power_mw * 1000.0 / (input.gpus as f64 / 8.0).ceil();
    if density > 10.0 || scale == Scale::Hyperscale {
        "Liquid cooled (direct-to-chip)"
    } else if density > 6.0 {
        "Hybrid air/liquid"
    } else {
        "Air cooled (hot aisle containment)"
    }
    .into()
}

fn rack_count(input: &OptimizerInput, data: &ReferenceData, a: &OptimizerAssumptions) -> Result<u64> {
    let per_node = match &input.gpu_model {
        Some(id) => data.gpu(id)?.rack_size,
        None => a.default_gpus_per_node,
    };
    let nodes = input.gpus.div_ceil(u64::from(per_node));
    let compute = ceil_u64(nodes as f64 / a.nodes_per_rack);
    let networking = ceil_u64(compute as f64 * a.networking_rack_share);
    let storage = ceil_u64(input.storage_pb / a.pb_per_storage_rack);
    Ok(compute + networking + storage)
}

fn financials(
    input: &OptimizerInput,
    c: &Constraints,
    tiers: &ServiceSplit,
    data: &ReferenceData,
) -> Result<Financials> {
    let a = &data.assumptions.optimizer;
    let gpus = input.gpus as f64;
    let power_kw = input.power_mw * 1000.0;

    let unit_price = match &c.gpu.id {
        Some(id) => data.gpu(id)?.unit_price,
        None => a.fallback_gpu_price,
    };
    // Only an operator-selected GPU brings its own PUE.
    let pue = match &input.gpu_model {
        Some(id) => {
            let spec = data.gpu(id)?;
            spec.pue.liquid.or(spec.pue.air).unwrap_or(a.default_pue)
        }
        None => a.default_pue,
    };
    let network_per_gpu = match input.networking {
        Some(Networking::Roce800) => a.network_cost_per_gpu.roce_800,
        Some(Networking::Roce400) => a.network_cost_per_gpu.roce_400,
        _ => a.network_cost_per_gpu.default,
    };
    let capex = gpus * unit_price
        + gpus * network_per_gpu
        + input.storage_pb * a.storage_capex_per_pb
        + input.power_mw * a.facility_capex_per_mw;

    let hours = data.assumptions.facility.hours_per_year;
    let power = power_kw * pue * hours * a.energy_rate;
    let staff = (gpus / a.gpus_per_fte).ceil() * a.fte_cost;
    let maintenance = capex * a.maintenance_ratio;
    let annual_opex = power + staff + maintenance;

    let mut hourly_rate = 0.0;
    for (kind, percent) in tiers.shares() {
        hourly_rate += percent / 100.0 * data.service_profile(kind)?.hourly_rate;
    }
    let annual_revenue = gpus * hourly_rate * hours * a.utilization;

    let tco_5year = capex + annual_opex * 5.0;
    let profit = annual_revenue - annual_opex;
    Ok(Financials {
        capex: capex.round(),
        annual_opex: annual_opex.round(),
        annual_revenue: annual_revenue.round(),
        tco_5year: tco_5year.round(),
        roi_percent: ((annual_revenue * 5.0 - tco_5year) / capex * 100.0).round(),
        payback_months: (profit > 0.0).then(|| (capex / profit * 12.0).round()),
    })
}

fn reasoning(
    input: &OptimizerInput,
    c: &Constraints,
    tiers: &ServiceSplit,
    a: &OptimizerAssumptions,
) -> Vec<String> {
    let mut out = Vec::new();
    match c.scale {
        Scale::Hyperscale => out.push(format!(
            "At {} GPUs the cluster has hyperscale capacity for whale customers and large enterprise deployments.",
            input.gpus
        )),
        Scale::Small => out.push(format!(
            "With {} GPUs, managed services and inference maximize revenue per GPU.",
            input.gpus
        )),
        _ => {}
    }
    if c.storage_constrained {
        out.push(format!(
            "Storage ratio of {:.0} TB/GPU favors inference and model serving workloads.",
            c.storage_per_gpu_tb
        ));
    }
    if c.power_constrained {
        out.push(
            "Power is constrained; the mix favors energy-efficient workloads and lower-power GPUs."
                .into(),
        );
    }
    if tiers.managed_mlops >= 35.0 {
        out.push(format!(
            "The MLOps platform ({:.0}%) carries the highest margins with {} GPUs at this scale.",
            tiers.managed_mlops, c.gpu.name
        ));
    }
    if tiers.bare_metal_whale > 20.0 {
        out.push(
            "The infrastructure supports whale customers needing dedicated bare-metal training capacity."
                .into(),
        );
    }
    out.push(format!(
        "{} selected for price/performance at {:.1} kW per GPU.",
        c.gpu.name,
        input.power_mw * 1000.0 * a.gpu_power_share / input.gpus as f64
    ));
    out
}

/// Smallest site power, in whole MW, for `gpus` at the average draw plus
/// facility overhead.
pub fn min_power_required_mw(gpus: u64, data: &ReferenceData) -> u64 {
    let a = &data.assumptions.optimizer;
    ceil_u64(gpus as f64 * a.average_gpu_kw * a.power_overhead / 1000.0)
}

/// Smallest storage, in whole PB, for `gpus`.
pub fn min_storage_required_pb(gpus: u64, data: &ReferenceData) -> u64 {
    ceil_u64(gpus as f64 * data.assumptions.optimizer.min_tb_per_gpu / 1000.0)
}

/// Share of `capacity_mw` the minimum power takes, capped at 100%.
pub fn power_utilization(gpus: u64, capacity_mw: f64, data: &ReferenceData) -> f64 {
    let required = min_power_required_mw(gpus, data) as f64;
    (required / capacity_mw * 100.0).min(100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    Critical,
    Warning,
    Good,
    Excellent,
}

impl PowerStatus {
    pub fn from_utilization(percent: f64) -> Self {
        if percent > 95.0 {
            Self::Critical
        } else if percent > 80.0 {
            Self::Warning
        } else if percent > 60.0 {
            Self::Good
        } else {
            Self::Excellent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical: insufficient power",
            Self::Warning => "Warning: limited headroom",
            Self::Good => "Good: adequate power",
            Self::Excellent => "Excellent: ample headroom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageRatioStatus {
    TooLow,
    Limited,
    Good,
    Excellent,
}

impl StorageRatioStatus {
    pub fn from_tb_per_gpu(tb: f64) -> Self {
        if tb < 10.0 {
            Self::TooLow
        } else if tb < 20.0 {
            Self::Limited
        } else if tb < 50.0 {
            Self::Good
        } else {
            Self::Excellent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TooLow => "Too low for training",
            Self::Limited => "Limited training capacity",
            Self::Good => "Good balance",
            Self::Excellent => "Excellent for all workloads",
        }
    }
}

impl Display for OptimizedConfiguration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let c = &self.constraints;
        writeln!(f, "Scale:              {:?}", c.scale)?;
        writeln!(f, "GPU model:          {}", c.gpu.name)?;
        writeln!(
            f,
            "GPU power budget:   {:.0} kW (max {} GPUs){}",
            c.gpu_power_budget_kw,
            c.max_gpus_from_power,
            if c.power_constrained { "  [constrained]" } else { "" }
        )?;
        writeln!(
            f,
            "Storage per GPU:    {:.1} TB{}",
            c.storage_per_gpu_tb,
            if c.storage_constrained { "  [constrained]" } else { "" }
        )?;
        writeln!(f)?;
        let s = &self.service_tiers;
        writeln!(f, "Service tiers:")?;
        writeln!(f, "  Bare metal whale: {:>4.0}%", s.bare_metal_whale)?;
        writeln!(f, "  Orchestrated K8s: {:>4.0}%", s.orchestrated_k8s)?;
        writeln!(f, "  Managed MLOps:    {:>4.0}%", s.managed_mlops)?;
        writeln!(f, "  Inference:        {:>4.0}%", s.inference_service)?;
        let st = &self.storage_tiers;
        writeln!(f, "Storage tiers:")?;
        writeln!(f, "  Ultra-high perf:  {:>4.0}%", st.ultra_high_perf)?;
        writeln!(f, "  High perf:        {:>4.0}%", st.high_perf)?;
        writeln!(f, "  Medium perf:      {:>4.0}%", st.medium_perf)?;
        writeln!(f, "  Capacity:         {:>4.0}%", st.capacity)?;
        writeln!(f, "  Object store:     {:>4.0}%", st.object_store)?;
        writeln!(f)?;
        writeln!(f, "Network:            {}", self.infrastructure.network)?;
        writeln!(f, "Cooling:            {}", self.infrastructure.cooling)?;
        writeln!(f, "Racks:              {}", self.infrastructure.racks)?;
        writeln!(f)?;
        let m = &self.financial;
        writeln!(f, "CAPEX:              ${:.0}M", m.capex / 1e6)?;
        writeln!(f, "Annual OPEX:        ${:.0}M", m.annual_opex / 1e6)?;
        writeln!(f, "Annual revenue:     ${:.0}M", m.annual_revenue / 1e6)?;
        writeln!(f, "5-year TCO:         ${:.0}M", m.tco_5year / 1e6)?;
        writeln!(f, "ROI:                {:.0}%", m.roi_percent)?;
        match m.payback_months {
            Some(months) => writeln!(f, "Payback:            {months:.0} months")?,
            None => writeln!(f, "Payback:            never")?,
        }
        writeln!(f)?;
        for reason in &self.reasoning {
            writeln!(f, "- {reason}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ReferenceData {
        ReferenceData::builtin().unwrap()
    }

    fn input(gpus: u64, power_mw: f64, storage_pb: f64) -> OptimizerInput {
        OptimizerInput {
            gpus,
            power_mw,
            storage_pb,
            gpu_model: None,
            networking: None,
        }
    }

    #[test]
    fn scale_buckets() {
        assert_eq!(Scale::for_gpus(499), Scale::Small);
        assert_eq!(Scale::for_gpus(500), Scale::Medium);
        assert_eq!(Scale::for_gpus(2000), Scale::Large);
        assert_eq!(Scale::for_gpus(9999), Scale::Large);
        assert_eq!(Scale::for_gpus(10_000), Scale::Hyperscale);
    }

    #[test]
    fn unconstrained_hyperscale() {
        // 10k GPUs, 15 MW -> 10.5 MW for GPUs at 1050 W each; 50 TB/GPU.
        let r = optimize(&input(10_000, 15.0, 500.0), &data()).unwrap();
        let c = &r.constraints;
        assert!(!c.power_constrained);
        assert!(!c.storage_constrained);
        assert_eq!(c.max_gpus_from_power, 15_000);
        assert_eq!(c.gpu.id.as_deref(), Some("h100-sxm"));
        assert_eq!(
            r.service_tiers,
            ServiceSplit {
                bare_metal_whale: 30.0,
                orchestrated_k8s: 25.0,
                managed_mlops: 30.0,
                inference_service: 15.0,
            }
        );
        assert_eq!(r.infrastructure.network, "InfiniBand NDR 400Gb (non-blocking)");
        assert!(r.infrastructure.cooling.starts_with("Liquid"));
        assert!((r.storage_tiers.ultra_high_perf - 5.0).abs() < 1e-9);
    }

    #[test]
    fn storage_constrained_hyperscale_shifts_to_inference() {
        let r = optimize(&input(10_000, 15.0, 100.0), &data()).unwrap();
        assert!(r.constraints.storage_constrained);
        assert!((r.service_tiers.inference_service - 30.0).abs() < 1e-9);
        assert!((r.storage_tiers.ultra_high_perf).abs() < 1e-9);
        assert!(r.reasoning.iter().any(|s| s.contains("10 TB/GPU")));
    }

    #[test]
    fn low_power_small_cluster_gets_inference_gpu() {
        // 100 GPUs on 0.05 MW: 350 W per GPU.
        let r = optimize(&input(100, 0.05, 5.0), &data()).unwrap();
        assert_eq!(r.constraints.gpu.name, "L40S");
        assert!(r.constraints.gpu.id.is_none());
        assert!(r.constraints.power_constrained);
        // 0/15/45/40 with 30% of k8s moved to inference: 0/10.5/45/44.5.
        assert!((r.service_tiers.orchestrated_k8s - 11.0).abs() < 1e-9);
        assert!((r.service_tiers.managed_mlops - 45.0).abs() < 1e-9);
        assert!((r.service_tiers.inference_service - 45.0).abs() < 1e-9);
        assert_eq!(r.infrastructure.network, "Ethernet 200GbE");
    }

    #[test]
    fn normalization_rounds_to_whole_percent() {
        assert_eq!(normalize([1.0, 1.0, 1.0]), [33.0, 33.0, 33.0]);
        assert_eq!(normalize([0.0, 0.0]), [0.0, 0.0]);
    }

    #[test]
    fn explicit_choices_are_respected() {
        let d = data();
        let mut i = input(720, 2.0, 20.0);
        i.gpu_model = Some("gb200".into());
        i.networking = Some("roce-400".parse().unwrap());
        let r = optimize(&i, &d).unwrap();
        assert_eq!(r.constraints.gpu.name, d.gpu("gb200").unwrap().name);
        assert_eq!(r.infrastructure.network, "Ethernet 400GbE RoCEv2");
        // 10 racks of 72: ceil(10 / 4) = 3 compute, 1 network, 4 storage.
        assert_eq!(r.infrastructure.racks, 8);

        i.gpu_model = Some("z100".into());
        assert!(matches!(optimize(&i, &d), Err(TcoError::Lookup { .. })));
        assert!("infiniband".parse::<Networking>().is_err());
    }

    #[test]
    fn financial_formulas() {
        let d = data();
        // Medium scale at 700 W per GPU: 0/25/50/25 at 3.20/4.50/5.00 per hour.
        let r = optimize(&input(1000, 1.0, 30.0), &d).unwrap();
        let m = &r.financial;
        assert_eq!(r.constraints.gpu.name, "A100 80GB");
        let capex = 1000.0 * 25_000.0 + 1000.0 * 12_000.0 + 30.0 * 100_000.0 + 2_000_000.0;
        assert!((m.capex - capex).abs() < 1.0);
        let opex = 1000.0 * 1.3 * 8760.0 * 0.07 + 2.0 * 200_000.0 + capex * 0.05;
        assert!((m.annual_opex - opex.round()).abs() < 1.0);
        let s = &r.service_tiers;
        let rate = (s.orchestrated_k8s * 3.2 + s.managed_mlops * 4.5 + s.inference_service * 5.0)
            / 100.0;
        assert!((m.annual_revenue - (1000.0 * rate * 8760.0 * 0.7).round()).abs() < 1.0);
        assert!(m.payback_months.is_some());
    }

    #[test]
    fn invalid_budgets() {
        let d = data();
        assert!(matches!(optimize(&input(0, 1.0, 1.0), &d), Err(TcoError::Configuration(_))));
        assert!(matches!(optimize(&input(10, 0.0, 1.0), &d), Err(TcoError::Configuration(_))));
        assert!(matches!(optimize(&input(10, 1.0, -1.0), &d), Err(TcoError::Configuration(_))));
    }

    #[test]
    fn helpers() {
        let d = data();
        assert_eq!(min_power_required_mw(10_000, &d), 10);
        assert_eq!(min_storage_required_pb(10_000, &d), 100);
        assert!((power_utilization(10_000, 20.0, &d) - 50.0).abs() < 1e-9);
        assert!((power_utilization(10_000, 5.0, &d) - 100.0).abs() < 1e-9);
        assert_eq!(PowerStatus::from_utilization(96.0), PowerStatus::Critical);
        assert_eq!(PowerStatus::from_utilization(81.0), PowerStatus::Warning);
        assert_eq!(PowerStatus::from_utilization(60.0), PowerStatus::Excellent);
        assert_eq!(StorageRatioStatus::from_tb_per_gpu(9.9), StorageRatioStatus::TooLow);
        assert_eq!(StorageRatioStatus::from_tb_per_gpu(20.0), StorageRatioStatus::Good);
        assert_eq!(StorageRatioStatus::from_tb_per_gpu(50.0), StorageRatioStatus::Excellent);
    }
}
