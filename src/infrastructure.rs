//! Enterprise infrastructure around the GPU systems: backup power, security,
//! platform services and the operations teams.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::reference::ReferenceData;
use crate::workload::ceil_u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostModel {
    PerGpu,
    PerNode,
    PerRack,
    PerCluster,
}

/// Quantity derived from cluster power instead of the rack count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSizing {
    /// N+1 generators.
    Generators,
    Ups,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureComponent {
    pub id: String,
    pub name: String,
    pub category: String,
    pub cost_model: CostModel,
    pub base_cost: f64,
    #[serde(default)]
    pub annual_cost: f64,
    /// Extra share of the base quantity per `scaling_step_gpus` GPUs.
    #[serde(default)]
    pub scaling_factor: Option<f64>,
    #[serde(default)]
    pub sizing: Option<PowerSizing>,
    #[serde(default)]
    pub optional: bool,
    /// Fabric the component only applies to.
    #[serde(default)]
    pub fabric: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureCatalog {
    pub default_gpu_power_w: f64,
    /// Networking, storage and management draw on top of the GPUs.
    pub overhead_ratio: f64,
    pub generator_mw: f64,
    pub ups_module_mw: f64,
    pub gpus_per_node: f64,
    pub scaling_step_gpus: f64,
    pub gpu_power_w: BTreeMap<String, f64>,
    pub components: Vec<InfrastructureComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerRequirements {
    pub gpu_power_kw: f64,
    pub overhead_kw: f64,
    pub total_kw: f64,
    pub total_mw: f64,
}

/// Cluster draw used to size generators and UPS modules.
pub fn power_requirements(
    catalog: &InfrastructureCatalog,
    gpus: u64,
    gpu_model: &str,
) -> PowerRequirements {
    let per_gpu = catalog
        .gpu_power_w
        .get(gpu_model)
        .copied()
        .unwrap_or(catalog.default_gpu_power_w);
    let gpu_power_kw = gpus as f64 * per_gpu / 1000.0;
    let overhead_kw = gpu_power_kw * catalog.overhead_ratio;
    let total_kw = gpu_power_kw + overhead_kw;
    PowerRequirements {
        gpu_power_kw,
        overhead_kw,
        total_kw,
        total_mw: total_kw / 1000.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureLine {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub capex: f64,
    pub annual_opex: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureCost {
    pub total_capex: f64,
    pub total_annual_opex: f64,
    pub power: PowerRequirements,
    pub breakdown: Vec<InfrastructureLine>,
}

impl InfrastructureCost {
    pub fn line(&self, id: &str) -> Option<&InfrastructureLine> {
        self.breakdown.iter().find(|l| l.id == id)
    }
}

/// Prices the enterprise infrastructure for a cluster.
///
/// Per-cluster components with a scaling factor grow by
/// `1 + factor * floor(gpus / scaling_step_gpus)`. Generators are sized
/// N+1 on the cluster draw, UPS modules without redundancy.
pub fn calculate_infrastructure(
    data: &ReferenceData,
    gpus: u64,
    racks: u64,
    fabric: &str,
    include_optional: bool,
    gpu_model: &str,
) -> InfrastructureCost {
    let catalog = &data.infrastructure;
    let power = power_requirements(catalog, gpus, gpu_model);
    let generators = ceil_u64(power.total_mw / catalog.generator_mw) + 1;
    let ups_modules = ceil_u64(power.total_mw / catalog.ups_module_mw);
    let scale_steps = (gpus as f64 / catalog.scaling_step_gpus).floor();

    let mut breakdown = Vec::with_capacity(catalog.components.len());
    for c in &catalog.components {
        if c.optional && !include_optional {
            continue;
        }
        if let Some(only) = &c.fabric {
            if !fabric.starts_with(only.as_str()) {
                continue;
            }
        }
        let quantity = match (c.cost_model, c.sizing) {
            (_, Some(PowerSizing::Generators)) => generators as f64,
            (_, Some(PowerSizing::Ups)) => ups_modules as f64,
            (CostModel::PerGpu, None) => gpus as f64,
            (CostModel::PerNode, None) => (gpus as f64 / catalog.gpus_per_node).ceil(),
            (CostModel::PerRack, None) => racks as f64,
            (CostModel::PerCluster, None) => 1.0 + c.scaling_factor.unwrap_or(0.0) * scale_steps,
        };
        breakdown.push(InfrastructureLine {
            id: c.id.clone(),
            name: c.name.clone(),
            category: c.category.clone(),
            quantity,
            capex: c.base_cost * quantity,
            annual_opex: c.annual_cost * quantity,
        });
    }

    let cost = InfrastructureCost {
        total_capex: breakdown.iter().map(|l| l.capex).sum(),
        total_annual_opex: breakdown.iter().map(|l| l.annual_opex).sum(),
        power,
        breakdown,
    };
    debug!(
        "infrastructure: {} components, capex ${:.0}, opex ${:.0}/yr, {} generators",
        cost.breakdown.len(),
        cost.total_capex,
        cost.total_annual_opex,
        generators
    );
    cost
}
