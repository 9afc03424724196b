//! Full cluster TCO: CAPEX, annual OPEX, unit costs and the revenue model.

use std::fmt::{Display, Formatter, Result as FmtResult};

use log::{debug, info};
use serde::Serialize;

use crate::config::Configuration;
use crate::error::Result;
use crate::infrastructure::{InfrastructureCost, calculate_infrastructure};
use crate::network::{NetworkDesign, calculate_network};
use crate::pricing::{CostBasis, RevenueModel, revenue_model};
use crate::reference::{ReferenceData, ResolvedRegion};
use crate::software::{StackCost, calculate_stack_cost};
use crate::storage::{GB_PER_PB, StorageCost, cost_tiers};

/// One line of a CAPEX or OPEX breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownLine {
    pub name: String,
    pub detail: String,
    pub amount: f64,
    /// Share of the breakdown total, percent.
    pub percent: f64,
}

fn breakdown(lines: Vec<(&str, String, f64)>) -> Vec<BreakdownLine> {
    let total: f64 = lines.iter().map(|(_, _, a)| a).sum();
    lines
        .into_iter()
        .map(|(name, detail, amount)| BreakdownLine {
            name: name.to_string(),
            detail,
            amount,
            percent: if total > 0.0 { amount / total * 100.0 } else { 0.0 },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapexSummary {
    pub gpu: f64,
    pub storage: f64,
    /// Switches, cabling, optics and DPUs.
    pub network: f64,
    pub cooling: f64,
    pub datacenter: f64,
    pub software: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpexSummary {
    pub power: f64,
    pub cooling: f64,
    pub staff: f64,
    pub maintenance: f64,
    pub bandwidth: f64,
    pub licenses: f64,
    pub storage_operations: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSizing {
    pub requested_gpus: u64,
    /// GPUs in whole systems.
    pub actual_gpus: u64,
    pub systems: u64,
    pub gpus_per_system: u32,
    pub unit_price: f64,
    pub gpu_power_mw: f64,
    pub it_power_mw: f64,
    pub pue: f64,
    /// Facility draw, IT power times PUE.
    pub total_power_mw: f64,
    pub energy_rate_usd: f64,
    pub region: ResolvedRegion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcoResults {
    pub sizing: ClusterSizing,
    pub capex: CapexSummary,
    pub opex: OpexSummary,
    pub capex_breakdown: Vec<BreakdownLine>,
    pub opex_breakdown: Vec<BreakdownLine>,
    pub cost_per_gpu_hour: f64,
    pub tco_5year: f64,
    pub tco_10year: f64,
    /// Five-year TCO per GPU.
    pub tco_per_gpu: f64,
    /// Aggregate fabric bandwidth, Pb/s.
    pub network_bandwidth_pbps: f64,
    /// Storage CAPEX amortised over 60 months, per usable GB.
    pub storage_cost_per_gb_month: f64,
    pub storage: StorageCost,
    pub network: NetworkDesign,
    pub infrastructure: InfrastructureCost,
    pub software: StackCost,
    pub revenue: RevenueModel,
}

/// Computes the TCO of a configured cluster.
///
/// The configuration is validated first. The result is a pure function of
/// `config` and `data`.
///
/// # Errors
///
/// Any validation error, plus [`crate::TcoError::Arithmetic`] when the
/// cluster sells no GPU-hours (zero utilization).
///
/// # Formulas
///
/// ```text
/// systems      = ceil(num_gpus / rack_size)
/// actual_gpus  = systems * rack_size
/// gpu_power    = systems * rack_power_w / 1e6                      (MW)
/// total_power  = (gpu_power + storage_power + dpu_power) * pue     (MW)
/// power_opex   = total_power * 1000 * rate * 8760 * multiplier
/// datacenter   = total_power * cost_per_mw
/// cost_per_hr  = (capex / depreciation + opex) / (actual_gpus * 8760 * utilization)
/// ```
///
/// # Examples
///
/// ```
/// use gpu_tco_planner::{Configuration, ReferenceData, calculate_tco};
///
/// let config = Configuration::from_toml_str(r#"
///     gpu_model = "gb200"
///     num_gpus = 10000
///     cooling = "liquid"
///     region = "us-texas"
///     utilization = 90.0
///     depreciation_years = 5
///
///     [storage]
///     total_pb = 50.0
///
///     [network]
///     fabric = "infiniband"
///     topology = "fat-tree"
/// "#).unwrap();
/// let data = ReferenceData::builtin().unwrap();
///
/// let r = calculate_tco(&config, &data).unwrap();
/// assert_eq!(r.sizing.actual_gpus, 10_008);
/// assert!((r.tco_5year - (r.capex.total + 5.0 * r.opex.total)).abs() < 1e-3);
/// ```
pub fn calculate_tco(config: &Configuration, data: &ReferenceData) -> Result<TcoResults> {
    config.validate(data)?;
    let facility = &data.assumptions.facility;
    let ov = &config.overrides;
    let gpu = data.gpu(&config.gpu_model)?;
    let region = data.resolve_region(&config.region)?;

    let rack_size = u64::from(gpu.rack_size);
    let systems = config.num_gpus.div_ceil(rack_size);
    let actual_gpus = systems * rack_size;
    let unit_price = ov.gpu_unit_price.unwrap_or(gpu.unit_price);
    let gpu_capex = unit_price * actual_gpus as f64;

    let tiers = config.storage.tiers(data)?;
    let storage = cost_tiers(config.storage.total_pb, &tiers, data)?;
    // The fabric is cabled for every installed GPU, not only the requested ones.
    let network = calculate_network(actual_gpus, gpu, &config.network, &ov.network, data)?;

    let gpu_power_mw = systems as f64 * gpu.rack_power_w / 1e6;
    let dpu_power_mw = network.power.dpus_w / 1e6;
    let it_power_mw = gpu_power_mw + storage.total_power_mw + dpu_power_mw;
    let pue = ov
        .pue
        .or_else(|| gpu.pue.get(config.cooling))
        .unwrap_or(region.pue);
    let total_power_mw = it_power_mw * pue;
    let energy_rate = ov.energy_rate.unwrap_or(region.rate_usd);
    let power_opex = total_power_mw
        * 1000.0
        * energy_rate
        * facility.hours_per_year
        * ov.power_cost_multiplier.unwrap_or(1.0);

    let cooling_capex = gpu_power_mw
        * 1000.0
        * ov
            .cooling_capex_per_kw
            .unwrap_or(facility.cooling_capex_per_kw.get(config.cooling));
    let datacenter_capex = total_power_mw
        * ov
            .datacenter_cost_per_mw
            .unwrap_or(facility.datacenter_cost_per_mw);
    let software = calculate_stack_cost(
        data,
        &config.software.stack,
        actual_gpus,
        facility.software_term_years,
        config.software.support,
    )?;
    let infrastructure = calculate_infrastructure(
        data,
        actual_gpus,
        systems,
        &config.network.fabric,
        true,
        &config.gpu_model,
    );

    let capex = CapexSummary {
        gpu: gpu_capex,
        storage: storage.total_capex,
        network: network.costs.total,
        cooling: cooling_capex,
        datacenter: datacenter_capex,
        software: software.upfront_cost,
        total: gpu_capex
            + storage.total_capex
            + network.costs.total
            + cooling_capex
            + datacenter_capex
            + software.upfront_cost,
    };

    let cooling_opex = power_opex
        * ov
            .cooling_opex_ratio
            .unwrap_or(facility.cooling_opex_ratio.get(config.cooling));
    let staff = infrastructure.total_annual_opex * ov.staff_multiplier.unwrap_or(1.0);
    let maintenance_percent = ov
        .maintenance_percent
        .unwrap_or(facility.maintenance_percent);
    let maintenance =
        (gpu_capex + network.costs.total + storage.total_capex) * maintenance_percent / 100.0;
    let bandwidth_rate = ov
        .bandwidth_cost_per_gpu
        .unwrap_or(facility.bandwidth_cost_per_gpu);
    let bandwidth = actual_gpus as f64 * bandwidth_rate;
    let licenses = match ov.software_license_cost_per_gpu {
        Some(per_gpu) => per_gpu * actual_gpus as f64,
        None => software.annual_cost,
    };
    let storage_ops_rate = ov
        .storage_ops_cost_per_gb_month
        .unwrap_or(facility.storage_ops_cost_per_gb_month);
    let storage_operations = config.storage.total_pb * GB_PER_PB * storage_ops_rate * 12.0;

    let opex = OpexSummary {
        power: power_opex,
        cooling: cooling_opex,
        staff,
        maintenance,
        bandwidth,
        licenses,
        storage_operations,
        total: power_opex
            + cooling_opex
            + staff
            + maintenance
            + bandwidth
            + licenses
            + storage_operations,
    };
    debug!(
        "tco: {} systems, {:.2} MW facility, capex ${:.0}, opex ${:.0}/yr",
        systems, total_power_mw, capex.total, opex.total
    );

    let revenue = revenue_model(
        &CostBasis {
            total_capex: capex.total,
            annual_opex: opex.total,
            depreciation_years: config.depreciation_years,
            gpus: actual_gpus,
            utilization_percent: config.utilization,
        },
        &config.service_tiers,
        &config.modifiers,
        data,
    )?;

    let capex_breakdown = breakdown(vec![
        (
            "GPU Hardware",
            format!("{actual_gpus} GPUs in {systems} systems at ${unit_price:.0}"),
            capex.gpu,
        ),
        (
            "Storage Systems",
            format!("{:.1} PB over {} tiers", storage.total_capacity_pb, storage.tiers.len()),
            capex.storage,
        ),
        (
            "Networking",
            format!("{} switches, {} DPUs", network.switches.total(), network.dpus),
            capex.network,
        ),
        (
            "Cooling Infrastructure",
            format!("{:.0} kW {}", gpu_power_mw * 1000.0, config.cooling.as_str()),
            capex.cooling,
        ),
        (
            "Data Center Infrastructure",
            format!("{total_power_mw:.1} MW"),
            capex.datacenter,
        ),
        ("Software Setup", software.stack.clone(), capex.software),
    ]);
    let opex_breakdown = breakdown(vec![
        (
            "Power",
            format!("{total_power_mw:.1} MW at ${energy_rate:.4}/kWh ({})", region.name),
            opex.power,
        ),
        ("Cooling", config.cooling.as_str().to_string(), opex.cooling),
        (
            "Staff",
            format!("{} infrastructure lines", infrastructure.breakdown.len()),
            opex.staff,
        ),
        (
            "Maintenance",
            format!("{maintenance_percent}% of hardware"),
            opex.maintenance,
        ),
        ("Bandwidth", format!("${bandwidth_rate:.0}/GPU"), opex.bandwidth),
        ("Software Licenses", software.stack.clone(), opex.licenses),
        (
            "Storage Operations",
            format!("${storage_ops_rate}/GB/month"),
            opex.storage_operations,
        ),
    ]);

    let tco_5year = capex.total + 5.0 * opex.total;
    let tco_10year = capex.total + 10.0 * opex.total;
    let fabric_tbps = if config.network.fabric.starts_with("infiniband") {
        facility.reported_bandwidth_tbps_per_gpu.infiniband
    } else {
        facility.reported_bandwidth_tbps_per_gpu.other
    };
    let storage_cost_per_gb_month = if config.storage.total_pb > 0.0 {
        storage.total_capex / (config.storage.total_pb * GB_PER_PB) / 60.0
    } else {
        0.0
    };

    let results = TcoResults {
        sizing: ClusterSizing {
            requested_gpus: config.num_gpus,
            actual_gpus,
            systems,
            gpus_per_system: gpu.rack_size,
            unit_price,
            gpu_power_mw,
            it_power_mw,
            pue,
            total_power_mw,
            energy_rate_usd: energy_rate,
            region,
        },
        cost_per_gpu_hour: revenue.base_cost_per_gpu_hour,
        tco_5year,
        tco_10year,
        tco_per_gpu: tco_5year / actual_gpus as f64,
        network_bandwidth_pbps: actual_gpus as f64 * fabric_tbps / 1000.0,
        storage_cost_per_gb_month,
        capex,
        opex,
        capex_breakdown,
        opex_breakdown,
        storage,
        network,
        infrastructure,
        software,
        revenue,
    };
    info!(
        "{} x {}: 5-year TCO ${:.0}, ${:.3}/GPU-hr",
        results.sizing.actual_gpus, gpu.name, results.tco_5year, results.cost_per_gpu_hour
    );
    Ok(results)
}

impl Display for TcoResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = &self.sizing;
        writeln!(
            f,
            "GPUs:            {} requested, {} deployed in {} systems of {}",
            s.requested_gpus, s.actual_gpus, s.systems, s.gpus_per_system
        )?;
        writeln!(
            f,
            "Power:           {:.2} MW IT, PUE {:.2}, {:.2} MW facility",
            s.it_power_mw, s.pue, s.total_power_mw
        )?;
        writeln!(
            f,
            "Region:          {} (${:.4}/kWh)",
            s.region.name, s.energy_rate_usd
        )?;
        writeln!(f)?;
        writeln!(f, "CAPEX:           ${:.0}", self.capex.total)?;
        for l in &self.capex_breakdown {
            writeln!(
                f,
                "  {:<28} ${:>16.0}  {:>5.1}%  {}",
                l.name, l.amount, l.percent, l.detail
            )?;
        }
        writeln!(f, "Annual OPEX:     ${:.0}", self.opex.total)?;
        for l in &self.opex_breakdown {
            writeln!(
                f,
                "  {:<28} ${:>16.0}  {:>5.1}%  {}",
                l.name, l.amount, l.percent, l.detail
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Cost per GPU-hr: ${:.3}", self.cost_per_gpu_hour)?;
        writeln!(f, "5-year TCO:      ${:.0}", self.tco_5year)?;
        writeln!(f, "10-year TCO:     ${:.0}", self.tco_10year)?;
        writeln!(f, "TCO per GPU:     ${:.0}", self.tco_per_gpu)?;
        writeln!(f, "Fabric:          {:.2} Pb/s", self.network_bandwidth_pbps)?;
        writeln!(
            f,
            "Storage:         ${:.5}/GB/month",
            self.storage_cost_per_gb_month
        )?;
        writeln!(f)?;
        write!(f, "{}", self.revenue)
    }
}
