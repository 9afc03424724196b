//! Enhanced TCO: storage and infrastructure sized from the service-tier mix
//! rather than configured directly.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use log::debug;
use serde::Serialize;

use crate::config::Configuration;
use crate::error::{Result, checked_div};
use crate::reference::ReferenceData;
use crate::workload::{
    InfrastructureRequirements, StorageRequirements, infrastructure_requirements,
    recommended_architecture, storage_requirements,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedCapex {
    pub gpu_systems: f64,
    pub storage: f64,
    pub network: f64,
    pub power_cooling: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedOpex {
    pub power: f64,
    pub cooling: f64,
    pub staff: f64,
    pub maintenance: f64,
    pub software: f64,
    pub storage_operations: f64,
    pub total: f64,
}

/// Storage bought for one performance class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageLine {
    pub architecture: String,
    pub name: String,
    pub capacity_pb: f64,
    pub capex: f64,
    pub annual_opex: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedRevenue {
    pub annual_revenue: f64,
    pub revenue_per_gpu: f64,
    pub gross_margin_percent: f64,
    /// `None` when revenue does not cover OPEX.
    pub payback_years: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedTcoResults {
    pub requirements: StorageRequirements,
    pub infrastructure: InfrastructureRequirements,
    pub storage: Vec<StorageLine>,
    pub capex: EnhancedCapex,
    pub opex: EnhancedOpex,
    pub horizon_years: u32,
    pub opex_over_horizon: f64,
    pub tco: f64,
    pub tco_per_gpu: f64,
    /// TCO allocated by cluster share, keyed by tier id.
    pub tco_per_tier: BTreeMap<String, f64>,
    pub revenue: EnhancedRevenue,
}

/// TCO of a cluster whose storage, network ports and licences follow from
/// its service tiers.
///
/// # Formulas
///
/// ```text
/// power_kw = power_w * gpus * utilization * pue / 1000 + storage_kw
/// staff    = fte_cost * ceil(gpus / 5000) * (tiers + 2 if extreme storage)
/// revenue  = sum(tier_gpus * revenue_per_gpu) * utilization
/// ```
pub fn calculate_enhanced_tco(
    config: &Configuration,
    data: &ReferenceData,
) -> Result<EnhancedTcoResults> {
    config.validate(data)?;
    let a = &data.assumptions.enhanced;
    let ov = &config.overrides;
    let gpu = data.gpu(&config.gpu_model)?;
    let region = data.resolve_region(&config.region)?;
    let gpus = config.num_gpus;
    let utilization = config.utilization / 100.0;

    let requirements = storage_requirements(&config.service_tiers, gpus, data)?;
    let infra = infrastructure_requirements(&requirements, gpus, data);

    let mut storage = Vec::new();
    for rec in recommended_architecture(&requirements, data)? {
        let arch = data.storage_architecture(&rec.architecture)?;
        storage.push(StorageLine {
            capex: rec.capacity_pb * arch.capex_per_pb,
            annual_opex: rec.capacity_pb * arch.opex_per_pb,
            architecture: rec.architecture,
            name: rec.name,
            capacity_pb: rec.capacity_pb,
            rationale: rec.rationale,
        });
    }
    let storage_capex: f64 = storage.iter().map(|s| s.capex).sum();
    let storage_opex: f64 = storage.iter().map(|s| s.annual_opex).sum();

    let gpu_capex = ov.gpu_unit_price.unwrap_or(gpu.unit_price) * gpus as f64;
    let network_capex = infra.network.infiniband_switches as f64 * a.switch_cost
        + infra.network.storage_network_ports as f64 * a.storage_port_cost;
    let power_cooling_capex = infra.power.storage_power_kw * a.power_capex_per_kw
        + infra.power.additional_racks as f64 * a.rack_capex;
    let capex = EnhancedCapex {
        gpu_systems: gpu_capex,
        storage: storage_capex,
        network: network_capex,
        power_cooling: power_cooling_capex,
        total: gpu_capex + storage_capex + network_capex + power_cooling_capex,
    };

    let pue = a.pue.get(config.cooling);
    let power_kw = gpu.power_w * gpus as f64 * utilization * pue / 1000.0
        + infra.power.storage_power_kw;
    let power = power_kw
        * data.assumptions.facility.hours_per_year
        * ov.energy_rate.unwrap_or(region.rate_usd);
    let cooling = power * a.cooling_opex_ratio;
    let complexity = config.service_tiers.len() as f64
        + if requirements.distribution.extreme > 0.0 {
            a.extreme_storage_complexity
        } else {
            0.0
        };
    let staff = ov.staff_cost_per_fte.unwrap_or(a.staff_cost_per_fte)
        * (gpus as f64 / a.gpus_per_staff_unit).ceil()
        * complexity;
    let maintenance = (gpu_capex + storage_capex) * ov.maintenance_ratio.unwrap_or(a.maintenance_ratio);
    let software = infra.software.kubernetes_license
        + infra.software.monitoring_stack
        + infra.software.vast_license / a.license_amortization_years;
    let opex = EnhancedOpex {
        power,
        cooling,
        staff,
        maintenance,
        software,
        storage_operations: storage_opex,
        total: power + cooling + staff + maintenance + software + storage_opex,
    };

    let horizon = f64::from(a.horizon_years);
    let opex_over_horizon = opex.total * horizon;
    let tco = capex.total + opex_over_horizon;
    let tco_per_tier = config
        .service_tiers
        .iter()
        .map(|t| (t.id.clone(), tco * t.cluster_percent / 100.0))
        .collect();

    let mut annual_revenue = 0.0;
    for tier in &config.service_tiers {
        let tier_gpus = tier.cluster_percent / 100.0 * gpus as f64;
        annual_revenue += tier_gpus * data.service_profile(tier.kind)?.revenue_per_gpu;
    }
    annual_revenue *= utilization;
    let profit = annual_revenue - opex.total;
    let revenue = EnhancedRevenue {
        annual_revenue,
        revenue_per_gpu: annual_revenue / gpus as f64,
        gross_margin_percent: checked_div(profit, annual_revenue, "gross margin (no revenue)")?
            * 100.0,
        payback_years: (profit > 0.0).then(|| capex.total / profit),
    };
    debug!(
        "enhanced: {:.1} PB storage, capex ${:.0}, opex ${:.0}/yr, revenue ${:.0}/yr",
        requirements.total_capacity_pb(),
        capex.total,
        opex.total,
        revenue.annual_revenue
    );

    Ok(EnhancedTcoResults {
        requirements,
        infrastructure: infra,
        storage,
        capex,
        opex,
        horizon_years: a.horizon_years,
        opex_over_horizon,
        tco,
        tco_per_gpu: tco / gpus as f64,
        tco_per_tier,
        revenue,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiMetrics {
    pub annual_profit: f64,
    pub roi_percent: f64,
    /// Annual profit over CAPEX, a constant-cash-flow IRR proxy.
    pub simple_irr_percent: f64,
    pub npv: f64,
    /// `None` when the cluster never breaks even.
    pub break_even_months: Option<f64>,
}

/// Return on the enhanced TCO over its horizon, discounting at the
/// reference discount rate.
pub fn roi_metrics(results: &EnhancedTcoResults, data: &ReferenceData) -> Result<RoiMetrics> {
    let a = &data.assumptions.enhanced;
    let capex = results.capex.total;
    let annual_profit = results.revenue.annual_revenue - results.opex.total;
    let horizon = f64::from(a.horizon_years);

    let roi_percent =
        checked_div(annual_profit * horizon - capex, capex, "ROI (no CAPEX)")? * 100.0;
    let simple_irr_percent = annual_profit / capex * 100.0;
    let npv = (1..=a.horizon_years).fold(-capex, |npv, year| {
        npv + annual_profit / (1.0 + a.discount_rate).powi(year as i32)
    });

    Ok(RoiMetrics {
        annual_profit,
        roi_percent,
        simple_irr_percent,
        npv,
        break_even_months: (annual_profit > 0.0).then(|| capex / (annual_profit / 12.0)),
    })
}

impl Display for EnhancedTcoResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.requirements)?;
        writeln!(f)?;
        writeln!(f, "Storage architecture:")?;
        for s in &self.storage {
            writeln!(
                f,
                "  {:<20} {:>8.2} PB  capex ${:>14.0}  ({})",
                s.name, s.capacity_pb, s.capex, s.rationale
            )?;
        }
        writeln!(f)?;
        writeln!(f, "CAPEX:              ${:.0}", self.capex.total)?;
        writeln!(f, "  GPU systems:      ${:.0}", self.capex.gpu_systems)?;
        writeln!(f, "  Storage:          ${:.0}", self.capex.storage)?;
        writeln!(f, "  Network:          ${:.0}", self.capex.network)?;
        writeln!(f, "  Power & cooling:  ${:.0}", self.capex.power_cooling)?;
        writeln!(f, "Annual OPEX:        ${:.0}", self.opex.total)?;
        writeln!(f, "  Power:            ${:.0}", self.opex.power)?;
        writeln!(f, "  Cooling:          ${:.0}", self.opex.cooling)?;
        writeln!(f, "  Staff:            ${:.0}", self.opex.staff)?;
        writeln!(f, "  Maintenance:      ${:.0}", self.opex.maintenance)?;
        writeln!(f, "  Software:         ${:.0}", self.opex.software)?;
        writeln!(f, "  Storage ops:      ${:.0}", self.opex.storage_operations)?;
        writeln!(f, "{}-year TCO:         ${:.0}", self.horizon_years, self.tco)?;
        writeln!(f, "TCO per GPU:        ${:.0}", self.tco_per_gpu)?;
        for (id, tco) in &self.tco_per_tier {
            writeln!(f, "  {id:<18}${tco:.0}")?;
        }
        writeln!(f, "Revenue:            ${:.0}/yr", self.revenue.annual_revenue)?;
        writeln!(f, "Gross margin:       {:.1}%", self.revenue.gross_margin_percent)?;
        match self.revenue.payback_years {
            Some(y) => writeln!(f, "Payback:            {y:.1} years"),
            None => writeln!(f, "Payback:            never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TcoError;
    use crate::workload::{ServiceKind, ServiceTier};

    const CONFIG: &str = r#"
gpu_model = "h100-sxm"
num_gpus = 10000
cooling = "liquid"
region = "us-virginia"
utilization = 100.0
depreciation_years = 5

[storage]
total_pb = 10.0

[network]
fabric = "infiniband"
topology = "fat-tree"
"#;

    fn setup() -> (Configuration, ReferenceData) {
        (
            Configuration::from_toml_str(CONFIG).unwrap(),
            ReferenceData::builtin().unwrap(),
        )
    }

    #[test]
    fn capex_components_close() {
        let (c, d) = setup();
        let r = calculate_enhanced_tco(&c, &d).unwrap();
        let sum = r.capex.gpu_systems + r.capex.storage + r.capex.network + r.capex.power_cooling;
        assert!((r.capex.total - sum).abs() < 1e-3);
        let storage: f64 = r.storage.iter().map(|s| s.capex).sum();
        assert!((r.capex.storage - storage).abs() < 1e-6);
        assert!((r.tco - (r.capex.total + 5.0 * r.opex.total)).abs() < 1e-3);
    }

    #[test]
    fn staff_scales_with_complexity() {
        let (c, d) = setup();
        let r = calculate_enhanced_tco(&c, &d).unwrap();
        // Four tiers plus extreme storage, two staff units of 5000 GPUs.
        assert!((r.opex.staff - 150_000.0 * 2.0 * 6.0).abs() < 1e-6);
    }

    #[test]
    fn per_tier_tco_follows_cluster_share() {
        let (c, d) = setup();
        let r = calculate_enhanced_tco(&c, &d).unwrap();
        let total: f64 = r.tco_per_tier.values().sum();
        assert!((total - r.tco).abs() < 1e-3);
        assert!((r.tco_per_tier["tier1_whale"] - 0.2 * r.tco).abs() < 1e-3);
    }

    #[test]
    fn revenue_uses_service_profiles_and_utilization() {
        let (mut c, d) = setup();
        c.service_tiers = vec![ServiceTier::new(
            "whale",
            "Bare metal",
            ServiceKind::BareMetalWhale,
            100.0,
            80.0,
        )];
        c.utilization = 50.0;
        let r = calculate_enhanced_tco(&c, &d).unwrap();
        assert!((r.revenue.annual_revenue - 10_000.0 * 50_000.0 * 0.5).abs() < 1e-3);
        assert!((r.revenue.revenue_per_gpu - 25_000.0).abs() < 1e-9);
    }

    #[test]
    fn payback_is_none_when_unprofitable() {
        let (mut c, d) = setup();
        c.overrides.energy_rate = Some(100.0);
        let r = calculate_enhanced_tco(&c, &d).unwrap();
        assert!(r.revenue.payback_years.is_none());
        assert!(r.revenue.gross_margin_percent < 0.0);
        let roi = roi_metrics(&r, &d).unwrap();
        assert!(roi.break_even_months.is_none());
        assert!(roi.npv < 0.0);
    }

    #[test]
    fn roi_metrics_formulas() {
        let (c, d) = setup();
        let r = calculate_enhanced_tco(&c, &d).unwrap();
        let m = roi_metrics(&r, &d).unwrap();
        let profit = r.revenue.annual_revenue - r.opex.total;
        assert!((m.annual_profit - profit).abs() < 1e-6);
        let npv: f64 = -r.capex.total
            + (1..=5)
                .map(|y| profit / 1.1f64.powi(y))
                .sum::<f64>();
        assert!((m.npv - npv).abs() < 1e-3);
        if profit > 0.0 {
            let months = m.break_even_months.unwrap();
            assert!((months - r.capex.total / profit * 12.0).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_utilization_has_no_revenue() {
        let (mut c, d) = setup();
        c.utilization = 0.0;
        assert!(matches!(
            calculate_enhanced_tco(&c, &d),
            Err(TcoError::Arithmetic(_))
        ));
    }
}
