//! Service-tier pricing: from the raw cost of a GPU-hour to a blended
//! selling rate, annual revenue and margins.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TcoError, checked_div};
use crate::reference::ReferenceData;
use crate::workload::ServiceTier;

/// Yearly revenue growth used in the cash-flow projection.
pub const REVENUE_GROWTH: f64 = 0.05;
/// Yearly OPEX inflation used in the cash-flow projection.
pub const COST_INFLATION: f64 = 0.03;

/// Raw cost of one sold GPU-hour: depreciation plus OPEX over the hours
/// actually sold.
///
/// # Errors
///
/// [`TcoError::Arithmetic`] when no GPU-hours are sold (zero GPUs or zero
/// utilization) and [`TcoError::Configuration`] for a zero depreciation
/// period.
///
/// # Examples
///
/// ```
/// use gpu_tco_planner::pricing::base_cost_per_gpu_hour;
///
/// let cost = base_cost_per_gpu_hour(8_760_000.0, 0.0, 1, 1000, 100.0, 8760.0).unwrap();
/// assert!((cost - 1.0).abs() < 1e-12);
/// assert!(base_cost_per_gpu_hour(1.0, 1.0, 1, 1000, 0.0, 8760.0).is_err());
/// ```
pub fn base_cost_per_gpu_hour(
    total_capex: f64,
    annual_opex: f64,
    depreciation_years: u32,
    gpus: u64,
    utilization_percent: f64,
    hours_per_year: f64,
) -> Result<f64> {
    if depreciation_years == 0 {
        return Err(TcoError::config("depreciation_years must be > 0"));
    }
    let gpu_hours = gpus as f64 * hours_per_year * utilization_percent / 100.0;
    checked_div(
        total_capex / f64::from(depreciation_years) + annual_opex,
        gpu_hours,
        "cost per GPU-hour (no GPU-hours sold)",
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    pub extreme: bool,
    pub high: bool,
    pub balanced: bool,
    pub cost: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceOptions {
    pub hipaa: bool,
    pub fedramp: bool,
    pub secnum: bool,
    pub airgap: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SustainabilityOptions {
    pub renewable: bool,
    pub carbon: bool,
    pub netzero: bool,
}

/// Add-ons sold on top of every tier. Each adds its premium to the tier
/// price multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceModifiers {
    pub storage: StorageOptions,
    pub compliance: ComplianceOptions,
    pub sustainability: SustainabilityOptions,
}

impl ServiceModifiers {
    /// Sum of the premiums of every selected add-on.
    pub fn premium(&self, data: &ReferenceData) -> f64 {
        let p = &data.assumptions.pricing;
        let pick = |on: bool, value: f64| if on { value } else { 0.0 };
        pick(self.storage.extreme, p.storage.extreme)
            + pick(self.storage.high, p.storage.high)
            + pick(self.storage.balanced, p.storage.balanced)
            + pick(self.storage.cost, p.storage.cost)
            + pick(self.compliance.hipaa, p.compliance.hipaa)
            + pick(self.compliance.fedramp, p.compliance.fedramp)
            + pick(self.compliance.secnum, p.compliance.secnum)
            + pick(self.compliance.airgap, p.compliance.airgap)
            + pick(self.sustainability.renewable, p.sustainability.renewable)
            + pick(self.sustainability.carbon, p.sustainability.carbon)
            + pick(self.sustainability.netzero, p.sustainability.netzero)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierRevenue {
    pub id: String,
    pub name: String,
    pub percent: f64,
    pub multiplier: f64,
    /// Selling price per GPU-hour.
    pub rate: f64,
    pub annual_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowYear {
    pub year: u32,
    pub revenue: f64,
    pub opex: f64,
    pub ebitda: f64,
    pub net_income: f64,
    pub cumulative_cash_flow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueModel {
    pub base_cost_per_gpu_hour: f64,
    pub modifier_premium: f64,
    pub tiers: Vec<TierRevenue>,
    /// Share-weighted selling price per GPU-hour.
    pub blended_rate: f64,
    pub annual_revenue: f64,
    pub annual_depreciation: f64,
    pub ebitda: f64,
    pub ebitda_margin_percent: f64,
    /// EBITDA minus depreciation.
    pub net_income: f64,
    pub gross_margin_percent: f64,
    pub roi_percent: f64,
    /// `None` when revenue never covers OPEX.
    pub payback_years: Option<f64>,
    pub cash_flow: Vec<CashFlowYear>,
}

/// Cost and volume figures the revenue model prices against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBasis {
    pub total_capex: f64,
    pub annual_opex: f64,
    pub depreciation_years: u32,
    pub gpus: u64,
    pub utilization_percent: f64,
}

/// Prices each tier at `base * (multiplier + premium)` and blends the rates
/// by cluster share.
///
/// # Errors
///
/// Propagates [`base_cost_per_gpu_hour`] errors and returns
/// [`TcoError::Arithmetic`] when the model yields no revenue.
pub fn revenue_model(
    basis: &CostBasis,
    tiers: &[ServiceTier],
    modifiers: &ServiceModifiers,
    data: &ReferenceData,
) -> Result<RevenueModel> {
    let hours = data.assumptions.facility.hours_per_year;
    let base = base_cost_per_gpu_hour(
        basis.total_capex,
        basis.annual_opex,
        basis.depreciation_years,
        basis.gpus,
        basis.utilization_percent,
        hours,
    )?;
    let premium = modifiers.premium(data);
    let sold_hours = basis.gpus as f64 * hours * basis.utilization_percent / 100.0;

    let mut out = Vec::with_capacity(tiers.len());
    for tier in tiers {
        let multiplier = data.service_profile(tier.kind)?.price_multiplier;
        let rate = base * (multiplier + premium);
        out.push(TierRevenue {
            id: tier.id.clone(),
            name: tier.name.clone(),
            percent: tier.cluster_percent,
            multiplier,
            rate,
            annual_revenue: rate * sold_hours * tier.cluster_percent / 100.0,
        });
    }
    let blended_rate: f64 = out.iter().map(|t| t.rate * t.percent / 100.0).sum();
    let annual_revenue = blended_rate * sold_hours;

    let annual_depreciation = basis.total_capex / f64::from(basis.depreciation_years);
    let ebitda = annual_revenue - basis.annual_opex;
    let net_income = ebitda - annual_depreciation;
    let ebitda_margin_percent = checked_div(ebitda, annual_revenue, "EBITDA margin")? * 100.0;
    let gross_margin_percent = net_income / annual_revenue * 100.0;
    let roi_percent = if basis.total_capex > 0.0 {
        net_income / basis.total_capex * 100.0
    } else {
        0.0
    };
    let payback_years = (ebitda > 0.0).then(|| basis.total_capex / ebitda);

    let mut cash_flow = Vec::with_capacity(5);
    let mut cumulative = -basis.total_capex;
    for year in 1..=5u32 {
        let growth = (year - 1) as i32;
        let revenue = annual_revenue * (1.0 + REVENUE_GROWTH).powi(growth);
        let opex = basis.annual_opex * (1.0 + COST_INFLATION).powi(growth);
        let ebitda = revenue - opex;
        let net_income = ebitda - annual_depreciation;
        cumulative += net_income;
        cash_flow.push(CashFlowYear {
            year,
            revenue,
            opex,
            ebitda,
            net_income,
            cumulative_cash_flow: cumulative,
        });
    }

    Ok(RevenueModel {
        base_cost_per_gpu_hour: base,
        modifier_premium: premium,
        tiers: out,
        blended_rate,
        annual_revenue,
        annual_depreciation,
        ebitda,
        ebitda_margin_percent,
        net_income,
        gross_margin_percent,
        roi_percent,
        payback_years,
        cash_flow,
    })
}

impl Display for RevenueModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "Revenue model")?;
        writeln!(f, "  Base cost:     ${:.3}/GPU-hr", self.base_cost_per_gpu_hour)?;
        for t in &self.tiers {
            writeln!(
                f,
                "  {:<36} {:>5.1}%  x{:.2}  ${:>7.3}/GPU-hr  ${:>15.0}/yr",
                t.name, t.percent, t.multiplier, t.rate, t.annual_revenue
            )?;
        }
        writeln!(f, "  Blended rate:  ${:.3}/GPU-hr", self.blended_rate)?;
        writeln!(f, "  Revenue:       ${:.0}/yr", self.annual_revenue)?;
        writeln!(
            f,
            "  EBITDA:        ${:.0}/yr ({:.1}%)",
            self.ebitda, self.ebitda_margin_percent
        )?;
        writeln!(f, "  Net income:    ${:.0}/yr", self.net_income)?;
        writeln!(f, "  ROI:           {:.1}%", self.roi_percent)?;
        match self.payback_years {
            Some(y) => writeln!(f, "  Payback:       {y:.1} years"),
            None => writeln!(f, "  Payback:       never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::ServiceKind;

    fn data() -> ReferenceData {
        ReferenceData::builtin().unwrap()
    }

    fn pricing_mix() -> Vec<ServiceTier> {
        vec![
            ServiceTier::new("t1", "Bare metal", ServiceKind::BareMetalWhale, 30.0, 80.0),
            ServiceTier::new("t2", "Kubernetes", ServiceKind::OrchestratedK8s, 35.0, 65.0),
            ServiceTier::new("t3", "MLOps", ServiceKind::ManagedMlops, 25.0, 55.0),
            ServiceTier::new("t4", "Inference", ServiceKind::InferenceService, 10.0, 10.0),
        ]
    }

    fn basis() -> CostBasis {
        CostBasis {
            total_capex: 1_000_000_000.0,
            annual_opex: 100_000_000.0,
            depreciation_years: 5,
            gpus: 10_000,
            utilization_percent: 80.0,
        }
    }

    #[test]
    fn base_cost_formula() {
        let c = base_cost_per_gpu_hour(1e9, 1e8, 5, 10_000, 80.0, 8760.0).unwrap();
        let expected = (2e8 + 1e8) / (10_000.0 * 8760.0 * 0.8);
        assert!((c - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_utilization_is_arithmetic_error() {
        assert!(matches!(
            base_cost_per_gpu_hour(1e9, 1e8, 5, 10_000, 0.0, 8760.0),
            Err(TcoError::Arithmetic(_))
        ));
    }

    #[test]
    fn blended_rate_is_weighted_sum() {
        let d = data();
        let m = revenue_model(&basis(), &pricing_mix(), &ServiceModifiers::default(), &d).unwrap();
        let base = m.base_cost_per_gpu_hour;
        let expected = base * (0.30 * 1.0 + 0.35 * 1.45 + 0.25 * 2.2 + 0.10 * 3.0);
        assert!((m.blended_rate - expected).abs() < 1e-9);
        assert!(m.blended_rate >= base * 1.0 && m.blended_rate <= base * 3.0);
        let tier_sum: f64 = m.tiers.iter().map(|t| t.annual_revenue).sum();
        assert!((tier_sum - m.annual_revenue).abs() < 1e-3);
    }

    #[test]
    fn modifiers_add_premiums() {
        let d = data();
        let mut mods = ServiceModifiers::default();
        mods.storage.balanced = true;
        mods.sustainability.renewable = true;
        assert!((mods.premium(&d) - 0.18).abs() < 1e-12);

        let plain = revenue_model(&basis(), &pricing_mix(), &ServiceModifiers::default(), &d)
            .unwrap();
        let premium = revenue_model(&basis(), &pricing_mix(), &mods, &d).unwrap();
        let base = plain.base_cost_per_gpu_hour;
        assert!((premium.blended_rate - plain.blended_rate - base * 0.18).abs() < 1e-9);
    }

    #[test]
    fn single_tier_at_cost_and_no_revenue() {
        let d = data();
        let tiers = vec![ServiceTier::new(
            "t",
            "Bare metal",
            ServiceKind::BareMetalWhale,
            100.0,
            80.0,
        )];
        // Multiplier 1.0 recovers depreciation plus OPEX exactly.
        let m = revenue_model(&basis(), &tiers, &ServiceModifiers::default(), &d).unwrap();
        assert!(m.net_income.abs() < 1e-3);
        let payback = m.payback_years.unwrap();
        assert!((payback - basis().total_capex / m.ebitda).abs() < 1e-9);

        let idle = CostBasis {
            annual_opex: 0.0,
            total_capex: 0.0,
            ..basis()
        };
        assert!(matches!(
            revenue_model(&idle, &tiers, &ServiceModifiers::default(), &d),
            Err(TcoError::Arithmetic(_))
        ));
    }

    #[test]
    fn cash_flow_covers_five_years() {
        let d = data();
        let m = revenue_model(&basis(), &pricing_mix(), &ServiceModifiers::default(), &d).unwrap();
        assert_eq!(m.cash_flow.len(), 5);
        let first = &m.cash_flow[0];
        assert!((first.revenue - m.annual_revenue).abs() < 1e-6);
        assert!(
            (first.cumulative_cash_flow - (first.net_income - basis().total_capex)).abs() < 1e-3
        );
    }
}
