//! Cluster software stacks: licences, support contracts and the engineers
//! needed to run them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TcoError, checked_div};
use crate::reference::ReferenceData;

/// Per-GPU yearly price of the paid support levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SupportPricing {
    pub business: f64,
    pub enterprise: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareComponent {
    pub name: String,
    pub category: String,
    pub cost_per_gpu_year: f64,
    pub setup_cost: f64,
    /// When present, a paid support tier replaces `cost_per_gpu_year`.
    #[serde(default)]
    pub support: Option<SupportPricing>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareStack {
    pub name: String,
    pub required_ftes: f64,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareCatalog {
    /// Loaded yearly cost of one platform engineer.
    pub fte_cost: f64,
    pub components: BTreeMap<String, SoftwareComponent>,
    pub stacks: BTreeMap<String, SoftwareStack>,
}

impl SoftwareCatalog {
    pub(crate) fn validate(&self) -> Result<()> {
        for (id, stack) in &self.stacks {
            if stack.required_ftes < 0.0 {
                return Err(TcoError::config(format!(
                    "software stack '{id}' has negative required_ftes"
                )));
            }
            for component in &stack.components {
                if !self.components.contains_key(component) {
                    return Err(TcoError::lookup("software component", component.as_str()));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportTier {
    Community,
    #[default]
    Business,
    Enterprise,
}

impl ReferenceData {
    pub fn software_stack(&self, id: &str) -> Result<&SoftwareStack> {
        self.software
            .stacks
            .get(id)
            .ok_or_else(|| TcoError::lookup("software stack", id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackLine {
    pub component: String,
    pub category: String,
    pub annual_cost: f64,
    pub setup_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackCost {
    pub stack: String,
    pub upfront_cost: f64,
    /// Licences, support and engineering staff per year.
    pub annual_cost: f64,
    pub total_cost: f64,
    pub per_gpu_year: f64,
    pub breakdown: Vec<StackLine>,
}

/// Cost of running `stack_id` on `gpus` GPUs for `years` years.
///
/// Components with support pricing are billed at the `support` tier
/// unless it is `Community`. Engineering staff appears as its own line.
///
/// # Errors
///
/// [`TcoError::Lookup`] for an unknown stack and
/// [`TcoError::Arithmetic`] when `gpus` or `years` is zero.
pub fn calculate_stack_cost(
    data: &ReferenceData,
    stack_id: &str,
    gpus: u64,
    years: u32,
    support: SupportTier,
) -> Result<StackCost> {
    let stack = data.software_stack(stack_id)?;
    let mut breakdown = Vec::with_capacity(stack.components.len() + 1);

    for id in &stack.components {
        let component = data
            .software
            .components
            .get(id)
            .ok_or_else(|| TcoError::lookup("software component", id.as_str()))?;
        let per_gpu = match (component.support, support) {
            (Some(p), SupportTier::Business) => p.business,
            (Some(p), SupportTier::Enterprise) => p.enterprise,
            _ => component.cost_per_gpu_year,
        };
        breakdown.push(StackLine {
            component: component.name.clone(),
            category: component.category.clone(),
            annual_cost: per_gpu * gpus as f64,
            setup_cost: component.setup_cost,
        });
    }
    breakdown.push(StackLine {
        component: "Engineering Staff".into(),
        category: "operational".into(),
        annual_cost: stack.required_ftes * data.software.fte_cost,
        setup_cost: 0.0,
    });

    let upfront_cost: f64 = breakdown.iter().map(|l| l.setup_cost).sum();
    let annual_cost: f64 = breakdown.iter().map(|l| l.annual_cost).sum();
    let total_cost = upfront_cost + annual_cost * f64::from(years);
    let per_gpu_year = checked_div(
        total_cost,
        gpus as f64 * f64::from(years),
        "software cost per GPU-year",
    )?;

    Ok(StackCost {
        stack: stack.name.clone(),
        upfront_cost,
        annual_cost,
        total_cost,
        per_gpu_year,
        breakdown,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Budget {
    Low,
    Medium,
    High,
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expertise {
    Basic,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorPreference {
    Nvidia,
    Dell,
    Opensource,
    #[default]
    Agnostic,
}

/// What an operator asks of the software stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackRequirements {
    pub gpus: u64,
    pub budget: Budget,
    pub expertise: Expertise,
    pub support: SupportTier,
    #[serde(default)]
    pub compliance: Vec<String>,
    #[serde(default)]
    pub vendor: VendorPreference,
}

/// Stack id for a set of requirements.
///
/// Rules are checked in order: sovereignty compliance, budget and
/// expertise, vendor preference, then scale.
pub fn recommend_stack(req: &StackRequirements) -> &'static str {
    if req
        .compliance
        .iter()
        .any(|c| c.eq_ignore_ascii_case("secnumcloud"))
    {
        return "hybrid-balanced";
    }
    if req.budget == Budget::Low && req.expertise == Expertise::Advanced {
        return "opensource-optimized";
    }
    if req.budget == Budget::Unlimited && req.support == SupportTier::Enterprise {
        return "nvidia-maximum";
    }
    match req.vendor {
        VendorPreference::Dell => return "omnia-enterprise",
        VendorPreference::Nvidia => return "nvidia-maximum",
        _ => {}
    }
    if req.gpus < 1000 {
        return if req.budget == Budget::Low {
            "opensource-optimized"
        } else {
            "hybrid-balanced"
        };
    }
    if req.gpus >= 50_000 {
        return if req.support == SupportTier::Enterprise {
            "nvidia-maximum"
        } else {
            "omnia-enterprise"
        };
    }
    "hybrid-balanced"
}

/// A stack at least 20% cheaper per GPU-year than the current one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackAlternative {
    pub id: String,
    pub name: String,
    pub per_gpu_year: f64,
    pub savings_per_gpu_year: f64,
    pub required_ftes: f64,
}

pub fn cheaper_alternatives(
    data: &ReferenceData,
    current: &str,
    gpus: u64,
    years: u32,
    support: SupportTier,
) -> Result<Vec<StackAlternative>> {
    let baseline = calculate_stack_cost(data, current, gpus, years, support)?;
    let mut out = Vec::new();
    for (id, stack) in &data.software.stacks {
        if id == current {
            continue;
        }
        let alt = calculate_stack_cost(data, id, gpus, years, support)?;
        if alt.per_gpu_year < baseline.per_gpu_year * 0.8 {
            out.push(StackAlternative {
                id: id.clone(),
                name: stack.name.clone(),
                per_gpu_year: alt.per_gpu_year,
                savings_per_gpu_year: baseline.per_gpu_year - alt.per_gpu_year,
                required_ftes: stack.required_ftes,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ReferenceData {
        ReferenceData::builtin().unwrap()
    }

    #[test]
    fn bytplus_stack_cost() {
        // bytplus 260 + nvidia-ai-enterprise 3500 + ceph-management (business 50)
        let c = calculate_stack_cost(&data(), "bytplus-integrated", 1000, 3, SupportTier::Business)
            .unwrap();
        assert!((c.upfront_cost - 100_000.0).abs() < 1e-9);
        let expected_annual = (260.0 + 3500.0 + 50.0) * 1000.0 + 150_000.0;
        assert!((c.annual_cost - expected_annual).abs() < 1e-6);
        assert!((c.total_cost - (100_000.0 + 3.0 * expected_annual)).abs() < 1e-6);
        assert!((c.per_gpu_year - c.total_cost / 3000.0).abs() < 1e-9);
        assert_eq!(c.breakdown.last().unwrap().component, "Engineering Staff");
    }

    #[test]
    fn community_support_uses_list_price() {
        let d = data();
        let business =
            calculate_stack_cost(&d, "bytplus-integrated", 100, 1, SupportTier::Business).unwrap();
        let community =
            calculate_stack_cost(&d, "bytplus-integrated", 100, 1, SupportTier::Community).unwrap();
        assert!((business.annual_cost - community.annual_cost - 50.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_stack_and_zero_gpus() {
        let d = data();
        assert!(matches!(
            calculate_stack_cost(&d, "canonical-enterprise", 10, 3, SupportTier::Business),
            Err(TcoError::Lookup { .. })
        ));
        assert!(matches!(
            calculate_stack_cost(&d, "hybrid-balanced", 0, 3, SupportTier::Business),
            Err(TcoError::Arithmetic(_))
        ));
    }

    #[test]
    fn recommendation_rules() {
        let mut req = StackRequirements {
            gpus: 5000,
            budget: Budget::Medium,
            expertise: Expertise::Intermediate,
            support: SupportTier::Business,
            compliance: vec![],
            vendor: VendorPreference::Agnostic,
        };
        assert_eq!(recommend_stack(&req), "hybrid-balanced");
        req.gpus = 60_000;
        assert_eq!(recommend_stack(&req), "omnia-enterprise");
        req.vendor = VendorPreference::Nvidia;
        assert_eq!(recommend_stack(&req), "nvidia-maximum");
        req.budget = Budget::Low;
        req.expertise = Expertise::Advanced;
        assert_eq!(recommend_stack(&req), "opensource-optimized");
        req.compliance = vec!["SecNumCloud".into()];
        assert_eq!(recommend_stack(&req), "hybrid-balanced");
    }

    #[test]
    fn alternatives_are_cheaper() {
        let d = data();
        let alts = cheaper_alternatives(&d, "nvidia-maximum", 2000, 3, SupportTier::Business)
            .unwrap();
        let base = calculate_stack_cost(&d, "nvidia-maximum", 2000, 3, SupportTier::Business)
            .unwrap();
        assert!(!alts.is_empty());
        for a in alts {
            assert!(a.per_gpu_year < base.per_gpu_year * 0.8);
            assert!(a.savings_per_gpu_year > 0.0);
        }
    }
}
