//! Storage tier costing.
//!
//! Per-GB vendor offers and per-PB architectures are priced through one
//! [`TierPricing`] abstraction, so a storage plan is just a total capacity
//! and a list of `(tier id, percent)` shares.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TcoError};
use crate::reference::{
    MediaType, ReferenceData, StorageArchitecture, StorageCategory, StorageVendor,
};
use crate::workload::{PERCENT_TOLERANCE, ceil_u64};

pub const GB_PER_PB: f64 = 1_000_000.0;
pub const TB_PER_PB: f64 = 1000.0;

/// One tier of a storage plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierShare {
    /// Architecture or vendor id.
    pub id: String,
    /// Share of the total capacity, percent.
    pub percent: f64,
    /// Negotiated price replacing the list price of the tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_gb: Option<f64>,
}

impl TierShare {
    pub fn new(id: impl Into<String>, percent: f64) -> Self {
        Self {
            id: id.into(),
            percent,
            price_per_gb: None,
        }
    }
}

/// Hot/warm/cold/archive split used when a configuration names no tiers.
pub fn default_storage_tiers() -> Vec<TierShare> {
    vec![
        TierShare::new("vast", 20.0),
        TierShare::new("pure-e", 35.0),
        TierShare::new("ceph", 35.0),
        TierShare::new("glacier", 10.0),
    ]
}

/// Pricing of a storage offer as a function of the capacity bought.
///
/// All methods are linear in `capacity_pb`.
pub trait TierPricing {
    fn name(&self) -> &str;

    fn capex(&self, capacity_pb: f64) -> f64;

    fn annual_opex(&self, capacity_pb: f64) -> f64;

    fn tco_5year(&self, capacity_pb: f64) -> f64 {
        self.capex(capacity_pb) + 5.0 * self.annual_opex(capacity_pb)
    }

    fn power_kw(&self, capacity_pb: f64) -> f64;

    /// Aggregate throughput, GB/s.
    fn throughput_gbps(&self, capacity_pb: f64) -> f64;

    /// Usable / raw capacity ratio.
    fn efficiency(&self) -> f64 {
        1.0
    }

    fn category(&self) -> Option<StorageCategory> {
        None
    }

    fn media(&self) -> Option<MediaType> {
        None
    }

    fn vendors(&self) -> Vec<&str> {
        vec![self.name()]
    }
}

impl TierPricing for StorageVendor {
    fn name(&self) -> &str {
        &self.name
    }

    fn capex(&self, capacity_pb: f64) -> f64 {
        capacity_pb * GB_PER_PB * self.price_per_gb
    }

    fn annual_opex(&self, _capacity_pb: f64) -> f64 {
        0.0
    }

    fn power_kw(&self, capacity_pb: f64) -> f64 {
        capacity_pb * TB_PER_PB * self.power_per_tb_w / 1000.0
    }

    fn throughput_gbps(&self, capacity_pb: f64) -> f64 {
        capacity_pb * self.throughput_gbps_per_pb
    }
}

impl TierPricing for StorageArchitecture {
    fn name(&self) -> &str {
        &self.name
    }

    fn capex(&self, capacity_pb: f64) -> f64 {
        capacity_pb * self.capex_per_pb
    }

    fn annual_opex(&self, capacity_pb: f64) -> f64 {
        capacity_pb * self.opex_per_pb
    }

    fn tco_5year(&self, capacity_pb: f64) -> f64 {
        capacity_pb * self.tco_5year_per_pb
    }

    fn power_kw(&self, capacity_pb: f64) -> f64 {
        capacity_pb * self.power_kw_per_pb
    }

    fn throughput_gbps(&self, capacity_pb: f64) -> f64 {
        capacity_pb * self.throughput_gbps_per_pb
    }

    fn efficiency(&self) -> f64 {
        self.efficiency
    }

    fn category(&self) -> Option<StorageCategory> {
        Some(self.category)
    }

    fn media(&self) -> Option<MediaType> {
        Some(self.media)
    }

    fn vendors(&self) -> Vec<&str> {
        self.vendors.iter().map(String::as_str).collect()
    }
}

impl ReferenceData {
    /// Pricing for a tier id. Architectures shadow vendors with the same id.
    pub fn storage_tier(&self, id: &str) -> Result<&dyn TierPricing> {
        if let Some(arch) = self.storage_architectures.get(id) {
            return Ok(arch as &dyn TierPricing);
        }
        self.storage_vendors
            .get(id)
            .map(|v| v as &dyn TierPricing)
            .ok_or_else(|| TcoError::lookup("storage tier", id))
    }

    /// Tier shares of a named preset.
    pub fn preset_tiers(&self, id: &str) -> Result<Vec<TierShare>> {
        Ok(self.storage_preset(id)?.tiers.clone())
    }
}

/// Storage nodes needed to hold one tier on its media.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeBreakdown {
    pub raw_tb: f64,
    pub drives: u64,
    pub nodes: u64,
    pub power_kw: f64,
}

/// Drive and node count for `capacity_pb` of usable capacity on `media`.
///
/// Cloud media own no hardware and yield `None`.
///
/// # Formulas
///
/// ```text
/// raw_tb = capacity_pb / efficiency * 1000
/// drives = ceil(raw_tb / drive_tb)
/// nodes  = ceil(drives / drives_per_node)
/// power  = nodes * node_power_kw
/// ```
pub fn node_breakdown(
    media: MediaType,
    capacity_pb: f64,
    efficiency: f64,
    data: &ReferenceData,
) -> Result<Option<NodeBreakdown>> {
    if media == MediaType::Cloud {
        return Ok(None);
    }
    let profile = data.media(media)?;
    let raw_tb = capacity_pb / efficiency * TB_PER_PB;
    let drives = ceil_u64(raw_tb / profile.drive_tb);
    let nodes = drives.div_ceil(u64::from(profile.drives_per_node.max(1)));
    Ok(Some(NodeBreakdown {
        raw_tb,
        drives,
        nodes,
        power_kw: nodes as f64 * profile.node_power_kw,
    }))
}

/// Cost of one tier of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierCost {
    pub id: String,
    pub name: String,
    pub percent: f64,
    pub capacity_pb: f64,
    /// Raw capacity behind `capacity_pb` after protection overhead.
    pub raw_pb: f64,
    pub capex: f64,
    pub annual_opex: f64,
    pub tco_5year: f64,
    pub power_kw: f64,
    pub throughput_gbps: f64,
    pub nodes: Option<NodeBreakdown>,
}

/// Cost of a complete storage plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageCost {
    pub tiers: Vec<TierCost>,
    pub total_capacity_pb: f64,
    pub raw_capacity_pb: f64,
    pub total_capex: f64,
    pub total_annual_opex: f64,
    pub total_tco_5year: f64,
    pub total_power_mw: f64,
    pub total_throughput_tbps: f64,
    pub cost_per_tb: f64,
}

impl StorageCost {
    pub fn tier(&self, id: &str) -> Option<&TierCost> {
        self.tiers.iter().find(|t| t.id == id)
    }
}

/// Prices `total_pb` of usable storage split across `tiers`.
///
/// # Errors
///
/// - [`TcoError::Configuration`] when `total_pb` is negative, `tiers` is
///   empty, a share is negative or the shares do not sum to 100.
/// - [`TcoError::Lookup`] for an unknown tier id.
///
/// # Formulas
///
/// ```text
/// capacity_pb = total_pb * percent / 100
/// capex       = capacity_pb * 1e6 * price_per_gb        (vendor offers)
///             = capacity_pb * capex_per_pb              (architectures)
/// power_kw    = capacity_pb * 1000 * power_per_tb_w / 1000
/// cost_per_tb = total_capex / (total_pb * 1000)
/// ```
pub fn cost_tiers(total_pb: f64, tiers: &[TierShare], data: &ReferenceData) -> Result<StorageCost> {
    if !total_pb.is_finite() || total_pb < 0.0 {
        return Err(TcoError::config(format!(
            "total storage capacity must be >= 0 PB, got {total_pb}"
        )));
    }
    if tiers.is_empty() {
        return Err(TcoError::config("storage plan has no tiers"));
    }
    if let Some(bad) = tiers.iter().find(|t| t.percent < 0.0) {
        return Err(TcoError::config(format!(
            "storage tier '{}' has a negative share",
            bad.id
        )));
    }
    let share_sum: f64 = tiers.iter().map(|t| t.percent).sum();
    if (share_sum - 100.0).abs() > PERCENT_TOLERANCE {
        return Err(TcoError::config(format!(
            "storage tier shares must sum to 100% (currently {share_sum:.1}%)"
        )));
    }

    let mut out = Vec::with_capacity(tiers.len());
    for share in tiers {
        let pricing = data.storage_tier(&share.id)?;
        let capacity_pb = total_pb * share.percent / 100.0;
        let annual_opex = pricing.annual_opex(capacity_pb);
        let (capex, tco_5year) = match share.price_per_gb {
            Some(price) => {
                let capex = capacity_pb * GB_PER_PB * price;
                (capex, capex + 5.0 * annual_opex)
            }
            None => (pricing.capex(capacity_pb), pricing.tco_5year(capacity_pb)),
        };
        let nodes = match pricing.media() {
            Some(media) => node_breakdown(media, capacity_pb, pricing.efficiency(), data)?,
            None => None,
        };
        out.push(TierCost {
            id: share.id.clone(),
            name: pricing.name().to_string(),
            percent: share.percent,
            capacity_pb,
            raw_pb: capacity_pb / pricing.efficiency(),
            capex,
            annual_opex,
            tco_5year,
            power_kw: pricing.power_kw(capacity_pb),
            throughput_gbps: pricing.throughput_gbps(capacity_pb),
            nodes,
        });
    }

    let total_capex: f64 = out.iter().map(|t| t.capex).sum();
    let cost = StorageCost {
        total_capacity_pb: total_pb,
        raw_capacity_pb: out.iter().map(|t| t.raw_pb).sum(),
        total_capex,
        total_annual_opex: out.iter().map(|t| t.annual_opex).sum(),
        total_tco_5year: out.iter().map(|t| t.tco_5year).sum(),
        total_power_mw: out.iter().map(|t| t.power_kw).sum::<f64>() / 1000.0,
        total_throughput_tbps: out.iter().map(|t| t.throughput_gbps).sum::<f64>() / 1000.0,
        cost_per_tb: if total_pb > 0.0 {
            total_capex / (total_pb * TB_PER_PB)
        } else {
            0.0
        },
        tiers: out,
    };
    debug!(
        "storage: {:.1} PB over {} tiers, capex ${:.0}, {:.3} MW",
        cost.total_capacity_pb,
        cost.tiers.len(),
        cost.total_capex,
        cost.total_power_mw
    );
    Ok(cost)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Advisory finding about a tier combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub severity: Severity,
    pub message: String,
}

impl Advisory {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Findings about a tier mix that prices fine but is operationally doubtful.
pub fn combination_warnings(
    total_pb: f64,
    tiers: &[TierShare],
    data: &ReferenceData,
) -> Result<Vec<Advisory>> {
    let mut categories = Vec::with_capacity(tiers.len());
    let mut vendors = BTreeSet::new();
    for share in tiers {
        let pricing = data.storage_tier(&share.id)?;
        categories.push(pricing.category());
        vendors.extend(pricing.vendors().into_iter().map(str::to_string));
    }
    let has = |c: StorageCategory| categories.contains(&Some(c));
    let ids: Vec<&str> = tiers.iter().map(|t| t.id.as_str()).collect();

    let mut out = Vec::new();
    if has(StorageCategory::Extreme) && !has(StorageCategory::CostOptimized) {
        out.push(Advisory::new(
            Severity::Warning,
            "Consider adding cost-optimized tiers for better TCO. Extreme performance tiers alone may be over-provisioned for cold data.",
        ));
    }
    if vendors.len() > 3 {
        out.push(Advisory::new(
            Severity::Warning,
            "Multiple vendors increase operational complexity. Consider consolidating to 2-3 vendors maximum.",
        ));
    }
    if categories.len() == 1 && has(StorageCategory::CostOptimized) {
        out.push(Advisory::new(
            Severity::Error,
            "Single cost-optimized tier may not meet performance requirements for AI/ML workloads.",
        ));
    }
    let metadata_tiers = ["vast-universal", "weka-parallel", "vast", "weka"];
    if total_pb > 100.0 && !ids.iter().any(|id| metadata_tiers.contains(id)) {
        out.push(Advisory::new(
            Severity::Info,
            "Above 100 PB, consider a dedicated metadata tier with VAST or WEKA.",
        ));
    }
    if total_pb > 50.0 && !ids.contains(&"s3-compatible") {
        out.push(Advisory::new(
            Severity::Info,
            "Above 50 PB, consider an S3-compatible object tier for archive and data-lake access.",
        ));
    }
    Ok(out)
}

impl Display for StorageCost {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(
            f,
            "Storage: {:.1} PB usable ({:.1} PB raw)",
            self.total_capacity_pb, self.raw_capacity_pb
        )?;
        for t in &self.tiers {
            writeln!(
                f,
                "  {:<28} {:>5.1}%  {:>8.2} PB  capex ${:>14.0}  opex ${:>12.0}/yr  {:>8.1} kW",
                t.name, t.percent, t.capacity_pb, t.capex, t.annual_opex, t.power_kw
            )?;
        }
        writeln!(f, "  CAPEX:        ${:.0}", self.total_capex)?;
        writeln!(f, "  OPEX:         ${:.0}/yr", self.total_annual_opex)?;
        writeln!(f, "  5-year TCO:   ${:.0}", self.total_tco_5year)?;
        writeln!(f, "  Power:        {:.3} MW", self.total_power_mw)?;
        writeln!(f, "  Throughput:   {:.2} TB/s", self.total_throughput_tbps)?;
        writeln!(f, "  Cost per TB:  ${:.2}", self.cost_per_tb)
    }
}
