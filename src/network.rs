//! GPU fabric sizing: switch tiers, cabling, optics and DPUs.

use std::fmt::{Display, Formatter, Result as FmtResult};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TcoError};
use crate::reference::{GpuFamily, GpuSpec, ReferenceData};
use crate::workload::ceil_u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    FatTree,
    Dragonfly,
    #[serde(rename = "bcube")]
    BCube,
}

/// Fabric choice of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Fabric id in the reference tables.
    pub fabric: String,
    pub topology: Topology,
    /// Downlink to uplink ratio, written `"N:1"`.
    #[serde(default = "default_oversubscription")]
    pub oversubscription: String,
    /// Fit BlueField-class DPUs to the GPU systems.
    #[serde(default)]
    pub dpus_enabled: bool,
}

fn default_oversubscription() -> String {
    "1:1".into()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            fabric: "infiniband".into(),
            topology: Topology::FatTree,
            oversubscription: default_oversubscription(),
            dpus_enabled: false,
        }
    }
}

/// Negotiated unit prices replacing the fabric list prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkPriceOverrides {
    pub switch_price: Option<f64>,
    pub cable_price: Option<f64>,
    pub transceiver_price: Option<f64>,
    pub dpu_unit_price: Option<f64>,
}

/// Parses an oversubscription ratio such as `"2:1"` into `2.0`.
///
/// # Errors
///
/// [`TcoError::Configuration`] when the text is not of the form `N:1` with
/// a positive `N`.
pub fn parse_oversubscription(text: &str) -> Result<f64> {
    let bad = || TcoError::config(format!("invalid oversubscription ratio '{text}'"));
    let (down, up) = text.split_once(':').ok_or_else(bad)?;
    let down: f64 = down.trim().parse().map_err(|_| bad())?;
    let up: f64 = up.trim().parse().map_err(|_| bad())?;
    if !(down > 0.0) || up != 1.0 {
        return Err(bad());
    }
    Ok(down)
}

/// Optical rails per GPU of a system family.
fn rails_for(family: GpuFamily) -> u32 {
    match family {
        GpuFamily::NvlinkRack => 9,
        GpuFamily::Amd => 6,
        GpuFamily::Workstation => 4,
        GpuFamily::Oem => 8,
    }
}

/// DPUs fitted to `gpus` GPUs of `family`.
///
/// NVL72 racks carry four, OEM nodes one per 8 GPUs, workstation builds one
/// per 16 GPUs and AMD systems none.
pub fn dpu_count(family: GpuFamily, gpus: u64) -> u64 {
    match family {
        GpuFamily::NvlinkRack => gpus.div_ceil(72) * 4,
        GpuFamily::Oem => gpus.div_ceil(8),
        GpuFamily::Workstation => gpus.div_ceil(16),
        GpuFamily::Amd => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchCounts {
    pub leaf: u64,
    pub spine: u64,
    pub core: u64,
}

impl SwitchCounts {
    pub fn total(&self) -> u64 {
        self.leaf + self.spine + self.core
    }
}

fn switch_counts(topology: Topology, gpus: u64, pods: u64) -> SwitchCounts {
    match topology {
        Topology::FatTree => SwitchCounts {
            leaf: pods * 4,
            spine: pods * 4,
            core: if gpus > 50_000 {
                50
            } else if gpus > 25_000 {
                10
            } else {
                2
            },
        },
        Topology::Dragonfly => {
            let leaf = gpus.div_ceil(96);
            let spine = leaf.div_ceil(12);
            SwitchCounts {
                leaf,
                spine,
                core: spine.div_ceil(6),
            }
        }
        Topology::BCube => {
            let leaf = gpus.div_ceil(64);
            let spine = leaf.div_ceil(16);
            SwitchCounts {
                leaf,
                spine,
                core: spine.div_ceil(8),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkCosts {
    pub switches: f64,
    pub cables: f64,
    pub transceivers: f64,
    pub dpus: f64,
    pub total: f64,
}

/// Power draw in watts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkPower {
    pub switches_w: f64,
    pub cables_w: f64,
    pub transceivers_w: f64,
    pub dpus_w: f64,
    pub total_w: f64,
}

/// Bandwidth figures, GB/s except `per_gpu_gbps` which is Gb/s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkBandwidth {
    pub bisection_gbs: f64,
    pub theoretical_gbs: f64,
    pub per_gpu_gbps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkDesign {
    pub fabric: String,
    pub topology: Topology,
    pub gpus: u64,
    pub pods: u64,
    pub rails_per_gpu: u32,
    pub oversubscription: f64,
    pub switches: SwitchCounts,
    pub ports: u64,
    pub cables: u64,
    pub intra_pod_cables: u64,
    pub inter_pod_cables: u64,
    pub transceivers: u64,
    pub dpus: u64,
    pub costs: NetworkCosts,
    pub power: NetworkPower,
    pub bandwidth: NetworkBandwidth,
}

/// Sizes the fabric for `gpus` GPUs of model `gpu`.
///
/// # Formulas
///
/// ```text
/// pods         = ceil(gpus / gpus_per_pod)                (per GPU model)
/// cables       = ceil(gpus * rails_per_gpu / oversubscription)
/// transceivers = 2 * cables
/// bisection    = core * ports_per_switch * bandwidth_per_gpu / 8
/// theoretical  = gpus * bandwidth_per_gpu * rails_per_gpu / 8
/// ```
///
/// # Errors
///
/// [`TcoError::Lookup`] for an unknown fabric and
/// [`TcoError::Configuration`] for an unparsable oversubscription ratio.
pub fn calculate_network(
    gpus: u64,
    gpu: &GpuSpec,
    config: &NetworkConfig,
    overrides: &NetworkPriceOverrides,
    data: &ReferenceData,
) -> Result<NetworkDesign> {
    let fabric = data.fabric(&config.fabric)?;
    let ratio = parse_oversubscription(&config.oversubscription)?;
    let assumptions = &data.assumptions.network;
    let rails_per_gpu = rails_for(gpu.family);

    let pods = gpus.div_ceil(u64::from(gpu.gpus_per_pod.max(1)));
    let switches = switch_counts(config.topology, gpus, pods);
    let ports = ceil_u64(gpus as f64 * f64::from(rails_per_gpu) / ratio);
    let cables = ports;
    let transceivers = cables * 2;
    let intra_pod_cables = (cables as f64 * assumptions.intra_pod_cable_share).floor() as u64;
    let dpus = if config.dpus_enabled {
        dpu_count(gpu.family, gpus)
    } else {
        0
    };

    let switch_price = overrides.switch_price.unwrap_or(fabric.switch_price);
    let cable_price = overrides.cable_price.unwrap_or(fabric.cable_price);
    let transceiver_price = overrides
        .transceiver_price
        .unwrap_or(fabric.transceiver_price);
    let dpu_price = overrides
        .dpu_unit_price
        .unwrap_or(assumptions.dpu_unit_price);

    let mut costs = NetworkCosts {
        switches: switches.total() as f64 * switch_price,
        cables: cables as f64 * cable_price,
        transceivers: transceivers as f64 * transceiver_price,
        dpus: dpus as f64 * dpu_price,
        total: 0.0,
    };
    costs.total = costs.switches + costs.cables + costs.transceivers + costs.dpus;

    let mut power = NetworkPower {
        switches_w: switches.total() as f64 * assumptions.switch_power_w,
        cables_w: cables as f64 * assumptions.cable_power_w,
        transceivers_w: transceivers as f64 * assumptions.transceiver_power_w,
        dpus_w: dpus as f64 * assumptions.dpu_power_w,
        total_w: 0.0,
    };
    power.total_w = power.switches_w + power.cables_w + power.transceivers_w + power.dpus_w;

    let rails = f64::from(rails_per_gpu);
    let bandwidth = NetworkBandwidth {
        bisection_gbs: switches.core as f64
            * f64::from(fabric.ports_per_switch)
            * fabric.bandwidth_per_gpu_gbps
            / 8.0,
        theoretical_gbs: gpus as f64 * fabric.bandwidth_per_gpu_gbps * rails / 8.0,
        per_gpu_gbps: fabric.bandwidth_per_gpu_gbps * rails,
    };

    debug!(
        "network: {} GPUs, {} pods, {} switches, {} cables, {} DPUs, ${:.0}",
        gpus,
        pods,
        switches.total(),
        cables,
        dpus,
        costs.total
    );

    Ok(NetworkDesign {
        fabric: fabric.name.clone(),
        topology: config.topology,
        gpus,
        pods,
        rails_per_gpu,
        oversubscription: ratio,
        switches,
        ports,
        cables,
        intra_pod_cables,
        inter_pod_cables: cables.saturating_sub(intra_pod_cables),
        transceivers,
        dpus,
        costs,
        power,
        bandwidth,
    })
}

impl Display for NetworkDesign {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "Network fabric: {} ({:?})", self.fabric, self.topology)?;
        writeln!(
            f,
            "  Pods: {}   rails/GPU: {}   oversubscription: {}:1",
            self.pods, self.rails_per_gpu, self.oversubscription
        )?;
        writeln!(
            f,
            "  Switches: {} (leaf {}, spine {}, core {})  ${:.0}",
            self.switches.total(),
            self.switches.leaf,
            self.switches.spine,
            self.switches.core,
            self.costs.switches
        )?;
        writeln!(f, "  Cables: {}  ${:.0}", self.cables, self.costs.cables)?;
        writeln!(
            f,
            "  Transceivers: {}  ${:.0}",
            self.transceivers, self.costs.transceivers
        )?;
        writeln!(f, "  DPUs: {}  ${:.0}", self.dpus, self.costs.dpus)?;
        writeln!(f, "  Total: ${:.0}", self.costs.total)?;
        writeln!(f, "  Power: {:.1} kW", self.power.total_w / 1000.0)?;
        writeln!(
            f,
            "  Bandwidth: bisection {:.0} GB/s, theoretical {:.0} GB/s, {:.0} Gb/s per GPU",
            self.bandwidth.bisection_gbs, self.bandwidth.theoretical_gbs, self.bandwidth.per_gpu_gbps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ReferenceData {
        ReferenceData::builtin().unwrap()
    }

    #[test]
    fn oversubscription_parsing() {
        assert!((parse_oversubscription("1:1").unwrap() - 1.0).abs() < 1e-12);
        assert!((parse_oversubscription("3:1").unwrap() - 3.0).abs() < 1e-12);
        assert!(matches!(
            parse_oversubscription("fast"),
            Err(TcoError::Configuration(_))
        ));
        assert!(parse_oversubscription("0:1").is_err());
        assert!(matches!(
            parse_oversubscription("1:2"),
            Err(TcoError::Configuration(_))
        ));
    }

    #[test]
    fn pod_size_and_rails_per_model() {
        let d = data();
        let cfg = NetworkConfig::default();
        let none = NetworkPriceOverrides::default();
        // (model, gpus, pods, rails per GPU, leaf switches)
        let cases = [
            ("gb200", 1008, 1, 9, 4),
            ("gb200", 1009, 2, 9, 8),
            ("gb300", 1024, 1, 9, 4),
            ("mi300x", 1024, 2, 6, 8),
            ("rtx6000-blackwell", 1024, 4, 4, 16),
            ("h100-sxm", 1024, 1, 8, 4),
        ];
        for (model, gpus, pods, rails, leaf) in cases {
            let gpu = d.gpu(model).unwrap();
            let n = calculate_network(gpus, gpu, &cfg, &none, &d).unwrap();
            assert_eq!(n.pods, pods, "{model}");
            assert_eq!(n.rails_per_gpu, rails, "{model}");
            assert_eq!(n.switches.leaf, leaf, "{model}");
        }
        // GB300 keeps the NVL72 DPU ratio while sizing pods like OEM nodes.
        let gb300 = d.gpu("gb300").unwrap();
        let with_dpus = NetworkConfig {
            dpus_enabled: true,
            ..NetworkConfig::default()
        };
        let n = calculate_network(1024, gb300, &with_dpus, &none, &d).unwrap();
        assert_eq!(n.dpus, 1024u64.div_ceil(72) * 4);
    }

    #[test]
    fn cable_share_above_one_does_not_underflow() {
        let mut d = data();
        d.assumptions.network.intra_pod_cable_share = 1.5;
        let gpu = d.gpu("h100-sxm").unwrap().clone();
        let n = calculate_network(
            1024,
            &gpu,
            &NetworkConfig::default(),
            &NetworkPriceOverrides::default(),
            &d,
        )
        .unwrap();
        assert_eq!(n.inter_pod_cables, 0);
    }

    #[test]
    fn dpu_ratios_per_family() {
        assert_eq!(dpu_count(GpuFamily::NvlinkRack, 10_000), 139 * 4);
        assert_eq!(dpu_count(GpuFamily::Oem, 1001), 126);
        assert_eq!(dpu_count(GpuFamily::Workstation, 32), 2);
        assert_eq!(dpu_count(GpuFamily::Amd, 4096), 0);
    }

    #[test]
    fn fat_tree_for_oem_nodes() {
        let d = data();
        let gpu = d.gpu("h100-sxm").unwrap();
        let cfg = NetworkConfig {
            dpus_enabled: true,
            ..NetworkConfig::default()
        };
        let n = calculate_network(2048, gpu, &cfg, &NetworkPriceOverrides::default(), &d).unwrap();
        assert_eq!(n.pods, 2);
        assert_eq!(n.switches.leaf, 8);
        assert_eq!(n.switches.spine, 8);
        assert_eq!(n.switches.core, 2);
        assert_eq!(n.cables, 2048 * 8);
        assert_eq!(n.transceivers, 2 * 2048 * 8);
        assert_eq!(n.intra_pod_cables + n.inter_pod_cables, n.cables);
        assert_eq!(n.dpus, 256);

        let fabric = d.fabric("infiniband").unwrap();
        let expected = 18.0 * fabric.switch_price
            + n.cables as f64 * fabric.cable_price
            + n.transceivers as f64 * fabric.transceiver_price
            + 256.0 * 2500.0;
        assert!((n.costs.total - expected).abs() < 1e-6);
        assert!((n.bandwidth.per_gpu_gbps - fabric.bandwidth_per_gpu_gbps * 8.0).abs() < 1e-9);
    }

    #[test]
    fn core_switches_step_with_scale() {
        let d = data();
        let gpu = d.gpu("h100-sxm").unwrap();
        let cfg = NetworkConfig::default();
        let none = NetworkPriceOverrides::default();
        let core = |g| calculate_network(g, gpu, &cfg, &none, &d).unwrap().switches.core;
        assert_eq!(core(25_000), 2);
        assert_eq!(core(25_001), 10);
        assert_eq!(core(50_001), 50);
    }

    #[test]
    fn oversubscription_reduces_cabling() {
        let d = data();
        let gpu = d.gpu("gb200").unwrap();
        let cfg = NetworkConfig {
            oversubscription: "2:1".into(),
            topology: Topology::Dragonfly,
            ..NetworkConfig::default()
        };
        let n = calculate_network(1000, gpu, &cfg, &NetworkPriceOverrides::default(), &d).unwrap();
        assert_eq!(n.rails_per_gpu, 9);
        assert_eq!(n.cables, 4500);
        assert_eq!(n.switches.leaf, 11);
        assert_eq!(n.switches.spine, 1);
        assert_eq!(n.switches.core, 1);
        assert_eq!(n.dpus, 0);
    }

    #[test]
    fn overrides_replace_list_prices() {
        let d = data();
        let gpu = d.gpu("mi300x").unwrap();
        let cfg = NetworkConfig {
            topology: Topology::BCube,
            dpus_enabled: true,
            ..NetworkConfig::default()
        };
        let overrides = NetworkPriceOverrides {
            switch_price: Some(1.0),
            cable_price: Some(0.0),
            transceiver_price: Some(0.0),
            dpu_unit_price: Some(1e9),
        };
        let n = calculate_network(1024, gpu, &cfg, &overrides, &d).unwrap();
        // 16 leaf, 1 spine, 1 core; AMD systems carry no DPUs.
        assert_eq!(n.switches.total(), 18);
        assert!((n.costs.total - 18.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_fabric_is_lookup_error() {
        let d = data();
        let gpu = d.gpu("h100-sxm").unwrap();
        let cfg = NetworkConfig {
            fabric: "token-ring".into(),
            ..NetworkConfig::default()
        };
        assert!(matches!(
            calculate_network(8, gpu, &cfg, &NetworkPriceOverrides::default(), &d),
            Err(TcoError::Lookup { .. })
        ));
    }
}
