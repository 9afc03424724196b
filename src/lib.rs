#![doc = include_str!("../README.md")]

pub mod config;
pub mod enhanced;
pub mod error;
pub mod infrastructure;
pub mod network;
pub mod optimizer;
pub mod pricing;
pub mod reference;
pub mod software;
pub mod storage;
pub mod tco;
pub mod workload;

pub use config::{Configuration, Overrides, SoftwareChoice, StorageConfig};
pub use enhanced::{EnhancedTcoResults, RoiMetrics, calculate_enhanced_tco, roi_metrics};
pub use error::{Result, TcoError};
pub use network::{NetworkConfig, NetworkDesign, Topology, calculate_network};
pub use optimizer::{Networking, OptimizedConfiguration, OptimizerInput, optimize};
pub use pricing::{RevenueModel, ServiceModifiers, base_cost_per_gpu_hour, revenue_model};
pub use reference::{CoolingType, ReferenceData};
pub use storage::{StorageCost, TierPricing, TierShare, cost_tiers};
pub use tco::{TcoResults, calculate_tco};
pub use workload::{ServiceKind, ServiceTier, storage_requirements};
