use gpu_tco_planner::pricing::CostBasis;
use gpu_tco_planner::*;

fn data() -> ReferenceData {
    ReferenceData::builtin().unwrap()
}

#[test]
fn gb200_cluster_is_bought_in_whole_racks() {
    let d = data();
    let config = Configuration::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/cluster.toml"))
        .unwrap();
    let r = calculate_tco(&config, &d).unwrap();
    assert_eq!(r.sizing.systems, 139);
    assert_eq!(r.sizing.actual_gpus, 10_008);
    assert!((r.capex.gpu - 650_520_000.0).abs() < 1e-3);
}

#[test]
fn hot_tier_of_a_fifty_petabyte_plan() {
    let d = data();
    let tiers = vec![
        TierShare::new("vast", 20.0),
        TierShare::new("pure-e", 35.0),
        TierShare::new("ceph", 35.0),
        TierShare::new("glacier", 10.0),
    ];
    let plan = cost_tiers(50.0, &tiers, &d).unwrap();
    let hot = plan.tier("vast").unwrap();
    assert!((hot.capacity_pb - 10.0).abs() < 1e-12);
    // 10 PB * 1e6 GB/PB * $0.03/GB
    assert!((hot.capex - 300_000.0).abs() < 1e-6);
}

#[test]
fn blended_rate_lies_between_tier_rates() {
    let d = data();
    let tiers = vec![
        ServiceTier::new("whale", "Bare metal", ServiceKind::BareMetalWhale, 30.0, 80.0),
        ServiceTier::new("k8s", "Kubernetes", ServiceKind::OrchestratedK8s, 35.0, 65.0),
        ServiceTier::new("mlops", "MLOps", ServiceKind::ManagedMlops, 25.0, 55.0),
        ServiceTier::new("inference", "Inference", ServiceKind::InferenceService, 10.0, 10.0),
    ];
    let basis = CostBasis {
        total_capex: 1.0e9,
        annual_opex: 1.5e8,
        depreciation_years: 5,
        gpus: 10_000,
        utilization_percent: 80.0,
    };
    let m = revenue_model(&basis, &tiers, &ServiceModifiers::default(), &d).unwrap();
    let base = m.base_cost_per_gpu_hour;
    let expected = base * (0.30 * 1.0 + 0.35 * 1.45 + 0.25 * 2.2 + 0.10 * 3.0);
    assert!((m.blended_rate - expected).abs() < 1e-9);
    assert!(m.blended_rate >= base * 1.0);
    assert!(m.blended_rate <= base * 3.0);
}

#[test]
fn optimizer_output_is_stable() {
    let d = data();
    let input = OptimizerInput {
        gpus: 4000,
        power_mw: 5.0,
        storage_pb: 120.0,
        gpu_model: None,
        networking: None,
    };
    let a = optimize(&input, &d).unwrap();
    let b = optimize(&input, &d).unwrap();
    assert_eq!(a, b);
    let sum = a.service_tiers.bare_metal_whale
        + a.service_tiers.orchestrated_k8s
        + a.service_tiers.managed_mlops
        + a.service_tiers.inference_service;
    assert!((sum - 100.0).abs() <= 2.0);
}
