use gpu_tco_planner::workload::gpu_allocation;
use gpu_tco_planner::*;

const CONFIG: &str = r#"
gpu_model = "gb200"
num_gpus = 10000
cooling = "liquid"
region = "us-texas"
utilization = 90.0
depreciation_years = 5

[storage]
total_pb = 50.0

[network]
fabric = "infiniband"
topology = "fat-tree"
dpus_enabled = true

[overrides]
gpu_unit_price = 65000.0
"#;

fn setup() -> (Configuration, ReferenceData) {
    (
        Configuration::from_toml_str(CONFIG).unwrap(),
        ReferenceData::builtin().unwrap(),
    )
}

#[test]
fn storage_cost_is_linear_in_capacity() {
    let d = ReferenceData::builtin().unwrap();
    let tiers = vec![
        TierShare::new("vast", 20.0),
        TierShare::new("pure-flashblade", 35.0),
        TierShare::new("ceph-hdd", 35.0),
        TierShare::new("glacier", 10.0),
    ];
    let one = cost_tiers(50.0, &tiers, &d).unwrap();
    let two = cost_tiers(100.0, &tiers, &d).unwrap();
    for (a, b) in one.tiers.iter().zip(&two.tiers) {
        assert!((b.capex - 2.0 * a.capex).abs() < 1e-3, "{}", a.id);
        assert!((b.annual_opex - 2.0 * a.annual_opex).abs() < 1e-3, "{}", a.id);
        assert!((b.power_kw - 2.0 * a.power_kw).abs() < 1e-6, "{}", a.id);
    }
    assert!((two.total_capex - 2.0 * one.total_capex).abs() < 1e-3);
}

#[test]
fn tier_allocations_close_over_the_cluster() {
    let mixes = [
        vec![20.0, 30.0, 35.0, 15.0],
        vec![33.3, 33.3, 33.4, 0.0],
        vec![100.0, 0.0, 0.0, 0.0],
        vec![12.5, 12.5, 50.0, 25.0],
    ];
    for mix in mixes {
        let tiers: Vec<ServiceTier> = mix
            .iter()
            .enumerate()
            .map(|(i, &p)| ServiceTier::new(format!("t{i}"), "tier", ServiceKind::Custom, p, 50.0))
            .collect();
        for total in [1, 72, 10_007, 250_000] {
            let sum: f64 = gpu_allocation(&tiers, total).iter().map(|a| a.gpus).sum();
            assert!((sum - total as f64).abs() < 1e-6, "{mix:?} {total}");
        }
    }
}

#[test]
fn tco_is_idempotent() {
    let (c, d) = setup();
    let a = calculate_tco(&c, &d).unwrap();
    let b = calculate_tco(&c, &d).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );

    let e1 = calculate_enhanced_tco(&c, &d).unwrap();
    let e2 = calculate_enhanced_tco(&c, &d).unwrap();
    assert_eq!(e1, e2);
}

#[test]
fn capex_never_decreases_with_more_gpus() {
    let (mut c, d) = setup();
    let mut last = 0.0;
    for gpus in [72, 500, 1000, 5000, 10_000, 26_000, 51_000, 100_000] {
        c.num_gpus = gpus;
        let capex = calculate_tco(&c, &d).unwrap().capex.total;
        assert!(capex >= last, "{gpus} GPUs: {capex} < {last}");
        last = capex;
    }
}

#[test]
fn zero_utilization_is_a_defined_error() {
    let (mut c, d) = setup();
    c.utilization = 0.0;
    assert!(matches!(calculate_tco(&c, &d), Err(TcoError::Arithmetic(_))));
    assert!(matches!(
        base_cost_per_gpu_hour(1e9, 1e8, 5, 10_000, 0.0, 8760.0),
        Err(TcoError::Arithmetic(_))
    ));
}

#[test]
fn missing_required_field_fails_to_load() {
    let text = CONFIG.replace("cooling = \"liquid\"\n", "");
    match Configuration::from_toml_str(&text) {
        Err(TcoError::Configuration(msg)) => assert!(msg.contains("cooling"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn out_of_range_tier_share_is_rejected_by_both_models() {
    let (mut c, d) = setup();
    for (tier, p) in c.service_tiers.iter_mut().zip([120.0, -20.0, 0.0, 0.0]) {
        tier.cluster_percent = p;
    }
    assert!(matches!(calculate_tco(&c, &d), Err(TcoError::Configuration(_))));
    assert!(matches!(
        calculate_enhanced_tco(&c, &d),
        Err(TcoError::Configuration(_))
    ));
}
