use pretty_assertions::assert_eq;
use serde_json::json;
use voltmesh_privacy::{
    HomomorphicSimulator, PrivacyConfig, PrivacyEngine, PrivacyError, PrivacyTier,
};

fn charging_payload() -> serde_json::Value {
    json!({
        "station_id": "st-0042",
        "energy_kwh": [18.2, 22.4, 9.9, 30.1],
        "peak_load": 0.82,
        "operator": "metro-charge"
    })
}

#[test]
fn public_tier_is_pass_through() {
    let engine = PrivacyEngine::new(PrivacyConfig::default()).unwrap();
    let mut rng = PrivacyEngine::seeded_rng("public");
    let payload = charging_payload();
    let out = engine
        .protect(&payload, PrivacyTier::Public, &mut rng)
        .unwrap();
    assert_eq!(out, payload);
}

#[test]
fn every_tier_produces_an_object() {
    let engine = PrivacyEngine::default();
    let payload = charging_payload();
    for tier in PrivacyTier::ALL {
        let mut rng = PrivacyEngine::seeded_rng(tier.as_str());
        let out = engine.protect(&payload, tier, &mut rng).unwrap();
        assert!(out.is_object(), "tier {tier} returned {out}");
    }
}

#[test]
fn aggregated_tier_removes_identifiers() {
    let engine = PrivacyEngine::default();
    let out = engine
        .protect_with_entropy(&charging_payload(), PrivacyTier::Aggregated)
        .unwrap();
    assert!(out.get("station_id").is_none());
    assert_eq!(out["energy_kwh"]["count"], 4);
    assert_eq!(out["operator"], "metro-charge");
}

#[test]
fn differential_tier_is_reproducible_with_the_same_seed() {
    let engine = PrivacyEngine::default();
    let payload = charging_payload();
    let a = engine
        .protect(
            &payload,
            PrivacyTier::Differential,
            &mut PrivacyEngine::seeded_rng("dp"),
        )
        .unwrap();
    let b = engine
        .protect(
            &payload,
            PrivacyTier::Differential,
            &mut PrivacyEngine::seeded_rng("dp"),
        )
        .unwrap();
    assert_eq!(a, b);
    assert_ne!(a["peak_load"], payload["peak_load"]);
}

#[test]
fn homomorphic_and_mpc_tiers_hide_values() {
    let engine = PrivacyEngine::default();
    let payload = charging_payload();
    let sealed = engine
        .protect_with_entropy(&payload, PrivacyTier::Homomorphic)
        .unwrap();
    assert!(HomomorphicSimulator::is_placeholder(&sealed["peak_load"]));

    let committed = engine
        .protect_with_entropy(&payload, PrivacyTier::SecureMpc)
        .unwrap();
    assert_eq!(committed["mpc_ready"], true);
    assert_eq!(committed["field_count"], 4);
}

#[test]
fn secure_aggregate_combines_parties() {
    let engine = PrivacyEngine::default();
    let mut rng = PrivacyEngine::seeded_rng("mpc");
    let parties = vec![
        json!({"avg_soc": 0.5, "sessions": 10}),
        json!({"avg_soc": 0.7, "sessions": 14}),
    ];
    let aggregate = engine.secure_aggregate(&parties, &mut rng).unwrap();
    assert_eq!(aggregate.participant_count, 2);
    assert!((aggregate.results["avg_soc"] - 0.6).abs() < 0.05);
    assert!((aggregate.results["sessions"] - 12.0).abs() < 0.05);
}

#[test]
fn invalid_config_is_rejected() {
    let config = PrivacyConfig {
        sensitivity: 0.0,
        ..PrivacyConfig::default()
    };
    assert!(matches!(
        PrivacyEngine::new(config),
        Err(PrivacyError::InvalidSensitivity)
    ));
}
