use voltmesh_federation::{
    FederatedCoordinator, FederationConfig, LearningMode, NetworkEffectEngine, NetworkValue,
    Segment, ThresholdConnections,
};

fn network_of(segments: &[Segment]) -> NetworkValue {
    let coordinator = FederatedCoordinator::new(FederationConfig::default())
        .unwrap()
        .with_connection_policy(Box::new(ThresholdConnections { threshold: 2.0 }));
    for (i, segment) in segments.iter().enumerate() {
        coordinator
            .register_node(format!("node-{i}"), *segment, Vec::new(), [LearningMode::Federated])
            .unwrap();
    }
    coordinator.network_value()
}

#[test]
fn synergy_rewards_segment_diversity() {
    let diverse = network_of(&[
        Segment::EnergyGrid,
        Segment::Transportation,
        Segment::Transportation,
    ]);
    let uniform = network_of(&[Segment::Retail, Segment::Retail, Segment::Retail]);
    assert!(diverse.total > uniform.total);
    assert_eq!(diverse.metcalfe, uniform.metcalfe);
    assert!(diverse.synergy_bonus > 0.0);
}

#[test]
fn empty_and_singleton_networks_are_worthless() {
    assert_eq!(network_of(&[]), NetworkValue::default());
    assert_eq!(network_of(&[Segment::Healthcare]), NetworkValue::default());
}

#[test]
fn sarnoff_is_reported_but_not_totalled() {
    let value = network_of(&[Segment::Insurance, Segment::Insurance]);
    assert!(value.sarnoff > 0.0);
    let recomposed = (value.metcalfe + value.reeds + value.odlyzko) * value.quality_multiplier
        + value.synergy_bonus
        + value.diversity_bonus;
    assert!((value.total - recomposed).abs() < 1e-12);
}

#[test]
fn value_never_drops_as_nodes_join() {
    let engine = NetworkEffectEngine::default();
    let coordinator = FederatedCoordinator::new(FederationConfig::seeded(5)).unwrap();
    let mut previous = engine.network_value(&coordinator.nodes());
    for i in 0..30 {
        coordinator
            .register_node(format!("fleet-{i:02}"), Segment::FleetLogistics, Vec::new(), [
                LearningMode::Federated,
            ])
            .unwrap();
        let current = engine.network_value(&coordinator.nodes());
        assert!(current.total >= previous.total);
        previous = current;
    }
}
