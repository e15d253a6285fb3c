use pretty_assertions::assert_eq;
use serde_json::json;
use voltmesh_datahub::{
    AccessFilters, CrossSegmentDataHub, DataSchema, HubConfig, HubError, ParticipantId,
    ShareRequest,
};
use voltmesh_federation::Segment;
use voltmesh_privacy::{PrivacyEngine, PrivacyTier};

fn hub(config: HubConfig) -> CrossSegmentDataHub {
    CrossSegmentDataHub::new(
        HubConfig {
            seed: Some(99),
            ..config
        },
        PrivacyEngine::default(),
    )
    .unwrap()
}

fn id(value: &str) -> ParticipantId {
    ParticipantId::from(value)
}

fn populate(hub: &CrossSegmentDataHub) {
    for (name, segment) in [
        ("utility", Segment::EnergyGrid),
        ("fleet", Segment::Transportation),
        ("shop", Segment::Retail),
    ] {
        hub.register_participant(name, segment, Vec::new(), PrivacyTier::Differential)
            .unwrap();
    }
}

fn session_payload() -> serde_json::Value {
    json!({"station": "st-17", "energy_kwh": 42.0, "duration_min": 55.0})
}

#[test]
fn collaboration_scores_include_network_bonus() {
    let hub = hub(HubConfig::default());
    hub.register_participant("utility", Segment::EnergyGrid, Vec::new(), PrivacyTier::Public)
        .unwrap();
    let fleet = hub
        .register_participant("fleet", Segment::Transportation, Vec::new(), PrivacyTier::Public)
        .unwrap();
    let expected = 0.9 + 0.05 * 3f64.ln();
    assert_eq!(fleet.network_size, 2);
    assert!((fleet.collaboration_scores[&id("utility")] - expected).abs() < 1e-12);
    assert_eq!(
        hub.collaboration_score(&id("utility"), &id("fleet")),
        hub.collaboration_score(&id("fleet"), &id("utility"))
    );

    let err = hub
        .register_participant("fleet", Segment::Retail, Vec::new(), PrivacyTier::Public)
        .unwrap_err();
    assert!(matches!(err, HubError::DuplicateParticipant(_)));
}

#[test]
fn access_log_only_grows_with_qualified_requestors() {
    let hub = hub(HubConfig::default());
    populate(&hub);
    let shared = hub
        .share_data(
            &id("utility"),
            ShareRequest::new(
                session_payload(),
                [Segment::Transportation, Segment::Retail],
                PrivacyTier::Aggregated,
            ),
        )
        .unwrap();
    assert_eq!(shared.eligible_recipients, vec![id("fleet"), id("shop")]);

    let mut previous = 0;
    for requestor in ["fleet", "shop", "fleet"] {
        let outcome = hub.access_data(&id(requestor), &AccessFilters::default()).unwrap();
        assert_eq!(outcome.packets.len(), 1);
        let packet = &hub.packets()[0];
        assert_eq!(packet.access_log().len(), previous + 1);
        previous = packet.access_log().len();
        for entry in packet.access_log() {
            let score = hub.collaboration_score(&packet.sender, &entry.accessor).unwrap();
            assert!(score > hub.config().collaboration_threshold);
            assert_eq!(entry.purpose, "analysis");
        }
    }

    // the sender does not read back its own packet
    let own = hub.access_data(&id("utility"), &AccessFilters::default()).unwrap();
    assert!(own.packets.is_empty());
    assert_eq!(hub.packets()[0].access_log().len(), 3);
}

#[test]
fn weak_collaborators_are_excluded() {
    let hub = hub(HubConfig {
        collaboration_threshold: 0.6,
        ..HubConfig::default()
    });
    populate(&hub);
    let shared = hub
        .share_data(
            &id("utility"),
            ShareRequest::new(
                session_payload(),
                [Segment::Transportation, Segment::Retail],
                PrivacyTier::Public,
            ),
        )
        .unwrap();
    assert_eq!(shared.eligible_recipients, vec![id("fleet")]);

    let fleet_score = 0.9 + 0.05 * 3f64.ln();
    let expected = 0.1 + 0.15 * fleet_score + 0.05 * 3f64.ln();
    assert!((shared.sharing_benefit - expected).abs() < 1e-12);

    let shop = hub.access_data(&id("shop"), &AccessFilters::default()).unwrap();
    assert!(shop.packets.is_empty());
    assert!(hub.packets()[0].access_log().is_empty());
}

#[test]
fn unknown_identities_are_rejected() {
    let hub = hub(HubConfig::default());
    populate(&hub);
    let share = hub.share_data(
        &id("ghost"),
        ShareRequest::new(session_payload(), [Segment::Retail], PrivacyTier::Public),
    );
    assert!(matches!(share, Err(HubError::UnregisteredSender(_))));
    let access = hub.access_data(&id("ghost"), &AccessFilters::default());
    assert!(matches!(access, Err(HubError::UnregisteredRequestor(_))));
    assert!(hub.packets().is_empty());
}

#[test]
fn sender_is_resolved_before_share_shape_checks() {
    let hub = hub(HubConfig::default());
    populate(&hub);
    hub.register_schema(DataSchema::new("grid-only", Segment::EnergyGrid, PrivacyTier::Public));

    let ghost = hub.share_data(
        &id("ghost"),
        ShareRequest::new(session_payload(), Vec::<Segment>::new(), PrivacyTier::Public),
    );
    assert!(matches!(ghost, Err(HubError::UnregisteredSender(_))));

    let no_targets = hub.share_data(
        &id("utility"),
        ShareRequest::new(session_payload(), Vec::<Segment>::new(), PrivacyTier::Public),
    );
    assert!(matches!(no_targets, Err(HubError::NoTargetSegments)));

    let foreign = hub
        .share_data(
            &id("fleet"),
            ShareRequest::new(session_payload(), [Segment::Retail], PrivacyTier::Public)
                .under_agreement("grid-only"),
        )
        .unwrap_err();
    assert!(matches!(
        foreign,
        HubError::AgreementSegmentMismatch {
            agreement_segment: Segment::EnergyGrid,
            sender_segment: Segment::Transportation,
            ..
        }
    ));
    assert!(hub.packets().is_empty());

    hub.share_data(
        &id("utility"),
        ShareRequest::new(session_payload(), [Segment::Retail], PrivacyTier::Public)
            .under_agreement("grid-only"),
    )
    .unwrap();
    assert_eq!(hub.packets().len(), 1);
}

#[test]
fn agreements_enforce_floor_accessors_and_retention() {
    let hub = hub(HubConfig::default());
    populate(&hub);
    hub.register_schema(
        DataSchema::new("fleet-telemetry", Segment::EnergyGrid, PrivacyTier::Homomorphic)
            .with_data_types(["charging-session"])
            .with_accessors([id("fleet")]),
    );
    hub.register_schema(
        DataSchema::new("ephemeral", Segment::EnergyGrid, PrivacyTier::Public).with_retention_days(0),
    );

    let floored = hub
        .share_data(
            &id("utility"),
            ShareRequest::new(
                session_payload(),
                [Segment::Transportation, Segment::Retail],
                PrivacyTier::Public,
            )
            .under_agreement("fleet-telemetry"),
        )
        .unwrap();
    assert_eq!(floored.privacy_level, PrivacyTier::Homomorphic);

    hub.share_data(
        &id("utility"),
        ShareRequest::new(session_payload(), [Segment::Retail], PrivacyTier::Public)
            .under_agreement("ephemeral"),
    )
    .unwrap();

    let fleet = hub.access_data(&id("fleet"), &AccessFilters::default()).unwrap();
    assert_eq!(fleet.packets.len(), 1);
    assert_eq!(fleet.packets[0].privacy_level, PrivacyTier::Homomorphic);
    assert_ne!(fleet.packets[0].payload, session_payload());

    // not a permitted accessor, and the other packet has already expired
    let shop = hub.access_data(&id("shop"), &AccessFilters::default()).unwrap();
    assert!(shop.packets.is_empty());

    let missing = hub.share_data(
        &id("utility"),
        ShareRequest::new(session_payload(), [Segment::Retail], PrivacyTier::Public)
            .under_agreement("nope"),
    );
    assert!(matches!(missing, Err(HubError::UnknownAgreement(_))));
}

#[test]
fn filters_narrow_results() {
    let hub = hub(HubConfig::default());
    populate(&hub);
    hub.share_data(
        &id("utility"),
        ShareRequest::new(session_payload(), [Segment::Retail], PrivacyTier::Public),
    )
    .unwrap();
    hub.share_data(
        &id("fleet"),
        ShareRequest::new(session_payload(), [Segment::Retail], PrivacyTier::SecureMpc),
    )
    .unwrap();

    let only_fleet = AccessFilters {
        source_segment: Some(Segment::Transportation),
        purpose: Some("pricing".into()),
        ..AccessFilters::default()
    };
    let outcome = hub.access_data(&id("shop"), &only_fleet).unwrap();
    assert_eq!(outcome.packets.len(), 1);
    assert_eq!(outcome.packets[0].payload["mpc_ready"], json!(true));
    assert_eq!(hub.packets()[1].access_log()[0].purpose, "pricing");

    let public_only = AccessFilters {
        privacy_level: Some(PrivacyTier::Public),
        ..AccessFilters::default()
    };
    let outcome = hub.access_data(&id("shop"), &public_only).unwrap();
    assert_eq!(outcome.packets.len(), 1);
    assert_eq!(outcome.packets[0].payload, session_payload());
}

#[test]
fn analytics_summarise_activity() {
    let hub = hub(HubConfig::default());
    populate(&hub);
    hub.share_data(
        &id("utility"),
        ShareRequest::new(session_payload(), [Segment::Transportation], PrivacyTier::Differential),
    )
    .unwrap();
    hub.access_data(&id("fleet"), &AccessFilters::default()).unwrap();

    let analytics = hub.network_analytics();
    assert_eq!(analytics.total_participants, 3);
    assert_eq!(analytics.total_packets, 1);
    assert_eq!(analytics.total_accesses, 1);
    assert_eq!(analytics.packets_by_tier[&PrivacyTier::Differential], 1);
    assert_eq!(analytics.participants_per_segment[&Segment::Retail], 1);
    assert_eq!(analytics.strong_pairs.len(), 1);
    assert_eq!(analytics.strong_pairs[0].score, hub.collaboration_score(&id("utility"), &id("fleet")).unwrap());
    assert_eq!(hub.telemetry().counter("hub.packets_accessed"), 1);
}
