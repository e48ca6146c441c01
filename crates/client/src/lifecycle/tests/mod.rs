// Path: crates/client/src/lifecycle/tests/mod.rs
use super::*;
use crate::testing::{config, response, test_identity, Behavior, MockTransport};
use std::time::Duration;
use stitch_ipc::lifecycle::query_chaincode_definitions_result;
use stitch_ipc::peer::{ChaincodeInvocationSpec, ChaincodeProposalPayload, Proposal};
use stitch_types::app::EndorsementPolicyRef;
use stitch_types::error::{LedgerError, TransportError};

fn definition(sequence: i64) -> ChaincodeDefinition {
    let mut definition = ChaincodeDefinition::new("basic", "1.0", sequence);
    definition.endorsement_policy = Some(EndorsementPolicyRef::SignaturePolicy(
        "OR('Org1MSP.peer', 'Org2MSP.peer')".into(),
    ));
    definition
}

fn commit_request(peers: &[&str]) -> CommitRequest {
    CommitRequest {
        channel_id: "mychannel".into(),
        definition: definition(1),
        peers: peers.iter().map(|p| p.to_string()).collect(),
        orderer: "orderer0".into(),
    }
}

fn sent_args(transport: &MockTransport) -> Vec<u8> {
    let proposals = transport.proposals.lock().unwrap();
    let proposal = Proposal::decode(&proposals[0].1.proposal_bytes[..]).unwrap();
    let payload = ChaincodeProposalPayload::decode(&proposal.payload[..]).unwrap();
    let spec = ChaincodeInvocationSpec::decode(&payload.input[..])
        .unwrap()
        .chaincode_spec
        .unwrap();
    assert_eq!(spec.chaincode_id.unwrap().name, LIFECYCLE_CHAINCODE);
    spec.input.unwrap().args[1].clone()
}

#[test]
fn package_id_is_label_and_content_hash() {
    let id = compute_package_id("basic_1.0", b"package bytes");
    let (label, hash) = id.split_once(':').unwrap();
    assert_eq!(label, "basic_1.0");
    assert_eq!(hash, hex::encode(Sha256::digest(b"package bytes")));
}

#[test]
fn tracker_moves_forward_and_allows_recommit() {
    let tracker = LifecycleTracker::new();
    let installed = LifecycleState::Installed {
        package_id: "basic:ab".into(),
    };
    tracker.record("basic", installed).unwrap();
    tracker
        .record("basic", LifecycleState::ApprovedByOrg { sequence: 1 })
        .unwrap();
    tracker
        .record(
            "basic",
            LifecycleState::ReadyToCommit {
                sequence: 1,
                approvals: BTreeMap::from([("Org1MSP".to_string(), true)]),
            },
        )
        .unwrap();
    tracker
        .record("basic", LifecycleState::Committed { sequence: 1 })
        .unwrap();
    tracker
        .record("basic", LifecycleState::Committed { sequence: 1 })
        .unwrap();

    assert!(matches!(
        tracker.check("basic", &LifecycleState::ApprovedByOrg { sequence: 1 }),
        Err(ValidationError::InvalidTransition { .. })
    ));
    tracker
        .record("basic", LifecycleState::ApprovedByOrg { sequence: 2 })
        .unwrap();
    assert!(tracker
        .check("basic", &LifecycleState::Installed { package_id: "x".into() })
        .is_ok());
    assert!(tracker
        .check("basic", &LifecycleState::Committed { sequence: 1 })
        .is_err());
    assert_eq!(
        tracker.state("basic"),
        Some(LifecycleState::ApprovedByOrg { sequence: 2 })
    );
}

#[tokio::test]
async fn install_returns_the_package_id_under_the_install_deadline() {
    let mut cfg = config(&["peer0"]);
    cfg.timeouts.endorse_ms = 5;
    cfg.timeouts.install_ms = 5_000;
    let ctx = ClientContext::new(cfg);
    let package = b"tarball".to_vec();
    let package_id = compute_package_id("basic_1.0", &package);
    let result = InstallChaincodeResult {
        package_id: package_id.clone(),
        label: "basic_1.0".into(),
    }
    .encode_to_vec();
    let transport = MockTransport::new().with_default(Behavior::Delay(
        Duration::from_millis(30),
        response(200, "", &result),
    ));
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);

    let installed = lifecycle
        .install(&InstallRequest {
            peer: "peer0".into(),
            chaincode_name: "basic".into(),
            label: "basic_1.0".into(),
            package: package.clone(),
        })
        .await
        .unwrap();
    assert_eq!(installed.package_id, package_id);
    assert_eq!(transport.functions(), vec![INSTALL]);
    let args = InstallChaincodeArgs::decode(&sent_args(&transport)[..]).unwrap();
    assert_eq!(args.chaincode_install_package, package);
    assert_eq!(
        lifecycle.tracker().state("basic"),
        Some(LifecycleState::Installed { package_id })
    );
}

#[tokio::test]
async fn install_on_a_second_peer_after_approval_is_allowed() {
    let ctx = ClientContext::new(config(&["peer0", "peer1"]));
    let package = b"tarball".to_vec();
    let package_id = compute_package_id("basic_1.0", &package);
    let result = InstallChaincodeResult {
        package_id: package_id.clone(),
        label: "basic_1.0".into(),
    }
    .encode_to_vec();
    let transport =
        MockTransport::new().with_default(Behavior::Respond(response(200, "", &result)));
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let install = |peer: &str| InstallRequest {
        peer: peer.into(),
        chaincode_name: "basic".into(),
        label: "basic_1.0".into(),
        package: package.clone(),
    };

    lifecycle.install(&install("peer0")).await.unwrap();
    lifecycle
        .approve(&ApproveRequest {
            channel_id: "mychannel".into(),
            definition: definition(1),
            package_id: Some(package_id.clone()),
            peer: "peer0".into(),
            orderer: "orderer0".into(),
        })
        .await
        .unwrap();
    let installed = lifecycle.install(&install("peer1")).await.unwrap();

    assert_eq!(installed.package_id, package_id);
    assert_eq!(transport.functions(), vec![INSTALL, APPROVE, INSTALL]);
    assert_eq!(transport.proposals.lock().unwrap().len(), 3);
    assert_eq!(
        lifecycle.tracker().state("basic"),
        Some(LifecycleState::ApprovedByOrg { sequence: 1 })
    );
}

#[tokio::test]
async fn reinstall_is_reported_as_already_exists() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let transport = MockTransport::new().with_default(Behavior::Respond(response(
        200,
        "chaincode already successfully installed",
        b"",
    )));
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let err = lifecycle
        .install(&InstallRequest {
            peer: "peer0".into(),
            chaincode_name: String::new(),
            label: "basic_1.0".into(),
            package: b"tarball".to_vec(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), 6);
    assert_eq!(err.function_name, "installChaincode");
    assert!(lifecycle.tracker().state("basic_1.0").is_none());
}

#[tokio::test]
async fn approve_orders_the_definition() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let transport = MockTransport::new();
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let result = lifecycle
        .approve(&ApproveRequest {
            channel_id: "mychannel".into(),
            definition: definition(1),
            package_id: Some("basic_1.0:abcd".into()),
            peer: "peer0".into(),
            orderer: "orderer0".into(),
        })
        .await
        .unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(transport.functions(), vec![APPROVE]);
    assert_eq!(transport.broadcasts.lock().unwrap().len(), 1);

    let args = ApproveChaincodeDefinitionForMyOrgArgs::decode(&sent_args(&transport)[..]).unwrap();
    assert_eq!(args.name, "basic");
    assert_eq!(args.sequence, 1);
    assert!(!args.validation_parameter.is_empty());
    assert_eq!(
        args.source.unwrap().r#type,
        Some(chaincode_source::Type::LocalPackage(chaincode_source::Local {
            package_id: "basic_1.0:abcd".into()
        }))
    );
    assert_eq!(
        lifecycle.tracker().state("basic"),
        Some(LifecycleState::ApprovedByOrg { sequence: 1 })
    );
}

#[tokio::test]
async fn approve_failure_is_fatal_and_keeps_its_code() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let transport = MockTransport::new().with_default(Behavior::Respond(response(
        200,
        "identity is not an admin",
        b"",
    )));
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let err = lifecycle
        .approve(&ApproveRequest {
            channel_id: "mychannel".into(),
            definition: definition(1),
            package_id: None,
            peer: "peer0".into(),
            orderer: "orderer0".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), 7);
    assert!(matches!(
        err.error,
        SdkError::Ledger(LedgerError::LiarSuccess { code: 7, .. })
    ));
    assert!(transport.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_definition_fails_before_io() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let transport = MockTransport::new();
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let mut request = commit_request(&["peer0"]);
    request.definition.sequence = 0;
    let err = lifecycle.commit(&request).await.unwrap_err();
    assert_eq!(err.status(), 3);

    let mut request = commit_request(&["peer0"]);
    request.definition.endorsement_policy =
        Some(EndorsementPolicyRef::SignaturePolicy("AND(".into()));
    assert!(lifecycle.commit(&request).await.is_err());
    assert!(transport.proposals.lock().unwrap().is_empty());
}

#[tokio::test]
async fn check_readiness_returns_the_approval_map() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let approvals = BTreeMap::from([
        ("Org1MSP".to_string(), true),
        ("Org2MSP".to_string(), false),
    ]);
    let payload = CheckCommitReadinessResult {
        approvals: approvals.clone(),
    }
    .encode_to_vec();
    let transport =
        MockTransport::new().with_default(Behavior::Respond(response(200, "", &payload)));
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let result = lifecycle
        .check_commit_readiness(&CheckReadinessRequest {
            channel_id: "mychannel".into(),
            definition: definition(1),
            peer: "peer0".into(),
        })
        .await
        .unwrap();
    assert_eq!(result, approvals);
    assert!(transport.broadcasts.lock().unwrap().is_empty());
    assert!(matches!(
        lifecycle.tracker().state("basic"),
        Some(LifecycleState::ReadyToCommit { sequence: 1, .. })
    ));
}

#[tokio::test]
async fn commit_tolerates_one_failing_peer_of_three() {
    let ctx = ClientContext::new(config(&["peer0", "peer1", "peer2"]));
    let transport = MockTransport::new().with_peer(
        "peer2",
        Behavior::Fail(TransportError::Rpc {
            url: "grpc://peer2:7051".into(),
            code: 14,
            message: "connection reset".into(),
        }),
    );
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let result = lifecycle
        .commit(&commit_request(&["peer0", "peer1", "peer2"]))
        .await
        .unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(result.endorsers.len(), 2);
    assert_eq!(result.soft_errors.len(), 1);
    assert_eq!(result.soft_errors.failures[0].peer, "peer2");
    assert_eq!(transport.functions(), vec![COMMIT, COMMIT, COMMIT]);

    let again = lifecycle
        .commit(&commit_request(&["peer0", "peer1"]))
        .await
        .unwrap();
    assert!(again.soft_errors.is_empty());
}

#[tokio::test]
async fn commit_without_any_endorsement_fails() {
    let ctx = ClientContext::new(config(&["peer0", "peer1"]));
    let transport = MockTransport::new().with_default(Behavior::Respond(response(
        200,
        "requested sequence is 1, but new definition must be sequence 2",
        b"",
    )));
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let err = lifecycle
        .commit(&commit_request(&["peer0", "peer1"]))
        .await
        .unwrap_err();
    assert_eq!(
        err.error,
        SdkError::Ledger(LedgerError::NoEndorsements { failures: 2 })
    );
    assert!(lifecycle.tracker().state("basic").is_none());
}

#[tokio::test]
async fn queries_decode_their_results() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let installed = QueryInstalledChaincodesResult {
        installed_chaincodes: vec![stitch_ipc::lifecycle::InstalledChaincode {
            package_id: "basic_1.0:ff".into(),
            label: "basic_1.0".into(),
        }],
    }
    .encode_to_vec();
    let transport =
        MockTransport::new().with_default(Behavior::Respond(response(200, "", &installed)));
    let identity = test_identity();
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let list = lifecycle.query_installed("peer0").await.unwrap();
    assert_eq!(list[0].label, "basic_1.0");

    let definitions = QueryChaincodeDefinitionsResult {
        chaincode_definitions: vec![query_chaincode_definitions_result::ChaincodeDefinition {
            name: "basic".into(),
            sequence: 3,
            version: "2.0".into(),
            ..Default::default()
        }],
    }
    .encode_to_vec();
    let transport =
        MockTransport::new().with_default(Behavior::Respond(response(200, "", &definitions)));
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let all = lifecycle
        .query_committed_all("mychannel", "peer0")
        .await
        .unwrap();
    assert_eq!(all[0].sequence, 3);
    assert!(all[0].approvals.is_empty());

    let one = QueryChaincodeDefinitionResult {
        sequence: 3,
        version: "2.0".into(),
        approvals: BTreeMap::from([("Org1MSP".to_string(), true)]),
        ..Default::default()
    }
    .encode_to_vec();
    let transport = MockTransport::new().with_default(Behavior::Respond(response(200, "", &one)));
    let lifecycle = Lifecycle::new(&ctx, &transport, &identity);
    let committed = lifecycle
        .query_committed("mychannel", "basic", "peer0")
        .await
        .unwrap();
    assert_eq!(committed.name, "basic");
    assert_eq!(committed.approvals.get("Org1MSP"), Some(&true));
    assert!(lifecycle.query_committed("", "basic", "peer0").await.is_err());
    assert!(lifecycle.query_installed("peer9").await.is_err());
}
