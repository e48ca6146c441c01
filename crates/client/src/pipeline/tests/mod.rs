// Path: crates/client/src/pipeline/tests/mod.rs
use super::*;
use crate::testing::{config, orderer, peer, response, test_identity, Behavior, MockTransport};
use std::sync::Arc;
use std::time::Duration;
use stitch_ipc::common::ConfigSignature;
use stitch_telemetry::prometheus::PrometheusSink;
use stitch_types::config::ClientConfig;

fn request() -> ProposalRequest {
    ProposalRequest::new("mychannel", "basic", "CreateAsset").arg("asset1")
}

#[test]
fn call_state_moves_forward_only() {
    let state = CallState::Building;
    assert!(state.advance(CallState::Sent).is_err());
    let state = state.advance(CallState::Signed).unwrap();
    let state = state.advance(CallState::Sent).unwrap();
    let done = state.advance(CallState::Succeeded).unwrap();
    assert!(done.advance(CallState::Failed).is_err());
    assert_eq!(
        CallState::Signed.advance(CallState::Failed).unwrap(),
        CallState::Failed
    );
    assert!(matches!(
        CallState::Failed.advance(CallState::Building),
        Err(ValidationError::InvalidTransition { .. })
    ));
}

#[test]
fn liar_success_table_matches_case_insensitively() {
    assert_eq!(liar_success_code("Identity is not an admin"), Some(7));
    assert_eq!(liar_success_code("creator certificate is not valid"), Some(16));
    assert_eq!(
        liar_success_code("chaincode definition for 'basic' already exists"),
        Some(6)
    );
    assert_eq!(
        liar_success_code("requested sequence is 1, but new definition must be sequence 2"),
        Some(9)
    );
    assert_eq!(liar_success_code("all good"), None);
}

#[test]
fn transport_ok_with_admin_message_is_permission_denied() {
    let outcome = Err(TransportError::Rpc {
        url: "grpc://peer0:7051".into(),
        code: 0,
        message: "failed: identity is not an admin".into(),
    });
    let err = classify_response("peer0", outcome).unwrap_err();
    assert_eq!(err.status(), 7);
    assert!(matches!(err, SdkError::Ledger(LedgerError::LiarSuccess { .. })));

    let outcome = Err(TransportError::Rpc {
        url: "grpc://peer0:7051".into(),
        code: 2,
        message: "something else".into(),
    });
    assert_eq!(classify_response("peer0", outcome).unwrap_err().status(), 2);
}

#[test]
fn application_status_decides_before_the_table() {
    let err = classify_response("peer0", Ok(response(500, "access denied", b""))).unwrap_err();
    assert!(matches!(
        err,
        SdkError::Ledger(LedgerError::ProposalRejected { status: 500, .. })
    ));
    let err = classify_response("peer0", Ok(response(200, "access denied", b""))).unwrap_err();
    assert_eq!(err.status(), 7);
    assert!(classify_response("peer0", Ok(response(200, "", b"x"))).is_ok());
}

#[tokio::test]
async fn one_failing_peer_of_three_still_commits() {
    let ctx = ClientContext::new(config(&["peer0", "peer1", "peer2"]));
    let transport = MockTransport::new().with_peer(
        "peer1",
        Behavior::Fail(TransportError::Connection {
            url: "grpc://peer1:7051".into(),
            message: "connection refused".into(),
        }),
    );
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let peers = ctx.resolve_peers(&["peer0", "peer1", "peer2"]).unwrap();

    let result = pipeline.submit(&request(), &peers, &orderer()).await.unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(result.endorsers, vec!["peer0", "peer2"]);
    assert_eq!(result.soft_errors.len(), 1);
    assert_eq!(result.soft_errors.failures[0].peer, "peer1");
    assert_eq!(result.soft_errors.failures[0].status, 14);
    assert_eq!(result.payload, b"ok");

    let payloads = transport.broadcast_payloads();
    assert_eq!(payloads.len(), 1);
    let tx = Transaction::decode(&payloads[0].data[..]).unwrap();
    let action = ChaincodeActionPayload::decode(&tx.actions[0].payload[..]).unwrap();
    assert_eq!(action.action.unwrap().endorsements.len(), 2);
}

#[tokio::test]
async fn all_peers_failing_is_fatal_and_nothing_is_ordered() {
    let ctx = ClientContext::new(config(&["peer0", "peer1"]));
    let transport = MockTransport::new().with_default(Behavior::Respond(response(
        500,
        "chaincode panicked",
        b"",
    )));
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let peers = ctx.resolve_peers(&["peer0", "peer1"]).unwrap();

    let err = pipeline.submit(&request(), &peers, &orderer()).await.unwrap_err();
    assert_eq!(
        err.error,
        SdkError::Ledger(LedgerError::NoEndorsements { failures: 2 })
    );
    assert_eq!(err.function_name, "submit");
    assert!(transport.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_payloads_are_soft_errors() {
    let ctx = ClientContext::new(config(&["peer0", "peer1"]));
    let transport = MockTransport::new()
        .with_peer("peer1", Behavior::Respond(response(200, "", b"different")));
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let peers = ctx.resolve_peers(&["peer0", "peer1"]).unwrap();

    let result = pipeline.submit(&request(), &peers, &orderer()).await.unwrap();
    assert_eq!(result.endorsers, vec!["peer0"]);
    assert_eq!(result.soft_errors.failures[0].status, status::ABORTED);
}

#[test]
fn agreed_payload_comes_from_the_first_endorsed_response() {
    let identity = test_identity();
    let proposal = build_proposal(&identity, &request()).unwrap();
    let mut unsigned = response(200, "", b"unsigned");
    unsigned.endorsement = None;
    let endorsed = response(200, "", b"ok");
    let results = vec![
        EndorsementResult {
            peer: "peer0".into(),
            status: 200,
            message: String::new(),
            response: Some(unsigned),
            error: None,
        },
        EndorsementResult {
            peer: "peer1".into(),
            status: 200,
            message: String::new(),
            response: Some(endorsed.clone()),
            error: None,
        },
    ];

    let prepared = build_transaction_envelope(&identity, &proposal, &results).unwrap();
    assert_eq!(prepared.endorsers, vec!["peer1"]);
    assert_eq!(prepared.payload, b"ok");
    assert_eq!(prepared.soft_errors.len(), 1);
    assert_eq!(prepared.soft_errors.failures[0].peer, "peer0");
    assert_eq!(prepared.soft_errors.failures[0].status, status::INTERNAL);

    let payload = Payload::decode(&prepared.envelope.payload[..]).unwrap();
    let tx = Transaction::decode(&payload.data[..]).unwrap();
    let action = ChaincodeActionPayload::decode(&tx.actions[0].payload[..]).unwrap();
    let endorsed_action = action.action.unwrap();
    assert_eq!(endorsed_action.proposal_response_payload, endorsed.payload);
    assert_eq!(endorsed_action.endorsements.len(), 1);
}

#[tokio::test]
async fn slow_peer_times_out_with_status_four() {
    let mut cfg = config(&["peer0"]);
    cfg.timeouts.endorse_ms = 20;
    let ctx = ClientContext::new(cfg);
    let transport = MockTransport::new().with_peer("peer0", Behavior::Hang);
    let identity = test_identity();
    let proposal = build_proposal(&identity, &request()).unwrap();

    let result = endorse_one(&ctx, &transport, &peer("peer0"), proposal.signed()).await;
    assert!(!result.is_success());
    assert_eq!(result.status, 4);
    assert!(matches!(
        result.error,
        Some(SdkError::Transport(TransportError::Timeout { .. }))
    ));
}

#[tokio::test]
async fn fan_out_never_exceeds_four_in_flight() {
    let names: Vec<String> = (0..10).map(|i| format!("peer{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut cfg = config(&refs);
    cfg.max_endorsement_concurrency = 16;
    let ctx = ClientContext::new(cfg);
    let transport = MockTransport::new().with_default(Behavior::Delay(
        Duration::from_millis(20),
        response(200, "", b"ok"),
    ));
    let identity = test_identity();
    let proposal = build_proposal(&identity, &request()).unwrap();
    let peers = ctx.resolve_peers(&refs).unwrap();

    let results = endorse_many(&ctx, &transport, &peers, proposal.signed()).await;
    assert_eq!(results.len(), 10);
    assert!(results.iter().all(EndorsementResult::is_success));
    let order: Vec<&str> = results.iter().map(|r| r.peer.as_str()).collect();
    assert_eq!(order, refs);
    let max = transport
        .max_in_flight
        .load(std::sync::atomic::Ordering::SeqCst);
    assert!(max <= 4, "saw {max} concurrent endorsements");
    assert!(max >= 2);
}

#[tokio::test]
async fn orderer_rejection_is_reported() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let mut transport = MockTransport::new();
    transport.broadcast_status = 403;
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);

    let err = pipeline
        .submit(&request(), &[peer("peer0")], &orderer())
        .await
        .unwrap_err();
    assert!(matches!(
        err.error,
        SdkError::Ledger(LedgerError::OrderRejected { status: 403, .. })
    ));
}

#[tokio::test]
async fn evaluate_returns_the_chaincode_payload() {
    let ctx = ClientContext::new(config(&["peer0"]));
    let transport =
        MockTransport::new().with_default(Behavior::Respond(response(200, "", b"{\"id\":1}")));
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let payload = pipeline.evaluate(&request(), &peer("peer0")).await.unwrap();
    assert_eq!(payload, b"{\"id\":1}");
    assert!(transport.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn fetch_blocks_collects_until_status() {
    let ctx = ClientContext::new(ClientConfig::default());
    let mut transport = MockTransport::new();
    let block = |n| Block {
        header: Some(stitch_ipc::common::BlockHeader {
            number: n,
            ..Default::default()
        }),
        ..Default::default()
    };
    transport.deliver = vec![
        stitch_ipc::orderer::DeliverResponse {
            r#type: Some(deliver_response::Type::Block(block(3))),
        },
        stitch_ipc::orderer::DeliverResponse {
            r#type: Some(deliver_response::Type::Block(block(4))),
        },
        stitch_ipc::orderer::DeliverResponse {
            r#type: Some(deliver_response::Type::Status(200)),
        },
    ];
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let blocks = pipeline
        .fetch_blocks("mychannel", &orderer(), BlockRange::Range(3, 4))
        .await
        .unwrap();
    assert_eq!(blocks.len(), 2);

    let sent = transport.broadcast_payloads();
    let seek = SeekInfo::decode(&sent[0].data[..]).unwrap();
    assert_eq!(
        seek.start.unwrap().r#type,
        Some(seek_position::Type::Specified(SeekSpecified { number: 3 }))
    );
    let header = ChannelHeader::decode(&sent[0].header.as_ref().unwrap().channel_header[..]).unwrap();
    assert_eq!(header.r#type, HeaderType::DeliverSeekInfo as i32);

    assert!(pipeline
        .fetch_blocks("mychannel", &orderer(), BlockRange::Range(5, 4))
        .await
        .is_err());
}

#[tokio::test]
async fn deliver_failure_status_is_an_error() {
    let ctx = ClientContext::new(ClientConfig::default());
    let mut transport = MockTransport::new();
    transport.deliver = vec![stitch_ipc::orderer::DeliverResponse {
        r#type: Some(deliver_response::Type::Status(404)),
    }];
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let err = pipeline
        .fetch_block("mychannel", &orderer(), 99)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 404);
}

#[tokio::test]
async fn config_updates_need_a_signature() {
    let ctx = ClientContext::new(ClientConfig::default());
    let transport = MockTransport::new();
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let mut update = ConfigUpdateEnvelope::default();
    assert!(pipeline
        .submit_config_update("mychannel", &orderer(), &update)
        .await
        .is_err());

    update.signatures.push(ConfigSignature {
        signature_header: vec![1],
        signature: vec![2],
    });
    let response = pipeline
        .submit_config_update("mychannel", &orderer(), &update)
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    let sent = transport.broadcast_payloads();
    assert_eq!(
        ConfigUpdateEnvelope::decode(&sent[0].data[..]).unwrap(),
        update
    );
}

#[tokio::test]
async fn metrics_record_outcomes() {
    let sink = Arc::new(PrometheusSink::new().unwrap());
    let ctx = ClientContext::with_metrics(config(&["peer0", "peer1"]), sink.clone());
    let transport = MockTransport::new().with_peer(
        "peer1",
        Behavior::Respond(response(200, "access denied", b"")),
    );
    let identity = test_identity();
    let pipeline = Pipeline::new(&ctx, &transport, &identity);
    let peers = ctx.resolve_peers(&["peer0", "peer1"]).unwrap();
    pipeline.submit(&request(), &peers, &orderer()).await.unwrap();

    let text = sink.gather_text().unwrap();
    assert!(text.contains("stitch_endorsements_total{outcome=\"ok\"} 1"));
    assert!(text.contains("stitch_endorsements_total{outcome=\"liar_success\"} 1"));
    assert!(text.contains("stitch_broadcasts_total{status=\"200\"} 1"));
}
