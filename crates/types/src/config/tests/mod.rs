// Path: crates/types/src/config/tests/mod.rs
use super::*;
use std::io::Write;

const SAMPLE: &str = r#"
max_endorsement_concurrency = 16

[identity]
msp_id = "Org1MSP"
cert_path = "/etc/stitch/admin-cert.pem"
key_path = "/etc/stitch/admin-key.pem"

[[peers]]
name = "peer0.org1"
url = "grpcs://peer0.org1.example.com:7051"
msp_id = "Org1MSP"
ssl_target_name_override = "peer0.org1.example.com"

[[orderers]]
name = "orderer0"
url = "grpc://localhost:7050"

[timeouts]
endorse_ms = 5000
"#;

#[test]
fn parses_sample_and_fills_defaults() {
    let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
    assert_eq!(config.identity.as_ref().unwrap().msp_id, "Org1MSP");
    assert_eq!(config.peers.len(), 1);
    assert!(config.peers[0].uses_tls());
    assert!(!config.orderers[0].uses_tls());
    assert_eq!(config.timeouts.endorse_ms, 5000);
    assert_eq!(config.timeouts.order_ms, 30_000);
    assert_eq!(
        config.timeouts.for_kind(RpcKind::Install),
        Duration::from_secs(300)
    );
}

#[test]
fn concurrency_is_clamped() {
    let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
    assert_eq!(config.max_endorsement_concurrency, 16);
    assert_eq!(config.effective_concurrency(), MAX_ENDORSEMENT_CONCURRENCY);

    let zero = ClientConfig {
        max_endorsement_concurrency: 0,
        ..ClientConfig::default()
    };
    assert_eq!(zero.effective_concurrency(), 1);
}

#[test]
fn rejects_unknown_scheme() {
    let bad = r#"
[[peers]]
name = "peer0"
url = "tcp://peer0:7051"
"#;
    assert!(matches!(
        ClientConfig::from_toml_str(bad),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn rejects_zero_timeouts() {
    let zero_order = r#"
[timeouts]
order_ms = 0
"#;
    match ClientConfig::from_toml_str(zero_order) {
        Err(ConfigError::Invalid(message)) => assert!(message.contains("order_ms")),
        other => panic!("expected invalid config, got {other:?}"),
    }

    let mut config = ClientConfig::default();
    config.timeouts.participation_ms = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    assert!(ClientConfig::default().validate().is_ok());
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();
    let config = ClientConfig::load(file.path()).unwrap();
    assert!(config.peer("peer0.org1").is_some());
    assert!(config.orderer("orderer0").is_some());
    assert!(config.peer("missing").is_none());
}
