// Path: crates/ipc/build.rs
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Maps stay ordered so encodings are deterministic.
    let mut config = prost_build::Config::new();
    config.btree_map(["."]);

    // Client stubs only.
    tonic_build::configure().build_server(false).compile_with_config(
        config,
        &[
            "proto/msp.proto",
            "proto/common.proto",
            "proto/peer.proto",
            "proto/orderer.proto",
            "proto/lifecycle.proto",
        ],
        &["proto"],
    )?;

    Ok(())
}
