// Path: crates/cli/src/main.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Stitch CLI
//!
//! Operator tooling for keys, certificates, the chaincode lifecycle and
//! orderer channel membership.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod util;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "stitch",
    version,
    about = "Keys, certificates, chaincode lifecycle and channel tooling for permissioned ledgers."
)]
struct Cli {
    /// Client configuration (TOML). Network commands require it.
    #[clap(long, global = true, env = "STITCH_CONFIG")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // --- Offline ---
    /// Generate keys, sign and verify.
    Keys(keys::KeysArgs),

    /// Inspect certificates, build CSRs and check trust.
    Cert(cert::CertArgs),

    // --- Network ---
    /// Install, approve, check and commit chaincode definitions.
    Lifecycle(lifecycle::LifecycleArgs),

    /// Read blocks and manage orderer channel membership.
    Channel(channel::ChannelArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    stitch_telemetry::init::init_tracing()?;

    match cli.command {
        Commands::Keys(args) => keys::run(args),
        Commands::Cert(args) => cert::run(args),
        Commands::Lifecycle(args) => lifecycle::run(cli.config.as_deref(), args).await,
        Commands::Channel(args) => channel::run(cli.config.as_deref(), args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from([
            "stitch",
            "channel",
            "list",
            "--config",
            "/etc/stitch/client.toml",
        ])
        .unwrap();
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("/etc/stitch/client.toml"))
        );
    }

    #[test]
    fn commit_takes_several_peers() {
        let cli = Cli::try_parse_from([
            "stitch",
            "lifecycle",
            "commit",
            "--channel",
            "mychannel",
            "--name",
            "basic",
            "--version",
            "1.0",
            "--sequence",
            "2",
            "--peer",
            "peer0",
            "--peer",
            "peer1",
            "--orderer",
            "orderer0",
        ])
        .unwrap();
        let Commands::Lifecycle(args) = cli.command else {
            panic!("expected lifecycle");
        };
        let lifecycle::LifecycleCommands::Commit { peers, definition, .. } = args.command else {
            panic!("expected commit");
        };
        assert_eq!(peers, vec!["peer0", "peer1"]);
        assert_eq!(definition.sequence, 2);
    }
}
