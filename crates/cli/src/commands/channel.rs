// Path: crates/cli/src/commands/channel.rs

use crate::util::{load_config, print_json, read_bytes, session};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use prost::Message;
use std::path::{Path, PathBuf};
use stitch_client::participation::Participation;
use stitch_client::pipeline::BlockRange;
use stitch_client::{ClientContext, Pipeline};

#[derive(Parser, Debug)]
pub struct ChannelArgs {
    #[clap(subcommand)]
    pub command: ChannelCommands,
}

#[derive(Subcommand, Debug)]
pub enum ChannelCommands {
    /// Read blocks from an orderer's deliver service.
    Blocks {
        #[clap(long)]
        channel: String,
        #[clap(long)]
        orderer: String,
        /// First block; with no `--end`, only this block is read.
        #[clap(long, conflicts_with_all = ["newest", "oldest"])]
        start: Option<u64>,
        #[clap(long, requires = "start")]
        end: Option<u64>,
        #[clap(long)]
        newest: bool,
        #[clap(long)]
        oldest: bool,
        /// Writes each block as `<dir>/<channel>_<number>.block`.
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// List the channels the orderer participates in.
    List,
    /// Show one channel's participation status.
    Info { channel: String },
    /// Join the orderer to a channel with its config block.
    Join { block: PathBuf },
    /// Remove the orderer from a channel.
    Unjoin { channel: String },
}

fn block_range(start: Option<u64>, end: Option<u64>, newest: bool, oldest: bool) -> Result<BlockRange> {
    Ok(match (start, end, newest, oldest) {
        (Some(start), Some(end), false, false) => BlockRange::Range(start, end),
        (Some(number), None, false, false) => BlockRange::Number(number),
        (None, None, true, false) => BlockRange::Newest,
        (None, None, false, true) => BlockRange::Oldest,
        _ => return Err(anyhow!("Choose one of --start [--end], --newest or --oldest")),
    })
}

pub async fn run(config: Option<&Path>, args: ChannelArgs) -> Result<()> {
    match args.command {
        ChannelCommands::Blocks {
            channel,
            orderer,
            start,
            end,
            newest,
            oldest,
            out,
        } => {
            let range = block_range(start, end, newest, oldest)?;
            let session = session(config)?;
            let orderer = session.ctx.resolve_orderer(&orderer)?;
            let pipeline = Pipeline::new(&session.ctx, &session.transport, &session.identity);
            let blocks = pipeline.fetch_blocks(&channel, &orderer, range).await?;
            for block in blocks {
                let header = block.header.clone().unwrap_or_default();
                let transactions = block.data.as_ref().map_or(0, |d| d.data.len());
                match &out {
                    Some(dir) => {
                        let path = dir.join(format!("{channel}_{}.block", header.number));
                        std::fs::write(&path, block.encode_to_vec())?;
                        println!("{}", path.display());
                    }
                    None => println!(
                        "{}\t{} tx\tdata_hash={}",
                        header.number,
                        transactions,
                        hex::encode(&header.data_hash)
                    ),
                }
            }
        }
        ChannelCommands::List => {
            let ctx = ClientContext::new(load_config(config)?);
            print_json(&Participation::new(&ctx)?.list().await?)?;
        }
        ChannelCommands::Info { channel } => {
            let ctx = ClientContext::new(load_config(config)?);
            print_json(&Participation::new(&ctx)?.get_channel(&channel).await?)?;
        }
        ChannelCommands::Join { block } => {
            let ctx = ClientContext::new(load_config(config)?);
            let info = Participation::new(&ctx)?.join(&read_bytes(&block)?).await?;
            println!("Joined {} as {} ({})", info.name, info.consensus_relation, info.status);
        }
        ChannelCommands::Unjoin { channel } => {
            let ctx = ClientContext::new(load_config(config)?);
            Participation::new(&ctx)?.remove(&channel).await?;
            println!("Removed from {channel}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_selection_is_exclusive() {
        assert_eq!(block_range(Some(3), Some(7), false, false).unwrap(), BlockRange::Range(3, 7));
        assert_eq!(block_range(Some(3), None, false, false).unwrap(), BlockRange::Number(3));
        assert_eq!(block_range(None, None, true, false).unwrap(), BlockRange::Newest);
        assert_eq!(block_range(None, None, false, true).unwrap(), BlockRange::Oldest);
        assert!(block_range(None, None, false, false).is_err());
        assert!(block_range(None, None, true, true).is_err());
    }
}
