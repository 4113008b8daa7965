//! feed-arbiter: compare arrival times of the A and B feeds in a capture directory

use anyhow::{Context, Result};
use clap::Parser;
use feed_arbiter::{run_directory, ArbiterConfig};
use std::path::PathBuf;
use tracing::info;

/// Arbitrate two redundant market data feeds captured as pcap files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding exactly two capture files, one per feed
    dir: PathBuf,

    /// Configuration file path (can also be set via FEED_ARBITER_CONFIG env var)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP destination port of feed A (overrides config)
    #[arg(long)]
    port_a: Option<u16>,

    /// UDP destination port of feed B (overrides config)
    #[arg(long)]
    port_b: Option<u16>,

    /// Print the summary as JSON instead of a text table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    feed_arbiter::init_logging();

    let mut config = ArbiterConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(port) = args.port_a {
        config.feed_a_port = port;
    }
    if let Some(port) = args.port_b {
        config.feed_b_port = port;
    }
    info!(
        port_a = config.feed_a_port,
        port_b = config.feed_b_port,
        dir = %args.dir.display(),
        "starting arbitration"
    );

    let summary = run_directory(config, &args.dir)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }

    Ok(())
}
