//! Marketplace node binary.
//!
//! Boots a node from an optional YAML config, runs until interrupted, and
//! persists state on the way out.

use anyhow::Result;
use log::info;
use marketplace_node::config::NodeConfig;
use marketplace_node::node::{wall_clock_now, MarketplaceNode};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => NodeConfig::load(Path::new(&path))?,
        None => NodeConfig::default(),
    };

    let node = MarketplaceNode::boot(config)?;
    info!(
        "marketplace node ready at {}: {} datasets minted, {} accounts, state root {}",
        wall_clock_now(),
        node.total_minted().await,
        node.account_count().await,
        node.state_root().await
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    node.save().await?;
    Ok(())
}
