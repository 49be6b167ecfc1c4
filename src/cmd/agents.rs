//! Agent status listing.

use anyhow::Result;

use ctxpilot::config::Config;
use ctxpilot::providers::{AgentsProvider, render};

use super::backend_client;

pub async fn cmd_agents(config: &Config) -> Result<()> {
    let client = backend_client(config).await?;
    render(&AgentsProvider.items(&client).await);
    Ok(())
}
