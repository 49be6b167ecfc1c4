//! Reward commands — balance and leaderboard.

use anyhow::Result;

use ctxpilot::config::Config;
use ctxpilot::providers::{RewardsProvider, render};

use super::backend_client;

pub async fn cmd_rewards_balance(config: &Config) -> Result<()> {
    let client = backend_client(config).await?;
    render(&RewardsProvider.items(&client).await);
    Ok(())
}

pub async fn cmd_rewards_leaderboard(config: &Config) -> Result<()> {
    let client = backend_client(config).await?;
    render(&RewardsProvider.leaderboard_items(&client).await);
    Ok(())
}
