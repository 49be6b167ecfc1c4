//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant family:
//!
//! | Module      | Commands handled                          |
//! |-------------|-------------------------------------------|
//! | `connect`   | `Connect`, `Status`                       |
//! | `proposals` | `Proposals` (list/show/approve/reject)    |
//! | `rewards`   | `Rewards` (balance/leaderboard)           |
//! | `agents`    | `Agents`                                  |
//! | `coach`     | `Coach` (ask/suggestions)                 |
//! | `context`   | `Context` (commit/show/milestones)        |
//! | `retro`     | `Retro`                                   |
//! | `workspace` | `Workspace` (dashboard operations)        |
//! | `config`    | `Config`                                  |

pub mod agents;
pub mod coach;
pub mod config;
pub mod connect;
pub mod context;
pub mod proposals;
pub mod retro;
pub mod rewards;
pub mod workspace;

pub use agents::cmd_agents;
pub use coach::{cmd_coach_ask, cmd_coach_suggestions};
pub use config::cmd_config;
pub use connect::{cmd_connect, cmd_status};
pub use context::{cmd_context_commit, cmd_context_milestones, cmd_context_show};
pub use proposals::{
    cmd_proposals_approve, cmd_proposals_list, cmd_proposals_reject, cmd_proposals_show,
};
pub use retro::cmd_retro;
pub use rewards::{cmd_rewards_balance, cmd_rewards_leaderboard};
pub use workspace::cmd_workspace;

use anyhow::{Context as _, Result};
use ctxpilot::client::ApiClient;
use ctxpilot::config::Config;
use ctxpilot::dashboard::DashboardClient;

/// Build the backend client, running the health-check handshake first when
/// `auto_connect` is enabled.
pub(crate) async fn backend_client(config: &Config) -> Result<ApiClient> {
    let mut client = ApiClient::new(&config.backend_url, &config.user_id)?;
    if config.auto_connect {
        client
            .connect()
            .await
            .with_context(|| format!("Backend handshake with {} failed", config.backend_url))?;
    }
    Ok(client)
}

/// Build the dashboard client, failing with guidance when unconfigured.
pub(crate) fn dashboard_client(config: &Config) -> Result<DashboardClient> {
    let base_url = config.dashboard_url.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "Dashboard is not configured. Set [dashboard] base_url in .ctxpilot/config.toml"
        )
    })?;
    let api_key = config.dashboard_api_key.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "Dashboard API key is not configured. Set [dashboard] api_key in .ctxpilot/config.toml"
        )
    })?;
    DashboardClient::new(base_url, api_key)
}
