//! Trigger a retrospective run for the workspace.

use anyhow::{Context, Result};

use ctxpilot::config::Config;
use ctxpilot::ui;

use super::backend_client;

pub async fn cmd_retro(config: &Config, trigger: &str, use_llm: bool) -> Result<()> {
    let client = backend_client(config).await?;
    client
        .trigger_retrospective(&config.workspace_id, trigger, use_llm)
        .await
        .context("Failed to trigger retrospective")?;
    ui::success(&format!(
        "Retrospective triggered for workspace {}",
        config.workspace_id
    ));
    Ok(())
}
