//! Context commands — commit the workspace context, inspect it, and list
//! milestones.

use anyhow::{Context, Result};

use ctxpilot::config::Config;
use ctxpilot::providers::{ContextProvider, render};
use ctxpilot::ui;

use super::backend_client;

pub async fn cmd_context_commit(config: &Config) -> Result<()> {
    let client = backend_client(config).await?;
    let workspace_path = config.project_dir.to_string_lossy();
    client
        .commit_context(&workspace_path)
        .await
        .context("Context commit failed")?;
    ui::success("Workspace context committed");
    Ok(())
}

pub async fn cmd_context_show(config: &Config) -> Result<()> {
    let client = backend_client(config).await?;
    let provider = ContextProvider {
        workspace_id: config.workspace_id.clone(),
    };
    render(&provider.items(&client).await);
    Ok(())
}

pub async fn cmd_context_milestones(config: &Config) -> Result<()> {
    let client = backend_client(config).await?;
    let provider = ContextProvider {
        workspace_id: config.workspace_id.clone(),
    };
    render(&provider.milestone_items(&client).await);
    Ok(())
}
