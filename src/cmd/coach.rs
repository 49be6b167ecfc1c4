//! Coach commands — direct questions and proactive suggestions.

use anyhow::{Context, Result};
use console::style;

use ctxpilot::config::Config;
use ctxpilot::providers::{CoachProvider, render};
use ctxpilot::ui;

use super::backend_client;

pub async fn cmd_coach_ask(config: &Config, question: &str) -> Result<()> {
    let client = backend_client(config).await?;
    let bar = ui::spinner("Asking the coach");
    let result = client.ask_coach(question).await;
    bar.finish_and_clear();

    let answer = result.context("Coach question failed")?;
    println!("{}", answer.answer);
    if !answer.references.is_empty() {
        println!();
        for reference in &answer.references {
            println!("  {} {}", style("→").dim(), reference);
        }
    }
    Ok(())
}

pub async fn cmd_coach_suggestions(config: &Config) -> Result<()> {
    let client = backend_client(config).await?;
    let provider = CoachProvider {
        workspace_id: config.workspace_id.clone(),
    };
    render(&provider.items(&client).await);
    Ok(())
}
