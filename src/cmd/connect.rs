//! Connectivity commands — `ctxpilot connect` and `ctxpilot status`.

use anyhow::Result;
use console::style;

use ctxpilot::client::ApiClient;
use ctxpilot::config::Config;
use ctxpilot::providers::{AgentsProvider, RewardsProvider, render};
use ctxpilot::ui;

pub async fn cmd_connect(config: &Config) -> Result<()> {
    let mut client = ApiClient::new(&config.backend_url, &config.user_id)?;
    let bar = ui::spinner(format!("Connecting to {}", config.backend_url));
    let result = client.connect().await;
    bar.finish_and_clear();

    let health = result?;
    ui::success(&format!("Connected to {}", config.backend_url));
    if let Some(version) = &health.version {
        println!("  version   {version}");
    }
    println!(
        "  storage   {}",
        health.storage_mode.as_deref().unwrap_or("unknown")
    );
    println!(
        "  event bus {}",
        health.event_bus_mode.as_deref().unwrap_or("unknown")
    );
    println!(
        "  rewards   {}",
        health.rewards_mode.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

pub async fn cmd_status(config: &Config) -> Result<()> {
    let mut client = ApiClient::new(&config.backend_url, &config.user_id)?;
    match client.connect().await {
        Ok(_) => ui::success(&format!("Backend reachable at {}", config.backend_url)),
        Err(err) => {
            ui::failure(&format!("Backend unreachable: {err}"));
            return Ok(());
        }
    }

    println!();
    println!("{}", style("Agents").bold());
    render(&AgentsProvider.items(&client).await);

    println!();
    println!("{}", style("Rewards").bold());
    render(&RewardsProvider.items(&client).await);

    if let Some(wallet) = &config.wallet_address {
        println!();
        println!("  wallet {}", style(wallet).dim());
    }
    Ok(())
}
