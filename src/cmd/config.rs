//! Configuration commands — `ctxpilot config show` and `config init`.

use anyhow::Result;
use console::style;

use ctxpilot::config::{Config, PilotToml, config_path};
use ctxpilot::ui;

use crate::ConfigCommands;

pub fn cmd_config(config: &Config, command: Option<&ConfigCommands>) -> Result<()> {
    match command.unwrap_or(&ConfigCommands::Show) {
        ConfigCommands::Show => {
            println!("{}", style("Effective configuration").bold());
            println!("  config file   {}", config_path(&config.project_dir).display());
            println!("  backend url   {}", config.backend_url);
            println!("  workspace id  {}", config.workspace_id);
            println!("  user id       {}", config.user_id);
            println!(
                "  wallet        {}",
                config.wallet_address.as_deref().unwrap_or("(unset)")
            );
            println!("  auto connect  {}", config.auto_connect);
            println!(
                "  dashboard     {}",
                config.dashboard_url.as_deref().unwrap_or("(unset)")
            );
        }
        ConfigCommands::Init => {
            let path = PilotToml::write_default(&config.project_dir)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }
    Ok(())
}
