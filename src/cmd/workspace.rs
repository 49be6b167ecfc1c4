//! Dashboard workspace management — workspaces, members, invitations,
//! checkpoints, and a permission preview backed by the role table.

use anyhow::{Context, Result};
use console::style;

use ctxpilot::config::Config;
use ctxpilot::permissions::{Capability, PermissionCache, Role};
use ctxpilot::ui;

use super::dashboard_client;
use crate::WorkspaceCommands;

pub async fn cmd_workspace(config: &Config, command: &WorkspaceCommands) -> Result<()> {
    let client = dashboard_client(config)?;

    match command {
        WorkspaceCommands::List => {
            let workspaces = client.workspaces().await?;
            if workspaces.is_empty() {
                println!("(no workspaces)");
                return Ok(());
            }
            for ws in workspaces {
                println!(
                    "{} {}  {}",
                    style(&ws.id).cyan(),
                    ws.name,
                    style(format!("created {}", ws.created_at.format("%Y-%m-%d"))).dim()
                );
            }
        }
        WorkspaceCommands::Create { name } => {
            let ws = client.create_workspace(name, &config.user_id).await?;
            ui::success(&format!("Created workspace {} ({})", ws.name, ws.id));
        }
        WorkspaceCommands::Rename { id, name } => {
            client.rename_workspace(id, name).await?;
            ui::success(&format!("Renamed workspace {id} to {name}"));
        }
        WorkspaceCommands::Delete { id } => {
            client.delete_workspace(id).await?;
            ui::success(&format!("Deleted workspace {id}"));
        }
        WorkspaceCommands::Members { id } => {
            let members = client.members(id).await?;
            if members.is_empty() {
                println!("(no members)");
                return Ok(());
            }
            for member in members {
                println!("{}  {}", member.user_id, style(&member.role).dim());
            }
        }
        WorkspaceCommands::Invite { id, email, role } => {
            let role: Role = role.parse()?;
            client.invite_user(id, email, role).await?;
            ui::success(&format!("Invitation sent to {email} as {role}"));
        }
        WorkspaceCommands::SetRole { id, user, role } => {
            let role: Role = role.parse()?;
            client.update_member_role(id, user, role).await?;
            ui::success(&format!("{user} is now {role} in {id}"));
        }
        WorkspaceCommands::Remove { id, user } => {
            client.remove_member(id, user).await?;
            ui::success(&format!("Removed {user} from {id}"));
        }
        WorkspaceCommands::Checkpoints { id } => {
            let checkpoints = client.checkpoints(id).await?;
            if checkpoints.is_empty() {
                println!("(no checkpoints)");
                return Ok(());
            }
            for cp in checkpoints {
                let detail = cp.description.as_deref().unwrap_or("");
                println!(
                    "{} {}  {}",
                    style(cp.created_at.format("%Y-%m-%d %H:%M").to_string()).dim(),
                    cp.name,
                    style(detail).dim()
                );
            }
        }
        WorkspaceCommands::Checkpoint {
            id,
            name,
            description,
        } => {
            let cp = client
                .create_checkpoint(id, name, description.as_deref())
                .await?;
            ui::success(&format!("Checkpoint {} recorded", cp.name));
        }
        WorkspaceCommands::Role { id, capability } => {
            let role = client
                .role_of(id, &config.user_id)
                .await
                .with_context(|| format!("Failed to look up membership in {id}"))?;

            let mut cache = PermissionCache::new();
            if let Some(role) = role {
                cache.cache_role(id.clone(), role);
                println!("Role in {id}: {role}");
            } else {
                println!("Not a member of {id}");
            }

            match capability {
                Some(raw) => {
                    let capability: Capability =
                        serde_json::from_value(serde_json::Value::String(raw.clone()))
                            .with_context(|| format!("Unknown capability '{raw}'"))?;
                    let allowed = cache.has_permission(id, capability);
                    println!("{raw}: {}", if allowed { "allowed" } else { "denied" });
                }
                None => {
                    if let Some(role) = cache.role(id) {
                        for capability in role.capabilities() {
                            let tag = serde_json::to_value(capability)?;
                            println!("  {}", tag.as_str().unwrap_or_default());
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
