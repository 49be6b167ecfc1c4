//! Proposal commands — list, show, approve, reject.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use ctxpilot::approval::watch::WatchOutcome;
use ctxpilot::approval::{ApprovalOptions, ApprovalOutcome, run_approval};
use ctxpilot::config::Config;
use ctxpilot::providers::{ProposalsProvider, render};
use ctxpilot::types::{ChangeKind, ProposalStatus};
use ctxpilot::ui;

use super::backend_client;

pub async fn cmd_proposals_list(config: &Config, status: Option<ProposalStatus>) -> Result<()> {
    let client = backend_client(config).await?;
    let provider = ProposalsProvider {
        workspace_id: config.workspace_id.clone(),
        status,
    };
    render(&provider.items(&client).await);
    Ok(())
}

pub async fn cmd_proposals_show(config: &Config, id: &str) -> Result<()> {
    let client = backend_client(config).await?;
    let proposal = client
        .proposal(id, &config.workspace_id)
        .await
        .with_context(|| format!("Proposal {id} not found"))?;

    println!(
        "{} {} {}",
        style(&proposal.id).cyan().bold(),
        proposal.title,
        style(format!("[{}]", proposal.status)).dim()
    );
    println!("  agent   {}", proposal.agent_id);
    println!("  created {}", proposal.created_at.format("%Y-%m-%d %H:%M"));
    if !proposal.description.is_empty() {
        println!("\n{}", proposal.description);
    }
    if let Some(verdict) = &proposal.ai_review {
        println!("\n{} {}", style("AI review:").dim(), verdict);
    }
    if !proposal.changes.is_empty() {
        println!();
        for change in &proposal.changes {
            let tag = match change.change_type {
                ChangeKind::Create => style("create").green(),
                ChangeKind::Update => style("update").yellow(),
                ChangeKind::Delete => style("delete").red(),
            };
            println!("  {} {}  {}", tag, change.path, style(&change.description).dim());
        }
    }
    if let Some(diff) = &proposal.diff {
        println!("\n{diff}");
    }
    Ok(())
}

pub async fn cmd_proposals_approve(
    config: &Config,
    id: &str,
    assume_yes: bool,
    no_watch: bool,
) -> Result<()> {
    let client = Arc::new(backend_client(config).await?);
    let outcome = run_approval(
        client,
        ApprovalOptions {
            workspace_root: Some(config.project_dir.clone()),
            workspace_id: config.workspace_id.clone(),
            assume_yes,
        },
        id,
    )
    .await?;

    match outcome {
        ApprovalOutcome::Declined => {
            println!("Approval declined, nothing changed");
            Ok(())
        }
        ApprovalOutcome::Approved {
            proposal,
            commit_id,
            applied,
            watch,
        } => {
            ui::success(&format!(
                "Applied {applied} change(s) from {} and committed {}",
                proposal.id,
                &commit_id[..8.min(commit_id.len())]
            ));

            if no_watch {
                watch.cancel();
                watch.join().await;
                return Ok(());
            }

            let bar = ui::spinner("Watching for a follow-up proposal (5 min max, Ctrl-C to stop)");
            let outcome = watch.join().await;
            bar.finish_and_clear();
            match outcome {
                WatchOutcome::NewProposal { proposal_id } => {
                    let id = proposal_id.as_deref().unwrap_or("(unknown)");
                    ui::success(&format!(
                        "Follow-up proposal {id} is ready — run `ctxpilot proposals show {id}`"
                    ));
                }
                WatchOutcome::TimedOut => {
                    println!("No follow-up proposal within 5 minutes");
                }
                WatchOutcome::Cancelled => {}
            }
            Ok(())
        }
    }
}

pub async fn cmd_proposals_reject(config: &Config, id: &str, reason: &str) -> Result<()> {
    let client = backend_client(config).await?;
    client
        .reject_proposal(id, reason)
        .await
        .with_context(|| format!("Failed to reject proposal {id}"))?;
    ui::success(&format!("Rejected proposal {id}"));
    Ok(())
}
