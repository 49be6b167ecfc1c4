use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ctxpilot::config::Config;
use ctxpilot::types::ProposalStatus;

mod cmd;

#[derive(Parser)]
#[command(name = "ctxpilot")]
#[command(version, about = "ContextPilot workspace client")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Auto-confirm prompts (approvals apply without asking)
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Backend base URL, overriding config file and environment
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Workspace identifier sent with backend calls (defaults to the
    /// project directory name)
    #[arg(long, global = true)]
    pub workspace: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check backend connectivity and show the reported modes
    Connect,
    /// Show connection, agent, and reward summaries
    Status,
    /// Inspect and act on change proposals
    Proposals {
        #[command(subcommand)]
        command: ProposalsCommands,
    },
    /// CPT balance and leaderboard
    Rewards {
        #[command(subcommand)]
        command: RewardsCommands,
    },
    /// List backend agents and their activity
    Agents,
    /// Ask the coach a question or list its suggestions
    Coach {
        #[command(subcommand)]
        command: CoachCommands,
    },
    /// Workspace context: commit, inspect, milestones
    Context {
        #[command(subcommand)]
        command: ContextCommands,
    },
    /// Trigger a retrospective run
    Retro {
        /// Trigger kind reported to the backend
        #[arg(long, default_value = "manual")]
        trigger: String,
        /// Let the backend use its LLM for the retrospective
        #[arg(long)]
        use_llm: bool,
    },
    /// Manage dashboard workspaces, members, and checkpoints
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },
    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ProposalsCommands {
    /// List proposals for the workspace
    List {
        /// Filter by status: pending, approved, rejected
        #[arg(long)]
        status: Option<ProposalStatus>,
    },
    /// Show one proposal in full
    Show { id: String },
    /// Approve a proposal: apply its changes and commit them
    Approve {
        id: String,
        /// Skip the post-approval watch for a follow-up proposal
        #[arg(long)]
        no_watch: bool,
    },
    /// Reject a proposal with a reason
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Subcommand)]
pub enum RewardsCommands {
    Balance,
    Leaderboard,
}

#[derive(Subcommand)]
pub enum CoachCommands {
    /// Ask the coach a question
    Ask { question: String },
    /// List proactive suggestions for the workspace
    Suggestions,
}

#[derive(Subcommand)]
pub enum ContextCommands {
    /// Commit the current workspace context to the backend
    Commit,
    /// Show the committed context
    Show,
    /// List project milestones
    Milestones,
}

#[derive(Subcommand)]
pub enum WorkspaceCommands {
    List,
    Create {
        name: String,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
    },
    Members {
        id: String,
    },
    /// Send an email invitation via the dashboard's invite function
    Invite {
        id: String,
        email: String,
        #[arg(long, default_value = "contributor")]
        role: String,
    },
    /// Change an existing member's role
    SetRole {
        id: String,
        user: String,
        role: String,
    },
    Remove {
        id: String,
        user: String,
    },
    Checkpoints {
        id: String,
    },
    /// Record a new checkpoint
    Checkpoint {
        id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show the caller's role and capabilities in a workspace
    Role {
        id: String,
        /// Check a single capability instead of listing all
        #[arg(long)]
        capability: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default .ctxpilot/config.toml
    Init,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "ctxpilot=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = Config::load(
        &project_dir,
        cli.backend_url.as_deref(),
        cli.workspace.as_deref(),
        cli.verbose,
    )?;

    match &cli.command {
        Commands::Connect => cmd::cmd_connect(&config).await?,
        Commands::Status => cmd::cmd_status(&config).await?,
        Commands::Proposals { command } => match command {
            ProposalsCommands::List { status } => {
                cmd::cmd_proposals_list(&config, *status).await?
            }
            ProposalsCommands::Show { id } => cmd::cmd_proposals_show(&config, id).await?,
            ProposalsCommands::Approve { id, no_watch } => {
                cmd::cmd_proposals_approve(&config, id, cli.yes, *no_watch).await?
            }
            ProposalsCommands::Reject { id, reason } => {
                cmd::cmd_proposals_reject(&config, id, reason).await?
            }
        },
        Commands::Rewards { command } => match command {
            RewardsCommands::Balance => cmd::cmd_rewards_balance(&config).await?,
            RewardsCommands::Leaderboard => cmd::cmd_rewards_leaderboard(&config).await?,
        },
        Commands::Agents => cmd::cmd_agents(&config).await?,
        Commands::Coach { command } => match command {
            CoachCommands::Ask { question } => cmd::cmd_coach_ask(&config, question).await?,
            CoachCommands::Suggestions => cmd::cmd_coach_suggestions(&config).await?,
        },
        Commands::Context { command } => match command {
            ContextCommands::Commit => cmd::cmd_context_commit(&config).await?,
            ContextCommands::Show => cmd::cmd_context_show(&config).await?,
            ContextCommands::Milestones => cmd::cmd_context_milestones(&config).await?,
        },
        Commands::Retro { trigger, use_llm } => {
            cmd::cmd_retro(&config, trigger, *use_llm).await?
        }
        Commands::Workspace { command } => cmd::cmd_workspace(&config, command).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.as_ref())?,
    }

    Ok(())
}
