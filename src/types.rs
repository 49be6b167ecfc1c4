//! Wire and domain types shared across the client.
//!
//! Everything here mirrors the backend's JSON shapes. The client never
//! mutates these locally — a fetched value is a cache invalidated by
//! re-fetching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a change proposal, owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Pending => write!(f, "pending"),
            ProposalStatus::Approved => write!(f, "approved"),
            ProposalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ProposalStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ProposalStatus::Pending),
            "approved" => Ok(ProposalStatus::Approved),
            "rejected" => Ok(ProposalStatus::Rejected),
            _ => anyhow::bail!(
                "Invalid proposal status '{}'. Valid values: pending, approved, rejected",
                s
            ),
        }
    }
}

/// Kind of filesystem effect a single proposed change has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// One file-level change inside a proposal.
///
/// `path` is relative to the workspace root. For `create`/`update` the
/// final content is `after` (empty when absent); `before` and `diff` are
/// informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedChange {
    pub path: String,
    pub change_type: ChangeKind,
    pub description: String,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub diff: Option<String>,
}

/// A backend-authored bundle of file changes awaiting user approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeProposal {
    pub id: String,
    pub agent_id: String,
    pub workspace_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub diff_format: Option<String>,
    #[serde(default)]
    pub diff: Option<String>,
    #[serde(default)]
    pub changes: Vec<ProposedChange>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    /// Verdict from the backend's AI reviewer, when one ran.
    #[serde(default)]
    pub ai_review: Option<String>,
}

/// CPT balance projection. Read-only; the backend owns all mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Balance {
    pub balance: f64,
    pub total_earned: f64,
    pub pending_rewards: f64,
}

/// One row of the CPT leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub total_earned: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Active,
    Idle,
    Error,
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::Active => write!(f, "active"),
            AgentState::Idle => write!(f, "idle"),
            AgentState::Error => write!(f, "error"),
        }
    }
}

/// Purely informational status row for one backend agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: String,
    pub name: String,
    pub status: AgentState,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Response from `GET /health`.
///
/// The mode fields back the UI's mode-indicator rows; any of them may be
/// missing on older backends.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub storage_mode: Option<String>,
    #[serde(default)]
    pub event_bus_mode: Option<String>,
    #[serde(default)]
    pub rewards_mode: Option<String>,
}

/// Answer from the coach agent for a direct question.
#[derive(Debug, Clone, Deserialize)]
pub struct CoachAnswer {
    pub answer: String,
    #[serde(default)]
    pub references: Vec<String>,
}

/// One proactive suggestion from `GET /coach`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoachSuggestion {
    pub title: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Snapshot of the committed workspace context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextSnapshot {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub last_commit: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: Vec<ContextEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextEntry {
    pub key: String,
    pub value: String,
}

/// A project milestone from `GET /context/milestones`.
#[derive(Debug, Clone, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Response from the retrospective status endpoint polled after approvals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrospectiveStatus {
    #[serde(default)]
    pub new_proposal: bool,
    #[serde(default)]
    pub proposal_id: Option<String>,
}
