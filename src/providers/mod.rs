//! Pull-based view models over the API client.
//!
//! Each provider re-pulls everything on `items()` — refreshing a view means
//! calling it again; nothing is cached between calls. Providers with a mode
//! indicator re-fetch that single field from `/health` on every refresh and
//! fall back to `"unknown"` on any error, nesting the substantive rows one
//! level below the indicator row.

use console::style;

use crate::client::ApiClient;
use crate::types::{HealthInfo, ProposalStatus};

/// One renderable row. `depth` is the nesting level under the view root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub label: String,
    pub detail: Option<String>,
    pub depth: usize,
}

impl TreeItem {
    fn new(depth: usize, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: None,
            depth,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Print items with two-space indentation per depth level.
pub fn render(items: &[TreeItem]) {
    for item in items {
        let indent = "  ".repeat(item.depth);
        match &item.detail {
            Some(detail) => println!("{indent}{} {}", item.label, style(detail).dim()),
            None => println!("{indent}{}", item.label),
        }
    }
}

const UNKNOWN_MODE: &str = "unknown";

/// Fetch one mode field from `/health`, degrading to `"unknown"` when the
/// call fails or the backend omits the field.
async fn mode_label(client: &ApiClient, pick: fn(&HealthInfo) -> Option<&String>) -> String {
    match client.health().await {
        Ok(health) => pick(&health)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_MODE.to_string()),
        Err(_) => UNKNOWN_MODE.to_string(),
    }
}

// ── Proposals ─────────────────────────────────────────────────────────

pub struct ProposalsProvider {
    pub workspace_id: String,
    pub status: Option<ProposalStatus>,
}

impl ProposalsProvider {
    pub async fn items(&self, client: &ApiClient) -> Vec<TreeItem> {
        let mode = mode_label(client, |h| h.storage_mode.as_ref()).await;
        let mut items = vec![TreeItem::new(0, format!("Storage: {mode}"))];

        let proposals = client.proposals(&self.workspace_id, self.status).await;
        if proposals.is_empty() {
            items.push(TreeItem::new(1, "(no proposals)"));
            return items;
        }
        for p in proposals {
            items.push(
                TreeItem::new(1, format!("{} {}", p.id, p.title))
                    .with_detail(format!("{} · {}", p.status, p.agent_id)),
            );
        }
        items
    }
}

// ── Rewards ───────────────────────────────────────────────────────────

pub struct RewardsProvider;

impl RewardsProvider {
    pub async fn items(&self, client: &ApiClient) -> Vec<TreeItem> {
        let mode = mode_label(client, |h| h.rewards_mode.as_ref()).await;
        let mut items = vec![TreeItem::new(0, format!("Rewards mode: {mode}"))];

        match client.balance().await {
            Some(balance) => {
                items.push(TreeItem::new(1, format!("Balance: {:.1} CPT", balance.balance)));
                items.push(TreeItem::new(
                    1,
                    format!("Total earned: {:.1} CPT", balance.total_earned),
                ));
                items.push(TreeItem::new(
                    1,
                    format!("Pending: {:.1} CPT", balance.pending_rewards),
                ));
            }
            None => items.push(TreeItem::new(1, "(balance unavailable)")),
        }
        items
    }

    pub async fn leaderboard_items(&self, client: &ApiClient) -> Vec<TreeItem> {
        let entries = client.leaderboard().await;
        if entries.is_empty() {
            return vec![TreeItem::new(0, "(leaderboard unavailable)")];
        }
        entries
            .iter()
            .enumerate()
            .map(|(rank, entry)| {
                let name = entry.display_name.as_deref().unwrap_or(&entry.user_id);
                TreeItem::new(0, format!("#{} {}", rank + 1, name))
                    .with_detail(format!("{:.1} CPT", entry.total_earned))
            })
            .collect()
    }
}

// ── Agents ────────────────────────────────────────────────────────────

pub struct AgentsProvider;

impl AgentsProvider {
    pub async fn items(&self, client: &ApiClient) -> Vec<TreeItem> {
        let mode = mode_label(client, |h| h.event_bus_mode.as_ref()).await;
        let mut items = vec![TreeItem::new(0, format!("Event bus: {mode}"))];

        let agents = client.agent_statuses().await;
        if agents.is_empty() {
            items.push(TreeItem::new(1, "(no agents)"));
            return items;
        }
        for agent in agents {
            let last = agent
                .last_activity
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            items.push(
                TreeItem::new(1, format!("{} [{}]", agent.name, agent.status))
                    .with_detail(format!("last active {last}")),
            );
        }
        items
    }
}

// ── Coach ─────────────────────────────────────────────────────────────

pub struct CoachProvider {
    pub workspace_id: String,
}

impl CoachProvider {
    pub async fn items(&self, client: &ApiClient) -> Vec<TreeItem> {
        let suggestions = client.coach_suggestions(&self.workspace_id).await;
        if suggestions.is_empty() {
            return vec![TreeItem::new(0, "(no suggestions)")];
        }
        suggestions
            .into_iter()
            .map(|s| {
                let item = TreeItem::new(0, s.title);
                match s.detail {
                    Some(detail) => item.with_detail(detail),
                    None => item,
                }
            })
            .collect()
    }
}

// ── Context ───────────────────────────────────────────────────────────

pub struct ContextProvider {
    pub workspace_id: String,
}

impl ContextProvider {
    pub async fn items(&self, client: &ApiClient) -> Vec<TreeItem> {
        let snapshot = client.context_snapshot(&self.workspace_id).await;
        let mut items = Vec::new();
        if let Some(summary) = &snapshot.summary {
            items.push(TreeItem::new(0, summary.clone()));
        }
        if let Some(at) = snapshot.last_commit {
            items.push(TreeItem::new(
                0,
                format!("Last commit: {}", at.format("%Y-%m-%d %H:%M")),
            ));
        }
        for entry in &snapshot.entries {
            items.push(TreeItem::new(1, entry.key.clone()).with_detail(entry.value.clone()));
        }
        if items.is_empty() {
            items.push(TreeItem::new(0, "(no context committed)"));
        }
        items
    }

    pub async fn milestone_items(&self, client: &ApiClient) -> Vec<TreeItem> {
        let milestones = client.milestones(&self.workspace_id).await;
        if milestones.is_empty() {
            return vec![TreeItem::new(0, "(no milestones)")];
        }
        milestones
            .into_iter()
            .map(|m| {
                let marker = if m.completed { "[x]" } else { "[ ]" };
                let item = TreeItem::new(0, format!("{marker} {}", m.title));
                match m.due_date {
                    Some(due) => item.with_detail(format!("due {}", due.format("%Y-%m-%d"))),
                    None => item,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::json;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn every_indicator_falls_back_to_unknown_when_health_fails() {
        let router = Router::new().route(
            "/health",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = spawn_backend(router).await;
        let client = ApiClient::new(&base, "tester").unwrap();

        let proposals = ProposalsProvider {
            workspace_id: "ws-1".into(),
            status: None,
        };
        assert_eq!(proposals.items(&client).await[0].label, "Storage: unknown");

        let rewards = RewardsProvider;
        assert_eq!(
            rewards.items(&client).await[0].label,
            "Rewards mode: unknown"
        );

        let agents = AgentsProvider;
        assert_eq!(agents.items(&client).await[0].label, "Event bus: unknown");
    }

    #[tokio::test]
    async fn indicator_reflects_reported_mode_and_nests_children() {
        let router = Router::new()
            .route(
                "/health",
                get(|| async {
                    Json(json!({"status": "ok", "storage_mode": "postgres"}))
                }),
            )
            .route(
                "/proposals",
                get(|| async {
                    Json(json!([{
                        "id": "p1",
                        "agent_id": "bot",
                        "workspace_id": "ws-1",
                        "title": "Tidy",
                        "description": "",
                        "status": "pending",
                        "created_at": "2026-08-01T12:00:00Z"
                    }]))
                }),
            );
        let base = spawn_backend(router).await;
        let client = ApiClient::new(&base, "tester").unwrap();

        let provider = ProposalsProvider {
            workspace_id: "ws-1".into(),
            status: None,
        };
        let items = provider.items(&client).await;
        assert_eq!(items[0].label, "Storage: postgres");
        assert_eq!(items[0].depth, 0);
        assert_eq!(items[1].depth, 1);
        assert!(items[1].label.contains("p1"));
    }

    #[tokio::test]
    async fn missing_mode_field_also_reads_unknown() {
        let router = Router::new().route(
            "/health",
            get(|| async { Json(json!({"status": "ok"})) }),
        );
        let base = spawn_backend(router).await;
        let client = ApiClient::new(&base, "tester").unwrap();
        let agents = AgentsProvider;
        assert_eq!(agents.items(&client).await[0].label, "Event bus: unknown");
    }

    #[tokio::test]
    async fn milestones_render_completion_markers() {
        let router = Router::new().route(
            "/context/milestones",
            get(|| async {
                Json(json!([
                    {"id": "m1", "title": "Ship MVP", "completed": true},
                    {"id": "m2", "title": "Beta", "completed": false}
                ]))
            }),
        );
        let base = spawn_backend(router).await;
        let client = ApiClient::new(&base, "tester").unwrap();
        let provider = ContextProvider {
            workspace_id: "ws-1".into(),
        };
        let items = provider.milestone_items(&client).await;
        assert_eq!(items[0].label, "[x] Ship MVP");
        assert_eq!(items[1].label, "[ ] Beta");
    }
}
