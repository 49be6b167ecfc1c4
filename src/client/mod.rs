//! HTTP access to the ContextPilot backend.
//!
//! All network traffic goes through [`ApiClient`]. Read paths degrade to an
//! empty/default value on failure (the caller renders what it got); write
//! paths surface a typed [`ClientError`]. The only retry policy lives in
//! [`ApiClient::connect`].

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::types::{
    AgentStatus, Balance, ChangeProposal, CoachAnswer, CoachSuggestion, ContextSnapshot,
    HealthInfo, LeaderboardEntry, Milestone, ProposalStatus, RetrospectiveStatus,
};

/// Number of health-check attempts made by [`ApiClient::connect`].
pub const CONNECT_ATTEMPTS: u32 = 3;
/// Fixed delay between health-check attempts.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Per-request timeout for every backend call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection state as established by the last explicit handshake.
///
/// Written only by [`ApiClient::connect`] and [`ApiClient::disconnect`];
/// data-path failures never touch it, so the value always reflects the last
/// deliberate handshake rather than ambient request luck.
#[derive(Debug, Clone, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected {
        health: HealthInfo,
    },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

/// One health-check attempt's failure, kept for the final wrapped error.
enum HealthFailure {
    Status(u16),
    Transport(reqwest::Error),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    state: ConnectionState,
    retry_delay: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            state: ConnectionState::Disconnected,
            retry_delay: CONNECT_RETRY_DELAY,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    #[cfg(test)]
    fn set_retry_delay(&mut self, delay: Duration) {
        self.retry_delay = delay;
    }

    // ── Handshake ─────────────────────────────────────────────────────

    /// Perform the health-check handshake: up to [`CONNECT_ATTEMPTS`]
    /// attempts with a fixed delay between them, succeeding only on HTTP
    /// 200. The last failure is returned wrapped after the budget is
    /// exhausted, and the state is left `Disconnected`.
    pub async fn connect(&mut self) -> Result<HealthInfo, ClientError> {
        let url = format!("{}/health", self.base_url);

        let mut outcome = self.try_health(&url).await;
        let mut attempt = 1;
        while let Err(failure) = &outcome
            && attempt < CONNECT_ATTEMPTS
        {
            match failure {
                HealthFailure::Status(status) => {
                    warn!(attempt, status, "health check rejected, retrying")
                }
                HealthFailure::Transport(err) => {
                    warn!(attempt, error = %err, "health check unreachable, retrying")
                }
            }
            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
            outcome = self.try_health(&url).await;
        }

        match outcome {
            Ok(health) => {
                debug!(status = %health.status, "backend handshake succeeded");
                self.state = ConnectionState::Connected {
                    health: health.clone(),
                };
                Ok(health)
            }
            Err(failure) => {
                self.state = ConnectionState::Disconnected;
                Err(match failure {
                    HealthFailure::Status(status) => ClientError::ConnectRejected {
                        url,
                        attempts: CONNECT_ATTEMPTS,
                        status,
                    },
                    HealthFailure::Transport(source) => ClientError::ConnectFailed {
                        url,
                        attempts: CONNECT_ATTEMPTS,
                        source,
                    },
                })
            }
        }
    }

    /// Drop the connection state locally. No network call.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    async fn try_health(&self, url: &str) -> Result<HealthInfo, HealthFailure> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(HealthFailure::Transport)?;
        if resp.status() != StatusCode::OK {
            return Err(HealthFailure::Status(resp.status().as_u16()));
        }
        resp.json::<HealthInfo>()
            .await
            .map_err(HealthFailure::Transport)
    }

    /// One-shot health fetch outside the handshake, used by the view
    /// providers for their mode-indicator rows. Does not mutate state.
    pub async fn health(&self) -> Result<HealthInfo, ClientError> {
        self.get_json("health", "/health", &[] as &[(&str, String)])
            .await
    }

    // ── Read paths (default on failure) ───────────────────────────────

    pub async fn proposals(
        &self,
        workspace_id: &str,
        status: Option<ProposalStatus>,
    ) -> Vec<ChangeProposal> {
        let mut query = vec![("workspace_id", workspace_id.to_string())];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        self.read_or_default("list proposals", "/proposals", &query)
            .await
    }

    pub async fn proposal(&self, id: &str, workspace_id: &str) -> Option<ChangeProposal> {
        let path = format!("/proposals/{id}");
        match self
            .get_json::<ChangeProposal>(
                "get proposal",
                &path,
                &[("workspace_id", workspace_id.to_string())],
            )
            .await
        {
            Ok(proposal) => Some(proposal),
            Err(err) => {
                warn!(id, error = %err, "fetching proposal failed");
                None
            }
        }
    }

    /// Balance lookup with the backend's mock fallback: when the real
    /// endpoint fails, `/rewards/balance/mock` is tried before giving up.
    pub async fn balance(&self) -> Option<Balance> {
        let query = [("user_id", self.user_id.clone())];
        match self
            .get_json::<Balance>("get balance", "/rewards/balance", &query)
            .await
        {
            Ok(balance) => Some(balance),
            Err(err) => {
                warn!(error = %err, "balance fetch failed, trying mock variant");
                self.get_json::<Balance>("get mock balance", "/rewards/balance/mock", &query)
                    .await
                    .map_err(|err| warn!(error = %err, "mock balance fetch failed"))
                    .ok()
            }
        }
    }

    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.read_or_default(
            "get leaderboard",
            "/rewards/leaderboard",
            &[] as &[(&str, String)],
        )
        .await
    }

    pub async fn agent_statuses(&self) -> Vec<AgentStatus> {
        self.read_or_default("get agent status", "/agents/status", &[] as &[(&str, String)])
            .await
    }

    pub async fn coach_suggestions(&self, workspace_id: &str) -> Vec<CoachSuggestion> {
        self.read_or_default(
            "get coach suggestions",
            "/coach",
            &[("workspace_id", workspace_id.to_string())],
        )
        .await
    }

    pub async fn context_snapshot(&self, workspace_id: &str) -> ContextSnapshot {
        self.read_or_default(
            "get context",
            "/context",
            &[("workspace_id", workspace_id.to_string())],
        )
        .await
    }

    pub async fn milestones(&self, workspace_id: &str) -> Vec<Milestone> {
        self.read_or_default(
            "get milestones",
            "/context/milestones",
            &[("workspace_id", workspace_id.to_string())],
        )
        .await
    }

    /// Status probe used by the post-approval watch. Degrades to "nothing
    /// new" on failure so a single bad tick never stops the poll loop.
    pub async fn retrospective_status(
        &self,
        workspace_id: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> RetrospectiveStatus {
        self.read_or_default(
            "get retrospective status",
            "/agents/retrospective/status",
            &[
                ("workspace_id", workspace_id.to_string()),
                ("since", since.to_rfc3339()),
            ],
        )
        .await
    }

    // ── Write paths (typed errors) ────────────────────────────────────

    pub async fn approve_proposal(&self, id: &str, workspace_id: &str) -> Result<(), ClientError> {
        let path = format!("/proposals/{id}/approve");
        self.post_empty(
            "approve proposal",
            &path,
            &[("workspace_id", workspace_id.to_string())],
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn reject_proposal(&self, id: &str, reason: &str) -> Result<(), ClientError> {
        let path = format!("/proposals/{id}/reject");
        self.post_empty(
            "reject proposal",
            &path,
            &[] as &[(&str, String)],
            &serde_json::json!({ "user_id": self.user_id, "reason": reason }),
        )
        .await
    }

    pub async fn ask_coach(&self, question: &str) -> Result<CoachAnswer, ClientError> {
        self.post_json(
            "ask coach",
            "/agents/coach/ask",
            &[] as &[(&str, String)],
            &serde_json::json!({ "user_id": self.user_id, "question": question }),
        )
        .await
    }

    pub async fn commit_context(&self, workspace_path: &str) -> Result<(), ClientError> {
        self.post_empty(
            "commit context",
            "/context/commit",
            &[] as &[(&str, String)],
            &serde_json::json!({ "user_id": self.user_id, "workspace_path": workspace_path }),
        )
        .await
    }

    /// Report a local git commit back to the backend for bookkeeping.
    pub async fn record_commit(
        &self,
        message: &str,
        agent: &str,
        workspace_id: &str,
    ) -> Result<(), ClientError> {
        self.post_empty(
            "record commit",
            "/commit",
            &[
                ("message", message.to_string()),
                ("agent", agent.to_string()),
                ("workspace_id", workspace_id.to_string()),
            ],
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn trigger_retrospective(
        &self,
        workspace_id: &str,
        trigger: &str,
        use_llm: bool,
    ) -> Result<(), ClientError> {
        self.post_empty(
            "trigger retrospective",
            "/agents/retrospective/trigger",
            &[("workspace_id", workspace_id.to_string())],
            &serde_json::json!({ "trigger": trigger, "use_llm": use_llm }),
        )
        .await
    }

    // ── Plumbing ──────────────────────────────────────────────────────

    async fn read_or_default<T, Q>(&self, operation: &'static str, path: &str, query: &Q) -> T
    where
        T: DeserializeOwned + Default,
        Q: Serialize + ?Sized,
    {
        match self.get_json::<T>(operation, path, query).await {
            Ok(value) => value,
            Err(err) => {
                warn!(operation, error = %err, "read failed, using default");
                T::default()
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &(impl Serialize + ?Sized),
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(ClientError::Backend {
                operation: operation.to_string(),
                status: resp.status().as_u16(),
            });
        }
        resp.json::<T>()
            .await
            .map_err(|source| ClientError::Transport {
                operation: operation.to_string(),
                source,
            })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &(impl Serialize + ?Sized),
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let resp = self
            .post_raw(operation, path, query, body)
            .await?;
        resp.json::<T>()
            .await
            .map_err(|source| ClientError::Transport {
                operation: operation.to_string(),
                source,
            })
    }

    async fn post_empty(
        &self,
        operation: &'static str,
        path: &str,
        query: &(impl Serialize + ?Sized),
        body: &impl Serialize,
    ) -> Result<(), ClientError> {
        self.post_raw(operation, path, query, body).await?;
        Ok(())
    }

    async fn post_raw(
        &self,
        operation: &'static str,
        path: &str,
        query: &(impl Serialize + ?Sized),
        body: &impl Serialize,
    ) -> Result<reqwest::Response, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(ClientError::Backend {
                operation: operation.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }
}
