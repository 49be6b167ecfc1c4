//! Workspace-management REST layer.
//!
//! The web dashboard's backing store is an external BaaS; this module is
//! the typed client for its REST surface: workspaces, members, checkpoints,
//! and the server-side `invite-user` function that sends the invitation
//! email. No local persistence — every view re-fetches.

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DashboardError;
use crate::permissions::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A member row. The creator is a member row like any other; "owner" is
/// only distinguished by the permission table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub workspace_id: String,
    pub user_id: String,
    pub role: String,
}

impl WorkspaceMember {
    pub fn parsed_role(&self) -> Result<Role, DashboardError> {
        self.role
            .parse()
            .map_err(|_| DashboardError::InvalidRole(self.role.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct DashboardClient {
    http: reqwest::Client,
    base_url: String,
}

impl DashboardClient {
    /// Build a client authenticated with the service API key.
    pub fn new(base_url: impl Into<String>, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", HeaderValue::from_str(api_key)?);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    // ── Workspaces ────────────────────────────────────────────────────

    pub async fn workspaces(&self) -> Result<Vec<Workspace>, DashboardError> {
        self.get_json("list workspaces", "/workspaces").await
    }

    pub async fn workspace(&self, id: &str) -> Result<Workspace, DashboardError> {
        let path = format!("/workspaces/{id}");
        match self.get_json::<Workspace>("get workspace", &path).await {
            Err(DashboardError::Backend { status: 404, .. }) => {
                Err(DashboardError::WorkspaceNotFound { id: id.to_string() })
            }
            other => other,
        }
    }

    pub async fn create_workspace(
        &self,
        name: &str,
        created_by: &str,
    ) -> Result<Workspace, DashboardError> {
        self.post_json(
            "create workspace",
            "/workspaces",
            &serde_json::json!({ "name": name, "created_by": created_by }),
        )
        .await
    }

    pub async fn rename_workspace(&self, id: &str, name: &str) -> Result<(), DashboardError> {
        let path = format!("/workspaces/{id}");
        let resp = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: "rename workspace".to_string(),
                source,
            })?;
        Self::check_status("rename workspace", resp.status())
    }

    pub async fn delete_workspace(&self, id: &str) -> Result<(), DashboardError> {
        let path = format!("/workspaces/{id}");
        self.delete("delete workspace", &path).await
    }

    // ── Members ───────────────────────────────────────────────────────

    pub async fn members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMember>, DashboardError> {
        let path = format!("/workspaces/{workspace_id}/members");
        self.get_json("list members", &path).await
    }

    /// Cached-role lookup for the permission table: `Ok(None)` when the
    /// user is not a member.
    pub async fn role_of(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<Role>, DashboardError> {
        let members = self.members(workspace_id).await?;
        members
            .iter()
            .find(|m| m.user_id == user_id)
            .map(WorkspaceMember::parsed_role)
            .transpose()
    }

    pub async fn add_member(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<(), DashboardError> {
        let path = format!("/workspaces/{workspace_id}/members");
        self.post_empty(
            "add member",
            &path,
            &serde_json::json!({ "user_id": user_id, "role": role.to_string() }),
        )
        .await
    }

    pub async fn update_member_role(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: Role,
    ) -> Result<(), DashboardError> {
        let path = format!("/workspaces/{workspace_id}/members/{user_id}");
        let resp = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .json(&serde_json::json!({ "role": role.to_string() }))
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: "update member role".to_string(),
                source,
            })?;
        Self::check_status("update member role", resp.status())
    }

    pub async fn remove_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<(), DashboardError> {
        let path = format!("/workspaces/{workspace_id}/members/{user_id}");
        self.delete("remove member", &path).await
    }

    /// Invoke the server-side invite function, which creates the pending
    /// member row and sends the invitation email.
    pub async fn invite_user(
        &self,
        workspace_id: &str,
        email: &str,
        role: Role,
    ) -> Result<(), DashboardError> {
        self.post_empty(
            "invite user",
            "/functions/invite-user",
            &serde_json::json!({
                "workspace_id": workspace_id,
                "email": email,
                "role": role.to_string(),
            }),
        )
        .await
    }

    // ── Checkpoints ───────────────────────────────────────────────────

    pub async fn checkpoints(&self, workspace_id: &str) -> Result<Vec<Checkpoint>, DashboardError> {
        let path = format!("/workspaces/{workspace_id}/checkpoints");
        self.get_json("list checkpoints", &path).await
    }

    pub async fn create_checkpoint(
        &self,
        workspace_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Checkpoint, DashboardError> {
        let path = format!("/workspaces/{workspace_id}/checkpoints");
        self.post_json(
            "create checkpoint",
            &path,
            &serde_json::json!({ "name": name, "description": description }),
        )
        .await
    }

    // ── Plumbing ──────────────────────────────────────────────────────

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<T, DashboardError> {
        debug!(operation, path, "dashboard GET");
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        Self::check_status(operation, resp.status())?;
        resp.json::<T>()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: operation.to_string(),
                source,
            })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, DashboardError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        Self::check_status(operation, resp.status())?;
        resp.json::<T>()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: operation.to_string(),
                source,
            })
    }

    async fn post_empty(
        &self,
        operation: &'static str,
        path: &str,
        body: &impl Serialize,
    ) -> Result<(), DashboardError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        Self::check_status(operation, resp.status())
    }

    async fn delete(&self, operation: &'static str, path: &str) -> Result<(), DashboardError> {
        let resp = self
            .http
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|source| DashboardError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        Self::check_status(operation, resp.status())
    }

    fn check_status(
        operation: &'static str,
        status: reqwest::StatusCode,
    ) -> Result<(), DashboardError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(DashboardError::Backend {
                operation: operation.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{get, post};
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
    async fn requests_carry_api_key_headers() {
        let router = Router::new().route(
            "/workspaces",
            get(|headers: AxumHeaders| async move {
                assert_eq!(headers.get("apikey").unwrap(), "sk-test");
                assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
                Json(json!([]))
            }),
        );
        let base = spawn_backend(router).await;
        let client = DashboardClient::new(&base, "sk-test").unwrap();
        assert!(client.workspaces().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_workspace_maps_to_not_found() {
        let router = Router::new().route(
            "/workspaces/{id}",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let base = spawn_backend(router).await;
        let client = DashboardClient::new(&base, "sk-test").unwrap();
        let err = client.workspace("w-404").await.unwrap_err();
        assert!(matches!(err, DashboardError::WorkspaceNotFound { .. }));
    }

    #[tokio::test]
    async fn role_of_parses_member_role() {
        let router = Router::new().route(
            "/workspaces/{id}/members",
            get(|| async {
                Json(json!([
                    {"workspace_id": "w1", "user_id": "alice", "role": "owner"},
                    {"workspace_id": "w1", "user_id": "bob", "role": "viewer"}
                ]))
            }),
        );
        let base = spawn_backend(router).await;
        let client = DashboardClient::new(&base, "sk-test").unwrap();
        assert_eq!(client.role_of("w1", "alice").await.unwrap(), Some(Role::Owner));
        assert_eq!(client.role_of("w1", "bob").await.unwrap(), Some(Role::Viewer));
        assert_eq!(client.role_of("w1", "carol").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_role_string_is_an_error() {
        let router = Router::new().route(
            "/workspaces/{id}/members",
            get(|| async {
                Json(json!([
                    {"workspace_id": "w1", "user_id": "eve", "role": "superadmin"}
                ]))
            }),
        );
        let base = spawn_backend(router).await;
        let client = DashboardClient::new(&base, "sk-test").unwrap();
        let err = client.role_of("w1", "eve").await.unwrap_err();
        assert!(matches!(err, DashboardError::InvalidRole(_)));
    }

    #[tokio::test]
    async fn rename_patches_the_workspace_row() {
        use axum::routing::patch;
        let router = Router::new().route(
            "/workspaces/{id}",
            patch(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["name"], "renamed");
                StatusCode::OK
            }),
        );
        let base = spawn_backend(router).await;
        let client = DashboardClient::new(&base, "sk-test").unwrap();
        client.rename_workspace("w1", "renamed").await.unwrap();
    }

    #[tokio::test]
    async fn invite_posts_to_the_function_endpoint() {
        let router = Router::new().route(
            "/functions/invite-user",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["email"], "new@example.com");
                assert_eq!(body["role"], "contributor");
                StatusCode::OK
            }),
        );
        let base = spawn_backend(router).await;
        let client = DashboardClient::new(&base, "sk-test").unwrap();
        client
            .invite_user("w1", "new@example.com", Role::Contributor)
            .await
            .unwrap();
    }
}
