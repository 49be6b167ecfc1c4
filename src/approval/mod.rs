//! The proposal approval flow.
//!
//! Converts a backend-approved proposal into local filesystem state and one
//! git commit, then watches for a follow-up proposal:
//!
//! 1. resolve the workspace root
//! 2. fetch the full proposal
//! 3. confirm with the user
//! 4. record the approval on the backend
//! 5. best-effort balance fetch for the reward notice
//! 6. apply the proposed changes in list order
//! 7. stage everything and commit
//! 8. start the retrospective watch
//!
//! Steps 1-4 fail fast with no side effect. Anything after step 4 is
//! best-effort relative to the approval already recorded by the backend:
//! errors surface to the caller but nothing is rolled back.

pub mod watch;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use console::style;
use dialoguer::Confirm;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::errors::ApprovalError;
use crate::types::{ChangeKind, ChangeProposal, ProposedChange};
use crate::vcs::WorkspaceRepo;
use watch::{RetrospectiveWatch, WatchHandle};

pub struct ApprovalOptions {
    /// Workspace root to apply changes under; `None` means no workspace is
    /// open and the flow fails before any network call.
    pub workspace_root: Option<PathBuf>,
    pub workspace_id: String,
    /// Skip the confirmation prompt (`--yes`).
    pub assume_yes: bool,
}

#[derive(Debug)]
pub enum ApprovalOutcome {
    /// The user declined the confirmation; nothing happened.
    Declined,
    Approved {
        proposal: ChangeProposal,
        commit_id: String,
        applied: usize,
        watch: WatchHandle,
    },
}

/// Run the approval flow for one proposal id.
pub async fn run_approval(
    client: Arc<ApiClient>,
    opts: ApprovalOptions,
    proposal_id: &str,
) -> Result<ApprovalOutcome, ApprovalError> {
    // 1. Workspace root
    let root = opts.workspace_root.ok_or(ApprovalError::NoWorkspace)?;
    if !root.is_dir() {
        return Err(ApprovalError::NoWorkspace);
    }

    // 2. Full proposal, including the ordered change list
    let proposal = client
        .proposal(proposal_id, &opts.workspace_id)
        .await
        .ok_or_else(|| ApprovalError::ProposalNotFound {
            id: proposal_id.to_string(),
        })?;

    // 3. Blocking confirmation; declining is not an error
    if !confirm_proposal(&proposal, opts.assume_yes)? {
        info!(id = %proposal.id, "approval declined by user");
        return Ok(ApprovalOutcome::Declined);
    }

    let started_at = Utc::now();

    // 4. Record the approval; nothing local has happened yet
    client
        .approve_proposal(&proposal.id, &opts.workspace_id)
        .await
        .map_err(|source| ApprovalError::RejectedByBackend {
            id: proposal.id.clone(),
            source,
        })?;

    // 5. Reward notice, swallowed on failure
    match client.balance().await {
        Some(balance) => println!(
            "  {} balance {:.1} CPT ({:.1} pending)",
            style("Rewards:").green(),
            balance.balance,
            balance.pending_rewards
        ),
        None => warn!("balance unavailable, skipping reward notice"),
    }

    // 6. Apply the changes in list order
    let applied = apply_changes(&root, &proposal.changes)?;

    // 7. One commit for the whole proposal
    let repo = WorkspaceRepo::open(&root).map_err(ApprovalError::CommitFailed)?;
    let message = commit_message(&proposal);
    let commit_id = repo
        .commit_all(&message)
        .map_err(ApprovalError::CommitFailed)?;
    info!(id = %proposal.id, commit = %commit_id, applied, "proposal applied and committed");

    // Report the commit back for bookkeeping; failure is not fatal here.
    if let Err(err) = client
        .record_commit(&proposal.title, &proposal.agent_id, &opts.workspace_id)
        .await
    {
        warn!(error = %err, "failed to report commit to backend");
    }

    // 8. Watch for a follow-up proposal
    let watch = RetrospectiveWatch::spawn_default(
        client.clone(),
        opts.workspace_id.clone(),
        started_at,
    );

    Ok(ApprovalOutcome::Approved {
        proposal,
        commit_id,
        applied,
        watch,
    })
}

fn confirm_proposal(proposal: &ChangeProposal, assume_yes: bool) -> Result<bool, ApprovalError> {
    println!(
        "{} {} {}",
        style("Proposal").bold(),
        style(&proposal.id).cyan(),
        style(format!("by {}", proposal.agent_id)).dim()
    );
    println!("  {}", style(&proposal.title).bold());
    if !proposal.description.is_empty() {
        println!("  {}", proposal.description);
    }
    for change in &proposal.changes {
        let tag = match change.change_type {
            ChangeKind::Create => style("create").green(),
            ChangeKind::Update => style("update").yellow(),
            ChangeKind::Delete => style("delete").red(),
        };
        println!("    {} {}", tag, change.path);
    }
    if let Some(verdict) = &proposal.ai_review {
        println!("  {} {}", style("AI review:").dim(), verdict);
    }

    if assume_yes {
        println!("  {} (--yes flag)", style("Auto-approved").dim());
        return Ok(true);
    }

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Apply {} change(s) and commit?",
            proposal.changes.len()
        ))
        .default(false)
        .interact()
        .context("confirmation prompt failed")?;
    Ok(confirmed)
}

/// Apply proposed changes under `root`, in list order. Later entries
/// targeting the same path win. The first failure aborts the remainder;
/// files already written stay on disk.
pub fn apply_changes(root: &Path, changes: &[ProposedChange]) -> Result<usize, ApprovalError> {
    for change in changes {
        let target = normalize_change_path(root, &change.path)?;
        match change.change_type {
            ChangeKind::Delete => {
                // A missing target is a no-op, not an error.
                if target.exists() {
                    std::fs::remove_file(&target).map_err(|source| {
                        ApprovalError::ApplyFailed {
                            path: target.clone(),
                            source,
                        }
                    })?;
                }
            }
            ChangeKind::Create | ChangeKind::Update => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|source| {
                        ApprovalError::ApplyFailed {
                            path: target.clone(),
                            source,
                        }
                    })?;
                }
                let content = change.after.as_deref().unwrap_or("");
                std::fs::write(&target, content).map_err(|source| ApprovalError::ApplyFailed {
                    path: target.clone(),
                    source,
                })?;
            }
        }
    }
    Ok(changes.len())
}

/// Resolve a backend-supplied relative path against the workspace root,
/// rejecting anything that would land outside it.
fn normalize_change_path(root: &Path, raw: &str) -> Result<PathBuf, ApprovalError> {
    let rel = Path::new(raw);
    if rel.is_absolute() {
        return Err(ApprovalError::PathEscapesWorkspace {
            path: raw.to_string(),
        });
    }
    let mut normalized = PathBuf::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(ApprovalError::PathEscapesWorkspace {
                        path: raw.to_string(),
                    });
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ApprovalError::PathEscapesWorkspace {
                    path: raw.to_string(),
                });
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(ApprovalError::PathEscapesWorkspace {
            path: raw.to_string(),
        });
    }
    Ok(root.join(normalized))
}

/// Commit message embedding the proposal metadata as trailers.
pub fn commit_message(proposal: &ChangeProposal) -> String {
    format!(
        "{}\n\n{}\n\nProposal-ID: {}\nAgent: {}",
        proposal.title, proposal.description, proposal.id, proposal.agent_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProposalStatus;
    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use git2::Repository;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn change(path: &str, kind: ChangeKind, after: Option<&str>) -> ProposedChange {
        ProposedChange {
            path: path.to_string(),
            change_type: kind,
            description: String::new(),
            before: None,
            after: after.map(str::to_string),
            diff: None,
        }
    }

    fn proposal(id: &str, changes: Vec<ProposedChange>) -> ChangeProposal {
        ChangeProposal {
            id: id.to_string(),
            agent_id: "refactor-bot".to_string(),
            workspace_id: "ws-1".to_string(),
            title: "Tidy sources".to_string(),
            description: "Replace old module".to_string(),
            diff_format: None,
            diff: None,
            changes,
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
            ai_review: None,
        }
    }

    // ── apply_changes ─────────────────────────────────────────────────

    #[test]
    fn apply_writes_create_and_update_content() {
        let dir = tempdir().unwrap();
        let changes = vec![
            change("src/a.ts", ChangeKind::Create, Some("// a")),
            change("src/nested/deep/b.ts", ChangeKind::Update, Some("// b")),
        ];
        let applied = apply_changes(dir.path(), &changes).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(fs::read_to_string(dir.path().join("src/a.ts")).unwrap(), "// a");
        assert_eq!(
            fs::read_to_string(dir.path().join("src/nested/deep/b.ts")).unwrap(),
            "// b"
        );
    }

    #[test]
    fn apply_missing_after_writes_empty_file() {
        let dir = tempdir().unwrap();
        let changes = vec![change("empty.txt", ChangeKind::Create, None)];
        apply_changes(dir.path(), &changes).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("empty.txt")).unwrap(), "");
    }

    #[test]
    fn apply_delete_of_missing_file_is_a_noop() {
        let dir = tempdir().unwrap();
        let changes = vec![change("ghost.txt", ChangeKind::Delete, None)];
        assert!(apply_changes(dir.path(), &changes).is_ok());
    }

    #[test]
    fn apply_delete_removes_existing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("old.ts"), "gone soon").unwrap();
        let changes = vec![change("old.ts", ChangeKind::Delete, None)];
        apply_changes(dir.path(), &changes).unwrap();
        assert!(!dir.path().join("old.ts").exists());
    }

    #[test]
    fn apply_later_entry_wins_on_same_path() {
        let dir = tempdir().unwrap();
        let changes = vec![
            change("same.txt", ChangeKind::Create, Some("first")),
            change("same.txt", ChangeKind::Update, Some("second")),
        ];
        apply_changes(dir.path(), &changes).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("same.txt")).unwrap(),
            "second"
        );
    }

    #[test]
    fn apply_rejects_traversal_before_touching_disk() {
        let dir = tempdir().unwrap();
        let changes = vec![
            change("../outside.txt", ChangeKind::Create, Some("nope")),
            change("inner.txt", ChangeKind::Create, Some("never reached")),
        ];
        let err = apply_changes(dir.path(), &changes).unwrap_err();
        assert!(matches!(err, ApprovalError::PathEscapesWorkspace { .. }));
        assert!(!dir.path().join("inner.txt").exists());
        assert!(!dir.path().parent().unwrap().join("outside.txt").exists());
    }

    #[test]
    fn normalize_allows_internal_parent_segments() {
        let dir = tempdir().unwrap();
        let resolved = normalize_change_path(dir.path(), "src/../src/a.ts").unwrap();
        assert_eq!(resolved, dir.path().join("src/a.ts"));
    }

    #[test]
    fn normalize_rejects_absolute_and_empty_paths() {
        let dir = tempdir().unwrap();
        assert!(normalize_change_path(dir.path(), "/etc/passwd").is_err());
        assert!(normalize_change_path(dir.path(), "").is_err());
        assert!(normalize_change_path(dir.path(), "a/../..").is_err());
    }

    #[test]
    fn commit_message_embeds_trailers() {
        let p = proposal("p1", vec![]);
        let message = commit_message(&p);
        assert!(message.contains("Tidy sources"));
        assert!(message.contains("Proposal-ID: p1"));
        assert!(message.contains("Agent: refactor-bot"));
    }

    // ── full flow ─────────────────────────────────────────────────────

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn git_workspace() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "test").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        dir
    }

    fn backend_for(p: ChangeProposal) -> Router {
        let fetched = Json(serde_json::to_value(&p).unwrap());
        Router::new()
            .route("/proposals/{id}", get(move || async move { fetched }))
            .route("/proposals/{id}/approve", post(|| async { StatusCode::OK }))
            .route(
                "/rewards/balance",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route(
                "/rewards/balance/mock",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route("/commit", post(|| async { StatusCode::OK }))
            .route(
                "/agents/retrospective/status",
                get(|| async { Json(json!({})) }),
            )
    }

    #[tokio::test]
    async fn full_flow_applies_changes_and_commits_once() {
        let ws = git_workspace();
        // Pre-existing file the proposal deletes.
        fs::create_dir_all(ws.path().join("src")).unwrap();
        fs::write(ws.path().join("src/old.ts"), "obsolete").unwrap();
        let repo = WorkspaceRepo::open(ws.path()).unwrap();
        repo.commit_all("seed").unwrap();

        let p = proposal(
            "p1",
            vec![
                change("src/a.ts", ChangeKind::Create, Some("// a")),
                change("src/old.ts", ChangeKind::Delete, None),
            ],
        );
        let base = spawn_backend(backend_for(p)).await;
        let client = Arc::new(ApiClient::new(&base, "tester").unwrap());

        let outcome = run_approval(
            client,
            ApprovalOptions {
                workspace_root: Some(ws.path().to_path_buf()),
                workspace_id: "ws-1".into(),
                assume_yes: true,
            },
            "p1",
        )
        .await
        .unwrap();

        let ApprovalOutcome::Approved {
            commit_id,
            applied,
            watch,
            ..
        } = outcome
        else {
            panic!("expected Approved outcome");
        };
        watch.cancel();
        watch.join().await;

        assert_eq!(applied, 2);
        assert_eq!(
            fs::read_to_string(ws.path().join("src/a.ts")).unwrap(),
            "// a"
        );
        assert!(!ws.path().join("src/old.ts").exists());

        // Exactly one commit on top of the seed, referencing the proposal.
        let repo = WorkspaceRepo::open(ws.path()).unwrap();
        assert_eq!(repo.head_sha().as_deref(), Some(commit_id.as_str()));
        let message = repo.head_message().unwrap();
        assert!(message.contains("Proposal-ID: p1"));
        let git = Repository::open(ws.path()).unwrap();
        let head = git.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.parent_count(), 1);
        assert_eq!(head.parent(0).unwrap().message().unwrap(), "seed");
    }

    #[tokio::test]
    async fn missing_workspace_fails_before_any_network_call() {
        // Backend that would panic if touched: unreachable address.
        let client = Arc::new(ApiClient::new("http://127.0.0.1:1", "tester").unwrap());
        let err = run_approval(
            client,
            ApprovalOptions {
                workspace_root: None,
                workspace_id: "ws-1".into(),
                assume_yes: true,
            },
            "p1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApprovalError::NoWorkspace));
    }

    #[tokio::test]
    async fn unknown_proposal_is_reported_as_not_found() {
        let ws = git_workspace();
        let base = spawn_backend(Router::new()).await;
        let client = Arc::new(ApiClient::new(&base, "tester").unwrap());
        let err = run_approval(
            client,
            ApprovalOptions {
                workspace_root: Some(ws.path().to_path_buf()),
                workspace_id: "ws-1".into(),
                assume_yes: true,
            },
            "nope",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApprovalError::ProposalNotFound { .. }));
    }

    #[tokio::test]
    async fn backend_rejection_leaves_workspace_untouched() {
        let ws = git_workspace();
        let p = proposal(
            "p1",
            vec![change("src/a.ts", ChangeKind::Create, Some("// a"))],
        );
        let fetched = Json(serde_json::to_value(&p).unwrap());
        let router = Router::new()
            .route("/proposals/{id}", get(move || async move { fetched }))
            .route(
                "/proposals/{id}/approve",
                post(|| async { StatusCode::FORBIDDEN }),
            );
        let base = spawn_backend(router).await;
        let client = Arc::new(ApiClient::new(&base, "tester").unwrap());

        let err = run_approval(
            client,
            ApprovalOptions {
                workspace_root: Some(ws.path().to_path_buf()),
                workspace_id: "ws-1".into(),
                assume_yes: true,
            },
            "p1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApprovalError::RejectedByBackend { .. }));
        assert!(!ws.path().join("src/a.ts").exists());
    }
}
