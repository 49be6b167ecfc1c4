//! git2 wrapper for the workspace repository.
//!
//! The approval flow stages everything and commits in one step; the commit
//! either lands as a unit or the flow fails with the underlying git error.

use std::path::Path;

use git2::{IndexAddOption, Repository, Signature};

pub struct WorkspaceRepo {
    repo: Repository,
}

impl WorkspaceRepo {
    /// Open the repository at the workspace root.
    pub fn open(workspace_root: &Path) -> Result<Self, git2::Error> {
        let repo = Repository::open(workspace_root)?;
        Ok(Self { repo })
    }

    /// Stage all changes (adds, modifications, deletions) and commit them
    /// with `message`. Handles the unborn-branch case for fresh
    /// repositories. Returns the new commit id.
    pub fn commit_all(&self, message: &str) -> Result<String, git2::Error> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        // add_all does not record deletions of tracked files
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.signature()?;

        let commit_id = if let Some(parent) = self.head_commit() {
            self.repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?
        } else {
            self.repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])?
        };

        Ok(commit_id.to_string())
    }

    /// Current HEAD SHA, or `None` on an unborn branch.
    pub fn head_sha(&self) -> Option<String> {
        self.head_commit().map(|c| c.id().to_string())
    }

    /// Message of the commit at HEAD, if any.
    pub fn head_message(&self) -> Option<String> {
        self.head_commit()
            .and_then(|c| c.message().map(str::to_string))
    }

    fn head_commit(&self) -> Option<git2::Commit<'_>> {
        self.repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
    }

    /// Committer identity: repo/global git config when present, a fixed
    /// client identity otherwise.
    fn signature(&self) -> Result<Signature<'_>, git2::Error> {
        self.repo
            .signature()
            .or_else(|_| Signature::now("ctxpilot", "ctxpilot@localhost"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn setup_repo() -> (WorkspaceRepo, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "test").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        drop(config);
        let ws = WorkspaceRepo::open(dir.path()).unwrap();
        (ws, dir)
    }

    #[test]
    fn commit_all_on_unborn_branch_creates_initial_commit() {
        let (ws, dir) = setup_repo();
        assert!(ws.head_sha().is_none());
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let sha = ws.commit_all("first").unwrap();
        assert_eq!(sha.len(), 40);
        assert_eq!(ws.head_sha().as_deref(), Some(sha.as_str()));
        assert_eq!(ws.head_message().as_deref(), Some("first"));
    }

    #[test]
    fn commit_all_records_subsequent_changes() {
        let (ws, dir) = setup_repo();
        fs::write(dir.path().join("a.txt"), "one").unwrap();
        let first = ws.commit_all("one").unwrap();
        fs::write(dir.path().join("a.txt"), "two").unwrap();
        fs::write(dir.path().join("b.txt"), "new").unwrap();
        let second = ws.commit_all("two").unwrap();
        assert_ne!(first, second);
        assert_eq!(ws.head_message().as_deref(), Some("two"));
    }

    #[test]
    fn commit_all_records_deletions() {
        let (ws, dir) = setup_repo();
        fs::write(dir.path().join("doomed.txt"), "bye").unwrap();
        ws.commit_all("add doomed").unwrap();
        fs::remove_file(dir.path().join("doomed.txt")).unwrap();
        ws.commit_all("remove doomed").unwrap();

        // The deleted file must not be in the committed tree.
        let repo = Repository::open(dir.path()).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        let tree = head.tree().unwrap();
        assert!(tree.get_name("doomed.txt").is_none());
    }

    #[test]
    fn open_fails_outside_a_repository() {
        let dir = tempdir().unwrap();
        assert!(WorkspaceRepo::open(dir.path()).is_err());
    }
}
