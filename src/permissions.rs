//! Role-derived workspace capabilities.
//!
//! Permissions are a pure function of the member's role; the cache only
//! remembers which role the current user holds per workspace. An unknown
//! workspace yields no capability at all.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Contributor,
    Viewer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Contributor => write!(f, "contributor"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "contributor" => Ok(Role::Contributor),
            "viewer" => Ok(Role::Viewer),
            _ => anyhow::bail!("Invalid role '{}'. Valid values: owner, contributor, viewer", s),
        }
    }
}

/// Everything a workspace member can be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ViewProject,
    ViewHistory,
    UpdateCheckpoint,
    CommitContext,
    PushToLlm,
    CreateProject,
    EditProject,
    DeleteProject,
    InviteMember,
    RemoveMember,
    ManageWorkspace,
}

const OWNER_CAPABILITIES: &[Capability] = &[
    Capability::ViewProject,
    Capability::ViewHistory,
    Capability::UpdateCheckpoint,
    Capability::CommitContext,
    Capability::PushToLlm,
    Capability::CreateProject,
    Capability::EditProject,
    Capability::DeleteProject,
    Capability::InviteMember,
    Capability::RemoveMember,
    Capability::ManageWorkspace,
];

const CONTRIBUTOR_CAPABILITIES: &[Capability] = &[
    Capability::UpdateCheckpoint,
    Capability::CommitContext,
    Capability::ViewHistory,
    Capability::PushToLlm,
    Capability::ViewProject,
];

const VIEWER_CAPABILITIES: &[Capability] = &[Capability::ViewProject, Capability::ViewHistory];

impl Role {
    /// The static, ordered capability set this role grants.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Owner => OWNER_CAPABILITIES,
            Role::Contributor => CONTRIBUTOR_CAPABILITIES,
            Role::Viewer => VIEWER_CAPABILITIES,
        }
    }

    pub fn allows(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// Cached role per workspace for the current user.
///
/// Fail-closed: a workspace with no cached role grants nothing.
#[derive(Debug, Default)]
pub struct PermissionCache {
    roles: HashMap<String, Role>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_role(&mut self, workspace_id: impl Into<String>, role: Role) {
        self.roles.insert(workspace_id.into(), role);
    }

    pub fn role(&self, workspace_id: &str) -> Option<Role> {
        self.roles.get(workspace_id).copied()
    }

    pub fn has_permission(&self, workspace_id: &str, capability: Capability) -> bool {
        match self.roles.get(workspace_id) {
            Some(role) => role.allows(capability),
            None => false,
        }
    }
}
