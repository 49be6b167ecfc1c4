//! Layered configuration for the ContextPilot client.
//!
//! Settings are read from `.ctxpilot/config.toml` in the project directory
//! and layered file → environment (`CTXPILOT_*`) → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8000"
//!
//! [user]
//! id = "you@example.com"
//! wallet_address = "0x0"
//!
//! [client]
//! auto_connect = true
//!
//! [dashboard]
//! base_url = "https://dashboard.example.com"
//! api_key = "service-key"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the ContextPilot backend
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Identity settings used for reward and coach calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// User identifier sent to the backend (defaults to "anonymous")
    #[serde(default)]
    pub id: Option<String>,
    /// Wallet address, display-only
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Client behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Run the health-check handshake automatically before commands that
    /// need the backend
    #[serde(default = "default_auto_connect")]
    pub auto_connect: bool,
}

fn default_auto_connect() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auto_connect: default_auto_connect(),
        }
    }
}

/// Workspace-dashboard (BaaS) settings. Optional; `workspace` commands
/// fail with guidance when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// The full configuration tree as persisted in `.ctxpilot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PilotToml {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl PilotToml {
    /// Load `.ctxpilot/config.toml` under `project_dir`, falling back to
    /// the user-level config file and then to defaults. A malformed file is
    /// an error, not a default.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let path = config_path(project_dir);
        if path.exists() {
            return Self::read(&path);
        }
        if let Some(global) = global_config_path()
            && global.exists()
        {
            return Self::read(&global);
        }
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write a commented starter file. Refuses to overwrite an existing one.
    pub fn write_default(project_dir: &Path) -> Result<PathBuf> {
        let path = config_path(project_dir);
        if path.exists() {
            anyhow::bail!("{} already exists", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Effective runtime configuration after layering.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub backend_url: String,
    pub workspace_id: String,
    pub user_id: String,
    pub wallet_address: Option<String>,
    pub auto_connect: bool,
    pub dashboard_url: Option<String>,
    pub dashboard_api_key: Option<String>,
    pub verbose: bool,
}

impl Config {
    /// Resolve the effective configuration for `project_dir`.
    ///
    /// `backend_url_flag` and `workspace_flag` are the CLI overrides and
    /// win over both the environment and the file.
    pub fn load(
        project_dir: &Path,
        backend_url_flag: Option<&str>,
        workspace_flag: Option<&str>,
        verbose: bool,
    ) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let file = PilotToml::load_or_default(&project_dir)?;

        let backend_url = backend_url_flag
            .map(str::to_string)
            .or_else(|| std::env::var("CTXPILOT_BACKEND_URL").ok())
            .unwrap_or(file.backend.base_url);

        // The workspace id falls back to the project directory name.
        let workspace_id = workspace_flag
            .map(str::to_string)
            .or_else(|| std::env::var("CTXPILOT_WORKSPACE_ID").ok())
            .or_else(|| {
                project_dir
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "default".to_string());

        let user_id = std::env::var("CTXPILOT_USER_ID")
            .ok()
            .or(file.user.id)
            .unwrap_or_else(|| "anonymous".to_string());

        let wallet_address = std::env::var("CTXPILOT_WALLET_ADDRESS")
            .ok()
            .or(file.user.wallet_address);

        let dashboard_url = std::env::var("CTXPILOT_DASHBOARD_URL")
            .ok()
            .or(file.dashboard.base_url);
        let dashboard_api_key = std::env::var("CTXPILOT_DASHBOARD_API_KEY")
            .ok()
            .or(file.dashboard.api_key);

        Ok(Self {
            project_dir,
            backend_url: backend_url.trim_end_matches('/').to_string(),
            workspace_id,
            user_id,
            wallet_address,
            auto_connect: file.client.auto_connect,
            dashboard_url,
            dashboard_api_key,
            verbose,
        })
    }
}

/// Location of the config file under a project directory.
pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".ctxpilot").join("config.toml")
}

/// User-level fallback config, e.g. `~/.config/ctxpilot/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ctxpilot").join("config.toml"))
}

const DEFAULT_CONFIG_TOML: &str = r#"# ContextPilot client configuration

[backend]
# Base URL of the ContextPilot backend
base_url = "http://localhost:8000"

[user]
# Identifier sent with reward and coach calls
# id = "you@example.com"
# wallet_address = "0x0"

[client]
# Health-check automatically before commands that need the backend
auto_connect = true

[dashboard]
# Workspace dashboard REST endpoint; required for `ctxpilot workspace`
# base_url = "https://dashboard.example.com"
# api_key = "service-key"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = PilotToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.backend.base_url, "http://localhost:8000");
        assert!(toml.client.auto_connect);
        assert!(toml.dashboard.base_url.is_none());
    }

    #[test]
    fn load_parses_partial_file() {
        let dir = tempdir().unwrap();
        let cfg_dir = dir.path().join(".ctxpilot");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(
            cfg_dir.join("config.toml"),
            "[backend]\nbase_url = \"http://10.0.0.5:9000\"\n\n[user]\nid = \"dev@example.com\"\n",
        )
        .unwrap();
        let toml = PilotToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.backend.base_url, "http://10.0.0.5:9000");
        assert_eq!(toml.user.id.as_deref(), Some("dev@example.com"));
        // Sections absent from the file fall back to defaults
        assert!(toml.client.auto_connect);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let cfg_dir = dir.path().join(".ctxpilot");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(cfg_dir.join("config.toml"), "backend = not valid toml [").unwrap();
        assert!(PilotToml::load_or_default(dir.path()).is_err());
    }

    #[test]
    fn cli_flag_overrides_file() {
        let dir = tempdir().unwrap();
        let cfg_dir = dir.path().join(".ctxpilot");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(
            cfg_dir.join("config.toml"),
            "[backend]\nbase_url = \"http://from-file:8000\"\n",
        )
        .unwrap();
        let config =
            Config::load(dir.path(), Some("http://from-flag:8000/"), None, false).unwrap();
        assert_eq!(config.backend_url, "http://from-flag:8000");
    }

    #[test]
    fn workspace_id_flag_beats_directory_name() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path(), None, Some("ws-42"), false).unwrap();
        assert_eq!(config.workspace_id, "ws-42");

        let config = Config::load(dir.path(), None, None, false).unwrap();
        let dir_name = dir
            .path()
            .canonicalize()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert_eq!(config.workspace_id, dir_name);
    }

    #[test]
    fn write_default_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = PilotToml::write_default(dir.path()).unwrap();
        assert!(path.exists());
        // Starter file must itself parse
        assert!(PilotToml::load_or_default(dir.path()).is_ok());
        assert!(PilotToml::write_default(dir.path()).is_err());
    }
}
