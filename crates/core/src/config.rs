//! TOML-based configuration for branchmirror.
//!
//! The push token never lives in the file: `[github].token_env` names an
//! environment variable that is resolved at runtime by
//! [`MirrorConfig::resolve_env_vars`]. GitHub context fields left empty in
//! the file are filled from the conventional `GITHUB_*` variables, so a run
//! inside a CI job needs no config beyond the map itself.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Mapping directives and run flags.
    #[serde(default)]
    pub mirror: MirrorSection,
    /// Hosting server and repository context.
    #[serde(default)]
    pub github: GithubSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MirrorSection {
    /// Mapping directives, one `<sourcePattern> -> <targetBranchPattern>`
    /// per line. Blank lines are ignored.
    #[serde(default)]
    pub map: String,

    /// Publish every mapping without probing for changes.
    #[serde(default)]
    pub skip_unchanged_check: bool,

    /// Render the command sequence instead of executing it.
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSection {
    /// Hosting server base URL. Empty: `GITHUB_SERVER_URL`, then
    /// `https://github.com`.
    #[serde(default)]
    pub server_url: String,

    /// Owning repository as `owner/repo`. Empty: `GITHUB_REPOSITORY`.
    #[serde(default)]
    pub repository: String,

    /// Reference checked out in the workspace, restored after tracked
    /// syncs. Empty: `GITHUB_REF_NAME`.
    #[serde(default)]
    pub ref_name: String,

    /// Revision that triggered the run, named in commit messages. Empty:
    /// `GITHUB_SHA`.
    #[serde(default)]
    pub sha: String,

    /// Environment variable holding the push token. Empty disables token
    /// resolution entirely.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Resolved push token. Never serialized; populated by
    /// [`MirrorConfig::resolve_env_vars`].
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            repository: String::new(),
            ref_name: String::new(),
            sha: String::new(),
            token_env: default_token_env(),
            token: None,
        }
    }
}

impl MirrorConfig {
    /// Load configuration from a TOML file. No environment resolution or
    /// validation happens here.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!("configuration parsed");
        Ok(config)
    }

    /// Fill empty GitHub context fields from the conventional `GITHUB_*`
    /// variables and resolve the push token.
    ///
    /// Values already set in the file win over the environment. A missing
    /// token is tolerated for the default variable (pushes then rely on
    /// ambient credentials) but is an error when the file names a custom
    /// variable.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment values in config");

        if self.github.server_url.is_empty() {
            self.github.server_url = std::env::var("GITHUB_SERVER_URL")
                .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        }
        if self.github.repository.is_empty() {
            if let Ok(value) = std::env::var("GITHUB_REPOSITORY") {
                self.github.repository = value;
            }
        }
        if self.github.ref_name.is_empty() {
            if let Ok(value) = std::env::var("GITHUB_REF_NAME") {
                self.github.ref_name = value;
            }
        }
        if self.github.sha.is_empty() {
            if let Ok(value) = std::env::var("GITHUB_SHA") {
                self.github.sha = value;
            }
        }

        self.github.token = match self.github.token_env.as_str() {
            "" => None,
            var => match std::env::var(var) {
                Ok(value) if !value.is_empty() => Some(value),
                _ if var == DEFAULT_TOKEN_ENV => {
                    warn!(
                        var,
                        "push token variable not set, pushes rely on ambient credentials"
                    );
                    None
                }
                _ => {
                    return Err(ConfigError::EnvVarMissing {
                        var: var.to_string(),
                        field: "github.token_env".to_string(),
                    })
                }
            },
        };

        debug!("environment resolution complete");
        Ok(())
    }

    /// Validate a resolved configuration for a real sync run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mirror.map.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mirror.map".to_string(),
                detail: "at least one mapping line is required".to_string(),
            });
        }
        if self.github.repository.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.repository".to_string(),
                detail: "owning repository must be set".to_string(),
            });
        }
        if !self.github.repository.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "github.repository".to_string(),
                detail: "expected 'owner/repo' format".to_string(),
            });
        }
        if self.github.ref_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.ref_name".to_string(),
                detail: "checked out reference must be known".to_string(),
            });
        }
        if self.github.sha.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.sha".to_string(),
                detail: "triggering revision must be set".to_string(),
            });
        }
        Ok(())
    }

    /// Load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        info!("configuration loaded and validated");
        Ok(config)
    }

    /// Build a configuration purely from the environment, for file-less
    /// runs inside CI jobs. The map must still be set by the caller.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.resolve_env_vars()?;
        Ok(config)
    }
}
