use crate::CoreError;
use serde::{Deserialize, Serialize};
use stackpresign_remote::{S3Config, DEFAULT_EXPIRES_SECS, MAX_EXPIRES_SECS};
use std::path::{Path, PathBuf};

pub const ENV_ENDPOINT: &str = "STACKPRESIGN_S3_ENDPOINT";
pub const ENV_REGION: &str = "STACKPRESIGN_REGION";

/// Settings for one run, loaded from `config.toml` and layered with the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub rewrite: RewriteOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteOptions {
    /// Lifetime of every signed URL written to the outputs.
    #[serde(default = "default_expires_secs")]
    pub expires_secs: u64,
    /// Shell used to source stack files.
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            expires_secs: default_expires_secs(),
            shell: default_shell(),
        }
    }
}

fn default_expires_secs() -> u64 {
    DEFAULT_EXPIRES_SECS
}

fn default_shell() -> String {
    "bash".to_owned()
}

impl Settings {
    pub fn parse(content: &str) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::Config(format!("invalid settings: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Load `~/.config/stackpresign/config.toml` if it exists, else defaults.
    pub fn load_default() -> Result<Self, CoreError> {
        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("loading settings from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply `STACKPRESIGN_S3_ENDPOINT` and `STACKPRESIGN_REGION` overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.is_empty()) {
            self.s3 = self.s3.clone().with_endpoint(&endpoint);
        }
        if let Some(region) = lookup(ENV_REGION).filter(|v| !v.is_empty()) {
            self.s3.region = region;
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        self.s3
            .validate()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        if self.rewrite.expires_secs == 0 || self.rewrite.expires_secs > MAX_EXPIRES_SECS {
            return Err(CoreError::Config(format!(
                "expires_secs must be within 1..={MAX_EXPIRES_SECS}, got {}",
                self.rewrite.expires_secs
            )));
        }
        if self.rewrite.shell.trim().is_empty() {
            return Err(CoreError::Config("shell must not be empty".to_owned()));
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/stackpresign/config.toml"))
}
