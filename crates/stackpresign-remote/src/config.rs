use crate::RemoteError;
use serde::{Deserialize, Serialize};

/// Region used when nothing overrides it.
pub const DEFAULT_REGION: &str = "us-west-2";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the S3 endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3Config {
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL for S3-compatible stores. Switches to path-style URLs.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl S3Config {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.trim_end_matches('/').to_owned());
        self
    }

    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.region.is_empty() {
            return Err(RemoteError::Config("region must not be empty".to_owned()));
        }
        if self.timeout_secs == 0 {
            return Err(RemoteError::Config(
                "timeout_secs must be greater than zero".to_owned(),
            ));
        }
        if let Some(ref endpoint) = self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(RemoteError::Config(format!(
                    "endpoint '{endpoint}' must be an http or https URL"
                )));
            }
        }
        Ok(())
    }
}
