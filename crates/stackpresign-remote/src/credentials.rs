//! Selection of the AWS credentials used to sign URLs.
//!
//! Sources are tried in order:
//! 1. `TF_VAR_aws_profile`: a named profile from the shared config and
//!    credentials files.
//! 2. `TF_VAR_aws_access_key_id` + `TF_VAR_aws_secret_access_key`.
//! 3. `AWS_ACCESS_KEY_ID` + `AWS_SECRET_ACCESS_KEY` (+ `AWS_SESSION_TOKEN`).
//! 4. The `default` profile, when a shared config or credentials file exists.
//!
//! Profiles are read by `aws-config`, so `[profile x]` sections in
//! `~/.aws/config`, `[x]` sections in `~/.aws/credentials`, role chaining and
//! SSO all behave as they do for the AWS CLI.

use crate::RemoteError;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use std::fmt;
use std::path::PathBuf;

pub const ENV_PROFILE: &str = "TF_VAR_aws_profile";
pub const ENV_ACCESS_KEY_ID: &str = "TF_VAR_aws_access_key_id";
pub const ENV_SECRET_ACCESS_KEY: &str = "TF_VAR_aws_secret_access_key";

const DEFAULT_PROFILE: &str = "default";

/// Where signing credentials come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// A named profile from the shared files that exist.
    Profile {
        name: String,
        config_file: Option<PathBuf>,
        credentials_file: Option<PathBuf>,
    },
    /// A key pair taken from the environment variable named by `origin`.
    Static {
        credentials: Credentials,
        origin: &'static str,
    },
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile { name, .. } => write!(f, "profile '{name}'"),
            Self::Static { origin, .. } => write!(f, "key pair from {origin}"),
        }
    }
}

impl CredentialSource {
    /// Select a source from the process environment.
    pub fn from_env() -> Result<Self, RemoteError> {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    /// Select a source using `lookup` in place of the process environment.
    pub fn resolve_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RemoteError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let (config_file, credentials_file) = shared_files(&lookup);

        if let Some(name) = non_empty(ENV_PROFILE) {
            tracing::debug!("using credentials profile '{name}'");
            if config_file.is_none() && credentials_file.is_none() {
                return Err(RemoteError::Credentials(format!(
                    "profile '{name}' requested but no shared config or credentials file exists"
                )));
            }
            return Ok(Self::Profile {
                name,
                config_file,
                credentials_file,
            });
        }

        if let (Some(id), Some(secret)) = (
            non_empty(ENV_ACCESS_KEY_ID),
            non_empty(ENV_SECRET_ACCESS_KEY),
        ) {
            tracing::debug!("using credentials from {ENV_ACCESS_KEY_ID}");
            return Ok(Self::Static {
                credentials: Credentials::new(id, secret, None, None, "stackpresign"),
                origin: ENV_ACCESS_KEY_ID,
            });
        }

        if let (Some(id), Some(secret)) = (
            non_empty("AWS_ACCESS_KEY_ID"),
            non_empty("AWS_SECRET_ACCESS_KEY"),
        ) {
            tracing::debug!("using credentials from AWS_ACCESS_KEY_ID");
            return Ok(Self::Static {
                credentials: Credentials::new(
                    id,
                    secret,
                    non_empty("AWS_SESSION_TOKEN"),
                    None,
                    "stackpresign",
                ),
                origin: "AWS_ACCESS_KEY_ID",
            });
        }

        if config_file.is_some() || credentials_file.is_some() {
            tracing::debug!("using the default profile");
            return Ok(Self::Profile {
                name: DEFAULT_PROFILE.to_owned(),
                config_file,
                credentials_file,
            });
        }

        Err(RemoteError::Credentials(format!(
            "no credentials found: set {ENV_PROFILE}, {ENV_ACCESS_KEY_ID}/{ENV_SECRET_ACCESS_KEY}, \
             or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY"
        )))
    }

    /// An SDK credentials provider for this source.
    pub fn provider(&self) -> SharedCredentialsProvider {
        match self {
            Self::Static { credentials, .. } => SharedCredentialsProvider::new(credentials.clone()),
            Self::Profile {
                name,
                config_file,
                credentials_file,
            } => {
                let mut files = ProfileFiles::builder();
                if let Some(path) = config_file {
                    files = files.with_file(ProfileFileKind::Config, path);
                }
                if let Some(path) = credentials_file {
                    files = files.with_file(ProfileFileKind::Credentials, path);
                }
                SharedCredentialsProvider::new(
                    ProfileFileCredentialsProvider::builder()
                        .profile_files(files.build())
                        .profile_name(name)
                        .build(),
                )
            }
        }
    }

    /// Resolve the credentials now, so a bad profile fails before any work starts.
    pub async fn load(&self) -> Result<Credentials, RemoteError> {
        self.provider().provide_credentials().await.map_err(|e| {
            RemoteError::Credentials(format!("{self}: {}", DisplayErrorContext(&e)))
        })
    }
}

/// Shared config and credentials files that exist, honouring the AWS overrides.
fn shared_files(lookup: &impl Fn(&str) -> Option<String>) -> (Option<PathBuf>, Option<PathBuf>) {
    let home = lookup("HOME").filter(|v| !v.is_empty()).map(PathBuf::from);
    let locate = |override_var: &str, default_name: &str| {
        lookup(override_var)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".aws").join(default_name)))
            .filter(|p| p.is_file())
    };
    (
        locate("AWS_CONFIG_FILE", "config"),
        locate("AWS_SHARED_CREDENTIALS_FILE", "credentials"),
    )
}
