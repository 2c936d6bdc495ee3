//! Object storage access for stackpresign.
//!
//! This crate provides the storage seam of the pipeline: the [`ObjectStore`]
//! trait, an S3 client built on the AWS SDK that issues presigned GET URLs and
//! downloads objects, an in-memory store for tests and dry runs, selection of
//! the credentials source from the environment and the shared AWS files, and
//! the best-effort text fetcher used to look up parcel manifests.

pub mod config;
pub mod credentials;
pub mod fetch;
pub mod memory;
pub mod s3;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{S3Config, DEFAULT_REGION};
pub use credentials::CredentialSource;
pub use fetch::fetch_text;
pub use memory::MemoryStore;
pub use s3::S3Client;

use stackpresign_schema::S3Location;
use std::io::Write;
use thiserror::Error;

/// Lifetime of signed URLs handed out to stack consumers.
pub const DEFAULT_EXPIRES_SECS: u64 = 7200;

/// Longest lifetime S3 accepts for a presigned URL (seven days).
pub const MAX_EXPIRES_SECS: u64 = 604_800;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error for {location}: {message}")]
    Http {
        location: S3Location,
        message: String,
    },
    #[error("HTTP {code} for {location}")]
    Status { code: u16, location: S3Location },
    #[error("object {0} is not valid UTF-8 text")]
    Encoding(S3Location),
    #[error("credentials error: {0}")]
    Credentials(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("signing error for {location}: {message}")]
    Signing {
        location: S3Location,
        message: String,
    },
}

impl RemoteError {
    /// HTTP status reported by the provider, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Trait for object storage backends.
pub trait ObjectStore: Send + Sync {
    /// Issue a time-limited GET URL for an object. A fresh URL per call.
    fn presign_get(&self, location: &S3Location, expires_secs: u64) -> Result<String, RemoteError>;

    /// Stream an object into `sink`. Returns the number of bytes written.
    fn download(&self, location: &S3Location, sink: &mut dyn Write) -> Result<u64, RemoteError>;
}
