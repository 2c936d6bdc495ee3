//! Core pipeline for rewriting stack files with signed object storage URLs.
//!
//! This crate ties together the schema types and the storage seam into the
//! `StackRewriter`: it sources a stack file in a real shell to resolve its
//! environment, signs every variable that points at object storage, expands
//! parcel manifests into URL map entries, and commits the rewritten outputs
//! atomically. It also provides the layered `Settings`, a reusable
//! `poll_until` loop, and an ordered `StepRegistry` for staged setup runs.
//!
//! `presign-urls` itself signs one stack per run and uses neither of the last
//! two. They are library API for drivers that run setup in stages and need to
//! wait for a dataset before signing it; `tests/staged_setup.rs` drives them
//! together with `StackRewriter`.

pub mod config;
pub mod expand;
pub mod extract;
pub mod poll;
pub mod rewrite;
pub mod steps;

pub use config::{RewriteOptions, Settings};
pub use expand::expand_manifest;
pub use extract::EnvExtractor;
pub use poll::{poll_until, PollError, PollState};
pub use rewrite::{rewrite_stack, OutputPaths, RewriteOutcome, RewriteResult, StackRewriter};
pub use steps::StepRegistry;

use stackpresign_schema::{ManifestError, S3Location};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("storage error: {0}")]
    Remote(#[from] stackpresign_remote::RemoteError),
    #[error("manifest error at {location}: {source}")]
    Manifest {
        location: S3Location,
        source: ManifestError,
    },
    #[error("failed to launch shell '{shell}': {source}")]
    ShellLaunch {
        shell: String,
        source: std::io::Error,
    },
    #[error("failed to read stack file {}: {source}", path.display())]
    ReadStack {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config error: {0}")]
    Config(String),
    #[error("poll error: {0}")]
    Poll(#[from] PollError),
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),
    #[error("step '{name}' (stage {stage}) failed: {source}")]
    Step {
        stage: u32,
        name: String,
        source: Box<CoreError>,
    },
}
