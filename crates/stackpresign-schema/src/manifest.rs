use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse parcel manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Companion manifest describing a dataset split into named parcels.
///
/// Only `parcels[].parcelName` is interpreted; other fields written by the
/// producer are accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParcelManifest {
    pub parcels: Vec<Parcel>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Parcel {
    #[serde(rename = "parcelName")]
    pub parcel_name: String,
}

impl ParcelManifest {
    pub fn parcel_names(&self) -> impl Iterator<Item = &str> {
        self.parcels.iter().map(|p| p.parcel_name.as_str())
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ParcelManifest, ManifestError> {
    Ok(serde_json::from_str(input)?)
}
