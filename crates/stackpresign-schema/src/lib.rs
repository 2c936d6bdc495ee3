//! Value types shared by the stackpresign pipeline.
//!
//! This crate defines the schema layer: object storage locations (`S3Location`),
//! resolved shell environments (`EnvSnapshot`) parsed from a `set` dump, parcel
//! manifests (`ParcelManifest`) describing multi-part datasets, and the ordered
//! URL map (`UrlMap`) written next to a rewritten stack file.

pub mod env;
pub mod location;
pub mod manifest;
pub mod url_map;

pub use env::{parse_env_dump, EnvBinding, EnvSnapshot, StorageBinding};
pub use location::{S3Location, MANIFEST_FILE_NAME};
pub use manifest::{parse_manifest_str, ManifestError, Parcel, ParcelManifest};
pub use url_map::{RewriteEntry, UrlMap, URL_MAP_SEPARATOR};
