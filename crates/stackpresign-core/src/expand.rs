use crate::CoreError;
use stackpresign_remote::{fetch_text, ObjectStore};
use stackpresign_schema::{parse_manifest_str, RewriteEntry, S3Location, MANIFEST_FILE_NAME};

/// Expand a signed dataset root into URL map entries for its parcels.
///
/// Looks up `<root>/manifest.json` next to `location`. Without one, returns no
/// entries. With one, returns the manifest mapping first and then one entry per
/// parcel in manifest order; each original URL is `signed_url` with the
/// object name appended, and each parcel is signed independently.
pub fn expand_manifest(
    store: &dyn ObjectStore,
    location: &S3Location,
    signed_url: &str,
    expires_secs: u64,
) -> Result<Vec<RewriteEntry>, CoreError> {
    let manifest_location = location.manifest();
    let text = match fetch_text(store, &manifest_location)? {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(Vec::new()),
    };

    let manifest = parse_manifest_str(&text).map_err(|source| CoreError::Manifest {
        location: manifest_location.clone(),
        source,
    })?;

    let mut entries = Vec::with_capacity(manifest.parcels.len() + 1);
    entries.push(RewriteEntry {
        original_url: format!("{signed_url}/{MANIFEST_FILE_NAME}"),
        signed_url: store.presign_get(&manifest_location, expires_secs)?,
    });
    for name in manifest.parcel_names() {
        entries.push(RewriteEntry {
            original_url: format!("{signed_url}/{name}"),
            signed_url: store.presign_get(&location.child(name), expires_secs)?,
        });
    }

    tracing::debug!(
        "{manifest_location}: {} parcel(s) expanded",
        manifest.parcels.len()
    );
    Ok(entries)
}
