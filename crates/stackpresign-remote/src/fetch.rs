use crate::{ObjectStore, RemoteError};
use stackpresign_schema::S3Location;
use std::io::{Read, Seek, SeekFrom};

/// Read a small text object, treating a missing manifest as absent.
///
/// The object is staged in a private scratch file that is removed on every
/// exit path; removal failures are ignored. For keys ending in
/// `/manifest.json`, a 404 or a 403 yields `Ok(None)`. S3 answers 403 for a
/// missing key when the caller may not list the bucket, so the two cannot be
/// told apart here. Every other failure is returned as an error.
pub fn fetch_text(
    store: &dyn ObjectStore,
    location: &S3Location,
) -> Result<Option<String>, RemoteError> {
    let mut scratch = tempfile::NamedTempFile::new()?;

    match store.download(location, scratch.as_file_mut()) {
        Ok(bytes) => tracing::debug!("fetched {location} ({bytes} bytes)"),
        Err(e) if location.is_manifest() && matches!(e.status(), Some(403 | 404)) => {
            tracing::debug!("no manifest at {location}: {e}");
            return Ok(None);
        }
        Err(e) => return Err(e),
    }

    let file = scratch.as_file_mut();
    file.seek(SeekFrom::Start(0))?;
    let mut content = String::new();
    file.read_to_string(&mut content).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            RemoteError::Encoding(location.clone())
        } else {
            RemoteError::Io(e)
        }
    })?;
    Ok(Some(content))
}
