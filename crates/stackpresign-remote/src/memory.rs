use crate::{ObjectStore, RemoteError};
use stackpresign_schema::S3Location;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// In-memory object store.
///
/// Signed URLs are deterministic: `https://<bucket>.mock.invalid/<key>?X-Amz-Expires=<n>&sig=<seq>`,
/// where `seq` increases on every call. Missing objects report 404.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failures: Mutex<HashMap<(String, String), u16>>,
    unsignable: Mutex<HashSet<String>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .expect("objects lock poisoned")
            .insert((bucket.to_owned(), key.to_owned()), data.to_vec());
    }

    /// Make downloads of `bucket/key` fail with `code`.
    pub fn fail_download(&self, bucket: &str, key: &str, code: u16) {
        self.failures
            .lock()
            .expect("failures lock poisoned")
            .insert((bucket.to_owned(), key.to_owned()), code);
    }

    /// Make signing fail for every key in `bucket`.
    pub fn fail_signing(&self, bucket: &str) {
        self.unsignable
            .lock()
            .expect("unsignable lock poisoned")
            .insert(bucket.to_owned());
    }

    /// Number of URLs signed so far.
    pub fn signed_count(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryStore {
    fn presign_get(&self, location: &S3Location, expires_secs: u64) -> Result<String, RemoteError> {
        if self
            .unsignable
            .lock()
            .expect("unsignable lock poisoned")
            .contains(&location.bucket)
        {
            return Err(RemoteError::Signing {
                location: location.clone(),
                message: "access denied".to_owned(),
            });
        }
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "https://{}.mock.invalid/{}?X-Amz-Expires={expires_secs}&sig={seq}",
            location.bucket, location.key
        ))
    }

    fn download(&self, location: &S3Location, sink: &mut dyn Write) -> Result<u64, RemoteError> {
        let id = (location.bucket.clone(), location.key.clone());
        if let Some(&code) = self.failures.lock().expect("failures lock poisoned").get(&id) {
            return Err(RemoteError::Status {
                code,
                location: location.clone(),
            });
        }
        let objects = self.objects.lock().expect("objects lock poisoned");
        let data = objects.get(&id).ok_or_else(|| RemoteError::Status {
            code: 404,
            location: location.clone(),
        })?;
        sink.write_all(data)?;
        Ok(data.len() as u64)
    }
}
