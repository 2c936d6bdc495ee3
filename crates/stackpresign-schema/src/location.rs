use std::fmt;

/// Name of the optional companion object describing a multi-part dataset.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// A `(bucket, key)` pair addressing one object in S3-compatible storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Split an `s3://<bucket>/<key>` URL.
    ///
    /// The bucket is everything up to the first `/` after the scheme; the key is
    /// the remainder and may be empty or contain further slashes.
    pub fn parse(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("s3://")?;
        let (bucket, key) = rest.split_once('/')?;
        Some(Self::new(bucket, key))
    }

    /// The key with any trailing `/` removed, used as the dataset root.
    pub fn dataset_root(&self) -> &str {
        self.key.trim_end_matches('/')
    }

    /// Location of the object `<dataset root>/<name>` in the same bucket.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self::new(self.bucket.clone(), format!("{}/{name}", self.dataset_root()))
    }

    /// Location of the companion manifest for this dataset root.
    #[must_use]
    pub fn manifest(&self) -> Self {
        self.child(MANIFEST_FILE_NAME)
    }

    /// Whether this key addresses a companion manifest.
    pub fn is_manifest(&self) -> bool {
        self.key.ends_with(&format!("/{MANIFEST_FILE_NAME}"))
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
