use std::fmt::Write as _;

/// Separator between the original and signed URL on each map line.
pub const URL_MAP_SEPARATOR: &str = "-->";

/// One original URL and the signed URL that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteEntry {
    pub original_url: String,
    pub signed_url: String,
}

/// Insertion-ordered map of original URL to signed URL.
///
/// Re-inserting an original URL replaces its signed URL but keeps the
/// position of the first insertion. Lookups are linear; a stack file holds
/// tens of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlMap {
    entries: Vec<RewriteEntry>,
}

impl UrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, original_url: impl Into<String>, signed_url: impl Into<String>) {
        let original_url = original_url.into();
        let signed_url = signed_url.into();
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.original_url == original_url)
        {
            existing.signed_url = signed_url;
        } else {
            self.entries.push(RewriteEntry {
                original_url,
                signed_url,
            });
        }
    }

    pub fn get(&self, original_url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.original_url == original_url)
            .map(|e| e.signed_url.as_str())
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = RewriteEntry>) {
        for entry in entries {
            self.insert(entry.original_url, entry.signed_url);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RewriteEntry> {
        self.entries.iter()
    }

    /// Render as `original-->signed` lines, each newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "{}{URL_MAP_SEPARATOR}{}",
                entry.original_url, entry.signed_url
            );
        }
        out
    }
}

impl<'a> IntoIterator for &'a UrlMap {
    type Item = &'a RewriteEntry;
    type IntoIter = std::slice::Iter<'a, RewriteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
