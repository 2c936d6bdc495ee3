//! Parsing of a shell environment dump (the output of `set`) into bindings.

use crate::S3Location;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// One `NAME=VALUE` line from a sourced shell environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvBinding {
    pub name: String,
    pub raw_value: String,
}

/// A binding whose value points at object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBinding {
    pub name: String,
    pub value: String,
    pub location: S3Location,
}

/// The resolved environment of a sourced stack file.
///
/// `raw` holds every assignment seen in the dump; `storage` holds only the
/// bindings whose value is an `s3://<bucket>/<key>` URL. A name seen twice
/// keeps its last value, as a shell would.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub raw: BTreeMap<String, String>,
    pub storage: BTreeMap<String, StorageBinding>,
}

impl EnvSnapshot {
    pub fn storage_binding(&self, name: &str) -> Option<&StorageBinding> {
        self.storage.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.storage.is_empty()
    }

    fn insert(&mut self, binding: EnvBinding, storage: Option<StorageBinding>) {
        match storage {
            Some(sb) => {
                self.storage.insert(binding.name.clone(), sb);
            }
            None => {
                self.storage.remove(&binding.name);
            }
        }
        self.raw.insert(binding.name, binding.raw_value);
    }
}

fn storage_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_]*)=(s3://([^/]*)/(.*))").expect("valid storage binding regex")
    })
}

fn assignment_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_]*)=(.*)").expect("valid assignment regex"))
}

/// Parse a line-oriented environment dump.
///
/// Lines that are not plain `NAME=VALUE` assignments (function bodies, shell
/// options) are skipped. Trailing whitespace on each line is ignored.
pub fn parse_env_dump(dump: &str) -> EnvSnapshot {
    let mut snapshot = EnvSnapshot::default();
    for line in dump.lines() {
        let line = line.trim_end();
        let Some(caps) = assignment_pattern().captures(line) else {
            continue;
        };
        let storage = storage_pattern()
            .captures(line)
            .map(|sc| StorageBinding {
                name: sc[1].to_owned(),
                value: sc[2].to_owned(),
                location: S3Location::new(&sc[3], &sc[4]),
            });
        snapshot.insert(
            EnvBinding {
                name: caps[1].to_owned(),
                raw_value: caps[2].to_owned(),
            },
            storage,
        );
    }
    snapshot
}
