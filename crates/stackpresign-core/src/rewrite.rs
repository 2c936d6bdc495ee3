use crate::{expand_manifest, CoreError, EnvExtractor, RewriteOptions};
use serde::Serialize;
use stackpresign_remote::ObjectStore;
use stackpresign_schema::{EnvSnapshot, UrlMap};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

/// Suffix of the rewritten stack file.
pub const SIGNED_SUFFIX: &str = ".signed";
/// Suffix of the URL map file.
pub const URLS_SUFFIX: &str = ".urls";

/// Where the two outputs for one input file go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub stack: PathBuf,
    pub urls: PathBuf,
}

impl OutputPaths {
    /// `<input>.signed` / `<input>.urls`, or the same file names under `output_dir`.
    pub fn for_input(input: &Path, output_dir: Option<&Path>) -> Self {
        let with_suffix = |suffix: &str| {
            let mut name = OsString::from(input.as_os_str());
            name.push(suffix);
            let path = PathBuf::from(name);
            match (output_dir, path.file_name()) {
                (Some(dir), Some(file_name)) => dir.join(file_name),
                _ => path,
            }
        };
        Self {
            stack: with_suffix(SIGNED_SUFFIX),
            urls: with_suffix(URLS_SUFFIX),
        }
    }
}

/// The in-memory outcome of rewriting one stack file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteResult {
    pub rewritten_lines: Vec<String>,
    pub url_map: UrlMap,
    pub any_rewrite_performed: bool,
    /// Names of the variables replaced, in file order.
    pub rewritten_vars: Vec<String>,
}

impl RewriteResult {
    /// The rewritten stack file, every line newline-terminated.
    pub fn render_stack(&self) -> String {
        let mut out = String::new();
        for line in &self.rewritten_lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// What was committed to disk for one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    pub stack_path: Option<PathBuf>,
    pub urls_path: Option<PathBuf>,
    pub variables_rewritten: Vec<String>,
    pub url_entries: usize,
}

/// Replace every storage-pointing assignment in `input` with a signed URL.
///
/// A line is an assignment when it contains `=`; the text before the first
/// `=` is the variable name. Lines whose name is not a storage binding in
/// `env` are kept verbatim.
pub fn rewrite_stack(
    store: &dyn ObjectStore,
    env: &EnvSnapshot,
    input: &str,
    expires_secs: u64,
) -> Result<RewriteResult, CoreError> {
    let mut result = RewriteResult::default();
    for line in input.lines() {
        let binding = line
            .split_once('=')
            .and_then(|(name, _)| env.storage_binding(name));
        let Some(binding) = binding else {
            result.rewritten_lines.push(line.to_owned());
            continue;
        };

        let signed_url = store.presign_get(&binding.location, expires_secs)?;
        tracing::debug!("{} -> signed {}", binding.name, binding.location);
        result
            .rewritten_lines
            .push(format!("{}=\"{signed_url}\"", binding.name));
        result.rewritten_vars.push(binding.name.clone());
        result.any_rewrite_performed = true;

        let entries = expand_manifest(store, &binding.location, &signed_url, expires_secs)?;
        result.url_map.extend(entries);
    }
    Ok(result)
}

/// Drives the pipeline for one stack file at a time.
pub struct StackRewriter<'a> {
    store: &'a dyn ObjectStore,
    extractor: EnvExtractor,
    expires_secs: u64,
}

impl<'a> StackRewriter<'a> {
    pub fn new(store: &'a dyn ObjectStore, options: &RewriteOptions) -> Self {
        Self {
            store,
            extractor: EnvExtractor::new(&options.shell),
            expires_secs: options.expires_secs,
        }
    }

    /// Rewrite `input` and commit its outputs.
    ///
    /// Nothing is written until every URL has been signed. A run that rewrites
    /// nothing removes stale outputs from earlier runs and leaves none behind.
    pub fn convert(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
    ) -> Result<RewriteOutcome, CoreError> {
        let paths = OutputPaths::for_input(input, output_dir);
        if let Some(dir) = output_dir {
            fs::create_dir_all(dir).map_err(|source| CoreError::WriteOutput {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let env = self.extractor.extract(input)?;
        let text = fs::read_to_string(input).map_err(|source| CoreError::ReadStack {
            path: input.to_path_buf(),
            source,
        })?;
        let result = rewrite_stack(self.store, &env, &text, self.expires_secs)?;
        commit(&result, &paths)
    }
}

fn commit(result: &RewriteResult, paths: &OutputPaths) -> Result<RewriteOutcome, CoreError> {
    if !result.any_rewrite_performed {
        remove_stale(&paths.stack);
        remove_stale(&paths.urls);
        tracing::info!("no object storage variables; nothing written");
        return Ok(RewriteOutcome::default());
    }

    // Stage both files before renaming either into place.
    let stack_tmp = stage(&paths.stack, &result.render_stack())?;
    let urls_tmp = if result.url_map.is_empty() {
        None
    } else {
        Some(stage(&paths.urls, &result.url_map.render())?)
    };

    persist(stack_tmp, &paths.stack)?;
    tracing::info!(
        "wrote {} ({} variable(s) signed)",
        paths.stack.display(),
        result.rewritten_vars.len()
    );

    let urls_path = match urls_tmp {
        Some(tmp) => {
            persist(tmp, &paths.urls)?;
            tracing::info!(
                "wrote {} ({} URL mapping(s))",
                paths.urls.display(),
                result.url_map.len()
            );
            Some(paths.urls.clone())
        }
        None => {
            remove_stale(&paths.urls);
            None
        }
    };

    Ok(RewriteOutcome {
        stack_path: Some(paths.stack.clone()),
        urls_path,
        variables_rewritten: result.rewritten_vars.clone(),
        url_entries: result.url_map.len(),
    })
}

/// Write `content` next to `dest`. The file gets the mode a plain create would
/// (0666 less the umask), or the mode of the file it is about to replace.
fn stage(dest: &Path, content: &str) -> Result<NamedTempFile, CoreError> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let to_err = |source| CoreError::WriteOutput {
        path: dest.to_path_buf(),
        source,
    };
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(to_err)?;
    if let Ok(existing) = fs::metadata(dest) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(to_err)?;
    }
    tmp.write_all(content.as_bytes()).map_err(to_err)?;
    tmp.as_file().sync_all().map_err(to_err)?;
    Ok(tmp)
}

fn persist(tmp: NamedTempFile, dest: &Path) -> Result<(), CoreError> {
    tmp.persist(dest).map_err(|e| CoreError::WriteOutput {
        path: dest.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

fn remove_stale(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed stale {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to remove stale {}: {e}", path.display()),
    }
}
