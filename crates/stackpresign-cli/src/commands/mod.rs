pub mod rewrite;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_STORAGE_ERROR: u8 = 3;

/// Render a run summary for `--json`.
pub fn summary_json(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to encode summary: {e}"))
}

/// Spinner on stderr while a stack is signed. Disabled for `--json` runs so
/// stdout carries nothing but the summary.
pub struct Progress(Option<ProgressBar>);

impl Progress {
    pub fn start(enabled: bool, msg: String) -> Self {
        if !enabled {
            return Self(None);
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
                .expect("valid template"),
        );
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(100));
        Self(Some(pb))
    }

    /// Replace the spinner with a final status line.
    pub fn finish(self, ok: bool, msg: &str) {
        if let Some(pb) = self.0 {
            pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
            let mark = if ok { "done:" } else { "failed:" };
            pb.finish_with_message(format!("{mark} {msg}"));
        }
    }

    #[cfg(test)]
    fn is_visible(&self) -> bool {
        self.0.is_some()
    }
}

/// Strip trailing slashes; an empty argument means no output directory.
pub fn normalize_output_dir(arg: Option<&str>) -> Option<PathBuf> {
    let trimmed = arg?.trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
