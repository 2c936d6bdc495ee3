use crate::CoreError;
use stackpresign_schema::{parse_env_dump, EnvSnapshot};
use std::path::Path;
use std::process::{Command, Stdio};

/// Sources the file given as `$1`, then dumps every variable.
const SOURCE_SCRIPT: &str = r#"source "$1" && set"#;

/// Resolves a stack file's environment by sourcing it in a real shell.
///
/// Assignments may rely on quoting, command substitution, or earlier
/// variables, so the file is executed rather than parsed, and the resulting
/// `set` dump is matched instead.
#[derive(Debug, Clone)]
pub struct EnvExtractor {
    shell: String,
}

impl Default for EnvExtractor {
    fn default() -> Self {
        Self::new("bash")
    }
}

impl EnvExtractor {
    pub fn new(shell: &str) -> Self {
        Self {
            shell: shell.to_owned(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Source `stack_file` and snapshot the resulting environment.
    ///
    /// A non-zero shell exit is not fatal: whatever reached stdout is parsed.
    /// Failing to start the shell at all is.
    pub fn extract(&self, stack_file: &Path) -> Result<EnvSnapshot, CoreError> {
        tracing::debug!("sourcing {} with {}", stack_file.display(), self.shell);
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(SOURCE_SCRIPT)
            .arg("stackpresign")
            .arg(stack_file)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| CoreError::ShellLaunch {
                shell: self.shell.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::warn!(
                "sourcing {} exited with {}; using {} bytes of captured output",
                stack_file.display(),
                output.status,
                output.stdout.len()
            );
        }

        let snapshot = parse_env_dump(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(
            "{} variables resolved, {} point at object storage",
            snapshot.raw.len(),
            snapshot.storage.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpresign_schema::S3Location;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with log output captured as text.
    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8_lossy(&capture.0.lock().unwrap()).into_owned();
        (result, logs)
    }

    fn write_stack(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("stack.sh");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn resolves_literal_assignments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stack(
            dir.path(),
            "DATA=s3://mybucket/datasets/v1\nLABEL=local_value\n",
        );
        let env = EnvExtractor::default().extract(&path).unwrap();
        assert_eq!(
            env.storage_binding("DATA").unwrap().location,
            S3Location::new("mybucket", "datasets/v1")
        );
        assert!(env.storage_binding("LABEL").is_none());
        assert_eq!(env.raw.get("LABEL").map(String::as_str), Some("local_value"));
    }

    #[test]
    fn resolves_expansions_and_command_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stack(
            dir.path(),
            "BUCKET=mybucket\n\
             VERSION=$(echo v2)\n\
             DATA=\"s3://${BUCKET}/datasets/${VERSION}\"\n\
             if true; then MODEL=s3://models/iot.pkl; fi\n",
        );
        let env = EnvExtractor::default().extract(&path).unwrap();
        assert_eq!(
            env.storage_binding("DATA").unwrap().value,
            "s3://mybucket/datasets/v2"
        );
        assert_eq!(
            env.storage_binding("MODEL").unwrap().location,
            S3Location::new("models", "iot.pkl")
        );
    }

    #[test]
    fn reassignment_keeps_last_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stack(dir.path(), "X=s3://a/one\nX=s3://b/two\n");
        let env = EnvExtractor::default().extract(&path).unwrap();
        assert_eq!(
            env.storage_binding("X").unwrap().location,
            S3Location::new("b", "two")
        );
    }

    #[test]
    fn failing_script_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stack(dir.path(), "DATA=s3://b/k\nfalse\n");
        // `source` returns the status of the last command, so `set` never runs.
        let env = EnvExtractor::default().extract(&path).unwrap();
        assert!(env.storage.is_empty());
    }

    #[test]
    fn output_before_failing_exit_is_kept_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stack(dir.path(), "echo DATA=s3://b/k\nexit 3\n");
        let (result, logs) = with_captured_logs(|| EnvExtractor::default().extract(&path));

        let env = result.unwrap();
        assert_eq!(
            env.storage_binding("DATA").unwrap().location,
            S3Location::new("b", "k")
        );
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("exited with"), "{logs}");
    }

    #[test]
    fn missing_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvExtractor::default()
            .extract(&dir.path().join("absent.sh"))
            .unwrap();
        assert!(env.is_empty());
    }

    #[test]
    fn missing_shell_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stack(dir.path(), "A=1\n");
        let err = EnvExtractor::new("/nonexistent/shell-binary")
            .extract(&path)
            .unwrap_err();
        assert!(matches!(err, CoreError::ShellLaunch { .. }));
        assert!(err.to_string().contains("/nonexistent/shell-binary"));
    }
}
