//! CLI subprocess integration tests.
//!
//! These tests invoke the `presign-urls` binary against a local mock S3
//! endpoint and verify exit codes, output files, and JSON output.

use stackpresign_remote::testing::MockS3;
use std::path::{Path, PathBuf};
use std::process::Command;

const MANIFEST: &[u8] = br#"{"parcels":[{"parcelName":"part-0"},{"parcelName":"part-1"}]}"#;

fn presign_bin(home: &Path, endpoint: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_presign-urls"));
    cmd.env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("HOME", home)
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env("TF_VAR_aws_access_key_id", "AKIDEXAMPLE")
        .env("TF_VAR_aws_secret_access_key", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .env("STACKPRESIGN_S3_ENDPOINT", endpoint);
    cmd
}

fn write_stack(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("stack.sh");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = presign_bin(home.path(), "http://127.0.0.1:1")
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("presign-urls"), "{stdout}");
}

#[test]
fn cli_help_lists_flags() {
    let home = tempfile::tempdir().unwrap();
    let output = presign_bin(home.path(), "http://127.0.0.1:1")
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--expires"));
    assert!(stdout.contains("--endpoint"));
}

#[test]
fn cli_no_storage_variables_is_clean_noop() {
    let s3 = MockS3::start();
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(work.path(), "LABEL=local_value\nCOUNT=3\n");

    let output = presign_bin(home.path(), &s3.endpoint)
        .arg(&input)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(!work.path().join("stack.sh.signed").exists());
    assert!(!work.path().join("stack.sh.urls").exists());
    assert!(s3.requests().is_empty());
}

#[test]
fn cli_signs_variables_and_expands_manifest() {
    let s3 = MockS3::start();
    s3.put_object("mybucket", "datasets/v1/manifest.json", MANIFEST);
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(
        work.path(),
        "BUCKET=mybucket\nDATA=\"s3://${BUCKET}/datasets/v1\"\nLABEL=local_value\n",
    );

    let output = presign_bin(home.path(), &s3.endpoint)
        .arg(&input)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let signed = std::fs::read_to_string(work.path().join("stack.sh.signed")).unwrap();
    let lines: Vec<_> = signed.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "BUCKET=mybucket");
    let prefix = format!("DATA=\"{}/mybucket/datasets/v1?", s3.endpoint);
    assert!(lines[1].starts_with(&prefix), "{}", lines[1]);
    assert!(lines[1].contains("X-Amz-Expires=7200"));
    assert!(lines[1].contains("X-Amz-Signature="));
    assert_eq!(lines[2], "LABEL=local_value");

    let urls = std::fs::read_to_string(work.path().join("stack.sh.urls")).unwrap();
    let entries: Vec<_> = urls.lines().collect();
    assert_eq!(entries.len(), 3);
    let top = lines[1]
        .trim_start_matches("DATA=\"")
        .trim_end_matches('"');
    for (entry, name) in entries.iter().zip(["manifest.json", "part-0", "part-1"]) {
        let (orig, signed) = entry.split_once("-->").unwrap();
        assert_eq!(orig, format!("{top}/{name}"));
        assert!(
            signed.starts_with(&format!("{}/mybucket/datasets/v1/{name}?", s3.endpoint)),
            "{signed}"
        );
    }
}

#[test]
fn cli_output_dir_with_trailing_slash() {
    let s3 = MockS3::start();
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(work.path(), "DATA=s3://mybucket/datasets/v1\n");
    let out = work.path().join("out");

    let output = presign_bin(home.path(), &s3.endpoint)
        .arg(&input)
        .arg(format!("{}/", out.display()))
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out.join("stack.sh.signed").exists());
    assert!(!out.join("stack.sh.urls").exists());
    assert!(!work.path().join("stack.sh.signed").exists());
}

#[test]
fn cli_json_summary() {
    let s3 = MockS3::start();
    s3.put_object("mybucket", "datasets/v1/manifest.json", MANIFEST);
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(work.path(), "DATA=s3://mybucket/datasets/v1\n");

    let output = presign_bin(home.path(), &s3.endpoint)
        .arg(&input)
        .arg("--json")
        .arg("--expires")
        .arg("600")
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["variables_rewritten"], serde_json::json!(["DATA"]));
    assert_eq!(summary["url_entries"], 3);

    let signed = std::fs::read_to_string(work.path().join("stack.sh.signed")).unwrap();
    assert!(signed.contains("X-Amz-Expires=600"));
}

#[test]
fn cli_provider_error_exits_with_storage_code() {
    let s3 = MockS3::start();
    s3.respond_with("mybucket", "datasets/v1/manifest.json", 500);
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(work.path(), "DATA=s3://mybucket/datasets/v1\n");

    let output = presign_bin(home.path(), &s3.endpoint)
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("storage error:"), "{stderr}");
    assert!(!work.path().join("stack.sh.signed").exists());
}

#[test]
fn cli_profile_from_shared_config_file() {
    let s3 = MockS3::start();
    let home = tempfile::tempdir().unwrap();
    let aws_dir = home.path().join(".aws");
    std::fs::create_dir(&aws_dir).unwrap();
    std::fs::write(
        aws_dir.join("config"),
        "[profile workshop]\n\
         aws_access_key_id = AKIDWORKSHOP\n\
         aws_secret_access_key = workshopsecret\n",
    )
    .unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(work.path(), "DATA=s3://mybucket/datasets/v1\n");

    let output = presign_bin(home.path(), &s3.endpoint)
        .env_remove("TF_VAR_aws_access_key_id")
        .env_remove("TF_VAR_aws_secret_access_key")
        .env("TF_VAR_aws_profile", "workshop")
        .arg(&input)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let signed = std::fs::read_to_string(work.path().join("stack.sh.signed")).unwrap();
    assert!(signed.contains("X-Amz-Credential=AKIDWORKSHOP%2F"), "{signed}");
}

#[test]
fn cli_unknown_profile_exits_with_config_code() {
    let home = tempfile::tempdir().unwrap();
    let aws_dir = home.path().join(".aws");
    std::fs::create_dir(&aws_dir).unwrap();
    std::fs::write(aws_dir.join("config"), "[profile other]\nregion = us-east-1\n").unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(work.path(), "DATA=s3://mybucket/datasets/v1\n");

    let output = presign_bin(home.path(), "http://127.0.0.1:1")
        .env("TF_VAR_aws_profile", "workshop")
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("profile 'workshop'"), "{stderr}");
}

#[test]
fn cli_missing_credentials_exits_with_config_code() {
    let home = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let input = write_stack(work.path(), "DATA=s3://mybucket/datasets/v1\n");

    let output = presign_bin(home.path(), "http://127.0.0.1:1")
        .env_remove("TF_VAR_aws_access_key_id")
        .env_remove("TF_VAR_aws_secret_access_key")
        .arg(&input)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config error:"), "{stderr}");
}
