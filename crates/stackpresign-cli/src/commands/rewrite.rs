use super::{summary_json, Progress, EXIT_SUCCESS};
use stackpresign_core::{RewriteOutcome, Settings, StackRewriter};
use stackpresign_remote::{CredentialSource, S3Client};
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over the settings file and environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub expires_secs: Option<u64>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

/// Defaults, then the settings file, then the environment, then flags.
pub fn resolve_settings(
    overrides: &Overrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Settings, String> {
    let mut settings = match &overrides.config {
        Some(path) => Settings::load(path),
        None => Settings::load_default(),
    }
    .map_err(|e| e.to_string())?;

    settings.apply_env(lookup);
    if let Some(expires) = overrides.expires_secs {
        settings.rewrite.expires_secs = expires;
    }
    if let Some(region) = &overrides.region {
        settings.s3.region.clone_from(region);
    }
    if let Some(endpoint) = &overrides.endpoint {
        settings.s3 = settings.s3.with_endpoint(endpoint);
    }
    settings.validate().map_err(|e| e.to_string())?;
    Ok(settings)
}

pub fn run(
    input: &Path,
    output_dir: Option<&Path>,
    overrides: &Overrides,
    json: bool,
) -> Result<u8, String> {
    let settings = resolve_settings(overrides, |name| std::env::var(name).ok())?;
    let source = CredentialSource::from_env().map_err(|e| format!("config error: {e}"))?;
    tracing::info!("signing with {source}");
    let client =
        S3Client::new(settings.s3.clone(), &source).map_err(|e| format!("config error: {e}"))?;

    let rewriter = StackRewriter::new(&client, &settings.rewrite);
    let progress = Progress::start(!json, format!("signing {}", input.display()));
    let outcome = match rewriter.convert(input, output_dir) {
        Ok(outcome) => {
            progress.finish(true, "signing complete");
            outcome
        }
        Err(e) => {
            progress.finish(false, "signing failed");
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", summary_json(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(EXIT_SUCCESS)
}

fn print_summary(outcome: &RewriteOutcome) {
    let Some(stack) = &outcome.stack_path else {
        println!("no object storage variables found; nothing written");
        return;
    };
    println!(
        "wrote {} ({} variable(s): {})",
        stack.display(),
        outcome.variables_rewritten.len(),
        outcome.variables_rewritten.join(", ")
    );
    if let Some(urls) = &outcome.urls_path {
        println!("wrote {} ({} URL mapping(s))", urls.display(), outcome.url_entries);
    }
}
