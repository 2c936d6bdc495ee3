mod commands;

use clap::Parser;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_STORAGE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "presign-urls",
    version,
    about = "Rewrite a stack file so its S3 locations become time-limited signed URLs"
)]
struct Cli {
    /// Stack file to rewrite.
    input: PathBuf,

    /// Directory for the outputs (default: next to the input).
    output_dir: Option<String>,

    /// Settings file (default: ~/.config/stackpresign/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lifetime of the signed URLs, in seconds.
    #[arg(long)]
    expires: Option<u64>,

    /// S3 region used for signing.
    #[arg(long)]
    region: Option<String>,

    /// S3-compatible endpoint URL (switches to path-style addressing).
    #[arg(long)]
    endpoint: Option<String>,

    /// Print the run summary as structured JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STACKPRESIGN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let overrides = commands::rewrite::Overrides {
        config: cli.config,
        expires_secs: cli.expires,
        region: cli.region,
        endpoint: cli.endpoint,
    };
    let output_dir = commands::normalize_output_dir(cli.output_dir.as_deref());
    let result = commands::rewrite::run(&cli.input, output_dir.as_deref(), &overrides, cli.json);

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("config error:") {
        EXIT_CONFIG_ERROR
    } else if msg.starts_with("storage error:") {
        EXIT_STORAGE_ERROR
    } else {
        EXIT_FAILURE
    }
}
