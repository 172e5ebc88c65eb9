mod cmd_run;
mod cmd_testgen;
mod cmd_upload;
mod config_store;

use clap::{Parser, Subcommand};
use config_store::{ConfigOverrides, ConfigStore, resolve_config};
use coval_core::CovalConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "coval",
    version,
    about = "Launch evaluation runs and submit conversations to Coval"
)]
struct Cli {
    /// JSON config file (api_key, base_url, request_timeout_secs, ...)
    #[arg(long, global = true, env = "COVAL_CONFIG")]
    config: Option<PathBuf>,
    /// Coval API key
    #[arg(long, global = true, env = "COVAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Coval API base URL
    #[arg(long, global = true, env = "COVAL_BASE_URL")]
    base_url: Option<String>,
    /// Log request details
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Launch a simulation run and follow it to completion
    LaunchRun(cmd_run::LaunchRunArgs),
    /// Submit a conversation whose audio sits behind a signed URL (S3, GCS, CDN, ...)
    UploadUrl(cmd_upload::UploadUrlArgs),
    /// Submit a Vapi call with its transcript and recording
    UploadVapi(cmd_upload::UploadVapiArgs),
    /// Submit a Twilio call with its recording metadata
    UploadTwilio(cmd_upload::UploadTwilioArgs),
    /// Generate test cases with an OpenAI-compatible model and upload them as a test set
    GenerateTestSet(cmd_testgen::GenerateTestSetArgs),
}

fn init_logger(verbose: bool) -> Result<(), fern::InitError> {
    let format =
        |out: fern::FormatCallback<'_>, message: &std::fmt::Arguments<'_>, record: &log::Record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d"),
                chrono::Local::now().format("%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        };

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(format)
        .level(log::LevelFilter::Warn)
        .level_for("coval_core", level)
        .level_for("coval_providers", level)
        .level_for("coval_engine", level)
        .level_for("coval", level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<CovalConfig> {
    let store = cli.config.as_ref().map(ConfigStore::at_path);
    resolve_config(
        store.as_ref(),
        ConfigOverrides {
            api_key: cli.api_key.clone(),
            base_url: cli.base_url.clone(),
        },
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose)?;

    let cfg = load_config(&cli)?;

    match cli.cmd {
        Command::LaunchRun(args) => cmd_run::execute(&cfg, args).await,
        Command::UploadUrl(args) => cmd_upload::upload_url(&cfg, args).await,
        Command::UploadVapi(args) => cmd_upload::upload_vapi(&cfg, args).await,
        Command::UploadTwilio(args) => cmd_upload::upload_twilio(&cfg, args).await,
        Command::GenerateTestSet(args) => cmd_testgen::execute(&cfg, args).await,
    }
}
