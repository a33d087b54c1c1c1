//! Upload a generated streaming dataset and verify it.
//!
//! Usage: upload-streams [--config gen.toml] [--file data.csv] [--bucket name]
//!
//! Credentials are read from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY.
//! `--local-dir` targets a directory instead of S3.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use streamsynth::config::GeneratorConfig;
use streamsynth::remote::{upload_and_verify, LocalDirStore, RemoteStore, S3Store};
use streamsynth::Error;

#[derive(Parser)]
#[command(name = "upload-streams")]
#[command(about = "Upload a generated streaming dataset to S3 and verify it")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset to upload (defaults to the configured output path)
    #[arg(long)]
    file: Option<PathBuf>,

    #[arg(long)]
    bucket: Option<String>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    region: Option<String>,

    /// S3-compatible endpoint (MinIO, LocalStack, ...)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Copy into a local directory instead of S3
    #[arg(long)]
    local_dir: Option<PathBuf>,
}

/// Operator hint for each failure category.
fn hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::RemoteConfig(_) => {
            Some("Check AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and the remote bucket setting")
        }
        Error::DataSource { .. } => Some("Run generate-streams first to create the dataset"),
        Error::RemoteConnectivity(_) => {
            Some("Could not connect to the object store. Check your network connection")
        }
        _ => None,
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    streamsynth::init_logging();

    let mut config = GeneratorConfig::resolve(args.config.as_deref())?;
    if let Some(bucket) = args.bucket {
        config.remote.bucket = bucket;
    }
    if let Some(prefix) = args.prefix {
        config.remote.prefix = prefix;
    }
    if let Some(region) = args.region {
        config.remote.region = region;
    }
    if args.endpoint_url.is_some() {
        config.remote.endpoint_url = args.endpoint_url;
    }
    let file = args.file.unwrap_or_else(|| config.output.path.clone());

    tracing::info!("=== Starting Upload ===");
    let result = match &args.local_dir {
        Some(dir) => upload(&LocalDirStore::new(dir), &file, &config.remote.prefix),
        None => S3Store::from_settings(&config.remote)
            .and_then(|store| upload(&store, &file, &config.remote.prefix)),
    };

    match result {
        Ok(()) => {
            tracing::info!("=== Upload Complete ===");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Upload failed [{}]: {}", e.kind(), e);
            if let Some(hint) = hint(&e) {
                tracing::error!("{}", hint);
            }
            std::process::exit(1);
        }
    }
}

fn upload(store: &dyn RemoteStore, file: &std::path::Path, prefix: &str) -> streamsynth::Result<()> {
    let (locator, _) = upload_and_verify(store, file, prefix)?;
    tracing::info!("Object URI: {}", locator);
    Ok(())
}
