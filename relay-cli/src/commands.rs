//! CLI command implementations

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use relay_core::{
    AssetOptions, BufferedLoadingRequest, DataRequest, HeaderOverride, LoadOutcome,
    LogErrorReporter, RelayAsset, RelayConfig, TrustPolicy,
};
use tokio::fs;
use tracing::info;

/// Origin connection settings shared by every command
#[derive(Args, Debug)]
pub struct OriginArgs {
    /// Extra request header in "Name: value" form (repeatable)
    #[arg(long = "header", short = 'H', global = true, value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Accept any TLS certificate from the origin
    #[arg(long, global = true)]
    pub trust_all: bool,

    /// Whole-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Report content type, length and range support of a resource
    Probe {
        /// Origin URL
        url: String,
    },
    /// Fetch a byte window of a resource
    Fetch {
        /// Origin URL
        url: String,
        /// First byte to fetch
        #[arg(long, default_value = "0")]
        offset: u64,
        /// Number of bytes to fetch
        #[arg(long, required_unless_present = "to_end", conflicts_with = "to_end")]
        length: Option<u64>,
        /// Fetch everything from the offset to the end of the resource
        #[arg(long)]
        to_end: bool,
        /// Write bytes to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the relay failure of the command, with a user-facing message
pub async fn handle_command(command: Commands, origin: &OriginArgs) -> anyhow::Result<()> {
    let options = asset_options(origin)?;
    match command {
        Commands::Probe { url } => probe(&url, options).await,
        Commands::Fetch {
            url,
            offset,
            length,
            to_end,
            output,
        } => {
            let window = match length {
                Some(length) if !to_end => DataRequest::bounded(offset, length),
                _ => DataRequest::to_end(offset),
            };
            fetch(&url, window, output, options).await
        }
    }
}

/// Builds asset options from the environment and command-line overrides.
///
/// # Errors
/// - Malformed `--header` value
pub fn asset_options(origin: &OriginArgs) -> anyhow::Result<AssetOptions> {
    let mut config = RelayConfig::from_env();
    if origin.trust_all {
        config.transport.trust_policy = TrustPolicy::TrustAll;
    }
    if let Some(seconds) = origin.timeout {
        config.transport.request_timeout = Some(Duration::from_secs(seconds));
    }

    let mut headers = HeaderOverride::new();
    for line in &origin.headers {
        headers = headers.with_header_line(line)?;
    }

    let mut options = AssetOptions::new()
        .with_config(config)
        .with_error_reporter(Arc::new(LogErrorReporter));
    if !headers.is_empty() {
        options = options.with_request_override(Arc::new(headers));
    }
    Ok(options)
}

/// Runs one loading request through a fresh asset, as the engine would.
async fn relay(
    url: &str,
    options: AssetOptions,
    request: Arc<BufferedLoadingRequest>,
) -> anyhow::Result<Arc<BufferedLoadingRequest>> {
    let asset = Arc::new(RelayAsset::create(url, options)?);
    info!(engine_url = %asset.engine_url(), "Relaying through asset");

    let engine_request = Arc::clone(&request);
    let handled = tokio::task::spawn_blocking(move || asset.intercept(engine_request))
        .await
        .context("interception thread failed")?;
    if !handled {
        bail!("relay declined the loading request");
    }

    match request.outcome() {
        Some(LoadOutcome::Succeeded) => Ok(request),
        Some(LoadOutcome::Failed(error)) => {
            let message = error.user_message();
            Err(anyhow::Error::new(error).context(message))
        }
        None => bail!("loading request was never completed"),
    }
}

/// Probe a resource for content information
///
/// # Errors
/// - Origin unreachable or answered with a non-success status
pub async fn probe(url: &str, options: AssetOptions) -> anyhow::Result<()> {
    let request = relay(url, options, Arc::new(BufferedLoadingRequest::content_info())).await?;
    let info = request.filled_content_info().unwrap_or_default();

    println!("Content type:   {}", info.content_type.as_deref().unwrap_or("unknown"));
    println!("Content length: {}", info.content_length);
    println!(
        "Range access:   {}",
        if info.byte_range_access_supported {
            "supported"
        } else {
            "not supported"
        }
    );

    Ok(())
}

/// Fetch a byte window of a resource
///
/// # Errors
/// - Origin unreachable or answered with a non-success status
/// - Output could not be written
pub async fn fetch(
    url: &str,
    window: DataRequest,
    output: Option<PathBuf>,
    options: AssetOptions,
) -> anyhow::Result<()> {
    let request = relay(url, options, Arc::new(BufferedLoadingRequest::data(window))).await?;
    let bytes = request.delivered_bytes();

    match output {
        Some(path) => {
            fs::write(&path, &bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
