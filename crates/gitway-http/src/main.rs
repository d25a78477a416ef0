//! gitway - serves a directory of git repositories over HTTP.

use anyhow::Context;
use clap::Parser;
use gitway_http::config::Config;
use gitway_http::observability::{init_logging, request_id_layer, LogFormat};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Git smart and dumb HTTP server
#[derive(Parser, Debug)]
#[command(name = "gitway")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Directory holding the repositories (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Path of the git executable
    #[arg(long)]
    git_bin: Option<PathBuf>,

    /// Refuse fetch and clone
    #[arg(long)]
    no_upload_pack: bool,

    /// Refuse push
    #[arg(long)]
    no_receive_pack: bool,

    /// Do not serve the dumb protocol
    #[arg(long)]
    no_dumb_proto: bool,

    /// Serve `archive/<tree>.zip` and `archive/<tree>.tar` downloads
    #[arg(long)]
    archive: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(git_bin) = self.git_bin {
            config.git_bin = git_bin;
        }
        if self.no_upload_pack {
            config.upload_pack = false;
        }
        if self.no_receive_pack {
            config.receive_pack = false;
        }
        if self.no_dumb_proto {
            config.dumb_proto = false;
        }
        if self.archive {
            config.archive = true;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;

    init_logging(&config.log_level, config.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting gitway");

    let engine = config
        .build_engine()
        .context("failed to build git http engine")?;
    tracing::info!(
        listen = %config.listen,
        root = %engine.git().root().display(),
        git_bin = %config.git_bin.display(),
        upload_pack = config.upload_pack,
        receive_pack = config.receive_pack,
        dumb_proto = config.dumb_proto,
        archive = config.archive,
        "server configuration"
    );

    let app = engine.into_router().layer(request_id_layer());

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
