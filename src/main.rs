//! `wt-api`: users and products over HTTP.
//!
//! Two listeners. The API on `WT_API_HOST`, probes on `WT_DEBUG_HOST`. The
//! process stops gracefully on SIGINT / SIGTERM or on the first fatal handler
//! error, and exits non-zero if the stop does not finish in time.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wt::api::{self, ApiMuxConfig};
use wt::config::{Config, LogFormat};
use wt::shutdown::{self, listen_for_os_signals};
use wt::store::{ProductStore, UserStore};
use wt::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::parse();
    init_tracing(cfg.log_format);

    if let Err(e) = run(cfg).await {
        error!(error = %format!("{e:#}"), "shutting down");
        return Err(e);
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wt=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    info!(build = %cfg.build, "starting service");
    info!(config = ?cfg, "startup");

    let (shutdown, mut listener) = shutdown::channel();
    listen_for_os_signals(shutdown.clone());

    // Debug listener. Not part of the graceful sequence: it stops once the
    // API has drained.
    let debug = api::debug_mux(&cfg.build).context("mounting debug routes")?;
    let debug_server = Server::bind(cfg.debug_host.as_str())
        .await
        .with_context(|| format!("binding debug listener on {}", cfg.debug_host))?;
    let debug_stop = CancellationToken::new();
    let debug_task = tokio::spawn(debug_server.serve(debug, debug_stop.clone().cancelled_owned()));

    let app = api::api_mux(ApiMuxConfig {
        shutdown,
        users: Arc::new(UserStore::new()),
        products: Arc::new(ProductStore::new()),
    })
    .context("mounting api routes")?;

    let api_server = Server::bind(cfg.api_host.as_str())
        .await
        .with_context(|| format!("binding api listener on {}", cfg.api_host))?
        .read_timeout(cfg.read_timeout)
        .shutdown_timeout(cfg.shutdown_timeout);

    let stop = async move {
        match listener.recv().await {
            Some(reason) => info!(%reason, "shutdown started"),
            None => warn!("shutdown channel closed"),
        }
    };

    let served = api_server.serve(app, stop).await;

    debug_stop.cancel();
    match debug_task.await {
        Ok(Err(e)) => warn!(error = %e, "debug listener stopped with error"),
        Err(e) => warn!(error = %e, "debug listener task failed"),
        Ok(Ok(())) => {}
    }

    served.context("could not stop server gracefully")?;
    info!("shutdown complete");
    Ok(())
}
