//! HTTP prediction service.

use std::sync::Arc;

use anyhow::Context;
use propval::api;
use propval::common::config::AppCfg;
use propval::common::log::{self, log_event, Level};
use propval::common::ErrorCode;
use propval::inference::InferenceService;
use propval::training::FsModelRepo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppCfg::load().context("reading configuration")?;
    log::init(cfg.log_format);

    let service = Arc::new(InferenceService::load(&FsModelRepo::from_cfg(&cfg)));
    if !service.is_loaded() {
        tracing::warn!("serving without a model; /predict will fail until propval-train has run");
    }
    let app = api::router(service);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("propval v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);
    log_event(Level::Info, "api", "bind", ErrorCode::Ok, 0);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
