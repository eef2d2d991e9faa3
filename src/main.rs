use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod compat;
mod config;
mod identity;
mod model;
mod page;
mod routes;
mod service;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::Config::load(config_path.as_deref())?;
    let port = config::port_from_env()?;

    tracing::debug!(?config, "loaded config");

    let store = store::PageStore::open(
        &config.db.file,
        config.db.open_timeout(),
        config.db.busy_timeout(),
    )
    .await
    .with_context(|| format!("could not open {}", config.db.file.display()))?;

    let templates = routes::load_templates(&config.net.template_dir).with_context(|| {
        format!(
            "could not load templates from {}",
            config.net.template_dir.display()
        )
    })?;

    let state = routes::AppState::new(
        service::PageService::new(store),
        templates,
        config.net.base_url.clone(),
    );
    let app = routes::router(state, &config.net.static_dir).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not listen on {}", addr))?;

    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
