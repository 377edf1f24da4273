//! anchord: the anchor-day web server.
//!
//! Serves the browser flow and the JSON API from one axum router; see
//! `anchor_day::server` for the route list.
//!
//! Configuration comes from `$XDG_CONFIG_HOME/anchor-day/config.toml`, with
//! `ANCHOR_SERVER_BIND`, `ANCHOR_SERVER_PORT`, `ANCHOR_DATABASE` and
//! `ANCHOR_SESSION_SECRET` taking precedence. Configured seed packs are
//! applied on startup; applying is idempotent.
//!
//! Build and run: `cargo run --bin anchord`

use std::sync::Arc;

use miette::{IntoDiagnostic, Result};

use anchor_day::config::AppConfig;
use anchor_day::paths::AppPaths;
use anchor_day::planner::Planner;
use anchor_day::seeds::SeedRegistry;
use anchor_day::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let paths = AppPaths::resolve()?;
    paths.ensure_dirs()?;

    let mut config = AppConfig::load_or_default(&paths.config_file())?;
    config.apply_env()?;

    let planner = Planner::from_config(&config, &paths)?;
    let registry = SeedRegistry::discover(&paths.seeds_dir());
    for report in planner.apply_seeds(&registry, &config.seed_packs)? {
        if report.already_applied {
            tracing::debug!(seed = %report.id, "seed pack already applied");
        }
    }

    let state = Arc::new(AppState::new(planner));
    let app = server::router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .into_diagnostic()?;
    tracing::info!("anchord listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .into_diagnostic()?;
    Ok(())
}
