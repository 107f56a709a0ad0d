//! # Dealflow API Server
//!
//! Multi-tenant CRM backend: organizations, role-based membership,
//! contacts, deals, tasks, an activity log, and deal analytics, behind a
//! JWT-authenticated REST API.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p dealflow-api
//! ```

use std::sync::Arc;

use dealflow_api::{
    app::{build_router, AppState},
    config::Config,
};
use dealflow_shared::{db, store::PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dealflow_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Dealflow API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database.url, config.database.max_connections).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database ready, migrations applied");

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool)), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
