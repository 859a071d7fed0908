use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server::config::ServerConfig;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let database_url = config.database_url.clone();

    let mut state = AppState::new(config);

    // The session store is optional: runs degrade gracefully without it.
    match db::create_pool(&database_url).await {
        Ok(pool) => match db::run_migrations(&pool).await {
            Ok(()) => {
                tracing::info!(database_url = %database_url, "Session store ready");
                state = state.with_repositories(pool);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Migrations failed; continuing without session store");
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database unavailable; continuing without session store");
        }
    }

    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
