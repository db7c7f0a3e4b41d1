use std::{net::SocketAddr, sync::Arc};

use snippetbox::{
    app_state::AppState,
    auth::Credentials,
    cleanup::spawn_cleanup_job,
    config::{self, AppConfig},
    database::{self, initialize_database},
    logging::{init_logging, LoggingError},
    models::{SqliteSnippetStore, SqliteUserStore},
    server::build_router,
    sessions::session_layer,
};
use thiserror::Error;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;

#[derive(Debug, Error)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database initialization error: {0}")]
    DatabaseInit(#[from] database::DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging()?;
    info!("Starting Snippetbox");

    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    let db_pool = initialize_database(&config).await?;

    let session_store = SqliteStore::new(db_pool.clone());
    session_store.migrate().await?;

    let credentials = Arc::new(Credentials::new(config.security.bcrypt_cost));
    let state = AppState::new(
        Arc::new(SqliteSnippetStore::new(db_pool.clone())),
        Arc::new(SqliteUserStore::new(db_pool, credentials)),
        config.clone(),
    );

    spawn_cleanup_job(state.clone(), session_store.clone());

    let app = build_router(state, session_layer(session_store, &config));

    let addr = SocketAddr::new(config.server.bind_addr.parse()?, config.server.port);
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
