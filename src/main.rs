use flasky::{
    config::{
        session::{validate_production_config, SessionConfig},
        AppConfig,
    },
    db, router, services, AppState,
};

use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flasky=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting Flasky with {:?} configuration", config.environment);

    if config.environment.is_production() {
        validate_production_config(&config)?;
    }

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let email_service = services::create_email_service(&config);
    let session_config = SessionConfig::for_environment(config.environment);
    let secret_key = config.secret_key.clone();
    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));

    let app_state = AppState::new(pool.clone(), config, email_service);

    let roles = app_state.user_service.insert_roles().await?;
    tracing::info!("Ensured {} roles exist", roles.len());

    // Session store
    let session_store = SqliteStore::new(pool.clone())
        .with_table_name("sessions")
        .map_err(anyhow::Error::msg)?;
    session_store.migrate().await?;
    let session_layer = session_config.create_layer(session_store, &secret_key);

    let app = router::build_router(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
