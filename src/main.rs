use event_ticketing::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    tokens::TokenRegistry,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads the configuration, initializes logging, connects and migrates the
/// database, seeds the token registry and serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "event_ticketing=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Token registry. Lives in memory only: a restart invalidates every issued token.
    let tokens = match &config.token_seed_file {
        Some(path) => TokenRegistry::from_seed_file(path)
            .expect("FATAL: Failed to read TOKEN_SEED_FILE."),
        None => TokenRegistry::new(),
    };

    let bind_address = config.bind_address.clone();
    let app_state = AppState {
        repo,
        tokens,
        config,
    };

    // 5. Router and server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDRESS.");

    tracing::info!("Listening on {}", bind_address);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_address);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
