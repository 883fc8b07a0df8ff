use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use matchday_backend::config::settings::{get_config, get_jwt_settings};
use matchday_backend::run;
use matchday_backend::services::telemetry::{get_subscriber, init_subscriber};
use matchday_backend::services::LiveMatchService;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    let subscriber = get_subscriber(
        "matchday-backend".into(),
        config.application.log_level.clone(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    let jwt_settings = get_jwt_settings(&config);

    // Redis is fan-out only; the service degrades to polling without it.
    let redis_client = match &config.application.redis_url {
        Some(redis_url) => match redis::Client::open(redis_url.expose_secret()) {
            Ok(client) => {
                tracing::info!("Redis client created successfully");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to create Redis client: {}. Live match broadcasts are disabled.",
                    e
                );
                None
            }
        },
        None => {
            tracing::warn!("No Redis URL configured. Live match broadcasts are disabled.");
            None
        }
    };

    // Only try to establish connection when actually used
    let connection_pool = PgPoolOptions::new()
        .max_connections(32)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_lazy(config.database.connection_string().expose_secret())
        .expect("Failed to create Postgres connection pool");

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;

    let (live_match_service, signal_rx) = LiveMatchService::new(
        connection_pool.clone(),
        redis_client.clone(),
        config.match_play,
    );
    live_match_service.spawn_signal_listener(signal_rx);

    // Pick clocks back up for matches that were live when the process died.
    match live_match_service.resume_live_matches().await {
        Ok(count) => tracing::info!("Startup resume sweep restarted {} clock(s)", count),
        Err(e) => tracing::error!("Startup resume sweep failed: {}", e),
    }

    run(
        listener,
        connection_pool,
        jwt_settings,
        redis_client,
        live_match_service,
    )?
    .await
}
