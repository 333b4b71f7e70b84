use std::net::SocketAddr;
use std::sync::Arc;

use login_governor::app::{AppState, build_router};
use login_governor::auth::governor::LoginAttemptGovernor;
use login_governor::auth::jwt::JwtManager;
use login_governor::auth::services::AuthService;
use login_governor::clock::{Clock, SystemClock};
use login_governor::config::Config;
use login_governor::store::MemoryStore;
use login_governor::users::{InMemoryUserDirectory, UserDirectory};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Si RUST_LOG n'est pas défini, utiliser ces règles par défaut
        tracing_subscriber::EnvFilter::new(
            "info,login_governor=debug,security=info,hyper_util=warn,tower_http=info",
        )
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_users(config: &Config) -> anyhow::Result<Arc<dyn UserDirectory>> {
    match &config.users_file {
        Some(path) => {
            let directory = InMemoryUserDirectory::from_json_file(path)?;
            if directory.is_empty() {
                tracing::warn!(path = %path.display(), "Users file has no accounts, every login will fail");
            }
            Ok(Arc::new(directory))
        }
        None => {
            tracing::warn!("USERS_FILE not set, every login will fail (DEVELOPMENT ONLY!)");
            Ok(Arc::new(InMemoryUserDirectory::default()))
        }
    }
}

/// Drops expired attempt records on a fixed interval.
fn spawn_purge_task(store: Arc<MemoryStore>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            store.purge_expired();
        }
    });
}

// ----------------- Main -----------------

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    setup_logging();
    tracing::info!("Starting login-governor...");

    let config = Config::from_env()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(clock.clone()));
    spawn_purge_task(store.clone(), config.store_purge_interval);

    let governor = LoginAttemptGovernor::new(store, clock, config.lockout);
    let jwt_manager = JwtManager::new(&config.jwt_secret, config.jwt_expiration_hours);
    let auth_service = AuthService::new(
        governor,
        load_users(&config)?,
        jwt_manager.clone(),
        config.store_failure_policy,
    );

    let app = build_router(AppState {
        auth_service: Arc::new(auth_service),
        jwt_manager,
        trust_forwarded_for: config.trust_forwarded_for,
    });

    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        tracing::info!("Running in Lambda mode");
        lambda_http::run(app).await
    } else {
        tracing::info!("Running in local HTTP server mode");
        let addr = format!("{}:{}", config.server_host, config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("🚀 Server running at http://{}", addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}
