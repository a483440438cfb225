use collabmarket::db::{self, AppState};
use collabmarket::notify::Notifier;
use collabmarket::{Config, handlers};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collabmarket=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    if config.dev_mode {
        tracing::warn!("running in dev mode");
    }

    let pool = db::create_pool(&config.database_path)?;
    tracing::info!(path = %config.database_path, "database ready");

    let state = AppState {
        db: pool,
        notifier: Notifier::new(config.notify_webhook_url.clone()),
    };

    let app = handlers::app(state);
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!(addr = %config.addr(), "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
