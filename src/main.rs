use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectern::notify::{ConsoleNotifier, Notifier, SmtpNotifier};
use lectern::routes::create_router;
use lectern::store::{InMemoryStore, LectureStore, MeetingStore, SqliteStore, UserStore};
use lectern::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectern=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let notifier: Box<dyn Notifier> = match config.smtp.clone() {
        Some(smtp) => {
            tracing::info!("Using SMTP notifier");
            Box::new(SmtpNotifier::new(smtp).map_err(anyhow::Error::msg)?)
        }
        None => {
            tracing::info!("Using console notifier (set SMTP_* variables to send real email)");
            Box::new(ConsoleNotifier::new())
        }
    };

    match config.database_path.clone() {
        Some(path) => {
            tracing::info!(path = %path, "Using SQLite store");
            let store = SqliteStore::open(&path)?;
            serve(config, store, notifier).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, using in-memory store (data is lost on restart)");
            serve(config, InMemoryStore::new(), notifier).await
        }
    }
}

async fn serve<S>(config: Config, store: S, notifier: Box<dyn Notifier>) -> anyhow::Result<()>
where
    S: UserStore + LectureStore + MeetingStore + 'static,
{
    let state = Arc::new(AppState::new(&config, store, notifier));
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
