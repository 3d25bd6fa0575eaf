use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mindwell_backend::app::create_router;
use mindwell_backend::app_state::AppState;
use mindwell_backend::config;
use mindwell_backend::db::{self, AvailabilityStore, MemoryStore, PgStore, SessionStore};
use mindwell_backend::modules::availability::service::AvailabilityService;
use mindwell_backend::modules::sessions::service::SessionService;
use mindwell_backend::notifications::BroadcastNotifier;
use mindwell_backend::reminders::ReminderSweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv().ok();

    let config = config::init()?;

    let (availability_store, session_store): (Arc<dyn AvailabilityStore>, Arc<dyn SessionStore>) =
        match &config.database.url {
            Some(url) => {
                let pool = db::init_pool(&config.database, url).await?;
                let store = Arc::new(PgStore::new(pool));
                (store.clone(), store)
            }
            None => {
                warn!("DATABASE_URL not set, using the in-memory store");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let (notify_tx, _) = broadcast::channel(256);
    let notifier = Arc::new(BroadcastNotifier::new(notify_tx.clone()));

    let sessions = Arc::new(SessionService::new(
        session_store.clone(),
        availability_store.clone(),
        notifier.clone(),
    ));
    let availability = Arc::new(AvailabilityService::new(availability_store));
    let sweeper = Arc::new(ReminderSweeper::new(
        session_store,
        notifier,
        config.reminder.clone(),
    ));
    sweeper.clone().spawn();

    let state = AppState::new(availability, sessions, sweeper, notify_tx);
    let app = create_router(state);

    let addr = config.server_addr();
    info!("{} listening on {}", env!("CARGO_PKG_NAME"), addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to serve application")?;

    Ok(())
}
