use std::sync::Arc;

use aiboom_shared::clients::db::create_pool;
use aiboom_shared::clients::rabbitmq::RabbitMQClient;

use aiboom_moderation::config::{AppConfig, StoreBackend};
use aiboom_moderation::events::{subscriber, EventPublisher};
use aiboom_moderation::store::{MemoryStore, PgStore, SharedStore};
use aiboom_moderation::submission::{AiClassifier, HttpClassifier, UnconfiguredClassifier};
use aiboom_moderation::{build_router, scheduler, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    aiboom_shared::middleware::init_tracing("aiboom-moderation");

    let config = AppConfig::load()?;
    let port = config.port;

    // The shared auth extractor reads the secret from the environment.
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let metrics_handle = match aiboom_shared::middleware::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed");
            None
        }
    };

    let store: SharedStore = match config.store {
        StoreBackend::Postgres => Arc::new(PgStore::new(create_pool(&config.database_url, 10)?)),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let publisher = match RabbitMQClient::connect(&config.rabbitmq_url).await {
        Ok(rabbitmq) => EventPublisher::new(rabbitmq),
        Err(e) if config.store == StoreBackend::Memory => {
            tracing::warn!(error = %e, "RabbitMQ unavailable, events disabled");
            EventPublisher::disabled()
        }
        Err(e) => return Err(e.into()),
    };

    let classifier: Arc<dyn AiClassifier> = match &config.classifier_url {
        Some(url) => Arc::new(HttpClassifier::new(
            url.clone(),
            config.classifier_api_key.clone(),
            config.classifier_timeout(),
        )?),
        None => {
            tracing::warn!("no classifier configured, every image upload goes to community review");
            Arc::new(UnconfiguredClassifier)
        }
    };

    let state = Arc::new(AppState::new(config, store, publisher, classifier, metrics_handle));

    if let Some(every) = state.config.scan_interval() {
        scheduler::spawn_resolution_task(state.resolver.clone(), every);
    }

    if state.config.realtime_bridge {
        if let Some(rabbitmq) = state.publisher.rabbitmq().cloned() {
            let feed = state.feed.clone();
            let instance_id = state.instance_id;
            tokio::spawn(async move {
                if let Err(e) = subscriber::listen_vote_events(rabbitmq, feed, instance_id).await {
                    tracing::error!(error = %e, "vote event subscriber failed");
                }
            });
        }
    }

    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "aiboom-moderation starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
