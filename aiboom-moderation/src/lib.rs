//! Moderation service: submission gate, community voting on unverified
//! posts, and expiry-driven resolution.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub mod config;
pub mod events;
pub mod models;
pub mod resolution;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod store;
pub mod submission;
pub mod voting;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::AppConfig;
use events::{EventPublisher, VoteFeed};
use resolution::Resolver;
use store::SharedStore;
use submission::{AiClassifier, SubmissionGate};
use voting::VotingSession;

pub struct AppState {
    pub config: AppConfig,
    pub store: SharedStore,
    pub feed: VoteFeed,
    pub publisher: EventPublisher,
    pub gate: SubmissionGate,
    pub sessions: VotingSession,
    pub resolver: Resolver,
    pub metrics_handle: Option<PrometheusHandle>,
    /// Identifies this replica on the broker so it can skip its own echoes.
    pub instance_id: Uuid,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: SharedStore,
        publisher: EventPublisher,
        classifier: Arc<dyn AiClassifier>,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        let feed = VoteFeed::new();
        let instance_id = Uuid::new_v4();

        let gate = SubmissionGate::new(
            store.clone(),
            classifier,
            publisher.clone(),
            config.voting_window(),
            config.classifier_min_confidence,
        );
        let sessions = VotingSession::new(store.clone(), feed.clone(), publisher.clone(), instance_id);
        let resolver = Resolver::new(store.clone(), publisher.clone(), feed.clone());

        Self {
            config,
            store,
            feed,
            publisher,
            gate,
            sessions,
            resolver,
            metrics_handle,
            instance_id,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/posts", post(routes::posts::submit_post))
        .route("/posts/pending", get(routes::posts::list_pending))
        .route("/posts/:id/tally", get(routes::votes::get_tally))
        .route("/posts/:id/live", get(routes::live::live_tally))
        .route("/posts/:id/vote", post(routes::votes::cast_vote))
        .route("/posts/:id/report", post(routes::reports::create_report))
        .route("/resolve", post(routes::resolve::resolve_now))
        .layer(axum::middleware::from_fn(aiboom_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
