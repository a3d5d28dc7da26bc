//! # Agentcloud forms
//!
//! Connector configuration forms and declarative payload validation for
//! the Agentcloud datasource screens and REST controllers.
//!
//! ## Features
//!
//! - **Validation chains**: ordered per-field rules over JSON payloads,
//!   returning the first failure as a readable message
//! - **Schema-driven forms**: connector specs resolved into a control tree,
//!   with field values kept in an injected registry
//! - **Rule sets from config**: JSON, YAML or TOML files with live reload
//! - **Metrics**: Prometheus metrics for monitoring
//! - **Health Checks**: Kubernetes-ready health endpoints
//!
//! ## Quick Start
//!
//! ```rust
//! use agentcloud::validation::{chain_validations, Validation, ValidationRule};
//! use serde_json::json;
//!
//! let rules = vec![ValidationRule::new(
//!     "name",
//!     Validation { not_empty: true, ..Default::default() },
//! )];
//! let error = chain_validations(&json!({ "name": "" }), &rules, None);
//! assert_eq!(error.as_deref(), Some("[name] is empty"));
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod forms;
pub mod validation;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Creates the Axum application router with all endpoints configured.
///
/// Health probes are never rate limited; everything else is when
/// `rate_limit.enabled` is set.
pub async fn create_app(settings: Arc<RwLock<crate::config::Settings>>, metrics: Arc<MetricsCollector>) -> Router {
    let health_handler = Arc::new(HealthHandler::new(settings.clone()));
    let metrics_handler = Arc::new(MetricsHandler::new(metrics.clone()));

    let public_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }));

    let api_state = ApiState {
        settings: settings.clone(),
        metrics,
    };

    let api_router = Router::new()
        .route("/rulesets", get(api_handler::list_rulesets))
        .route("/rulesets/:name", get(api_handler::get_ruleset))
        .route("/rulesets/:name/validate", post(api_handler::validate_payload))
        .route("/forms/render", post(api_handler::render_form))
        .route("/forms/submit", post(api_handler::submit_form))
        .with_state(api_state);

    let mut protected_router = Router::new()
        .route("/metrics", get({
            let handler = metrics_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.metrics().await }
            }
        }))
        .nest("/api", api_router);

    let settings_read = settings.read().await;
    if let Some(rate_limit) = &settings_read.rate_limit {
        if rate_limit.enabled {
            let limiter = crate::adapters::rate_limit::create_limiter(
                rate_limit.requests_per_second,
                rate_limit.burst_size,
            );

            protected_router = protected_router.layer(axum::middleware::from_fn_with_state(
                limiter,
                crate::adapters::rate_limit::rate_limit_middleware,
            ));
        }
    }

    public_router.merge(protected_router).layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
