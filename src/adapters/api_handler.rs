//! REST API handlers
//!
//! Rule-set validation and form render/submit endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::adapters::metrics_handler::MetricsCollector;
use crate::config::Settings;
use crate::forms::{root_from_json_schema, Control, FormAction, FormError, FormSession, FormState, UiState};
use crate::validation::RuleSet;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<RwLock<Settings>>,
    pub metrics: Arc<MetricsCollector>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

#[derive(Serialize)]
pub struct RuleSetSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rules: usize,
}

impl From<&RuleSet> for RuleSetSummary {
    fn from(ruleset: &RuleSet) -> Self {
        Self {
            name: ruleset.name.clone(),
            description: ruleset.description.clone(),
            rules: ruleset.rules.len(),
        }
    }
}

/// Schema plus the state a client holds between requests.
#[derive(Debug, Deserialize)]
pub struct FormRequest {
    pub schema: Value,
    /// Existing values to edit
    #[serde(default)]
    pub values: Option<Value>,
    #[serde(default)]
    pub ui: UiState,
    /// Operations applied in order after opening the form
    #[serde(default)]
    pub actions: Vec<FormAction>,
    /// Rule set checked on submit
    #[serde(default)]
    pub ruleset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenderedForm {
    pub controls: Vec<Control>,
    pub ui: UiState,
    pub values: Value,
}

// ============================================================================
// Rule sets
// ============================================================================

/// GET /api/rulesets - List configured rule sets
pub async fn list_rulesets(State(state): State<ApiState>) -> impl IntoResponse {
    let settings = state.settings.read().await;
    let summaries: Vec<RuleSetSummary> = settings.rulesets.iter().map(RuleSetSummary::from).collect();
    Json(ApiResponse::success(summaries))
}

/// GET /api/rulesets/:name - Get one rule set with its rules
pub async fn get_ruleset(State(state): State<ApiState>, Path(name): Path<String>) -> impl IntoResponse {
    let settings = state.settings.read().await;

    match settings.ruleset(&name) {
        Some(ruleset) => (StatusCode::OK, Json(ApiResponse::success(ruleset.clone()))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<RuleSet>::error("Rule set not found")),
        ),
    }
}

/// POST /api/rulesets/:name/validate - Run a rule set against a payload
pub async fn validate_payload(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let Some(ruleset) = find_ruleset(&state, &name).await else {
        return (StatusCode::NOT_FOUND, Json(ApiResponse::<()>::error("Rule set not found")));
    };

    let timer = state
        .metrics
        .validation_duration
        .with_label_values(&[name.as_str()])
        .start_timer();
    let result = ruleset.validate(&payload);
    timer.observe_duration();

    match result {
        None => {
            state.metrics.validations_total.with_label_values(&[name.as_str(), "passed"]).inc();
            (StatusCode::OK, Json(ApiResponse::ok()))
        }
        Some(message) => {
            debug!("Rule set '{}' rejected payload: {}", name, message);
            state.metrics.validations_total.with_label_values(&[name.as_str(), "failed"]).inc();
            (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::error(message)))
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

/// POST /api/forms/render - Control tree for a schema after applying actions
pub async fn render_form(State(state): State<ApiState>, Json(req): Json<FormRequest>) -> impl IntoResponse {
    let session = match open_session(&state, &req).await {
        Ok(session) => session,
        Err(e) => return form_error::<RenderedForm>(e),
    };
    state.metrics.forms_rendered.inc();

    let rendered = RenderedForm {
        controls: session.controls().to_vec(),
        ui: session.ui_state().clone(),
        values: session.submission(),
    };
    (StatusCode::OK, Json(ApiResponse::success(rendered)))
}

/// POST /api/forms/submit - Normalised submission, checked by an optional rule set
pub async fn submit_form(State(state): State<ApiState>, Json(req): Json<FormRequest>) -> impl IntoResponse {
    let ruleset = match &req.ruleset {
        Some(name) => match find_ruleset(&state, name).await {
            Some(ruleset) => Some(ruleset),
            None => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::<Value>::error("Rule set not found")),
                )
            }
        },
        None => None,
    };

    let session = match open_session(&state, &req).await {
        Ok(session) => session,
        Err(e) => {
            state.metrics.form_submissions.with_label_values(&["invalid"]).inc();
            return form_error::<Value>(e);
        }
    };

    match session.submit(ruleset.as_ref()) {
        Ok(submission) => {
            state.metrics.form_submissions.with_label_values(&["accepted"]).inc();
            (StatusCode::OK, Json(ApiResponse::success(submission)))
        }
        Err(e) => {
            state.metrics.form_submissions.with_label_values(&["rejected"]).inc();
            form_error::<Value>(e)
        }
    }
}

/// Clone a rule set out so the settings lock is released before it runs.
async fn find_ruleset(state: &ApiState, name: &str) -> Option<RuleSet> {
    let settings = state.settings.read().await;
    settings.ruleset(name).cloned()
}

async fn open_session(state: &ApiState, req: &FormRequest) -> Result<FormSession<FormState>, FormError> {
    let forms = state.settings.read().await.forms.clone();

    let root = root_from_json_schema(&req.schema, forms.max_schema_depth)?;
    let mut session = FormSession::restore(
        root,
        FormState::new(),
        forms.display_format(),
        req.ui.clone(),
        req.values.as_ref(),
    );
    for action in &req.actions {
        session.apply(action)?;
    }
    Ok(session)
}

fn form_error<T>(e: FormError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = e.status_code();
    if status != StatusCode::BAD_REQUEST {
        warn!("Form request failed: {}", e);
    }
    (status, Json(ApiResponse::error(e.to_string())))
}
