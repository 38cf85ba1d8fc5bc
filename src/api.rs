//! REST API server for the mentor service
//!
//! Exposes the chat orchestrator, the calculator and an index health probe
//! over HTTP.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::agent::{ChatRequest, Orchestrator};
use crate::calculator::{calculate, parse_inputs, CalculationInputs, CalculationKind, CalculationResult, ToolInvocation};
use crate::error::MentorError;
use crate::models::{ChatMessage, UserProfile};
use crate::Result;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub user_context: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateBody {
    pub calculation_type: Option<String>,
    pub inputs: Option<Value>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Error that still carries a payload (usage hints, partial status).
    pub fn error_with(message: String, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::error(message)
        }
    }
}

type ApiReply = (StatusCode, Json<ApiResponse>);

/// HTTP status for a failed request
pub fn status_for(err: &MentorError) -> StatusCode {
    match err {
        MentorError::Validation(_) => StatusCode::BAD_REQUEST,
        MentorError::Completion {
            status: Some(code), ..
        } => StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY),
        MentorError::CompletionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        MentorError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        MentorError::Completion { .. }
        | MentorError::MaxToolRounds(_)
        | MentorError::Embedding(_)
        | MentorError::VectorSearch(_)
        | MentorError::RetrievalTimeout(_)
        | MentorError::HttpError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(err: &MentorError) -> ApiReply {
    let status = status_for(err);
    if status.is_server_error() {
        warn!(%status, error = %err, "Request failed");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

fn rejection_reply(rejection: JsonRejection) -> ApiReply {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(format!("Invalid request body: {}", rejection.body_text()))),
    )
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    /// Cancelled on shutdown so in-flight chats stop promptly
    pub shutdown: CancellationToken,
}

/// =============================
/// Health Endpoints
/// =============================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn index_health(State(state): State<ApiState>) -> ApiReply {
    let stats = state.orchestrator.retrieval().index_stats().await;

    if stats.available {
        (StatusCode::OK, Json(ApiResponse::success(stats)))
    } else {
        let message = stats
            .error
            .clone()
            .unwrap_or_else(|| "Vector index unavailable".to_string());
        let data = serde_json::to_value(&stats).unwrap_or(Value::Null);
        (StatusCode::SERVICE_UNAVAILABLE, Json(ApiResponse::error_with(message, data)))
    }
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    body: std::result::Result<Json<ChatBody>, JsonRejection>,
) -> ApiReply {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_reply(rejection),
    };

    let request = match ChatRequest::new(body.messages, body.user_context) {
        Ok(request) => request,
        Err(e) => return error_reply(&e),
    };

    info!(history = request.query.history().len(), "Received chat request");

    match state
        .orchestrator
        .run_cancellable(request, &state.shutdown)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::success(response))),
        Err(e) => error_reply(&e),
    }
}

/// =============================
/// Calculator Endpoints
/// =============================

fn run_calculation(kind: &str, inputs: CalculationInputs) -> Result<CalculationResult> {
    let kind: CalculationKind = kind.parse()?;
    let invocation = ToolInvocation::new(kind, inputs)?;
    Ok(calculate(&invocation))
}

fn calculation_reply(result: Result<CalculationResult>) -> ApiReply {
    match result {
        Ok(result) => (StatusCode::OK, Json(ApiResponse::success(result))),
        Err(e) => error_reply(&e),
    }
}

fn calculate_from_body(body: CalculateBody) -> Result<CalculationResult> {
    let kind = body
        .calculation_type
        .filter(|k| !k.is_empty())
        .ok_or_else(|| MentorError::validation("calculationType is required"))?;
    let inputs = body
        .inputs
        .as_ref()
        .and_then(Value::as_object)
        .ok_or_else(|| MentorError::validation("inputs must be an object with numeric values"))?;

    run_calculation(&kind, parse_inputs(inputs)?)
}

async fn calculate_post(body: std::result::Result<Json<CalculateBody>, JsonRejection>) -> ApiReply {
    match body {
        Ok(Json(body)) => calculation_reply(calculate_from_body(body)),
        Err(rejection) => rejection_reply(rejection),
    }
}

fn usage_examples() -> Value {
    let valid: Vec<&str> = CalculationKind::ALL.iter().map(|k| k.as_str()).collect();
    json!({
        "validTypes": valid,
        "usage": {
            "unit_economics": "?type=unit_economics&monthlyRevenuePerCustomer=100&averageCustomerLifespanMonths=24&customerAcquisitionCost=200",
            "tam_sam_som": "?type=tam_sam_som&totalAddressableMarket=1000000000&serviceableAddressableMarketPercent=10&realisticMarketSharePercent=5",
            "break_even": "?type=break_even&monthlyFixedCosts=10000&pricePerUnit=100&variableCostPerUnit=30",
            "runway": "?type=runway&currentCash=500000&monthlyBurnRate=50000&monthlyRevenue=10000"
        }
    })
}

async fn calculate_get(Query(mut params): Query<HashMap<String, String>>) -> ApiReply {
    let Some(kind) = params.remove("type").filter(|k| !k.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_with(
                "type query parameter is required".to_string(),
                usage_examples(),
            )),
        );
    };

    let inputs: Result<CalculationInputs> = params
        .into_iter()
        .map(|(key, raw)| {
            raw.trim()
                .parse::<f64>()
                .map(|n| (key.clone(), n))
                .map_err(|_| MentorError::validation(format!("Input \"{}\" must be a number", key)))
        })
        .collect();

    calculation_reply(inputs.and_then(|inputs| run_calculation(&kind, inputs)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>, shutdown: CancellationToken) -> Router {
    let state = ApiState {
        orchestrator,
        shutdown,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/index/health", get(index_health))
        .route("/api/chat", post(chat_handler))
        .route("/api/calculate", post(calculate_post).get(calculate_get))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
    shutdown: CancellationToken,
) -> Result<()> {
    let router = create_router(orchestrator, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("API Server stopped");

    Ok(())
}
