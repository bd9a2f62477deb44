//! textpace HTTP API
//!
//! - `POST /sendMessage` and `POST /sendBulkMessages` (API key required)
//! - `GET /health`
//! - `GET /api-doc/openapi.json`
//!
//! Send endpoints answer as soon as the request is validated; the messages
//! go out afterwards on a background task the caller never hears from. The
//! task is released only once the acknowledgement response exists.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tp_common::DispatchRequest;
use tracing::{debug, error, info};
use utoipa::OpenApi;

use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, ValidationError};
use crate::validator::{validate_bulk, validate_single, BULK_MISSING_FIELDS, SINGLE_MISSING_FIELDS};

pub mod auth;
pub mod model;

pub use auth::{api_key_middleware, ApiKeyAuth, API_KEY_HEADER};
use model::{
    AcceptedResponse, ErrorResponse, HealthResponse, SendBulkMessagesRequest, SendMessageRequest,
    UnauthorizedResponse,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub auth: ApiKeyAuth,
}

/// Errors a handler can answer with
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Unauthorized,
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    success: false,
                    error: err.to_string(),
                }),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(UnauthorizedResponse {
                    error: "Invalid API key".to_string(),
                }),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                internal_error_response()
            }
        }
    }
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            error: "Internal server error".to_string(),
        }),
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Handler panicked");
    internal_error_response()
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "textpace API",
        version = "0.1.0",
        description = "Paced text message dispatch"
    ),
    paths(send_message, send_bulk_messages, health_handler),
    components(schemas(
        SendMessageRequest,
        SendBulkMessagesRequest,
        AcceptedResponse,
        ErrorResponse,
        UnauthorizedResponse,
        HealthResponse,
    )),
    tags(
        (name = "messages", description = "Message dispatch"),
        (name = "health", description = "Health checks"),
    )
)]
pub struct ApiDoc;

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/sendMessage", post(send_message))
        .route("/sendBulkMessages", post(send_bulk_messages))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), api_key_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api-doc/openapi.json", get(openapi_handler))
        .merge(protected)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
}

// ============================================================================
// Message Endpoints
// ============================================================================

/// Send messages to one phone number
#[utoipa::path(
    post,
    path = "/sendMessage",
    tag = "messages",
    request_body = SendMessageRequest,
    params(("X-API-Key" = String, Header, description = "Shared API key")),
    responses(
        (status = 200, description = "Sending started", body = AcceptedResponse),
        (status = 400, description = "Missing fields or invalid phone number", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = UnauthorizedResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn send_message(
    State(state): State<AppState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|rejection| {
        debug!(error = %rejection, "Unreadable sendMessage body");
        ValidationError::MissingFields(SINGLE_MISSING_FIELDS)
    })?;

    let job = validate_single(req.phone_number.as_deref(), req.messages)?;
    let ack = AcceptedResponse::new(format!("Started sending {} messages", job.batch.len()));

    info!(recipient = %job.recipient, messages = job.batch.len(), "Accepted sendMessage request");
    let submission = state.dispatcher.submit(DispatchRequest::Single(job))?;

    let response = Json(ack).into_response();
    submission.release();
    Ok(response)
}

/// Send the same messages to several phone numbers
#[utoipa::path(
    post,
    path = "/sendBulkMessages",
    tag = "messages",
    request_body = SendBulkMessagesRequest,
    params(("X-API-Key" = String, Header, description = "Shared API key")),
    responses(
        (status = 200, description = "Sending started", body = AcceptedResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = UnauthorizedResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn send_bulk_messages(
    State(state): State<AppState>,
    body: Result<Json<SendBulkMessagesRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|rejection| {
        debug!(error = %rejection, "Unreadable sendBulkMessages body");
        ValidationError::MissingFields(BULK_MISSING_FIELDS)
    })?;

    let (recipients, batch) = validate_bulk(req.phone_numbers, req.messages)?;

    let ack = AcceptedResponse::new(format!(
        "Started sending {} messages to {} recipients",
        batch.len(),
        recipients.len()
    ));

    info!(
        recipients = recipients.len(),
        rejected = recipients.iter().filter(|r| !r.is_valid()).count(),
        messages = batch.len(),
        "Accepted sendBulkMessages request"
    );
    let submission = state.dispatcher.submit(DispatchRequest::Bulk { recipients, batch })?;

    let response = Json(ack).into_response();
    submission.release();
    Ok(response)
}

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
