//! # HTTP front end
//!
//! The JSON-facing surface of the gateway:
//!
//! * `POST /v1/{service}/{method}?version=`: resolve the service, perform
//!   the gRPC call, return the backend's response as JSON.
//! * `GET /healthz`: liveness probe.
//!
//! Request headers are forwarded to the backend as gRPC metadata, minus
//! framing and credential headers. Error responses keep resolution failures
//! ("no such route") distinguishable from backend failures ("route exists,
//! call rejected"): the latter carry the numeric gRPC status code in the
//! body.
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pontic_core::client::{CallError, DynamicClient};
use pontic_core::grpc::client::Metadata;
use pontic_core::registry::{Resolve, records::ResolveError};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Headers never forwarded to the backend.
const SKIPPED_HEADERS: [&str; 4] = ["host", "content-length", "content-type", "x-access-token"];

/// Shared state of the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn Resolve + Send + Sync>,
    pub access_token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/v1/{service}/{method}", post(call))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct CallQuery {
    #[serde(default)]
    version: String,
}

async fn call(
    State(state): State<AppState>,
    Path((service, method)): Path<(String, String)>,
    Query(query): Query<CallQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = &state.access_token {
        let provided = headers.get("x-access-token").and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return error_response(StatusCode::UNAUTHORIZED, "invalid access token");
        }
    }

    let url = match state.resolver.resolve(&service, &query.version) {
        Ok(url) => url,
        Err(err) => return (resolve_status(&err), Json(json!({ "error": err.to_string() }))).into_response(),
    };

    let metadata = forward_metadata(&headers);
    let mut client = DynamicClient::connect(&url).await;
    match client.call(&service, &method, &body, &metadata).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(err) => {
            error!(%service, %method, error = %err, "gateway call failed");
            (call_status(&err), Json(call_body(&err))).into_response()
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn forward_metadata(headers: &HeaderMap) -> Metadata {
    headers
        .iter()
        .filter(|(name, _)| !SKIPPED_HEADERS.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect()
}

fn resolve_status(err: &ResolveError) -> StatusCode {
    match err {
        ResolveError::ServiceUnresolvable { .. } => StatusCode::NOT_FOUND,
        ResolveError::VersionNotSpecified { .. } => StatusCode::BAD_REQUEST,
        ResolveError::VersionUndecidable { .. } => StatusCode::CONFLICT,
    }
}

fn call_status(err: &CallError) -> StatusCode {
    match err {
        CallError::MethodNotFound { .. } => StatusCode::NOT_FOUND,
        CallError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        CallError::Backend(status) => backend_status(status.code()),
        CallError::Connect { .. }
        | CallError::Reflection(_)
        | CallError::Request(_)
        | CallError::Transport(_) => StatusCode::BAD_GATEWAY,
        CallError::ResponseEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn call_body(err: &CallError) -> serde_json::Value {
    match err.backend_status() {
        Some(status) => json!({
            "error": status.message(),
            "grpc_code": status.code() as i32,
        }),
        None => json!({ "error": err.to_string() }),
    }
}

/// The canonical gRPC code to HTTP status mapping.
fn backend_status(code: tonic::Code) -> StatusCode {
    match code {
        tonic::Code::Ok => StatusCode::OK,
        tonic::Code::InvalidArgument | tonic::Code::OutOfRange => StatusCode::BAD_REQUEST,
        tonic::Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        tonic::Code::PermissionDenied => StatusCode::FORBIDDEN,
        tonic::Code::NotFound => StatusCode::NOT_FOUND,
        tonic::Code::AlreadyExists | tonic::Code::Aborted => StatusCode::CONFLICT,
        tonic::Code::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
        tonic::Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        tonic::Code::Cancelled => StatusCode::REQUEST_TIMEOUT,
        tonic::Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        tonic::Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        tonic::Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        // Unknown, Internal, DataLoss
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
