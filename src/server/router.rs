//! Request classification and the update pipeline.
//!
//! # Responsibilities
//! - Classify every inbound request: update path, health probe, or
//!   unauthorized
//! - Reject non-POST traffic on the update path before touching the body
//! - Buffer, decode, and dispatch update payloads
//! - Route pipeline failures to the error reporter
//!
//! # Design Decisions
//! - The token check is a substring test against path-and-query, so tokens
//!   may arrive as a path segment or a query parameter; it runs before the
//!   health check, which means a health path containing the token is
//!   treated as an update path
//! - Acknowledgement is tied to receipt, not processing: the sender sees
//!   200 "OK" once the body has been collected, whatever the decode
//!   outcome, so it never redelivers an update we already hold
//! - One catch-all handler owns the whole policy; the framework router
//!   only funnels traffic into it

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use regex::Regex;
use tower_http::trace::TraceLayer;

use crate::config::WebhookConfig;
use crate::dispatch::{ErrorReporter, UpdateProcessor, WebhookError};

/// State injected into the webhook handler.
#[derive(Clone)]
pub(crate) struct RouterState {
    pub(crate) config: Arc<WebhookConfig>,
    pub(crate) health_pattern: Regex,
    pub(crate) processor: Arc<dyn UpdateProcessor>,
    pub(crate) reporter: Arc<ErrorReporter>,
}

/// Routing decision for one request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteClass {
    /// Target carries the secret token; the update branch owns the request.
    Update,
    /// Health pattern matched; answered without reading the body.
    Health,
    /// Neither matched.
    Unauthorized,
}

/// Classify a request target. First match wins: the token test runs before
/// the health pattern, so a health-looking target that contains the token
/// is still an update.
pub(crate) fn classify_target(target: &str, token: &str, health_pattern: &Regex) -> RouteClass {
    if target.contains(token) {
        RouteClass::Update
    } else if health_pattern.is_match(target) {
        RouteClass::Health
    } else {
        RouteClass::Unauthorized
    }
}

/// Build the Axum router funneling every method and path into the
/// classifier.
pub(crate) fn build_router(state: RouterState) -> Router {
    Router::new()
        .route("/{*path}", any(webhook_handler))
        .route("/", any(webhook_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Main webhook handler.
/// Classifies the request, then either runs the update pipeline, answers
/// the health probe, or rejects.
async fn webhook_handler(State(state): State<RouterState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    // Match against path and query together; the token may live in either.
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    tracing::debug!(
        method = %parts.method,
        target = %target,
        headers = ?parts.headers,
        "Webhook request"
    );

    match classify_target(&target, &state.config.secret_token, &state.health_pattern) {
        RouteClass::Update => {
            if parts.method != Method::POST {
                tracing::debug!(method = %parts.method, "Rejecting non-POST on update path");
                return StatusCode::IM_A_TEAPOT.into_response();
            }
            collect_and_dispatch(&state, body).await
        }
        RouteClass::Health => {
            tracing::debug!("Health probe");
            (StatusCode::OK, "OK").into_response()
        }
        RouteClass::Unauthorized => {
            tracing::debug!(target = %target, "Unauthorized request");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

/// Buffer the whole body, decode it, and hand the update to the processor.
///
/// The response does not depend on the pipeline outcome: once collection
/// has finished, the sender gets 200 "OK" and failures go to the reporter.
async fn collect_and_dispatch(state: &RouterState, body: Body) -> Response {
    match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(update) => state.processor.process_update(update),
            Err(source) => state.reporter.report(WebhookError::Parse(source)),
        },
        Err(source) => state.reporter.report(WebhookError::Transport(source)),
    }

    (StatusCode::OK, "OK").into_response()
}
