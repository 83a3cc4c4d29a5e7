//! Contact form endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use super::client_ip::client_identifier;
use super::state::AppState;
use crate::contact::{ContactRequest, ContactSubmission};
use crate::ratelimit::{RateLimitDecision, RateLimitPolicy};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Handle a contact form submission.
///
/// The client is rate limited before the body is looked at; only admitted
/// requests are parsed, validated and delivered.
#[instrument(skip_all, fields(client = tracing::field::Empty))]
pub async fn submit_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client = client_identifier(&headers);
    tracing::Span::current().record("client", client.as_str());

    let decision = state.limiter.check(&client, &state.policy);
    if !decision.allowed {
        warn!(
            reset_time = decision.reset_time,
            "Contact submission rejected by rate limit"
        );
        let now = state.limiter.clock().now_millis();
        return too_many_requests(&state.policy, &decision, now);
    }

    let limit_headers = rate_limit_headers(&state.policy, &decision);

    let request: ContactRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Unparseable contact body");
            return error_response(StatusCode::BAD_REQUEST, limit_headers, "Invalid request body");
        }
    };

    let submission = match ContactSubmission::from_request(&request, state.max_field_len) {
        Ok(submission) => submission,
        Err(e) => {
            warn!(reason = %e, "Contact submission failed validation");
            return error_response(StatusCode::BAD_REQUEST, limit_headers, &e.to_string());
        }
    };

    match state.sink.deliver(&submission).await {
        Ok(receipt) => {
            info!(id = %submission.id, remaining = decision.remaining, "Contact submission accepted");
            (
                StatusCode::OK,
                limit_headers,
                Json(json!({
                    "success": true,
                    "message": receipt.message,
                    "id": submission.id,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(id = %submission.id, error = %e, "Contact submission delivery failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                limit_headers,
                "Failed to send message. Please try again later.",
            )
        }
    }
}

/// `GET /api/contact` is not supported.
pub async fn method_not_allowed() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        HeaderMap::new(),
        "Method not allowed",
    )
}

/// `429` response for a denied client, with the reset time in server-local
/// `HH:MM`. `Retry-After` counts whole seconds from `now`, rounded up.
pub fn too_many_requests(
    policy: &RateLimitPolicy,
    decision: &RateLimitDecision,
    now: u64,
) -> Response {
    let mut headers = rate_limit_headers(policy, decision);
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_time));

    let wait = decision.retry_after(now);
    let retry_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    headers.insert(RETRY_AFTER, HeaderValue::from(retry_secs));

    let message = format!(
        "Too many contact form submissions. Please try again after {}.",
        format_reset_time(decision)
    );
    error_response(StatusCode::TOO_MANY_REQUESTS, headers, &message)
}

/// Reset time as local wall-clock `HH:MM`.
pub fn format_reset_time(decision: &RateLimitDecision) -> String {
    decision
        .reset_at()
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string()
}

fn rate_limit_headers(policy: &RateLimitPolicy, decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(policy.max_requests));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers
}

fn error_response(status: StatusCode, headers: HeaderMap, message: &str) -> Response {
    (status, headers, Json(json!({ "error": message }))).into_response()
}
