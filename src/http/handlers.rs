//! Request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::state::AppState;
use crate::payments::{DonationRequest, PaymentError, PaymentIntentParams};
use crate::ratelimit::{ClientKey, RateLimitDecision, RateLimitPolicy};

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
const INVALID_BODY_MESSAGE: &str = "Invalid request body";
const PROCESSING_FAILED_MESSAGE: &str =
    "An error occurred while processing your donation. Please try again.";

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON body of a created payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
}

/// `POST /api/create-payment-intent`
///
/// Rate limited per client before the body is even parsed. Every response
/// past the limiter carries the `X-RateLimit-*` headers.
#[instrument(skip_all)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client = ClientKey::from_headers(&headers);
    let decision = state.rate_limiter.check(client.as_str(), &state.policy);

    let response = if decision.allowed {
        debug!(client = %client, remaining = decision.remaining, "Payment intent request admitted");
        process_payment_intent(&state, &body).await
    } else {
        warn!(
            client = %client,
            reset_at = decision.reset_at,
            "Payment intent request rate limited"
        );
        error_response(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE)
    };

    with_rate_limit_headers(response, &state.policy, &decision)
}

async fn process_payment_intent(state: &AppState, body: &[u8]) -> Response {
    let request: DonationRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected malformed payment intent request");
            return error_response(StatusCode::BAD_REQUEST, INVALID_BODY_MESSAGE);
        }
    };

    let donation = match request.validate() {
        Ok(donation) => donation,
        Err(e) => {
            warn!(reason = %e, "Rejected invalid payment intent request");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    let params = PaymentIntentParams::for_donation(
        &donation,
        &state.default_currency,
        &state.organization_name,
    );

    match state.payments.create_payment_intent(&params).await {
        Ok(intent) => {
            info!(
                payment_intent = %intent.id,
                amount = params.amount,
                currency = %params.currency,
                "Payment intent created"
            );
            Json(PaymentIntentResponse {
                client_secret: intent.client_secret,
                payment_intent_id: intent.id,
            })
            .into_response()
        }
        Err(PaymentError::Api { status, message }) => {
            error!(status = status, message = %message, "Payment processor rejected payment intent");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, &message)
        }
        Err(e) => {
            error!(error = %e, "Error creating payment intent");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED_MESSAGE)
        }
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "trackedClients": state.rate_limiter.record_count(),
    }))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn with_rate_limit_headers(
    mut response: Response,
    policy: &RateLimitPolicy,
    decision: &RateLimitDecision,
) -> Response {
    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(policy.max_requests()));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_at));
    response
}
