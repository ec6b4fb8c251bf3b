//! Fingerprint capture middleware.
//! Records every request before it reaches the downstream handler.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::analytics::Analytics;
use crate::fingerprint::extract;

/// State required for fingerprint capture.
#[derive(Clone, Debug)]
pub struct FingerprintState {
    pub analytics: Analytics,
    /// Put the store's error text in 500 bodies.
    pub expose_error_details: bool,
}

pub async fn fingerprint_middleware(
    State(state): State<FingerprintState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // 1. Extract; cannot fail.
    let fingerprint = extract(&req);

    // 2. Persist. A failed write stops the request here.
    if let Err(e) = state.analytics.write(&fingerprint).await {
        let body = if state.expose_error_details {
            e.to_string()
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .unwrap_or_default()
                .to_string()
        };
        return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
    }

    // 3. Forward the untouched request.
    next.run(req).await
}

/// Wrap every route (and fallback) of `downstream` with fingerprint capture.
pub fn with_fingerprinting(downstream: Router, state: FingerprintState) -> Router {
    downstream.layer(middleware::from_fn_with_state(state, fingerprint_middleware))
}
