//! Axum middleware used by the catalog router.
//!
//! * [`basic_auth_middleware`] gates every request on the shared credential
//!   before any routing, handler or metrics code runs.
//! * [`record_request_metrics`] is the single instrumentation wrapper applied
//!   to every catalog route and to the fallback. It records one duration
//!   observation and one request count per request, whatever the handler did.
//! * [`request_id_middleware`] tags each request with a UUID.
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::Instrument;

use crate::{
    config::models::AuthConfig,
    metrics::{CatalogMetrics, RequestTimer},
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The shared username/password pair checked on every request.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: String,
    challenge: HeaderValue,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, realm: &str) -> Self {
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        Self {
            username: username.into(),
            password: password.into(),
            challenge,
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(auth.username.clone(), auth.password.clone(), &auth.realm)
    }

    /// Check an `Authorization` header value against the credential.
    pub fn verify(&self, authorization: &HeaderValue) -> bool {
        let Ok(value) = authorization.to_str() else {
            return false;
        };
        let Some((scheme, encoded)) = value.split_once(' ') else {
            return false;
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            return false;
        }
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((username, password)) => {
                username == self.username && password == self.password
            }
            None => false,
        }
    }

    fn unauthorized(&self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, self.challenge.clone())],
            "Not Authorized",
        )
            .into_response()
    }
}

/// Reject requests that do not carry the shared credential.
pub async fn basic_auth_middleware(
    State(credentials): State<Arc<Credentials>>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .is_some_and(|value| credentials.verify(value));

    if !authorized {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "Rejected request with missing or invalid credentials"
        );
        return credentials.unauthorized();
    }

    next.run(req).await
}

/// State of the instrumentation wrapper: where to record and under which
/// method label.
#[derive(Clone)]
pub struct Instrumentation {
    metrics: Arc<CatalogMetrics>,
    method: &'static str,
}

impl Instrumentation {
    pub fn new(metrics: Arc<CatalogMetrics>, method: &'static str) -> Self {
        Self { metrics, method }
    }
}

/// Record request duration and the final status for one request.
pub async fn record_request_metrics(
    State(instrumentation): State<Instrumentation>,
    req: Request,
    next: Next,
) -> Response {
    let timer = RequestTimer::new(&instrumentation.metrics, instrumentation.method);
    let response = next.run(req).await;
    drop(timer);

    instrumentation
        .metrics
        .increment_request_total(instrumentation.method, response.status().as_u16());
    response
}

/// Generate a per-request UUID and expose it via tracing plus `x-request-id`.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %request_id);

    let mut response = next.run(req).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}
