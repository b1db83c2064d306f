//! HTTP surface of the catalog.
//!
//! [`build_router`] wires the route table, the not-found fallback, the
//! per-route instrumentation wrapper and the authentication gate around a
//! shared [`AppState`]. Handlers only translate between HTTP and
//! [`CatalogService`]; the store and metrics registry arrive through state so
//! tests can substitute both.
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    handler::Handler,
    http::{Method, StatusCode, Uri, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::{
    adapters::middleware::{
        Credentials, Instrumentation, basic_auth_middleware, record_request_metrics,
        request_id_middleware,
    },
    core::{Book, BookList, CatalogService},
    metrics::{CatalogMetrics, EXPOSITION_CONTENT_TYPE},
    ports::book_store::StoreError,
};

/// Method labels used by the instrumentation wrapper.
pub const LABEL_GET: &str = "GET";
pub const LABEL_POST: &str = "POST";
pub const LABEL_UPDATE: &str = "UPDATE";
pub const LABEL_NOT_FOUND: &str = "NOT_FOUND";

/// Errors a handler can turn into a response.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body did not match the expected shape
    #[error("invalid request body: {0}")]
    Validation(String),

    /// The requested book is not stored
    #[error("book not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Validation(_) => {
                tracing::warn!(error = %self, "Rejected request body");
                let body = serde_json::json!({ "error": self.to_string() });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::Storage(ref e) => {
                tracing::error!(error = %e, "Storage operation failed");
                let body = serde_json::json!({ "error": e.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub metrics: Arc<CatalogMetrics>,
}

impl AppState {
    pub fn new(catalog: CatalogService, metrics: Arc<CatalogMetrics>) -> Self {
        Self { catalog, metrics }
    }
}

/// `GET /books`
pub async fn list_books(State(state): State<AppState>) -> Result<Json<BookList>, ApiError> {
    tracing::info!("Received list request");
    let books = state.catalog.list().await?;
    Ok(Json(books.into()))
}

/// `GET /books/{id}`
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    tracing::info!(%id, "Received get request");
    state
        .catalog
        .get(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `POST /books`: insert every submitted book whose id is not stored yet and
/// answer with the whole catalog. Every item is attempted even after a
/// failure; the first failure then becomes the response.
pub async fn import_books(
    State(state): State<AppState>,
    payload: Result<Json<BookList>, JsonRejection>,
) -> Result<Json<BookList>, ApiError> {
    let Json(list) = payload?;
    if let Some(index) = list.first_missing_id() {
        return Err(ApiError::Validation(format!(
            "items[{index}]: id must not be empty"
        )));
    }
    tracing::info!(items = list.items.len(), "Received import request");

    let report = state.catalog.import_batch(&list.items).await?;
    tracing::info!(
        inserted = report.inserted(),
        skipped = report.skipped(),
        failed = report.failed(),
        "Import finished"
    );
    if let Some(e) = report.first_error() {
        return Err(ApiError::Storage(e.clone()));
    }

    Ok(Json(report.catalog.into()))
}

/// `POST /books/{id}`: replace the stored fields and echo the submitted book.
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Book>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let Json(book) = payload?;
    tracing::info!(%id, "Received update request");
    state.catalog.update(&id, &book).await?;
    Ok(Json(book))
}

/// Fallback for every unmatched method and path.
pub async fn not_found(State(state): State<AppState>, method: Method, uri: Uri) -> StatusCode {
    let raw_path = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    tracing::info!(%method, path = raw_path, "No route matched");
    state.metrics.increment_not_found(method.as_str(), raw_path);
    StatusCode::BAD_REQUEST
}

/// `GET /metrics`
pub async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

/// Build the complete application router.
pub fn build_router(state: AppState, credentials: Credentials) -> Router {
    let metrics = state.metrics.clone();
    let instrumented = |method: &'static str| {
        middleware::from_fn_with_state(
            Instrumentation::new(metrics.clone(), method),
            record_request_metrics,
        )
    };

    Router::new()
        .route(
            "/books",
            get(list_books.layer(instrumented(LABEL_GET)))
                .post(import_books.layer(instrumented(LABEL_POST))),
        )
        .route(
            "/books/{id}",
            get(get_book.layer(instrumented(LABEL_GET)))
                .post(update_book.layer(instrumented(LABEL_UPDATE))),
        )
        .route("/metrics", get(render_metrics))
        .method_not_allowed_fallback(not_found.layer(instrumented(LABEL_NOT_FOUND)))
        .fallback(not_found.layer(instrumented(LABEL_NOT_FOUND)))
        .layer(middleware::from_fn_with_state(
            Arc::new(credentials),
            basic_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
