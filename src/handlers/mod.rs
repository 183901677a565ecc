use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    error::{AppError, Result},
    services::{DeliveryLoader, FilterOptions, FilterQuery, FilterSelection},
};

pub mod api;
pub mod dashboard;

/// Shared state for every route
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<DeliveryLoader>,
}

impl AppState {
    pub fn new(loader: Arc<DeliveryLoader>) -> Self {
        Self { loader }
    }
}

/// Build the dashboard router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route(
            "/download/deliveries_filtered.csv",
            get(dashboard::download_csv),
        )
        .route("/api/options", get(api::options))
        .route("/api/summary", get(api::summary))
        .route("/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decode the raw query string into a filter selection.
///
/// Keys may repeat (`status=a&status=b`), so the string is decoded into pairs
/// rather than a struct.
pub(crate) fn selection_from_query(
    raw: Option<&str>,
    options: &FilterOptions,
) -> Result<FilterSelection> {
    let pairs: Vec<(String, String)> = match raw {
        Some(query) => serde_urlencoded::from_str(query)
            .map_err(|e| AppError::BadRequest(format!("Malformed query string: {}", e)))?,
        None => Vec::new(),
    };
    FilterQuery::from_pairs(pairs)
        .resolve(options)
        .map_err(|e| AppError::BadRequest(e.to_string()))
}
