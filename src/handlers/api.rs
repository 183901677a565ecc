use axum::{
    Json,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use super::{AppState, selection_from_query};
use crate::{
    error::Result,
    models::delivery::DeliveryRecord,
    services::{DashboardSummary, FilterOptions, FilterSelection, attention_rows},
};

/// Filter choices and the default selection
#[derive(Debug, Serialize)]
pub struct OptionsResponse<'a> {
    #[serde(flatten)]
    pub options: &'a FilterOptions,
    pub default_selection: FilterSelection,
}

/// Aggregates and attention rows for one selection
#[derive(Debug, Serialize)]
pub struct SummaryResponse<'a> {
    pub selection: FilterSelection,
    pub summary: DashboardSummary,
    pub attention: Vec<&'a DeliveryRecord>,
}

// Response bodies borrow the dataset and are serialized before it is dropped

pub async fn options(State(state): State<AppState>) -> Result<Response> {
    let dataset = state.loader.load().await?;
    let options = dataset.options();

    Ok(Json(OptionsResponse {
        options,
        default_selection: options.default_selection(),
    })
    .into_response())
}

pub async fn summary(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let dataset = state.loader.load().await?;
    let selection = selection_from_query(query.as_deref(), dataset.options())?;

    let filtered = selection.apply(dataset.records());
    let response = SummaryResponse {
        summary: DashboardSummary::compute(&filtered),
        attention: attention_rows(&filtered),
        selection,
    };

    tracing::debug!(
        "Summary for {} deliveries, {} need attention",
        response.summary.deliveries,
        response.attention.len()
    );
    Ok(Json(response).into_response())
}

pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let dataset = state.loader.load().await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "records": dataset.len(),
            "quarantined": dataset.quarantined(),
        })),
    ))
}
