use axum::{
    extract::{RawQuery, State},
    http::header,
    response::{Html, IntoResponse},
};

use super::{AppState, selection_from_query};
use crate::{
    error::Result,
    render::{DashboardView, render_dashboard},
    services::{
        DashboardSummary, attention_rows,
        export::{self, EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME},
    },
};

/// Dashboard page for the selection in the query string
pub async fn dashboard(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>> {
    let dataset = state.loader.load().await?;
    let selection = selection_from_query(query.as_deref(), dataset.options())?;

    let filtered = selection.apply(dataset.records());
    let attention = attention_rows(&filtered);
    let summary = DashboardSummary::compute(&filtered);

    Ok(Html(render_dashboard(&DashboardView {
        options: dataset.options(),
        selection: &selection,
        summary: &summary,
        attention: &attention,
        filtered: &filtered,
    })))
}

/// Filtered rows as a CSV attachment
pub async fn download_csv(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let dataset = state.loader.load().await?;
    let selection = selection_from_query(query.as_deref(), dataset.options())?;

    let filtered = selection.apply(dataset.records());
    let body = export::to_csv(&filtered)?;
    tracing::info!("Exporting {} deliveries as {}", filtered.len(), EXPORT_FILE_NAME);

    Ok((
        [
            (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}
