use crate::dtos::AnalyticsFilter;
use crate::services::analytics::generate_report;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use service_core::error::AppError;

#[tracing::instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(filter): Query<AnalyticsFilter>,
) -> Result<impl IntoResponse, AppError> {
    let report = generate_report(state.tickets.as_ref(), filter, Local::now()).await?;
    Ok(Json(report))
}
