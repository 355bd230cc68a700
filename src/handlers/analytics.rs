// src/handlers/analytics.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::date_range::{range_or_last_30_days, DateBound},
    models::analytics::{AnalyticsReport, StatusPolicy},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// Início do período. Padrão: 30 dias antes de `end`.
    #[param(value_type = Option<String>)]
    pub start: Option<DateBound>,
    /// Fim do período, inclusivo. Padrão: agora.
    #[param(value_type = Option<String>)]
    pub end: Option<DateBound>,
    /// `completed` (padrão) ou `all`.
    #[serde(default)]
    #[param(inline)]
    pub status: StatusPolicy,
}

// GET /api/analytics
#[utoipa::path(
    get,
    path = "/api/analytics",
    tag = "Analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Totais, margem e desempenho por SKU", body = AnalyticsReport),
        (status = 400, description = "Período inválido"),
        (status = 500, description = "Venda gravada com item corrompido")
    )
)]
pub async fn get_analytics(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AnalyticsQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let (start, end) = range_or_last_30_days(query.start, query.end, Utc::now())?;

    let report = app_state
        .analytics_service
        .report(start, end, query.status)
        .await?;

    Ok((StatusCode::OK, Json(report)))
}
