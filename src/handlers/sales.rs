// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::{date_range::{optional_range, DateBound}, products::validate_money},
    models::sale::{NewSale, NewSaleLine, SaleDetail, SalePatch, SaleStatus},
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemPayload {
    pub product_id: Uuid,
    pub variant_id: Uuid,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 2)]
    pub quantity: i32,

    /// Preço efetivamente cobrado; sem ele vale o preço de venda da variante.
    #[validate(custom(function = "validate_money"))]
    #[schema(example = 40.0)]
    pub actual_selling_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    pub customer: Option<String>,

    #[serde(default)]
    pub status: SaleStatus,

    #[validate(length(min = 1, message = "A venda precisa de ao menos um item."), nested)]
    pub items: Vec<SaleItemPayload>,
}

impl From<CreateSalePayload> for NewSale {
    fn from(payload: CreateSalePayload) -> Self {
        NewSale {
            customer: payload.customer.filter(|c| !c.trim().is_empty()),
            status: payload.status,
            lines: payload
                .items
                .into_iter()
                .map(|item| NewSaleLine {
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                    actual_selling_price: item.actual_selling_price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSalePayload {
    pub status: Option<SaleStatus>,
    /// Ausente mantém o cliente; `null` (ou texto em branco) o remove.
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<String>)]
    pub customer: Option<Option<String>>,
}

// Diferencia campo ausente (`None`, via `default`) de `null` explícito (`Some(None)`).
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl From<UpdateSalePayload> for SalePatch {
    fn from(payload: UpdateSalePayload) -> Self {
        SalePatch {
            status: payload.status,
            customer: payload
                .customer
                .map(|customer| customer.filter(|c| !c.trim().is_empty())),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesQuery {
    /// Início do período (RFC 3339 ou AAAA-MM-DD). Exige `end`.
    #[param(value_type = Option<String>)]
    pub start: Option<DateBound>,
    /// Fim do período, inclusivo. Exige `start`.
    #[param(value_type = Option<String>)]
    pub end: Option<DateBound>,
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(SalesQuery),
    responses(
        (status = 200, description = "Vendas, das mais recentes para as mais antigas", body = Vec<SaleDetail>),
        (status = 400, description = "Período inválido")
    )
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SalesQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let sales = match optional_range(query.start, query.end)? {
        Some((start, end)) => app_state.sale_service.get_by_date_range(start, end).await?,
        None => app_state.sale_service.get_all().await?,
    };
    Ok((StatusCode::OK, Json(sales)))
}

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CreateSalePayload,
    responses(
        (status = 201, description = "Venda registrada e estoque baixado", body = SaleDetail),
        (status = 400, description = "Payload inválido"),
        (status = 404, description = "Variante não encontrada"),
        (status = 409, description = "Estoque insuficiente")
    )
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateSalePayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let sale = app_state.sale_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda com itens", body = SaleDetail),
        (status = 404, description = "Venda não encontrada")
    )
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let sale = app_state
        .sale_service
        .get_by_id(id)
        .await?
        .ok_or(AppError::SaleNotFound)?;
    Ok((StatusCode::OK, Json(sale)))
}

// PATCH /api/sales/{id}
#[utoipa::path(
    patch,
    path = "/api/sales/{id}",
    tag = "Sales",
    request_body = UpdateSalePayload,
    params(("id" = Uuid, Path, description = "ID da venda")),
    responses(
        (status = 200, description = "Venda atualizada (estoque não é devolvido)", body = SaleDetail),
        (status = 404, description = "Venda não encontrada")
    )
)]
pub async fn update_sale(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateSalePayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let sale = app_state
        .sale_service
        .update(id, payload.into())
        .await?
        .ok_or(AppError::SaleNotFound)?;
    Ok((StatusCode::OK, Json(sale)))
}
