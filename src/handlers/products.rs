// src/handlers/products.rs

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    models::product::{
        NewProduct, NewVariant, ProductDetail, ProductPatch, ProductVariant, VariantUpsert,
    },
};

// ---
// Validação Customizada
// ---

/// Valores em dinheiro: não negativos e com no máximo 2 casas (a coluna é NUMERIC(12,2)).
pub(crate) fn validate_money(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    if val.normalize().scale() > 2 {
        let mut err = ValidationError::new("scale");
        err.message = Some("Use no máximo 2 casas decimais.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payloads
// ---

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariantPayload {
    /// Só no PUT: com id atualiza a variante existente, sem id cria uma nova.
    pub id: Option<Uuid>,

    #[validate(length(min = 1, message = "O nome da variante é obrigatório."))]
    #[schema(example = "Cerâmica")]
    pub name: String,

    #[validate(length(min = 1, message = "O SKU é obrigatório."))]
    #[schema(example = "BP-FRONT-001")]
    pub sku: String,

    #[validate(custom(function = "validate_money"))]
    #[schema(example = 25.0)]
    pub cost_price: Decimal,

    #[validate(custom(function = "validate_money"))]
    #[schema(example = 45.0)]
    pub selling_price: Decimal,

    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    #[serde(default)]
    #[schema(example = 12)]
    pub quantity: i32,

    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl VariantPayload {
    fn into_upsert(self) -> VariantUpsert {
        VariantUpsert {
            id: self.id,
            variant: NewVariant {
                name: self.name,
                sku: self.sku.trim().to_string(),
                cost_price: self.cost_price,
                selling_price: self.selling_price,
                quantity: self.quantity,
                attributes: self.attributes,
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Pastilha de Freio Dianteira")]
    pub name: String,

    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    #[schema(example = "Freios")]
    pub category: String,

    pub description: Option<String>,
    pub brand: Option<String>,

    #[serde(default)]
    pub compatible_models: Vec<String>,

    #[validate(length(min = 1, message = "Cadastre ao menos uma variante."), nested)]
    pub variants: Vec<VariantPayload>,
}

impl From<CreateProductPayload> for NewProduct {
    fn from(payload: CreateProductPayload) -> Self {
        NewProduct {
            name: payload.name,
            category: payload.category,
            description: payload.description,
            brand: payload.brand,
            compatible_models: payload.compatible_models,
            variants: payload
                .variants
                .into_iter()
                .map(|v| v.into_upsert().variant)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "A categoria não pode ser vazia."))]
    pub category: Option<String>,

    pub description: Option<String>,
    pub brand: Option<String>,
    pub compatible_models: Option<Vec<String>>,

    #[validate(length(min = 1, message = "O produto precisa de ao menos uma variante."), nested)]
    pub variants: Option<Vec<VariantPayload>>,
}

impl From<UpdateProductPayload> for ProductPatch {
    fn from(payload: UpdateProductPayload) -> Self {
        ProductPatch {
            name: payload.name,
            category: payload.category,
            description: payload.description,
            brand: payload.brand,
            compatible_models: payload.compatible_models,
            variants: payload
                .variants
                .map(|list| list.into_iter().map(VariantPayload::into_upsert).collect()),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddStockPayload {
    #[validate(range(min = 1, message = "Informe uma quantidade maior que zero."))]
    #[schema(example = 10)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct LowStockQuery {
    /// Padrão: LOW_STOCK_THRESHOLD da configuração.
    pub threshold: Option<i32>,
}

// ---
// Handlers
// ---

// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Products",
    responses(
        (status = 200, description = "Catálogo completo com variantes", body = Vec<ProductDetail>)
    )
)]
pub async fn list_products(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = app_state.product_service.get_all().await?;
    Ok((StatusCode::OK, Json(products)))
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = ProductDetail),
        (status = 400, description = "Payload inválido"),
        (status = 409, description = "SKU já cadastrado")
    )
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateProductPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = app_state.product_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = ProductDetail),
        (status = 404, description = "Produto não encontrado")
    )
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .product_service
        .get_by_id(id)
        .await?
        .ok_or(AppError::ProductNotFound)?;
    Ok((StatusCode::OK, Json(product)))
}

// PUT /api/products/{id}
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Products",
    request_body = UpdateProductPayload,
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto atualizado", body = ProductDetail),
        (status = 404, description = "Produto ou variante não encontrados")
    )
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateProductPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let product = app_state
        .product_service
        .update(id, payload.into())
        .await?
        .ok_or(AppError::ProductNotFound)?;
    Ok((StatusCode::OK, Json(product)))
}

// DELETE /api/products/{id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "Products",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto removido"),
        (status = 404, description = "Produto não encontrado")
    )
)]
pub async fn delete_product(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    if !app_state.product_service.delete(id).await? {
        return Err(AppError::ProductNotFound);
    }
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

// GET /api/products/low-stock
#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    tag = "Products",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Produtos com alguma variante entre 1 e o limite", body = Vec<ProductDetail>)
    )
)]
pub async fn list_low_stock(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<LowStockQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let threshold = query.threshold.unwrap_or(app_state.low_stock_threshold);
    if threshold < 0 {
        return Err(AppError::BadRequest("O limite não pode ser negativo.".to_string()));
    }

    let products = app_state.product_service.get_low_stock(threshold).await?;
    Ok((StatusCode::OK, Json(products)))
}

// GET /api/products/out-of-stock
#[utoipa::path(
    get,
    path = "/api/products/out-of-stock",
    tag = "Products",
    responses(
        (status = 200, description = "Produtos com alguma variante zerada", body = Vec<ProductDetail>)
    )
)]
pub async fn list_out_of_stock(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = app_state.product_service.get_out_of_stock().await?;
    Ok((StatusCode::OK, Json(products)))
}

// POST /api/products/{id}/variants/{variant_id}/stock
#[utoipa::path(
    post,
    path = "/api/products/{id}/variants/{variant_id}/stock",
    tag = "Products",
    request_body = AddStockPayload,
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("variant_id" = Uuid, Path, description = "ID da variante")
    ),
    responses(
        (status = 200, description = "Estoque atualizado", body = ProductVariant),
        (status = 404, description = "Produto ou variante não encontrados")
    )
)]
pub async fn add_stock(
    State(app_state): State<AppState>,
    WithRejection(Path((id, variant_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<AddStockPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let variant = app_state
        .product_service
        .add_stock(id, variant_id, payload.quantity)
        .await?;
    Ok((StatusCode::OK, Json(variant)))
}
