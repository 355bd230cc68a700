// src/models/product.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Produto (linha da tabela 'products') ---
// O catálogo "pai". As variantes ficam em 'product_variants'.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "Pastilha de Freio Dianteira")]
    pub name: String,
    #[schema(example = "Freios")]
    pub category: String,
    pub description: Option<String>,
    #[schema(example = "Bosch")]
    pub brand: Option<String>,
    pub compatible_models: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Variante (SKU com preço e estoque próprios) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "Cerâmica")]
    pub name: String,
    #[schema(example = "BP-FRONT-001")]
    pub sku: String,
    #[schema(example = 25.0)]
    pub cost_price: Decimal,
    #[schema(example = 45.0)]
    pub selling_price: Decimal,
    #[schema(example = 12)]
    pub quantity: i32,
    #[schema(value_type = HashMap<String, String>)]
    pub attributes: Json<HashMap<String, String>>,
    /// Calculado na leitura a partir do limite de estoque baixo.
    #[sqlx(skip)]
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub stock_status: Option<StockStatus>,
}

impl ProductVariant {
    pub fn with_stock_status(mut self, low_stock_threshold: i32) -> Self {
        self.stock_status = Some(StockStatus::classify(self.quantity, low_stock_threshold));
        self
    }
}

// --- 3. Situação do estoque (derivada, não persistida) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StockStatus {
    InStock,    // "in-stock"
    LowStock,   // "low-stock"
    OutOfStock, // "out-of-stock"
}

impl StockStatus {
    /// `0` => sem estoque; `1..=threshold` => estoque baixo.
    /// O banco não aceita estoque negativo; aqui ele também conta como sem estoque.
    pub fn classify(quantity: i32, low_stock_threshold: i32) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

// --- 4. Produto completo (o "documento" devolvido pela API) ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    /// Soma do estoque de todas as variantes.
    pub total_stock: i64,
}

impl ProductDetail {
    pub fn new(product: Product, variants: Vec<ProductVariant>, low_stock_threshold: i32) -> Self {
        let variants: Vec<ProductVariant> = variants
            .into_iter()
            .map(|v| v.with_stock_status(low_stock_threshold))
            .collect();
        let total_stock = variants.iter().map(|v| i64::from(v.quantity)).sum();
        Self { product, variants, total_stock }
    }
}

// ---
// Estruturas de escrita (usadas pelo service/repo, já validadas no handler)
// ---

#[derive(Debug, Clone)]
pub struct NewVariant {
    pub name: String,
    pub sku: String,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub quantity: i32,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub compatible_models: Vec<String>,
    pub variants: Vec<NewVariant>,
}

/// Variante enviada num PUT: com `id` atualiza, sem `id` cria.
#[derive(Debug, Clone)]
pub struct VariantUpsert {
    pub id: Option<Uuid>,
    pub variant: NewVariant,
}

/// Atualização parcial: `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub compatible_models: Option<Vec<String>>,
    pub variants: Option<Vec<VariantUpsert>>,
}
