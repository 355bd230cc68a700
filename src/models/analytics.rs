// src/models/analytics.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// 1. Desempenho por SKU (uma linha por SKU na janela)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPerformance {
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub revenue: Decimal,
    pub profit: Decimal,
}

// 2. Relatório do período
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_sales: Decimal,
    pub total_profit: Decimal,
    /// Percentual (0 quando não houve vendas).
    pub profit_margin: Decimal,
    pub sales_count: usize,
    pub product_performance: Vec<ProductPerformance>,
}

impl AnalyticsReport {
    pub fn empty() -> Self {
        Self {
            total_sales: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            profit_margin: Decimal::ZERO,
            sales_count: 0,
            product_performance: Vec::new(),
        }
    }
}

// 3. Quais vendas entram no relatório
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Só vendas `completed` (pendentes e estornadas ficam de fora).
    #[default]
    Completed,
    /// Todas as vendas recebidas, qualquer status.
    All,
}
