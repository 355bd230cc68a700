// src/models/sale.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum SaleStatus {
    #[default]
    Completed,
    Pending,
    Refunded,
}

// --- Venda (cabeçalho) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(example = "Oficina do Zé")]
    pub customer: Option<String>,
    #[schema(example = 242.0)]
    pub total: Decimal,
    #[schema(example = 98.0)]
    pub profit: Decimal,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Item da venda ---
// Retrato do produto no momento da venda (nome, SKU e preços copiados).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    #[serde(skip)]
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub name: String,
    #[schema(example = "BP-FRONT-001")]
    pub sku: String,
    #[schema(example = 4)]
    pub quantity: i32,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    /// Preço efetivamente cobrado (pode ter desconto).
    pub actual_selling_price: Decimal,
}

impl SaleItem {
    pub fn line_revenue(&self) -> Decimal {
        Decimal::from(self.quantity) * self.actual_selling_price
    }

    pub fn line_profit(&self) -> Decimal {
        Decimal::from(self.quantity) * (self.actual_selling_price - self.cost_price)
    }
}

/// Soma (total, lucro) a partir dos itens.
pub fn totals_from_items<'a>(items: impl IntoIterator<Item = &'a SaleItem>) -> (Decimal, Decimal) {
    items.into_iter().fold((Decimal::ZERO, Decimal::ZERO), |(total, profit), item| {
        (total + item.line_revenue(), profit + item.line_profit())
    })
}

// --- Venda completa (documento da API) ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// ---
// Estruturas de escrita
// ---

#[derive(Debug, Clone)]
pub struct NewSaleLine {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    /// `None` => usa o preço de catálogo da variante.
    pub actual_selling_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub customer: Option<String>,
    pub status: SaleStatus,
    pub lines: Vec<NewSaleLine>,
}

#[derive(Debug, Clone, Default)]
pub struct SalePatch {
    pub status: Option<SaleStatus>,
    /// `None` mantém; `Some(None)` apaga; `Some(Some(nome))` troca.
    pub customer: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, quantity: i32, cost: i64, price: i64) -> SaleItem {
        SaleItem {
            sale_id: Uuid::nil(),
            product_id: Uuid::nil(),
            variant_id: Uuid::nil(),
            name: sku.to_lowercase(),
            sku: sku.into(),
            quantity,
            cost_price: Decimal::from(cost),
            selling_price: Decimal::from(price),
            actual_selling_price: Decimal::from(price),
        }
    }

    #[test]
    fn totals_follow_actual_selling_price() {
        let mut discounted = item("OF-001", 1, 5, 15);
        discounted.actual_selling_price = Decimal::from(12);

        let items = vec![item("BP-FRONT-001", 4, 25, 45), discounted];
        let (total, profit) = totals_from_items(&items);

        assert_eq!(total, Decimal::from(192));
        assert_eq!(profit, Decimal::from(87));
    }

    #[test]
    fn status_round_trips_lowercase() {
        let json = serde_json::to_string(&SaleStatus::Refunded).unwrap();
        assert_eq!(json, "\"refunded\"");
        let parsed: SaleStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, SaleStatus::Pending);
        assert_eq!(SaleStatus::default(), SaleStatus::Completed);
    }
}
