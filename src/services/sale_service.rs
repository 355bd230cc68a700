// src/services/sale_service.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProductRepository, SaleRepository},
    models::{
        product::ProductVariant,
        sale::{totals_from_items, NewSale, NewSaleLine, SaleDetail, SaleItem, SalePatch},
    },
};

#[derive(Clone)]
pub struct SaleService {
    sale_repo: SaleRepository,
    product_repo: ProductRepository,
}

impl SaleService {
    pub fn new(sale_repo: SaleRepository, product_repo: ProductRepository) -> Self {
        Self { sale_repo, product_repo }
    }

    pub async fn get_all(&self) -> Result<Vec<SaleDetail>, AppError> {
        self.sale_repo.get_all().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<SaleDetail>, AppError> {
        self.sale_repo.get_by_id(id).await
    }

    pub async fn get_by_date_range(
        &self,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<SaleDetail>, AppError> {
        if start > end {
            return Err(AppError::InvalidDateRange);
        }
        self.sale_repo.get_sales_by_date_range(start, end).await
    }

    // --- VENDA (PDV) ---
    // Tudo numa transação: trava as variantes, grava venda + itens e baixa o estoque.
    pub async fn create(&self, new_sale: NewSale) -> Result<SaleDetail, AppError> {
        let mut tx = self.sale_repo.pool().begin().await?;

        // 1. Trava cada variante e monta o "retrato" do item
        let mut items = Vec::with_capacity(new_sale.lines.len());
        let mut available: HashMap<Uuid, i32> = HashMap::new();
        for line in &new_sale.lines {
            let variant = self
                .product_repo
                .get_variant_for_update(&mut *tx, line.product_id, line.variant_id)
                .await?
                .ok_or(AppError::VariantNotFound {
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                })?;

            available.insert(variant.id, variant.quantity);
            items.push(snapshot_item(&variant, line));
        }

        // 2. Valida saldo (somando linhas repetidas da mesma variante)
        check_stock(&items, &available)?;

        // 3. Totais sempre derivados dos itens
        let (total, profit) = totals_from_items(&items);

        let sale = self
            .sale_repo
            .insert_sale(&mut *tx, new_sale.customer.as_deref(), total, profit, new_sale.status)
            .await?;

        // 4. Itens + baixa de estoque (uma vez por item)
        let mut saved_items = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let saved = self
                .sale_repo
                .insert_item(&mut *tx, sale.id, position as i32, item)
                .await?;

            self.product_repo
                .adjust_variant_stock(&mut *tx, item.product_id, item.variant_id, -item.quantity)
                .await?;

            saved_items.push(saved);
        }

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            items = saved_items.len(),
            total = %sale.total,
            profit = %sale.profit,
            "Venda registrada"
        );

        Ok(SaleDetail { sale, items: saved_items })
    }

    pub async fn update(&self, id: Uuid, patch: SalePatch) -> Result<Option<SaleDetail>, AppError> {
        let Some(sale) = self.sale_repo.update_sale(self.sale_repo.pool(), id, &patch).await? else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            tracing::info!(sale_id = %id, ?status, "Status da venda alterado");
        }

        let items = self.sale_repo.items_for(self.sale_repo.pool(), &[sale.id]).await?;
        Ok(Some(SaleDetail { sale, items }))
    }
}

/// Copia nome, SKU e preços da variante; o preço cobrado cai no de catálogo se não vier.
fn snapshot_item(variant: &ProductVariant, line: &NewSaleLine) -> SaleItem {
    SaleItem {
        sale_id: Uuid::nil(),
        product_id: variant.product_id,
        variant_id: variant.id,
        name: variant.name.clone(),
        sku: variant.sku.clone(),
        quantity: line.quantity,
        cost_price: variant.cost_price,
        selling_price: variant.selling_price,
        actual_selling_price: line.actual_selling_price.unwrap_or(variant.selling_price),
    }
}

/// Quantidade pedida por variante, na ordem em que aparecem.
/// Soma em i64: várias linhas da mesma variante não estouram o i32.
fn requested_per_variant(items: &[SaleItem]) -> Vec<(Uuid, &str, i64)> {
    let mut totals: Vec<(Uuid, &str, i64)> = Vec::new();
    for item in items {
        let quantity = i64::from(item.quantity);
        match totals.iter_mut().find(|(v, _, _)| *v == item.variant_id) {
            Some(entry) => entry.2 += quantity,
            None => totals.push((item.variant_id, item.sku.as_str(), quantity)),
        }
    }
    totals
}

fn check_stock(items: &[SaleItem], available: &HashMap<Uuid, i32>) -> Result<(), AppError> {
    for (variant_id, sku, requested) in requested_per_variant(items) {
        let available = available.get(&variant_id).copied().unwrap_or(0);
        if i64::from(available) < requested {
            return Err(AppError::InsufficientStock {
                sku: sku.to_string(),
                available,
                requested,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use sqlx::types::Json;

    fn variant(sku: &str, cost: i64, price: i64) -> ProductVariant {
        ProductVariant {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            name: format!("Variante {sku}"),
            sku: sku.into(),
            cost_price: Decimal::from(cost),
            selling_price: Decimal::from(price),
            quantity: 10,
            attributes: Json(HashMap::new()),
            stock_status: None,
        }
    }

    fn line(v: &ProductVariant, quantity: i32, price: Option<i64>) -> NewSaleLine {
        NewSaleLine {
            product_id: v.product_id,
            variant_id: v.id,
            quantity,
            actual_selling_price: price.map(Decimal::from),
        }
    }

    #[test]
    fn snapshot_defaults_to_catalog_price() {
        let pads = variant("BP-FRONT-001", 25, 45);
        let item = snapshot_item(&pads, &line(&pads, 4, None));

        assert_eq!(item.sku, "BP-FRONT-001");
        assert_eq!(item.actual_selling_price, Decimal::from(45));
        assert_eq!(item.cost_price, Decimal::from(25));
        assert_eq!(item.line_revenue(), Decimal::from(180));
        assert_eq!(item.line_profit(), Decimal::from(80));
    }

    #[test]
    fn snapshot_honours_price_override() {
        let filter = variant("OF-001", 5, 15);
        let item = snapshot_item(&filter, &line(&filter, 1, Some(12)));

        assert_eq!(item.selling_price, Decimal::from(15));
        assert_eq!(item.actual_selling_price, Decimal::from(12));
        assert_eq!(item.line_profit(), Decimal::from(7));
    }

    #[test]
    fn repeated_variant_lines_are_summed_for_stock_check() {
        let pads = variant("BP-FRONT-001", 25, 45);
        let filter = variant("OF-001", 5, 12);
        let items = vec![
            snapshot_item(&pads, &line(&pads, 2, None)),
            snapshot_item(&filter, &line(&filter, 1, None)),
            snapshot_item(&pads, &line(&pads, 3, Some(40))),
        ];

        let requested = requested_per_variant(&items);

        assert_eq!(requested.len(), 2);
        assert_eq!(requested[0].0, pads.id);
        assert_eq!(requested[0].2, 5);
        assert_eq!(requested[1].1, "OF-001");
        assert_eq!(requested[1].2, 1);
    }

    #[test]
    fn stock_check_rejects_oversell_across_lines() {
        let pads = variant("BP-FRONT-001", 25, 45);
        let items = vec![
            snapshot_item(&pads, &line(&pads, 6, None)),
            snapshot_item(&pads, &line(&pads, 5, None)),
        ];
        let available = HashMap::from([(pads.id, 10)]);

        match check_stock(&items, &available) {
            Err(AppError::InsufficientStock { sku, available, requested }) => {
                assert_eq!(sku, "BP-FRONT-001");
                assert_eq!(available, 10);
                assert_eq!(requested, 11);
            }
            other => panic!("esperava estoque insuficiente, veio {other:?}"),
        }
    }

    #[test]
    fn huge_repeated_lines_do_not_wrap_around() {
        let pads = variant("BP-FRONT-001", 25, 45);
        let items = vec![
            snapshot_item(&pads, &line(&pads, i32::MAX, None)),
            snapshot_item(&pads, &line(&pads, 2, None)),
        ];
        let available = HashMap::from([(pads.id, i32::MAX)]);

        match check_stock(&items, &available) {
            Err(AppError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, i32::MAX);
                assert_eq!(requested, i64::from(i32::MAX) + 2);
            }
            other => panic!("esperava estoque insuficiente, veio {other:?}"),
        }
    }

    #[test]
    fn stock_check_accepts_exact_balance() {
        let filter = variant("OF-001", 5, 12);
        let items = vec![snapshot_item(&filter, &line(&filter, 10, None))];
        let available = HashMap::from([(filter.id, 10)]);

        assert!(check_stock(&items, &available).is_ok());
    }
}
