// src/db/sale_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sale::{Sale, SaleDetail, SaleItem, SalePatch, SaleStatus},
    services::analytics_service::SaleSource,
};

#[derive(Clone)]
pub struct SaleRepository {
    pool: PgPool,
}

impl SaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---
    // Consultas completas (cabeçalho + itens), direto na pool
    // ---

    pub async fn get_all(&self) -> Result<Vec<SaleDetail>, AppError> {
        let sales = sqlx::query_as::<_, Sale>("SELECT * FROM sales ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        self.with_items(sales).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<SaleDetail>, AppError> {
        match self.find_sale(&self.pool, id).await? {
            Some(sale) => Ok(self.with_items(vec![sale]).await?.pop()),
            None => Ok(None),
        }
    }

    /// `[start, end]` inclusivo nas duas pontas, mais recentes primeiro.
    pub async fn get_sales_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SaleDetail>, AppError> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE created_at >= $1 AND created_at <= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        self.with_items(sales).await
    }

    async fn with_items(&self, sales: Vec<Sale>) -> Result<Vec<SaleDetail>, AppError> {
        if sales.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();
        let items = self.items_for(&self.pool, &ids).await?;
        Ok(attach_items(sales, items))
    }

    // ---
    // Funções genéricas (aceitam pool, conexão ou transação)
    // ---

    pub async fn find_sale<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn items_for<'e, E>(&self, executor: E, sale_ids: &[Uuid]) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT * FROM sale_items
            WHERE sale_id = ANY($1)
            ORDER BY sale_id, position ASC
            "#,
        )
        .bind(sale_ids)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        customer: Option<&str>,
        total: Decimal,
        profit: Decimal,
        status: SaleStatus,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (customer, total, profit, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(customer)
        .bind(total)
        .bind(profit)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        position: i32,
        item: &SaleItem,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (
                sale_id, position, product_id, variant_id, name, sku,
                quantity, cost_price, selling_price, actual_selling_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(position)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(&item.name)
        .bind(&item.sku)
        .bind(item.quantity)
        .bind(item.cost_price)
        .bind(item.selling_price)
        .bind(item.actual_selling_price)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    /// Atualização parcial (status / cliente); `updated_at` sempre avança.
    /// O cliente só muda quando veio no patch, inclusive para ser apagado.
    pub async fn update_sale<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        patch: &SalePatch,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET
                status     = COALESCE($2, status),
                customer   = CASE WHEN $3 THEN $4 ELSE customer END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.status)
        .bind(patch.customer.is_some())
        .bind(patch.customer.as_ref().and_then(|c| c.as_deref()))
        .fetch_optional(executor)
        .await?;
        Ok(sale)
    }
}

#[async_trait]
impl SaleSource for SaleRepository {
    async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SaleDetail>, AppError> {
        self.get_sales_by_date_range(start, end).await
    }
}

/// Distribui os itens pelas vendas, preservando a ordem das vendas e dos itens.
fn attach_items(sales: Vec<Sale>, items: Vec<SaleItem>) -> Vec<SaleDetail> {
    let mut by_sale: HashMap<Uuid, Vec<SaleItem>> = HashMap::new();
    for item in items {
        by_sale.entry(item.sale_id).or_default().push(item);
    }

    sales
        .into_iter()
        .map(|sale| {
            let items = by_sale.remove(&sale.id).unwrap_or_default();
            SaleDetail { sale, items }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(id: Uuid) -> Sale {
        let now = Utc::now();
        Sale {
            id,
            customer: None,
            total: Decimal::ZERO,
            profit: Decimal::ZERO,
            status: SaleStatus::Completed,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(sale_id: Uuid, sku: &str) -> SaleItem {
        SaleItem {
            sale_id,
            product_id: Uuid::new_v4(),
            variant_id: Uuid::new_v4(),
            name: sku.into(),
            sku: sku.into(),
            quantity: 1,
            cost_price: Decimal::ONE,
            selling_price: Decimal::TWO,
            actual_selling_price: Decimal::TWO,
        }
    }

    #[test]
    fn attach_items_keeps_sale_order_and_item_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let details = attach_items(
            vec![sale(b), sale(a), sale(c)],
            vec![item(a, "A1"), item(b, "B1"), item(a, "A2")],
        );

        assert_eq!(details.len(), 3);
        assert_eq!(details[0].sale.id, b);
        assert_eq!(details[0].items.len(), 1);

        let skus: Vec<&str> = details[1].items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, ["A1", "A2"]);

        // venda sem itens continua na lista
        assert_eq!(details[2].sale.id, c);
        assert!(details[2].items.is_empty());
    }
}
