// src/db/product_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::product::{NewProduct, NewVariant, Product, ProductPatch, ProductVariant},
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn list_products<'e, E>(&self, executor: E) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    pub async fn find_products_by_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ANY($1) ORDER BY name ASC",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }

    pub async fn find_product<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    /// Variantes de vários produtos de uma vez (evita N+1).
    pub async fn variants_for<'e, E>(
        &self,
        executor: E,
        product_ids: &[Uuid],
    ) -> Result<Vec<ProductVariant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT * FROM product_variants
            WHERE product_id = ANY($1)
            ORDER BY product_id, position ASC, name ASC
            "#,
        )
        .bind(product_ids)
        .fetch_all(executor)
        .await?;
        Ok(variants)
    }

    /// Produtos com alguma variante entre 1 e `threshold` unidades.
    pub async fn low_stock_product_ids<'e, E>(
        &self,
        executor: E,
        threshold: i32,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT product_id FROM product_variants
            WHERE quantity > 0 AND quantity <= $1
            "#,
        )
        .bind(threshold)
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    /// Produtos com alguma variante zerada.
    pub async fn out_of_stock_product_ids<'e, E>(&self, executor: E) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT product_id FROM product_variants WHERE quantity = 0",
        )
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    /// Trava a linha da variante até o fim da transação (usado na venda).
    pub async fn get_variant_for_update<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<ProductVariant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let variant = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT * FROM product_variants
            WHERE product_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(variant_id)
        .fetch_optional(executor)
        .await?;
        Ok(variant)
    }

    // ---
    // Funções de "Escrita" (rodam dentro da transação do service)
    // ---

    pub async fn insert_product<'e, E>(&self, executor: E, product: &NewProduct) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, category, description, brand, compatible_models)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.description.as_deref())
        .bind(product.brand.as_deref())
        .bind(&product.compatible_models)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn insert_variant<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        position: i32,
        variant: &NewVariant,
    ) -> Result<ProductVariant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProductVariant>(
            r#"
            INSERT INTO product_variants
                (product_id, name, sku, cost_price, selling_price, quantity, attributes, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(&variant.name)
        .bind(&variant.sku)
        .bind(variant.cost_price)
        .bind(variant.selling_price)
        .bind(variant.quantity)
        .bind(Json(&variant.attributes))
        .bind(position)
        .fetch_one(executor)
        .await
        .map_err(|e| map_sku_violation(e, &variant.sku))
    }

    /// Atualização parcial: campos `None` ficam como estão.
    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name              = COALESCE($2, name),
                category          = COALESCE($3, category),
                description       = COALESCE($4, description),
                brand             = COALESCE($5, brand),
                compatible_models = COALESCE($6, compatible_models),
                updated_at        = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.category.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.brand.as_deref())
        .bind(patch.compatible_models.as_deref())
        .fetch_optional(executor)
        .await?;
        Ok(updated)
    }

    pub async fn update_variant<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        variant_id: Uuid,
        position: i32,
        variant: &NewVariant,
    ) -> Result<Option<ProductVariant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProductVariant>(
            r#"
            UPDATE product_variants SET
                name = $3, sku = $4, cost_price = $5, selling_price = $6,
                quantity = $7, attributes = $8, position = $9
            WHERE product_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(variant_id)
        .bind(&variant.name)
        .bind(&variant.sku)
        .bind(variant.cost_price)
        .bind(variant.selling_price)
        .bind(variant.quantity)
        .bind(Json(&variant.attributes))
        .bind(position)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sku_violation(e, &variant.sku))
    }

    /// Remove as variantes do produto que não estão em `keep`.
    pub async fn delete_variants_except<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        keep: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM product_variants WHERE product_id = $1 AND NOT (id = ANY($2))",
        )
        .bind(product_id)
        .bind(keep)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Soma `delta` ao estoque da variante de forma atômica (negativo = baixa).
    pub async fn adjust_variant_stock<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        variant_id: Uuid,
        delta: i32,
    ) -> Result<Option<ProductVariant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let variant = sqlx::query_as::<_, ProductVariant>(
            r#"
            UPDATE product_variants
            SET quantity = quantity + $3
            WHERE product_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(variant_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;
        Ok(variant)
    }

    pub async fn touch_product<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE products SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete_product<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Converte erro de violação de chave única em um erro mais amigável
fn map_sku_violation(e: sqlx::Error, sku: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::SkuAlreadyExists(sku.to_string());
        }
    }
    e.into()
}
