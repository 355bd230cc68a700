// src/services/product_service.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::product::{NewProduct, Product, ProductDetail, ProductPatch, ProductVariant},
};

#[derive(Clone)]
pub struct ProductService {
    repo: ProductRepository,
    low_stock_threshold: i32,
}

impl ProductService {
    pub fn new(repo: ProductRepository, low_stock_threshold: i32) -> Self {
        Self { repo, low_stock_threshold }
    }

    pub async fn get_all(&self) -> Result<Vec<ProductDetail>, AppError> {
        let products = self.repo.list_products(self.repo.pool()).await?;
        self.with_variants(products).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ProductDetail>, AppError> {
        match self.repo.find_product(self.repo.pool(), id).await? {
            Some(product) => Ok(self.with_variants(vec![product]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn get_low_stock(&self, threshold: i32) -> Result<Vec<ProductDetail>, AppError> {
        let ids = self.repo.low_stock_product_ids(self.repo.pool(), threshold).await?;
        self.load_many(&ids).await
    }

    pub async fn get_out_of_stock(&self) -> Result<Vec<ProductDetail>, AppError> {
        let ids = self.repo.out_of_stock_product_ids(self.repo.pool()).await?;
        self.load_many(&ids).await
    }

    // --- CREATE (produto + variantes numa transação) ---
    pub async fn create(&self, new_product: NewProduct) -> Result<ProductDetail, AppError> {
        let mut tx = self.repo.pool().begin().await?;

        let product = self.repo.insert_product(&mut *tx, &new_product).await?;

        let mut variants = Vec::with_capacity(new_product.variants.len());
        for (position, variant) in new_product.variants.iter().enumerate() {
            let created = self
                .repo
                .insert_variant(&mut *tx, product.id, position as i32, variant)
                .await?;
            variants.push(created);
        }

        tx.commit().await?;

        tracing::info!(product_id = %product.id, variants = variants.len(), "Produto criado");
        Ok(ProductDetail::new(product, variants, self.low_stock_threshold))
    }

    // --- UPDATE (parcial; se vierem variantes, o conjunto é reconciliado) ---
    pub async fn update(&self, id: Uuid, patch: ProductPatch) -> Result<Option<ProductDetail>, AppError> {
        let mut tx = self.repo.pool().begin().await?;

        let Some(product) = self.repo.update_product(&mut *tx, id, &patch).await? else {
            return Ok(None);
        };

        if let Some(upserts) = &patch.variants {
            // 1. Remove primeiro o que saiu da lista (libera os SKUs para reuso)
            let keep: Vec<Uuid> = upserts.iter().filter_map(|u| u.id).collect();
            let removed = self.repo.delete_variants_except(&mut *tx, id, &keep).await?;

            // 2. Atualiza as existentes e cria as novas, na ordem recebida
            for (position, upsert) in upserts.iter().enumerate() {
                let position = position as i32;
                match upsert.id {
                    Some(variant_id) => {
                        self.repo
                            .update_variant(&mut *tx, id, variant_id, position, &upsert.variant)
                            .await?
                            .ok_or(AppError::VariantNotFound { product_id: id, variant_id })?;
                    }
                    None => {
                        self.repo
                            .insert_variant(&mut *tx, id, position, &upsert.variant)
                            .await?;
                    }
                }
            }

            tracing::debug!(product_id = %id, removed, kept = keep.len(), "Variantes reconciliadas");
        }

        let variants = self.repo.variants_for(&mut *tx, &[id]).await?;
        tx.commit().await?;

        Ok(Some(ProductDetail::new(product, variants, self.low_stock_threshold)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let deleted = self.repo.delete_product(self.repo.pool(), id).await?;
        if deleted {
            tracing::info!(product_id = %id, "Produto removido");
        }
        Ok(deleted)
    }

    // --- ENTRADA DE ESTOQUE ---
    pub async fn add_stock(
        &self,
        product_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<ProductVariant, AppError> {
        let mut tx = self.repo.pool().begin().await?;

        if self.repo.find_product(&mut *tx, product_id).await?.is_none() {
            return Err(AppError::ProductNotFound);
        }

        let variant = self
            .repo
            .adjust_variant_stock(&mut *tx, product_id, variant_id, quantity)
            .await?
            .ok_or(AppError::VariantNotFound { product_id, variant_id })?;

        self.repo.touch_product(&mut *tx, product_id).await?;
        tx.commit().await?;

        tracing::info!(%product_id, %variant_id, quantity, new_quantity = variant.quantity, "Entrada de estoque");
        Ok(variant.with_stock_status(self.low_stock_threshold))
    }

    // ---
    // Auxiliares
    // ---

    async fn load_many(&self, ids: &[Uuid]) -> Result<Vec<ProductDetail>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let products = self.repo.find_products_by_ids(self.repo.pool(), ids).await?;
        self.with_variants(products).await
    }

    async fn with_variants(&self, products: Vec<Product>) -> Result<Vec<ProductDetail>, AppError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let variants = self.repo.variants_for(self.repo.pool(), &ids).await?;
        Ok(assemble(products, variants, self.low_stock_threshold))
    }
}

/// Junta cada produto com as suas variantes, mantendo a ordem dos produtos.
fn assemble(
    products: Vec<Product>,
    variants: Vec<ProductVariant>,
    low_stock_threshold: i32,
) -> Vec<ProductDetail> {
    let mut by_product: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for variant in variants {
        by_product.entry(variant.product_id).or_default().push(variant);
    }

    products
        .into_iter()
        .map(|product| {
            let variants = by_product.remove(&product.id).unwrap_or_default();
            ProductDetail::new(product, variants, low_stock_threshold)
        })
        .collect()
}
