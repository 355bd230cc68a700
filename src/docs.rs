// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Products ---
        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::list_low_stock,
        handlers::products::list_out_of_stock,
        handlers::products::add_stock,

        // --- Sales ---
        handlers::sales::list_sales,
        handlers::sales::create_sale,
        handlers::sales::get_sale,
        handlers::sales::update_sale,

        // --- Analytics ---
        handlers::analytics::get_analytics,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::product::Product,
            models::product::ProductVariant,
            models::product::ProductDetail,
            models::product::StockStatus,

            // --- Vendas ---
            models::sale::SaleStatus,
            models::sale::Sale,
            models::sale::SaleItem,
            models::sale::SaleDetail,

            // --- Relatórios ---
            models::analytics::StatusPolicy,
            models::analytics::ProductPerformance,
            models::analytics::AnalyticsReport,

            // --- Payloads ---
            handlers::products::VariantPayload,
            handlers::products::CreateProductPayload,
            handlers::products::UpdateProductPayload,
            handlers::products::AddStockPayload,
            handlers::sales::SaleItemPayload,
            handlers::sales::CreateSalePayload,
            handlers::sales::UpdateSalePayload,
        )
    ),
    tags(
        (name = "Products", description = "Catálogo de Peças e Estoque por Variante"),
        (name = "Sales", description = "Registro de Vendas (PDV)"),
        (name = "Analytics", description = "Faturamento, Lucro e Desempenho por SKU")
    )
)]
pub struct ApiDoc;
