// src/config.rs

use std::{env, sync::Arc};

use anyhow::Context;

use crate::{
    db::{Database, ProductRepository, SaleRepository},
    services::{
        analytics_service::AnalyticsService, product_service::ProductService,
        sale_service::SaleService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub low_stock_threshold: i32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave -> valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS inválido: '{raw}'"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let low_stock_threshold = match lookup("LOW_STOCK_THRESHOLD") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("LOW_STOCK_THRESHOLD inválido: '{raw}'"))?,
            None => DEFAULT_LOW_STOCK_THRESHOLD,
        };

        Ok(Self {
            database_url,
            bind_addr,
            database_max_connections,
            low_stock_threshold,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub low_stock_threshold: i32,
    pub product_service: ProductService,
    pub sale_service: SaleService,
    pub analytics_service: AnalyticsService,
}

impl AppState {
    /// A sessão continua com quem chamou (o `main` a fecha no desligamento).
    pub fn new(config: &Config, database: &Database) -> Self {
        // --- Monta o gráfico de dependências ---
        let pool = database.pool().clone();
        let product_repo = ProductRepository::new(pool.clone());
        let sale_repo = SaleRepository::new(pool);

        let product_service = ProductService::new(product_repo.clone(), config.low_stock_threshold);
        let sale_service = SaleService::new(sale_repo.clone(), product_repo);
        let analytics_service = AnalyticsService::new(Arc::new(sale_repo));

        Self {
            low_stock_threshold: config.low_stock_threshold,
            product_service,
            sale_service,
            analytics_service,
        }
    }
}
