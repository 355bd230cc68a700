// src/db/database.rs

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{common::error::AppError, config::Config};

/// Sessão com o banco: aberta explicitamente no início, fechada no desligamento.
/// Os repositórios recebem clones do pool a partir daqui.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .inspect_err(|e| tracing::error!("🔥 Falha ao conectar ao banco de dados: {:?}", e))?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(Self { pool })
    }

    /// Pool sem conexão imediata (a primeira query é que conecta).
    pub fn connect_lazy(config: &Config) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy(&config.database_url)?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Conexões com o banco de dados encerradas.");
    }
}
