use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Falhas da agregação de vendas (cálculo puro, sem banco).
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Item inválido na venda {sale_id} (SKU '{sku}'): {reason}")]
    MalformedSaleItem {
        sale_id: Uuid,
        sku: String,
        reason: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Rejeições dos extratores do axum (JSON malformado, UUID inválido na rota...)
    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Período inválido: a data inicial é posterior à final")]
    InvalidDateRange,

    #[error("Produto não encontrado")]
    ProductNotFound,

    #[error("Variante {variant_id} não encontrada no produto {product_id}")]
    VariantNotFound { product_id: Uuid, variant_id: Uuid },

    #[error("Venda não encontrada")]
    SaleNotFound,

    #[error("SKU já cadastrado: {0}")]
    SkuAlreadyExists(String),

    #[error("Estoque insuficiente para {sku}: disponível {available}, solicitado {requested}")]
    InsufficientStock {
        sku: String,
        available: i32,
        requested: i64,
    },

    #[error("Erro na agregação de vendas: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro ao aplicar migrações: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::InvalidDateRange => StatusCode::BAD_REQUEST,
            AppError::ProductNotFound
            | AppError::VariantNotFound { .. }
            | AppError::SaleNotFound => StatusCode::NOT_FOUND,
            AppError::SkuAlreadyExists(_) | AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::Aggregation(_)
            | AppError::DatabaseError(_)
            | AppError::MigrationError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }

            // 5xx: loga o detalhe, devolve mensagem genérica.
            ref e if status.is_server_error() => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }

            e => json!({ "error": e.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
