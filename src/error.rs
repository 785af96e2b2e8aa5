use crate::service::pricing::PricingError;
use crate::service::reconcile::{ReconcileError, SaveError};
use crate::service::scan::ScanError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 接口层统一错误
#[derive(Debug, Error)]
pub enum AppError {
    /// 数据库错误, 原样返回给用户
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 请求校验失败, 未做任何修改
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}

/// 错误响应体 (与成功响应同一信封)
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::Pricing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Reconcile(ReconcileError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Reconcile(_) => StatusCode::BAD_REQUEST,
            AppError::Save(SaveError::NoLineItems) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Save(SaveError::UnconfirmedUnmatched { .. }) => StatusCode::CONFLICT,
            AppError::Scan(ScanError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Scan(ScanError::Http(_)) | AppError::Scan(ScanError::Upstream { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Scan(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::warn!("request rejected: {}", self);
        }
        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_errors_map_to_distinct_statuses() {
        assert_eq!(
            AppError::from(SaveError::NoLineItems).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(SaveError::UnconfirmedUnmatched { count: 2 }).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn scanner_errors_map_by_origin() {
        assert_eq!(
            AppError::from(ScanError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(ScanError::NoJsonArray).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn error_message_is_displayed_verbatim() {
        let err = AppError::Validation("product name must not be empty".to_string());
        assert_eq!(err.to_string(), "validation error: product name must not be empty");
    }
}
