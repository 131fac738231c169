// region:    --- Imports
use crate::catalog::price::Price;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- App Error
/// 요청 단위 오류
/// Validation, NotFound, Unauthorized, Conflict, ArchiveFormat 만 호출자에게 그대로 노출된다.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("관리자 권한이 필요합니다.")]
    Unauthorized,

    #[error("입찰 금액은 현재 가격({current_price})보다 높아야 합니다.")]
    Conflict { current_price: Price },

    #[error("압축 파일을 읽을 수 없습니다: {0}")]
    ArchiveFormat(String),

    #[error("storage error")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Unauthorized => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "LOW_BID"),
            Self::ArchiveFormat(_) => (StatusCode::BAD_REQUEST, "INVALID_ARCHIVE"),
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = match &self {
            Self::Conflict { current_price } => serde_json::json!({
                "error": self.to_string(),
                "code": code,
                "current_price": current_price,
            }),
            Self::Database(e) => {
                error!("{:<12} --> 데이터베이스 오류: {:?}", "Handler", e);
                serde_json::json!({ "error": "내부 오류가 발생했습니다.", "code": code })
            }
            Self::Internal(e) => {
                error!("{:<12} --> 내부 오류: {}", "Handler", e);
                serde_json::json!({ "error": "내부 오류가 발생했습니다.", "code": code })
            }
            _ => serde_json::json!({ "error": self.to_string(), "code": code }),
        };
        (status, Json(body)).into_response()
    }
}

// endregion: --- App Error

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_visible_errors_map_to_statuses() {
        assert_eq!(
            AppError::validation("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("상품을 찾을 수 없습니다.")
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict {
                current_price: Price::from_cents(10_000)
            }
            .into_response()
            .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn database_errors_are_not_disclosed() {
        let response = AppError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
// endregion: --- Tests
