use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::{Value, json};
use tracing::error;

/// Failure returned by every handler. Rendered as `{"error": ..., "details"?: ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid(message: impl Into<String>, details: Value) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("Insufficient permissions".to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Logs a database failure and hides it behind `message`.
    ///
    /// ```ignore
    /// .fetch_all(pool).await.map_err(ApiError::db("Failed to fetch leave types"))?;
    /// ```
    pub fn db(message: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
        move |e| {
            error!(error = %e, "{}", message);
            ApiError::Internal(message.to_string())
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::BadRequest {
                message,
                details: Some(details),
            } => json!({ "error": message, "details": details }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn bad_request_carries_details() {
        let err = ApiError::invalid("Invalid request data", json!([{ "field": "reason" }]));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Invalid request data");
        assert_eq!(value["details"][0]["field"], "reason");
    }

    #[actix_web::test]
    async fn internal_errors_only_expose_the_message() {
        let err = ApiError::db("Failed to fetch leave types")(sqlx::Error::RowNotFound);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "Failed to fetch leave types" }));
    }
}
