use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use slugge_engine::EngineError;
use slugge_store::StoreError;

/// Errors returned by HTTP handlers. Rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Unimplemented(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn project_not_found() -> Self {
        Self::NotFound("Project not found".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::Internal(cause) => {
                tracing::error!(error = %cause, "request failed");
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::ProjectNotFound(_) => Self::project_not_found(),
            EngineError::Store(store) => store.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::project_not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Unimplemented("x".into()).status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn body_carries_detail() {
        let resp = ApiError::project_not_found().into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await, json!({"detail": "Project not found"}));
    }

    #[tokio::test]
    async fn internal_details_not_leaked() {
        let resp = ApiError::Internal("disk I/O error at /var/db".into()).into_response();
        assert_eq!(body_json(resp).await, json!({"detail": "Internal server error"}));
    }

    #[test]
    fn maps_store_and_engine_errors() {
        let e: ApiError = StoreError::NotFound("snapshot s1".into()).into();
        assert!(matches!(e, ApiError::NotFound(ref m) if m == "snapshot s1"));

        let e: ApiError = StoreError::Database("locked".into()).into();
        assert!(matches!(e, ApiError::Internal(_)));

        let e: ApiError = EngineError::ProjectNotFound("p".into()).into();
        assert_eq!(e.to_string(), "Project not found");
    }
}
