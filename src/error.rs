//! Error taxonomy shared by every handler, and its JSON envelope.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::AppConfig;

/// Debug rendering of an internal fault, carried on the response until
/// [`attach_error_detail`] decides whether the client may see it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation Error")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(errors) => ErrorBody {
                success: false,
                message: "Validation Error".into(),
                errors,
            },
            AppError::Internal(e) => {
                error!(error = ?e, "unhandled server fault");
                let mut resp = (
                    status,
                    Json(ErrorBody {
                        success: false,
                        message: e.to_string(),
                        errors: Vec::new(),
                    }),
                )
                    .into_response();
                resp.extensions_mut().insert(ErrorDetail(format!("{e:?}")));
                return resp;
            }
            other => ErrorBody {
                success: false,
                message: other.to_string(),
                errors: Vec::new(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("id", format!("Invalid id: {}", rejection.body_text()))
    }
}

/// Failures surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(field) => AppError::Conflict(format!("{field} already exists")),
            other => AppError::Internal(other.into()),
        }
    }
}

/// `Json` with rejections rendered through [`AppError`].
#[derive(Debug, axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Path` with rejections rendered through [`AppError`].
#[derive(Debug, axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// `Query` with rejections rendered through [`AppError`].
#[derive(Debug, axum::extract::FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Adds `stack` to 500 bodies when running in development.
pub async fn attach_error_detail(State(config): State<Arc<AppConfig>>, resp: Response) -> Response {
    if !config.is_development() {
        return resp;
    }
    let Some(ErrorDetail(detail)) = resp.extensions().get::<ErrorDetail>().cloned() else {
        return resp;
    };

    let (mut parts, body) = resp.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "could not buffer error body");
            return Response::from_parts(parts, Body::empty());
        }
    };
    let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut json) => {
            if let Some(obj) = json.as_object_mut() {
                obj.insert("stack".into(), detail.into());
            }
            Body::from(json.to_string())
        }
        Err(_) => Body::from(bytes),
    };
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_lists_every_field() {
        let err = AppError::Validation(vec![
            FieldError::new("name", "Name is required"),
            FieldError::new("email", "Please provide a valid email"),
        ]);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"].as_array().unwrap().len(), 2);
        assert_eq!(json["errors"][1]["field"], "email");
    }

    #[tokio::test]
    async fn taxonomy_maps_to_status_codes() {
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthenticated("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn not_found_message_is_passed_through() {
        let json = body_json(AppError::NotFound("Task not found".into()).into_response()).await;
        assert_eq!(json["message"], "Task not found");
        assert!(json.get("errors").is_none());
        assert!(json.get("stack").is_none());
    }

    #[tokio::test]
    async fn stack_is_only_attached_in_development() {
        let fault = || AppError::Internal(anyhow::anyhow!("pool timed out")).into_response();

        let mut dev = AppConfig::for_tests();
        dev.environment = crate::config::Environment::Development;
        let json = body_json(attach_error_detail(State(Arc::new(dev)), fault()).await).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "pool timed out");
        assert!(json["stack"].as_str().unwrap().contains("pool timed out"));

        let mut prod = AppConfig::for_tests();
        prod.environment = crate::config::Environment::Production;
        let json = body_json(attach_error_detail(State(Arc::new(prod)), fault()).await).await;
        assert!(json.get("stack").is_none());
    }

    #[tokio::test]
    async fn non_internal_errors_never_get_a_stack() {
        let resp = AppError::NotFound("Task not found".into()).into_response();
        let json = body_json(attach_error_detail(State(Arc::new(AppConfig::for_tests())), resp).await).await;
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn duplicate_store_error_becomes_conflict() {
        let err: AppError = StoreError::Duplicate("email").into();
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "email already exists"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
