//! HTTP-facing glue: error responses, response envelopes and request extractors
//! whose rejections use the same `{error, message}` shape as every other failure.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{normalize_page, Pagination, RemotePage};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn invalid_id(raw: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("'{raw}' is not a valid numeric id"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let (status, code) = match &e {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
            Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };
        Self::new(status, code, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = self.code, "{}", self.message);
        }
        let body = json!({
            "error": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Provider-backed page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePageBody<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

impl<T> From<RemotePage<T>> for RemotePageBody<T> {
    fn from(p: RemotePage<T>) -> Self {
        Self {
            results: p.items,
            page: p.page,
            total_pages: p.total_pages,
            total_results: p.total_results,
        }
    }
}

/// Store-backed page; `total` ignores limit and offset.
#[derive(Debug, Serialize)]
pub struct LocalPageBody<T> {
    pub results: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> LocalPageBody<T> {
    pub fn new((results, total): (Vec<T>, u64), page: Pagination) -> Self {
        Self {
            results,
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Raw query values; parsing is lenient so bad numbers fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub page: Option<String>,
    #[serde(alias = "q")]
    pub query: Option<String>,
}

impl ListParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_raw(self.limit.as_deref(), self.offset.as_deref())
    }

    pub fn page(&self) -> u32 {
        normalize_page(self.page.as_deref())
    }

    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }
}

/// Provider ids in paths (`tmdb_id`, `genre_id`) must be numeric.
pub fn parse_numeric_id(raw: &str) -> ApiResult<i64> {
    raw.trim().parse().map_err(|_| ApiError::invalid_id(raw))
}

/// Internal ids that do not parse cannot name anything stored.
pub fn parse_uuid(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::not_found(format!("{what} '{raw}'")).into())
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(e) => Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid_query", e.body_text())),
        }
    }
}

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(e) => {
                let status = match e.status() {
                    StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                    StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    _ => StatusCode::BAD_REQUEST,
                };
                Err(ApiError::new(status, "invalid_body", e.body_text()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (Error::not_found("movie 1"), StatusCode::NOT_FOUND, "not_found"),
            (Error::invalid_input("x"), StatusCode::BAD_REQUEST, "invalid_input"),
            (Error::conflict("user"), StatusCode::CONFLICT, "conflict"),
            (Error::provider(Some(500), "boom"), StatusCode::BAD_GATEWAY, "provider_error"),
            (Error::store("down"), StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn path_ids() {
        assert_eq!(parse_numeric_id("550").unwrap(), 550);
        assert_eq!(parse_numeric_id("abc").unwrap_err().code(), "invalid_id");
        assert_eq!(parse_uuid("nope", "user").unwrap_err().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn list_params_are_lenient() {
        let params = ListParams {
            limit: Some("500".into()),
            offset: Some("-2".into()),
            page: Some("0".into()),
            query: None,
        };
        assert_eq!(params.pagination(), Pagination::default());
        assert_eq!(params.page(), 1);
        assert_eq!(params.query(), "");
    }
}
