use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::database::paginate::{PageResult, PaginationLinks};
use crate::database::store::Document;

/// Wrapper for API responses that adds the `{success: true, ...}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub status_code: Option<StatusCode>,
    pub count: Option<usize>,
    pub pagination: Option<PaginationLinks>,
    pub token: Option<String>,
    /// Raw `Set-Cookie` value
    pub cookie: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            status_code: None,
            count: None,
            pagination: None,
            token: None,
            cookie: None,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::success(data).with_status(StatusCode::CREATED)
    }

    pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.cookie = Some(cookie);
        self
    }
}

impl ApiResponse<()> {
    /// `{success: true, token}` plus the session cookie
    pub fn token(token: String, cookie: String) -> Self {
        Self {
            data: None,
            status_code: None,
            count: None,
            pagination: None,
            token: Some(token),
            cookie: Some(cookie),
        }
    }
}

impl ApiResponse<Vec<Document>> {
    /// List envelope: `count` of this page, neighbour links, records
    pub fn page(result: PageResult) -> Self {
        let pagination = result.links();
        let count = result.records.len();
        Self::success(result.records).with_count(count).with_pagination(pagination)
    }

    fn with_pagination(mut self, pagination: PaginationLinks) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

fn serialization_failure(e: serde_json::Error) -> Response {
    tracing::error!("Failed to serialize response data: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": "Server Error"
        })),
    )
        .into_response()
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let mut envelope = Map::new();
        envelope.insert("success".into(), Value::Bool(true));
        if let Some(count) = self.count {
            envelope.insert("count".into(), json!(count));
        }
        if let Some(pagination) = &self.pagination {
            match serde_json::to_value(pagination) {
                Ok(value) => envelope.insert("pagination".into(), value),
                Err(e) => return serialization_failure(e),
            };
        }
        if let Some(token) = self.token {
            envelope.insert("token".into(), Value::String(token));
        }
        if let Some(data) = &self.data {
            match serde_json::to_value(data) {
                Ok(value) => envelope.insert("data".into(), value),
                Err(e) => return serialization_failure(e),
            };
        }

        let mut response = (status, Json(Value::Object(envelope))).into_response();
        if let Some(cookie) = self.cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
                Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PageRef;

    async fn body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = ApiResponse::created(json!({"id": "1"})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body(response).await, json!({"success": true, "data": {"id": "1"}}));
    }

    #[tokio::test]
    async fn test_page_envelope_omits_missing_links() {
        let result = PageResult {
            records: vec![Document::new(), Document::new()],
            total: 7,
            next: Some(PageRef { page: 2, limit: 2 }),
            prev: None,
        };
        let value = body(ApiResponse::page(result).into_response()).await;
        assert_eq!(value["count"], 2);
        assert_eq!(value["pagination"], json!({"next": {"page": 2, "limit": 2}}));
        assert_eq!(value["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_token_envelope_sets_cookie() {
        let response = ApiResponse::token("abc".into(), "token=abc; HttpOnly".into()).into_response();
        assert_eq!(response.headers()[header::SET_COOKIE], "token=abc; HttpOnly");
        assert_eq!(body(response).await, json!({"success": true, "token": "abc"}));
    }
}
