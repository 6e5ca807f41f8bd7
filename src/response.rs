use auth_session_api::{AppResponse as ApiResponse, StatusCode as ApiStatusCode};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Axum side of `auth_session_api::AppResponse`.
///
/// Success bodies are the bare payload; errors go through `AppError`.
pub struct AppResponse<T> {
    inner: ApiResponse<T>,
}

impl<T: Serialize> AppResponse<T> {
    pub fn new(inner: ApiResponse<T>) -> Self {
        Self { inner }
    }

    /// 200 OK with data
    pub fn ok(data: T) -> Self {
        Self::new(ApiResponse::ok(data))
    }

    /// 201 Created with data
    pub fn created(data: T) -> Self {
        Self::new(ApiResponse::created(data))
    }
}

impl AppResponse<()> {
    /// 204 No Content
    pub fn no_content() -> Self {
        Self::new(ApiResponse::no_content())
    }
}

fn convert_status(api_status: ApiStatusCode) -> StatusCode {
    match api_status {
        ApiStatusCode::Ok => StatusCode::OK,
        ApiStatusCode::Created => StatusCode::CREATED,
        ApiStatusCode::NoContent => StatusCode::NO_CONTENT,
    }
}

impl<T: Serialize> IntoResponse for AppResponse<T> {
    fn into_response(self) -> Response {
        let status = convert_status(self.inner.status);

        match self.inner.data {
            Some(data) => (status, Json(data)).into_response(),
            None => status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_response_keeps_status_and_data() {
        let response = AppResponse::created("resource");
        assert_eq!(response.inner.status, ApiStatusCode::Created);
        assert_eq!(response.inner.data, Some("resource"));
    }

    #[test]
    fn no_content_response_has_empty_body() {
        let response = AppResponse::no_content().into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(axum::http::header::CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn ok_response_serializes_the_bare_payload() {
        let response = AppResponse::ok(serde_json::json!({ "email": "a@x.com" })).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({ "email": "a@x.com" }));
    }

    #[test]
    fn status_conversion_covers_every_variant() {
        assert_eq!(convert_status(ApiStatusCode::Ok), StatusCode::OK);
        assert_eq!(convert_status(ApiStatusCode::Created), StatusCode::CREATED);
        assert_eq!(convert_status(ApiStatusCode::NoContent), StatusCode::NO_CONTENT);
    }
}
