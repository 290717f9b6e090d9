//! REST API handlers grouped by domain.

pub mod auth;
pub mod batch;
pub mod downloads;
pub mod formats;
pub mod single;

use axum::Json;
use axum::http::{HeaderMap, StatusCode, header};
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::services::accounts::User;

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult = Result<Json<Value>, ApiError>;

/// Standard success response.
pub fn ok_json(data: Value) -> Json<Value> {
    Json(json!({ "status": "ok", "data": data }))
}

/// Standard error response.
pub fn err_json(status: u16, message: &str) -> ApiError {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(json!({ "status": "error", "error": message })),
    )
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the caller's session, or fail with 401.
pub async fn require_session(
    state: &SharedState,
    headers: &HeaderMap,
) -> Result<(String, User), ApiError> {
    let token = bearer_token(headers).ok_or_else(|| err_json(401, "Missing bearer token"))?;
    let user = state
        .auth()
        .resolve(token)
        .await
        .ok_or_else(|| err_json(401, "Invalid or expired session"))?;
    Ok((token.to_string(), user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn err_json_uses_error_envelope() {
        let (status, Json(body)) = err_json(409, "busy");
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, json!({ "status": "error", "error": "busy" }));

        let (status, _) = err_json(1000, "x");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
