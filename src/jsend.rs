//! JSend-style response envelope: `{code, status, data, message?}`.
//!
//! Every API response (the OAuth2 token endpoint excepted, which speaks the
//! OAuth2 error dialect) is wrapped in this envelope. Error responses always
//! carry `data: null`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

pub fn success(data: impl Serialize) -> Response {
    success_with_status(StatusCode::OK, data)
}

pub fn success_with_status(status: StatusCode, data: impl Serialize) -> Response {
    let body = Json(json!({
        "code": status.as_u16(),
        "status": "success",
        "data": data,
    }));
    (status, body).into_response()
}

pub fn error(status: StatusCode, message: &str) -> Response {
    let body = Json(json!({
        "code": status.as_u16(),
        "status": "error",
        "data": null,
        "message": message,
    }));
    (status, body).into_response()
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let resp = success(json!({"id": 1}));
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn created_status_is_reflected_in_code() {
        let resp = success_with_status(StatusCode::CREATED, json!({"id": 1}));
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[test]
    fn error_envelope_is_an_error() {
        let resp = error(StatusCode::FORBIDDEN, "Access denied");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
