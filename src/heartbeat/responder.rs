//! Responder side of the heartbeat exchange.

use axum::http::HeaderMap;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Secret;

use super::token::{is_authorized, AUTH_HEADER};

/// Inbound heartbeat check, built by the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatRequest {
    /// Value of the `x-auth-token` header, if present.
    pub auth_token: Option<String>,
}

impl HeartbeatRequest {
    pub fn new(auth_token: Option<&str>) -> Self {
        Self {
            auth_token: auth_token.map(str::to_string),
        }
    }

    /// Extract the token header from an HTTP header map.
    ///
    /// A header that is not valid visible ASCII is treated as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            auth_token: headers
                .get(AUTH_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// Status returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    Alive,
    Forbidden,
}

impl HeartbeatStatus {
    pub fn code(&self) -> u16 {
        match self {
            HeartbeatStatus::Alive => 200,
            HeartbeatStatus::Forbidden => 403,
        }
    }
}

/// Reply to an inbound heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatResponse {
    pub status: HeartbeatStatus,
    pub message: String,
}

impl HeartbeatResponse {
    pub fn alive() -> Self {
        Self {
            status: HeartbeatStatus::Alive,
            message: "Alive".to_string(),
        }
    }

    pub fn forbidden() -> Self {
        Self {
            status: HeartbeatStatus::Forbidden,
            message: "Forbidden".to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    /// JSON body: `{"message": ...}` when alive, `{"error": ...}` otherwise.
    pub fn body(&self) -> Value {
        match self.status {
            HeartbeatStatus::Alive => json!({ "message": self.message }),
            HeartbeatStatus::Forbidden => json!({ "error": self.message }),
        }
    }
}

/// Answers heartbeat checks from the peer's initiator.
#[derive(Debug, Clone)]
pub struct Responder {
    role: String,
    secret: Secret,
}

impl Responder {
    /// Create a responder for `role` guarding with `secret`.
    pub fn new(role: &str, secret: Secret) -> Self {
        Self {
            role: role.to_string(),
            secret,
        }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Validate the presented token and answer `Alive` or `Forbidden`.
    pub fn handle(&self, request: &HeartbeatRequest) -> HeartbeatResponse {
        if is_authorized(request.auth_token.as_deref(), &self.secret) {
            HeartbeatResponse::alive()
        } else {
            debug!(
                role = %self.role,
                token_present = request.auth_token.is_some(),
                "heartbeat token rejected"
            );
            HeartbeatResponse::forbidden()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn responder() -> Responder {
        Responder::new("b", Secret::new("abc123").unwrap())
    }

    #[test]
    fn test_matching_token_is_alive() {
        let response = responder().handle(&HeartbeatRequest::new(Some("abc123")));
        assert_eq!(response.status, HeartbeatStatus::Alive);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.message, "Alive");
    }

    #[test]
    fn test_wrong_token_is_forbidden() {
        let response = responder().handle(&HeartbeatRequest::new(Some("wrong")));
        assert_eq!(response.status, HeartbeatStatus::Forbidden);
        assert_eq!(response.status_code(), 403);
        assert_eq!(response.message, "Forbidden");
    }

    #[test]
    fn test_missing_token_is_forbidden() {
        let response = responder().handle(&HeartbeatRequest::default());
        assert_eq!(response.status_code(), 403);
    }

    #[test]
    fn test_other_headers_do_not_matter() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, HeaderValue::from_static("abc123"));
        headers.insert("authorization", HeaderValue::from_static("Bearer nope"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

        let response = responder().handle(&HeartbeatRequest::from_headers(&headers));
        assert_eq!(response.status, HeartbeatStatus::Alive);
    }

    #[test]
    fn test_from_headers_without_token() {
        let mut headers = HeaderMap::new();
        headers.insert("x-auth", HeaderValue::from_static("abc123"));
        let request = HeartbeatRequest::from_headers(&headers);
        assert!(request.auth_token.is_none());
    }

    #[test]
    fn test_response_bodies() {
        assert_eq!(
            HeartbeatResponse::alive().body(),
            json!({ "message": "Alive" })
        );
        assert_eq!(
            HeartbeatResponse::forbidden().body(),
            json!({ "error": "Forbidden" })
        );
    }
}
