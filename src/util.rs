//! Shared helpers for the collabmarket application.

use axum::http::HeaderMap;
use serde::Deserialize;

/// Cursorless pagination parameters used by the list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_take")]
    pub take: i64,
    #[serde(default)]
    pub skip: i64,
}

fn default_take() -> i64 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            take: default_take(),
            skip: 0,
        }
    }
}

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}
