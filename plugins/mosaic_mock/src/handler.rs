//! Request handlers and path matching.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method a handler answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Matches every method.
    All,
}

impl Method {
    fn accepts(self, method: Method) -> bool {
        self == Method::All || self == method
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::All => "*",
        };
        f.write_str(label)
    }
}

/// Canned response returned by a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockResponse {
    pub status: u16,
    pub body: Value,
}

/// A mocked endpoint.
///
/// Paths may contain `:param` segments, captured into the match, and a
/// trailing `*` segment matching any remainder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestHandler {
    pub method: Method,
    pub path: String,
    pub response: MockResponse,
}

impl RequestHandler {
    pub fn new(method: Method, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            response: MockResponse { status: 200, body },
        }
    }

    pub fn get(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Get, path, body)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path, body)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.response.status = status;
        self
    }

    /// Path parameters when this handler answers `method` on `path`.
    pub fn matches(&self, method: Method, path: &str) -> Option<HashMap<String, String>> {
        if !self.method.accepts(method) {
            return None;
        }
        match_pattern(&self.path, path)
    }
}

/// Match a path against a handler pattern, extracting `:param` segments.
fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.trim_end_matches('/').split('/').collect();
    let path_parts: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    let wildcard = pattern_parts.last() == Some(&"*");
    let fixed = if wildcard {
        pattern_parts.len() - 1
    } else {
        pattern_parts.len()
    };
    if path_parts.len() < fixed || (!wildcard && path_parts.len() != fixed) {
        return None;
    }

    let mut params = HashMap::new();

    for (pat, actual) in pattern_parts[..fixed].iter().zip(path_parts.iter()) {
        if let Some(param_name) = pat.strip_prefix(':') {
            params.insert(param_name.to_string(), actual.to_string());
        } else if pat != actual {
            return None;
        }
    }

    Some(params)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn match_pattern_exact() {
        let params = match_pattern("/api/session", "/api/session");
        assert!(params.unwrap().is_empty());
    }

    #[test]
    fn match_pattern_with_params() {
        let params = match_pattern("/api/:type/:id", "/api/orders/42").unwrap();
        assert_eq!(params.get("type"), Some(&"orders".to_string()));
        assert_eq!(params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn match_pattern_ignores_trailing_slash() {
        assert!(match_pattern("/api/orders", "/api/orders/").is_some());
    }

    #[test]
    fn match_pattern_wildcard_takes_the_rest() {
        assert!(match_pattern("/api/*", "/api/orders/42").is_some());
        assert!(match_pattern("/api/*", "/api").is_some());
        assert!(match_pattern("/api/*", "/other/orders").is_none());
    }

    #[test]
    fn match_pattern_no_match() {
        assert!(match_pattern("/api/orders", "/api/users").is_none());
        assert!(match_pattern("/api/:id", "/api/a/b").is_none());
    }

    #[test]
    fn handler_checks_the_method() {
        let handler = RequestHandler::post("/api/orders", json!({"ok": true})).with_status(201);
        assert!(handler.matches(Method::Get, "/api/orders").is_none());
        assert!(handler.matches(Method::Post, "/api/orders").is_some());
        assert_eq!(handler.response.status, 201);

        let any = RequestHandler::new(Method::All, "/health", json!("up"));
        assert!(any.matches(Method::Delete, "/health").is_some());
    }
}
