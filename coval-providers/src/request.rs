use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted_headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                let v = if is_sensitive_header(k) {
                    "[REDACTED]".into()
                } else {
                    v.clone()
                };
                (k.clone(), v)
            })
            .collect();

        let body_summary = match &self.body {
            Body::Empty => "Empty".to_string(),
            Body::Json(s) => format!("Json(len={})", s.len()),
        };

        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &redacted_headers)
            .field("body", &body_summary)
            .finish()
    }
}

fn is_sensitive_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.to_ascii_lowercase().contains("api-key")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    Empty,
    Json(String),
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url, Body::Empty)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new("HEAD", url, Body::Empty)
    }

    /// Serializes `payload` as the body and sets the JSON content type.
    pub fn post_json<T: Serialize>(url: impl Into<String>, payload: &T) -> anyhow::Result<Self> {
        let json = serde_json::to_string(payload)?;
        Ok(Self::new("POST", url, Body::Json(json)).with_header("Content-Type", "application/json"))
    }

    fn new(method: &str, url: impl Into<String>, body: Body) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<&str> {
        match &self.body {
            Body::Json(s) => Some(s),
            Body::Empty => None,
        }
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = HttpRequest::get("https://example.com").with_header("Content-Type", "application/json");
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("https://example.com", &json!({"a": 1})).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.json_body(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn debug_redacts_sensitive_headers() {
        let req = HttpRequest::get("https://example.com")
            .with_header("Authorization", "Bearer sk-test-123")
            .with_header("X-API-Key", "cov-456")
            .with_header("Content-Type", "application/json");

        let s = format!("{req:?}");
        assert!(!s.contains("sk-test-123"));
        assert!(!s.contains("cov-456"));
        assert!(!s.contains("Bearer"));
        assert!(s.contains("[REDACTED]"));
        assert!(s.contains("application/json"));
    }

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(
            join_url("https://api.example.com/v1/", "/runs"),
            "https://api.example.com/v1/runs"
        );
        assert_eq!(
            join_url("https://api.example.com/v1", "runs"),
            "https://api.example.com/v1/runs"
        );
    }
}
