use crate::request::{HttpRequest, join_url};
use serde_json::json;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiCompatibleChatConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for OpenAiCompatibleChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleChatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Chat completion constrained to a single JSON object reply.
pub fn build_json_chat_request(
    cfg: &OpenAiCompatibleChatConfig,
    messages: &[ChatMessage],
) -> anyhow::Result<HttpRequest> {
    let url = join_url(&cfg.base_url, "/chat/completions");

    let payload = json!({
        "model": cfg.model,
        "messages": messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
        "response_format": {"type": "json_object"},
    });

    Ok(HttpRequest::post_json(url, &payload)?
        .with_header("Authorization", format!("Bearer {}", cfg.api_key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_authorized_json_mode_request() {
        let cfg = OpenAiCompatibleChatConfig {
            base_url: "https://api.example.com/v1".into(),
            api_key: "k".into(),
            model: DEFAULT_MODEL.into(),
        };
        let req = build_json_chat_request(&cfg, &[ChatMessage::user("hi")]).unwrap();

        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://api.example.com/v1/chat/completions");
        assert_eq!(req.header("authorization"), Some("Bearer k"));

        let body: serde_json::Value = serde_json::from_str(req.json_body().unwrap()).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
