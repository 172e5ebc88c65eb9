use crate::request::{HttpRequest, join_url};
use anyhow::Context;
use coval_core::MessageRecord;
use serde::Deserialize;

pub const VAPI_API_URL: &str = "https://api.vapi.ai";

#[derive(Clone, PartialEq, Eq)]
pub struct VapiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for VapiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl VapiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: VAPI_API_URL.into(),
            api_key: api_key.into(),
        }
    }
}

pub fn build_get_call_request(cfg: &VapiConfig, call_id: &str) -> HttpRequest {
    let url = join_url(&cfg.base_url, &format!("/call/{call_id}"));
    HttpRequest::get(url)
        .with_header("Authorization", format!("Bearer {}", cfg.api_key))
        .with_header("Content-Type", "application/json")
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapiCall {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub call_type: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub stereo_recording_url: Option<String>,
    #[serde(default)]
    pub customer: Option<VapiCustomer>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub messages: Vec<VapiMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VapiCustomer {
    #[serde(default)]
    pub number: Option<String>,
}

/// A message from a Vapi call log.
///
/// `duration` is in milliseconds; `secondsFromStart` is already seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VapiMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub seconds_from_start: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub time: Option<f64>,
}

impl From<&VapiMessage> for MessageRecord {
    fn from(m: &VapiMessage) -> Self {
        MessageRecord {
            role: m.role.clone().unwrap_or_default(),
            text: m.message.clone().unwrap_or_default(),
            seconds_from_start: m.seconds_from_start,
            duration_ms: m.duration,
            time: m.time,
        }
    }
}

impl VapiCall {
    /// Prefers the stereo recording when both are present.
    pub fn audio_url(&self) -> Option<&str> {
        non_empty(&self.stereo_recording_url).or_else(|| non_empty(&self.recording_url))
    }

    pub fn occurred_at(&self) -> Option<&str> {
        self.started_at.as_deref().or(self.created_at.as_deref())
    }

    pub fn message_records(&self) -> Vec<MessageRecord> {
        self.messages.iter().map(MessageRecord::from).collect()
    }
}

fn non_empty(url: &Option<String>) -> Option<&str> {
    url.as_deref().filter(|s| !s.is_empty())
}

pub fn parse_vapi_call(body: &[u8]) -> anyhow::Result<VapiCall> {
    serde_json::from_slice(body).context("decode Vapi call JSON")
}
