use crate::request::{HttpRequest, join_url};
use anyhow::Context;
use base64::Engine as _;
use serde::Deserialize;

pub const TWILIO_API_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl TwilioConfig {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            base_url: TWILIO_API_URL.into(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
        }
    }

    fn account_url(&self, path: &str) -> String {
        join_url(
            &self.base_url,
            &format!("/Accounts/{}/{}", self.account_sid, path.trim_start_matches('/')),
        )
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.account_sid, self.auth_token);
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
    }
}

pub fn build_get_call_request(cfg: &TwilioConfig, call_sid: &str) -> HttpRequest {
    HttpRequest::get(cfg.account_url(&format!("Calls/{call_sid}.json")))
        .with_header("Authorization", cfg.basic_auth())
}

/// Lists at most one recording for the call.
pub fn build_list_recordings_request(
    cfg: &TwilioConfig,
    call_sid: &str,
) -> anyhow::Result<HttpRequest> {
    let url = url::Url::parse_with_params(
        &cfg.account_url("Recordings.json"),
        &[("CallSid", call_sid), ("PageSize", "1")],
    )
    .context("build Twilio recordings URL")?;
    Ok(HttpRequest::get(url.to_string()).with_header("Authorization", cfg.basic_auth()))
}

/// Media URL of a recording. Fetching it requires the account credentials.
pub fn recording_media_url(cfg: &TwilioConfig, recording_sid: &str) -> String {
    cfg.account_url(&format!("Recordings/{recording_sid}.mp3"))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TwilioCall {
    pub sid: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    // Seconds, reported as a string.
    #[serde(default)]
    pub duration: Option<String>,
    // RFC 2822, e.g. "Tue, 10 Aug 2010 08:02:17 +0000".
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TwilioRecording {
    pub sid: String,
}

#[derive(Debug, Deserialize)]
struct RecordingPage {
    #[serde(default)]
    recordings: Vec<TwilioRecording>,
}

pub fn parse_twilio_call(body: &[u8]) -> anyhow::Result<TwilioCall> {
    serde_json::from_slice(body).context("decode Twilio call JSON")
}

pub fn parse_first_recording(body: &[u8]) -> anyhow::Result<Option<TwilioRecording>> {
    let page: RecordingPage =
        serde_json::from_slice(body).context("decode Twilio recordings JSON")?;
    Ok(page.recordings.into_iter().next())
}
