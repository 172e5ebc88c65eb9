use crate::client::CovalClient;
use crate::traits::{AudioSource, MessageSource};
use anyhow::{Context, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use coval_core::{
    ConversationRecord, ConversationSubmission, MessageRecord, RoleMap, SkippedMessage,
    map_transcript,
};
use coval_providers::request::HttpRequest;
use coval_providers::runtime::{self, HttpResponse};
use coval_providers::signed_url::{
    AudioUrlCheck, PROBE_TIMEOUT, build_probe_request, check_probe_response, check_scheme,
};
use coval_providers::twilio::{self, TwilioCall, TwilioConfig, TwilioRecording};
use coval_providers::vapi::{self, VapiCall, VapiConfig};
use std::time::Duration;

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A pre-signed read URL from any storage provider (S3, GCS, Azure SAS, CDN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAudioUrl {
    url: String,
}

impl SignedAudioUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub async fn probe(&self) -> AudioUrlCheck {
        probe_audio_url(&self.url).await
    }
}

#[async_trait::async_trait]
impl AudioSource for SignedAudioUrl {
    async fn resolve_audio_reference(&self) -> anyhow::Result<Option<String>> {
        Ok(Some(self.url.clone()))
    }
}

/// HEAD-probes a signed URL. Probe failures leave the URL unverified rather
/// than rejected, since the service may still be able to read it.
pub async fn probe_audio_url(url: &str) -> AudioUrlCheck {
    if let Some(rejected) = check_scheme(url) {
        return rejected;
    }

    match runtime::execute_with_timeout(&build_probe_request(url), PROBE_TIMEOUT).await {
        Ok(resp) => check_probe_response(&resp),
        Err(e) if runtime::is_timeout(&e) => AudioUrlCheck::Unverified {
            reason: "URL validation timed out".into(),
        },
        Err(e) => AudioUrlCheck::Unverified {
            reason: format!("could not validate URL: {e:#}"),
        },
    }
}

async fn fetch_ok(req: &HttpRequest, timeout: Duration, what: &str) -> anyhow::Result<HttpResponse> {
    let resp = runtime::execute_with_timeout(req, timeout)
        .await
        .with_context(|| format!("fetch {what}"))?;
    if resp.status != 200 {
        return Err(anyhow!(
            "{what} request failed: status={} body={}",
            resp.status,
            resp.body_text()
        ));
    }
    Ok(resp)
}

pub async fn fetch_vapi_call(
    cfg: &VapiConfig,
    call_id: &str,
    timeout: Duration,
) -> anyhow::Result<VapiCall> {
    let resp = fetch_ok(&vapi::build_get_call_request(cfg, call_id), timeout, "Vapi call").await?;
    let call = vapi::parse_vapi_call(&resp.body)?;
    log::info!(
        "fetched Vapi call {} (status={:?}, {} messages)",
        call.id,
        call.status,
        call.messages.len()
    );
    Ok(call)
}

#[async_trait::async_trait]
impl AudioSource for VapiCall {
    async fn resolve_audio_reference(&self) -> anyhow::Result<Option<String>> {
        Ok(self.audio_url().map(str::to_string))
    }
}

#[async_trait::async_trait]
impl MessageSource for VapiCall {
    async fn list_messages(&self) -> anyhow::Result<Vec<MessageRecord>> {
        Ok(self.message_records())
    }
}

/// Submission fields for a Vapi call. Transcript and audio are filled in by
/// the uploader.
pub fn vapi_submission(call: &VapiCall, metrics: Vec<String>) -> ConversationSubmission {
    let occurred_at = call
        .occurred_at()
        .map(str::to_string)
        .unwrap_or_else(now_rfc3339);

    ConversationSubmission::new(occurred_at)
        .with_external_id(call.id.clone())
        .with_metrics(metrics)
        .with_metadata("platform", Some("vapi"))
        .with_metadata("vapi_call_id", Some(call.id.as_str()))
        .with_metadata("status", call.status.as_deref())
        .with_metadata("type", call.call_type.as_deref())
        .with_metadata("assistant_id", call.assistant_id.as_deref())
        .with_metadata(
            "customer_number",
            call.customer.as_ref().and_then(|c| c.number.as_deref()),
        )
        .with_metadata("ended_reason", call.ended_reason.as_deref())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioCallDetails {
    pub call: TwilioCall,
    pub recording: TwilioRecording,
    pub recording_media_url: String,
}

pub async fn fetch_twilio_call(
    cfg: &TwilioConfig,
    call_sid: &str,
    timeout: Duration,
) -> anyhow::Result<TwilioCallDetails> {
    let resp = fetch_ok(
        &twilio::build_get_call_request(cfg, call_sid),
        timeout,
        "Twilio call",
    )
    .await?;
    let call = twilio::parse_twilio_call(&resp.body)?;

    let req = twilio::build_list_recordings_request(cfg, call_sid)?;
    let resp = fetch_ok(&req, timeout, "Twilio recordings").await?;
    let recording = twilio::parse_first_recording(&resp.body)?
        .ok_or_else(|| anyhow!("no recordings found for call {call_sid}"))?;

    log::info!(
        "found recording {} for call {} ({}s, {} -> {})",
        recording.sid,
        call.sid,
        call.duration.as_deref().unwrap_or("?"),
        call.from.as_deref().unwrap_or("?"),
        call.to.as_deref().unwrap_or("?"),
    );

    Ok(TwilioCallDetails {
        recording_media_url: twilio::recording_media_url(cfg, &recording.sid),
        call,
        recording,
    })
}

fn rfc2822_to_rfc3339(value: &str) -> Option<String> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|t| t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Submission fields for a Twilio call.
///
/// Twilio media needs account credentials to read, so the audio itself is
/// expected to be re-hosted and passed in as a signed URL.
pub fn twilio_submission(details: &TwilioCallDetails, metrics: Vec<String>) -> ConversationSubmission {
    let call = &details.call;
    let occurred_at = call
        .start_time
        .as_deref()
        .and_then(rfc2822_to_rfc3339)
        .unwrap_or_else(now_rfc3339);

    ConversationSubmission::new(occurred_at)
        .with_external_id(call.sid.clone())
        .with_metrics(metrics)
        .with_metadata("platform", Some("twilio"))
        .with_metadata("call_sid", Some(call.sid.as_str()))
        .with_metadata("recording_sid", Some(details.recording.sid.as_str()))
        .with_metadata("recording_media_url", Some(details.recording_media_url.as_str()))
        .with_metadata("from", call.from.as_deref())
        .with_metadata("to", call.to.as_deref())
        .with_metadata("duration", call.duration.as_deref())
        .with_metadata("status", call.status.as_deref())
        .with_metadata("direction", call.direction.as_deref())
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub conversation: ConversationRecord,
    pub transcript_len: usize,
    pub skipped: Vec<SkippedMessage>,
    pub audio_url: Option<String>,
}

/// Maps a platform transcript once, attaches audio, and submits once.
pub struct ConversationUploader<'a> {
    client: &'a CovalClient,
    roles: RoleMap,
}

impl<'a> ConversationUploader<'a> {
    pub fn new(client: &'a CovalClient, roles: RoleMap) -> Self {
        Self { client, roles }
    }

    pub async fn upload(
        &self,
        mut submission: ConversationSubmission,
        audio: Option<&dyn AudioSource>,
        messages: Option<&dyn MessageSource>,
    ) -> anyhow::Result<UploadReport> {
        let mut skipped = Vec::new();

        if let Some(source) = messages {
            let records = source.list_messages().await.context("list call messages")?;
            if records.is_empty() {
                log::warn!("no messages found for this call");
            }
            let mapping = map_transcript(&records, &self.roles);
            log::info!(
                "mapped {} of {} messages into the transcript",
                mapping.entries.len(),
                records.len()
            );
            submission.transcript = mapping.entries;
            skipped = mapping.skipped;
        }

        if let Some(source) = audio {
            if let Some(url) = source
                .resolve_audio_reference()
                .await
                .context("resolve audio reference")?
            {
                submission.audio_url = Some(url);
            }
        }

        if submission.audio_url.is_none() {
            log::warn!("no audio URL provided; submitting without audio");
        }

        let transcript_len = submission.transcript.len();
        let conversation = self.client.submit_conversation(&submission).await?;

        Ok(UploadReport {
            conversation,
            transcript_len,
            skipped,
            audio_url: submission.audio_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_twilio_start_time() {
        assert_eq!(
            rfc2822_to_rfc3339("Tue, 10 Aug 2010 08:02:17 +0000").as_deref(),
            Some("2010-08-10T08:02:17Z")
        );
        assert_eq!(rfc2822_to_rfc3339("yesterday"), None);
    }

    #[test]
    fn now_is_utc_with_z_suffix() {
        assert!(now_rfc3339().ends_with('Z'));
    }

    #[test]
    fn vapi_submission_drops_absent_metadata() {
        let call = vapi::parse_vapi_call(
            br#"{"id":"call-1","status":"ended","startedAt":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        let sub = vapi_submission(&call, vec!["m1".into()]);

        assert_eq!(sub.occurred_at, "2024-05-01T10:00:00Z");
        assert_eq!(sub.external_conversation_id.as_deref(), Some("call-1"));
        assert_eq!(sub.metadata["platform"], "vapi");
        assert_eq!(sub.metadata["vapi_call_id"], "call-1");
        assert!(!sub.metadata.contains_key("customer_number"));
        assert!(!sub.metadata.contains_key("ended_reason"));
        assert_eq!(sub.metrics, vec!["m1".to_string()]);
    }

    #[test]
    fn twilio_submission_carries_call_metadata() {
        let details = TwilioCallDetails {
            call: twilio::parse_twilio_call(
                br#"{"sid":"CA9","from":"+1555","to":"+1666","duration":"42",
                     "start_time":"Tue, 10 Aug 2010 08:02:17 +0000",
                     "status":"completed","direction":"inbound"}"#,
            )
            .unwrap(),
            recording: TwilioRecording { sid: "RE1".into() },
            recording_media_url: "https://api.twilio.com/x/RE1.mp3".into(),
        };
        let sub = twilio_submission(&details, vec![]);

        assert_eq!(sub.occurred_at, "2010-08-10T08:02:17Z");
        assert_eq!(sub.metadata["recording_sid"], "RE1");
        assert_eq!(sub.metadata["duration"], "42");
        assert_eq!(sub.metadata["direction"], "inbound");
        assert!(sub.audio_url.is_none());
    }

    #[tokio::test]
    async fn plain_http_url_is_rejected_without_probing() {
        let check = probe_audio_url("http://example.com/a.wav").await;
        assert!(check.is_rejected());
    }
}
