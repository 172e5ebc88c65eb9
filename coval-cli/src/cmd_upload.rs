use anyhow::Context;
use clap::Args;
use coval_core::{
    ConversationSubmission, CovalConfig, RoleMap, TranscriptEntry, conversation_dashboard_url,
    require_non_empty,
};
use coval_engine::client::CovalClient;
use coval_engine::traits::AudioSource;
use coval_engine::upload::{
    ConversationUploader, SignedAudioUrl, UploadReport, fetch_twilio_call, fetch_vapi_call,
    now_rfc3339, twilio_submission, vapi_submission,
};
use coval_providers::signed_url::{AudioUrlCheck, megabytes};
use coval_providers::twilio::TwilioConfig;
use coval_providers::vapi::VapiConfig;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct UploadUrlArgs {
    /// Pre-signed HTTPS URL of the recording
    pub url: String,
    /// JSON array of transcript entries ({role, content, start_time, end_time})
    #[arg(long)]
    pub transcript_file: Option<PathBuf>,
    /// Conversation id in the source platform
    #[arg(long)]
    pub external_id: Option<String>,
    /// RFC 3339 time of the conversation (default: now)
    #[arg(long)]
    pub occurred_at: Option<String>,
    /// Metric to evaluate (repeatable)
    #[arg(long = "metric")]
    pub metrics: Vec<String>,
    /// Extra metadata as key=value, e.g. platform=aws bucket=calls source=s3 (repeatable)
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,
    /// Do not HEAD-probe the URL before submitting
    #[arg(long)]
    pub skip_check: bool,
}

#[derive(Args, Debug)]
pub struct UploadVapiArgs {
    /// Vapi call id
    pub call_id: String,
    #[arg(long, env = "VAPI_API_KEY", hide_env_values = true)]
    pub vapi_api_key: Option<String>,
    /// Metric to evaluate (repeatable)
    #[arg(long = "metric")]
    pub metrics: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UploadTwilioArgs {
    /// Twilio call SID
    pub call_sid: String,
    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub account_sid: Option<String>,
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
    /// Signed URL where the recording has been re-hosted
    #[arg(long)]
    pub audio_url: Option<String>,
    /// Metric to evaluate (repeatable)
    #[arg(long = "metric")]
    pub metrics: Vec<String>,
    /// Do not HEAD-probe the audio URL before submitting
    #[arg(long)]
    pub skip_check: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty metadata key in `{s}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn load_transcript(path: &Path) -> anyhow::Result<Vec<TranscriptEntry>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read transcript: {}", path.display()))?;
    serde_json::from_slice(&bytes).context("decode transcript JSON")
}

async fn check_audio_url(audio: &SignedAudioUrl) {
    println!("Validating audio URL...");
    match audio.probe().await {
        AudioUrlCheck::Accessible {
            size_bytes,
            content_type,
        } => {
            println!("URL is accessible");
            if let Some(size) = size_bytes {
                println!("File size: {:.2} MB", megabytes(size));
            }
            if let Some(content_type) = content_type {
                println!("Content type: {content_type}");
            }
        }
        AudioUrlCheck::Rejected { reason } => {
            log::warn!("audio URL check failed: {reason}; submitting anyway");
        }
        AudioUrlCheck::Unverified { reason } => {
            log::warn!("{reason}; proceeding with upload");
        }
    }
}

fn print_report(report: &UploadReport) {
    let id = report.conversation.conversation_id.as_str();
    println!();
    println!("Upload successful");
    println!("Conversation ID: {id}");
    if let Some(status) = &report.conversation.status {
        println!("Status: {status}");
    }
    if report.transcript_len > 0 {
        println!("Transcript entries: {}", report.transcript_len);
    }
    if !report.skipped.is_empty() {
        println!("Skipped messages: {}", report.skipped.len());
    }
    println!("View at: {}", conversation_dashboard_url(id));
}

pub async fn upload_url(cfg: &CovalConfig, args: UploadUrlArgs) -> anyhow::Result<()> {
    require_non_empty("url", &args.url)?;
    let client = CovalClient::new(cfg)?;
    let audio = SignedAudioUrl::new(args.url);

    let transcript = match &args.transcript_file {
        Some(path) => load_transcript(path)?,
        None => Vec::new(),
    };

    if !args.skip_check {
        check_audio_url(&audio).await;
    }

    let mut submission =
        ConversationSubmission::new(args.occurred_at.unwrap_or_else(now_rfc3339))
            .with_transcript(transcript)
            .with_metrics(args.metrics);
    if let Some(id) = args.external_id {
        submission = submission.with_external_id(id);
    }
    for (key, value) in args.metadata {
        submission = submission.with_metadata(&key, Some(value));
    }

    println!();
    println!("Uploading conversation to Coval...");
    let report = ConversationUploader::new(&client, RoleMap::passthrough())
        .upload(submission, Some(&audio), None)
        .await?;
    print_report(&report);
    Ok(())
}

pub async fn upload_vapi(cfg: &CovalConfig, args: UploadVapiArgs) -> anyhow::Result<()> {
    let api_key = args.vapi_api_key.unwrap_or_default();
    require_non_empty("vapi_api_key", &api_key)?;
    require_non_empty("call_id", &args.call_id)?;
    let client = CovalClient::new(cfg)?;

    println!("Fetching Vapi call {}...", args.call_id);
    let call = fetch_vapi_call(&VapiConfig::new(api_key), &args.call_id, client.timeout()).await?;
    println!("Status: {}", call.status.as_deref().unwrap_or("unknown"));
    println!("Messages: {}", call.messages.len());

    let submission = vapi_submission(&call, args.metrics);

    println!();
    println!("Uploading conversation to Coval...");
    let report = ConversationUploader::new(&client, RoleMap::vapi())
        .upload(submission, Some(&call), Some(&call))
        .await?;
    print_report(&report);
    Ok(())
}

pub async fn upload_twilio(cfg: &CovalConfig, args: UploadTwilioArgs) -> anyhow::Result<()> {
    let account_sid = args.account_sid.unwrap_or_default();
    let auth_token = args.auth_token.unwrap_or_default();
    require_non_empty("twilio_account_sid", &account_sid)?;
    require_non_empty("twilio_auth_token", &auth_token)?;
    require_non_empty("call_sid", &args.call_sid)?;
    let client = CovalClient::new(cfg)?;

    println!("Fetching Twilio call {}...", args.call_sid);
    let twilio = TwilioConfig::new(account_sid, auth_token);
    let details = fetch_twilio_call(&twilio, &args.call_sid, client.timeout()).await?;
    println!("Recording: {}", details.recording.sid);
    println!("Media URL: {}", details.recording_media_url);

    let audio = args.audio_url.map(SignedAudioUrl::new);
    match &audio {
        Some(audio) if !args.skip_check => check_audio_url(audio).await,
        Some(_) => {}
        None => log::warn!(
            "Twilio media requires account credentials; pass --audio-url with a re-hosted copy to include audio"
        ),
    }

    let submission = twilio_submission(&details, args.metrics);

    println!();
    println!("Uploading conversation to Coval...");
    let report = ConversationUploader::new(&client, RoleMap::passthrough())
        .upload(
            submission,
            audio.as_ref().map(|a| a as &dyn AudioSource),
            None,
        )
        .await?;
    print_report(&report);
    Ok(())
}
