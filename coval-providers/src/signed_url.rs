use crate::request::HttpRequest;
use crate::runtime::HttpResponse;
use std::time::Duration;

pub const MAX_AUDIO_BYTES: u64 = 200 * 1024 * 1024;
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioUrlCheck {
    Accessible {
        size_bytes: Option<u64>,
        content_type: Option<String>,
    },
    /// The URL answered but cannot be used as-is.
    Rejected { reason: String },
    /// The URL could not be probed; it may still work for the service.
    Unverified { reason: String },
}

impl AudioUrlCheck {
    pub fn is_rejected(&self) -> bool {
        matches!(self, AudioUrlCheck::Rejected { .. })
    }
}

/// Checks the scheme before anything goes on the wire.
pub fn check_scheme(url: &str) -> Option<AudioUrlCheck> {
    match url::Url::parse(url) {
        Ok(u) if u.scheme() == "https" => None,
        Ok(_) => Some(AudioUrlCheck::Rejected {
            reason: "URL must use HTTPS protocol".into(),
        }),
        Err(e) => Some(AudioUrlCheck::Rejected {
            reason: format!("invalid URL: {e}"),
        }),
    }
}

pub fn build_probe_request(url: &str) -> HttpRequest {
    HttpRequest::head(url)
}

pub fn check_probe_response(resp: &HttpResponse) -> AudioUrlCheck {
    if resp.status != 200 {
        return AudioUrlCheck::Rejected {
            reason: format!("URL returned status code {}", resp.status),
        };
    }

    let size_bytes = resp
        .header("content-length")
        .and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(size) = size_bytes.filter(|s| *s > MAX_AUDIO_BYTES) {
        return AudioUrlCheck::Rejected {
            reason: format!(
                "file too large ({:.2} MB); maximum is {} MB",
                megabytes(size),
                MAX_AUDIO_BYTES / (1024 * 1024)
            ),
        };
    }

    AudioUrlCheck::Accessible {
        size_bytes,
        content_type: resp.header("content-type").map(str::to_string),
    }
}

pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
