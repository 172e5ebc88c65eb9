use crate::traits::RunStatusSource;
use anyhow::anyhow;
use coval_core::{
    ConfigError, ConversationRecord, ConversationSubmission, CovalConfig, LaunchRunRequest,
    RunId, RunRecord, RunStatus, TestCaseRecord, TestCaseSpec, TestSetRecord, TestSetSpec,
};
use coval_providers::coval::{
    CovalApiConfig, build_create_test_case_request, build_create_test_set_request,
    build_get_run_request, build_launch_run_request, build_submit_conversation_request,
};
use coval_providers::parse;
use coval_providers::request::HttpRequest;
use coval_providers::runtime;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build request: {0:#}")]
    Request(anyhow::Error),

    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("request failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("service rejected request: status={status} body={body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected response: {0:#}")]
    Decode(anyhow::Error),
}

/// Authenticated client for the evaluation service.
///
/// Every call is a single attempt. Failures are returned to the caller, who
/// decides whether to try again.
#[derive(Debug, Clone)]
pub struct CovalClient {
    api: CovalApiConfig,
    timeout: Duration,
}

impl CovalClient {
    pub fn new(cfg: &CovalConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            api: CovalApiConfig::from(cfg),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn launch_run(&self, run: &LaunchRunRequest) -> Result<RunRecord, SubmitError> {
        run.validate()?;
        let req = build_launch_run_request(&self.api, run).map_err(SubmitError::Request)?;
        let body = self.send(&req).await?;
        parse::parse_run_response(&body).map_err(SubmitError::Decode)
    }

    pub async fn get_run(&self, run_id: &RunId) -> Result<RunRecord, SubmitError> {
        let req = build_get_run_request(&self.api, run_id);
        let body = self.send(&req).await?;
        parse::parse_run_response(&body).map_err(SubmitError::Decode)
    }

    pub async fn submit_conversation(
        &self,
        submission: &ConversationSubmission,
    ) -> Result<ConversationRecord, SubmitError> {
        let req =
            build_submit_conversation_request(&self.api, submission).map_err(SubmitError::Request)?;
        let body = self.send(&req).await?;
        parse::parse_conversation_response(&body).map_err(SubmitError::Decode)
    }

    pub async fn create_test_set(&self, spec: &TestSetSpec) -> Result<TestSetRecord, SubmitError> {
        let req = build_create_test_set_request(&self.api, spec).map_err(SubmitError::Request)?;
        let body = self.send(&req).await?;
        parse::parse_test_set_response(&body).map_err(SubmitError::Decode)
    }

    pub async fn create_test_case(
        &self,
        spec: &TestCaseSpec,
    ) -> Result<TestCaseRecord, SubmitError> {
        let req = build_create_test_case_request(&self.api, spec).map_err(SubmitError::Request)?;
        let body = self.send(&req).await?;
        parse::parse_test_case_response(&body).map_err(SubmitError::Decode)
    }

    // Only HTTP 200 counts as success.
    async fn send(&self, req: &HttpRequest) -> Result<Vec<u8>, SubmitError> {
        log::debug!("sending {req:?}");

        let resp = runtime::execute_with_timeout(req, self.timeout)
            .await
            .map_err(|e| {
                if runtime::is_timeout(&e) {
                    SubmitError::Timeout {
                        timeout: self.timeout,
                    }
                } else {
                    SubmitError::Transport(e)
                }
            })?;

        if resp.status != 200 {
            return Err(SubmitError::Rejected {
                status: resp.status,
                body: resp.body_text(),
            });
        }

        Ok(resp.body)
    }
}

#[async_trait::async_trait]
impl RunStatusSource for CovalClient {
    async fn run_status(&self, run_id: &RunId) -> Result<RunStatus, SubmitError> {
        self.get_run(run_id)
            .await?
            .status
            .ok_or_else(|| SubmitError::Decode(anyhow!("run {run_id} has no status")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_requires_api_key() {
        let err = CovalClient::new(&CovalConfig::default()).unwrap_err();
        assert_eq!(err, ConfigError::Missing { field: "api_key" });
    }

    #[test]
    fn client_uses_configured_timeout() {
        let mut cfg = CovalConfig::default().with_api_key("k");
        cfg.request_timeout_secs = 7;
        let client = CovalClient::new(&cfg).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn invalid_launch_fails_before_network() {
        // Unroutable base URL: reaching the network would surface as Transport.
        let cfg = CovalConfig::default()
            .with_api_key("k")
            .with_base_url("http://127.0.0.1:9");
        let client = CovalClient::new(&cfg).unwrap();
        let run = LaunchRunRequest {
            agent_id: String::new(),
            persona_id: "p".into(),
            test_set_id: "t".into(),
            options: Default::default(),
            metric_ids: vec![],
        };
        let err = client.launch_run(&run).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Config(ConfigError::Missing { field: "agent_id" })
        ));
    }

    #[test]
    fn timeout_message_names_duration() {
        let err = SubmitError::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "request timed out after 30s");
    }
}
