use crate::request::{HttpRequest, join_url};
use coval_core::{ConversationSubmission, LaunchRunRequest, RunId, TestCaseSpec, TestSetSpec};

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone, PartialEq, Eq)]
pub struct CovalApiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for CovalApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CovalApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl From<&coval_core::CovalConfig> for CovalApiConfig {
    fn from(cfg: &coval_core::CovalConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

fn authorize(cfg: &CovalApiConfig, req: HttpRequest) -> HttpRequest {
    req.with_header(API_KEY_HEADER, cfg.api_key.clone())
}

pub fn runs_url(cfg: &CovalApiConfig) -> String {
    join_url(&cfg.base_url, "/runs")
}

pub fn build_launch_run_request(
    cfg: &CovalApiConfig,
    run: &LaunchRunRequest,
) -> anyhow::Result<HttpRequest> {
    Ok(authorize(cfg, HttpRequest::post_json(runs_url(cfg), run)?))
}

pub fn build_get_run_request(cfg: &CovalApiConfig, run_id: &RunId) -> HttpRequest {
    let url = format!("{}/{}", runs_url(cfg), run_id);
    authorize(
        cfg,
        HttpRequest::get(url).with_header("Content-Type", "application/json"),
    )
}

pub fn build_submit_conversation_request(
    cfg: &CovalApiConfig,
    submission: &ConversationSubmission,
) -> anyhow::Result<HttpRequest> {
    let url = join_url(&cfg.base_url, "/conversations:submit");
    Ok(authorize(cfg, HttpRequest::post_json(url, submission)?))
}

pub fn build_create_test_set_request(
    cfg: &CovalApiConfig,
    spec: &TestSetSpec,
) -> anyhow::Result<HttpRequest> {
    let url = join_url(&cfg.base_url, "/test-sets");
    Ok(authorize(cfg, HttpRequest::post_json(url, spec)?))
}

pub fn build_create_test_case_request(
    cfg: &CovalApiConfig,
    spec: &TestCaseSpec,
) -> anyhow::Result<HttpRequest> {
    let url = join_url(&cfg.base_url, "/test-cases");
    Ok(authorize(cfg, HttpRequest::post_json(url, spec)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coval_core::{RunOptions, TestSetId};

    fn cfg() -> CovalApiConfig {
        CovalApiConfig {
            base_url: "https://api.coval.dev/v1/".into(),
            api_key: "k".into(),
        }
    }

    #[test]
    fn launch_run_is_authorized_json_post() {
        let run = LaunchRunRequest {
            agent_id: "a".into(),
            persona_id: "p".into(),
            test_set_id: "t".into(),
            options: RunOptions::default(),
            metric_ids: vec![],
        };
        let req = build_launch_run_request(&cfg(), &run).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://api.coval.dev/v1/runs");
        assert_eq!(req.header("x-api-key"), Some("k"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.json_body().unwrap().contains("\"agent_id\":\"a\""));
    }

    #[test]
    fn get_run_targets_resource_path() {
        let req = build_get_run_request(&cfg(), &RunId::new("r1"));
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "https://api.coval.dev/v1/runs/r1");
        assert_eq!(req.header("x-api-key"), Some("k"));
    }

    #[test]
    fn conversation_and_test_set_paths() {
        let sub = ConversationSubmission::new("2024-01-01T00:00:00Z");
        let req = build_submit_conversation_request(&cfg(), &sub).unwrap();
        assert_eq!(req.url, "https://api.coval.dev/v1/conversations:submit");

        let req = build_create_test_set_request(&cfg(), &TestSetSpec::default()).unwrap();
        assert_eq!(req.url, "https://api.coval.dev/v1/test-sets");
        assert!(req.json_body().unwrap().contains("SCENARIO"));

        let case = TestCaseSpec {
            test_set_id: TestSetId::new("ts"),
            input_str: "hi".into(),
            expected_output_str: None,
            description: None,
        };
        let req = build_create_test_case_request(&cfg(), &case).unwrap();
        assert_eq!(req.url, "https://api.coval.dev/v1/test-cases");
        assert_eq!(
            req.json_body(),
            Some(r#"{"test_set_id":"ts","input_str":"hi"}"#)
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let cfg = CovalApiConfig {
            base_url: "https://x".into(),
            api_key: "secret-key".into(),
        };
        assert!(!format!("{cfg:?}").contains("secret-key"));
    }
}
