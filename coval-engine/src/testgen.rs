use crate::client::{CovalClient, SubmitError};
use crate::traits::TestCaseGenerator;
use anyhow::{Context, anyhow};
use coval_core::{GeneratedTestCase, TestCaseRecord, TestSetRecord, TestSetSpec};
use coval_providers::openai_compatible::{
    ChatMessage, OpenAiCompatibleChatConfig, build_json_chat_request,
};
use coval_providers::{parse, runtime};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_GENERATION_PROMPT: &str = "\
Generate 10 diverse test cases for evaluating a customer support AI agent.

Each test case should be a realistic customer inquiry. Return a JSON array with objects containing:
- \"input\": the customer's message/question
- \"expected_output\": a brief description of what a good response should include
- \"description\": a short label for the test case

Focus on variety: billing questions, technical issues, account management, etc.
";

// A ten-case completion routinely takes longer than a Coval API call.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiTestCaseGenerator {
    cfg: OpenAiCompatibleChatConfig,
    timeout: Duration,
}

impl OpenAiTestCaseGenerator {
    pub fn new(cfg: OpenAiCompatibleChatConfig) -> Self {
        Self {
            cfg,
            timeout: GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl TestCaseGenerator for OpenAiTestCaseGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<GeneratedTestCase>> {
        if self.cfg.api_key.trim().is_empty() {
            return Err(anyhow!("missing OpenAI API key"));
        }

        let req = build_json_chat_request(&self.cfg, &[ChatMessage::user(prompt)])?;
        let resp = runtime::execute_with_timeout(&req, self.timeout).await?;
        if !(200..=299).contains(&resp.status) {
            return Err(anyhow!(
                "OpenAI-compatible request failed: status={} body={}",
                resp.status,
                resp.body_text()
            ));
        }

        let content = parse::parse_openai_chat_completion(&resp.body)?;
        extract_generated_test_cases(&content)
    }
}

/// Pulls the case list out of a JSON-mode reply.
///
/// JSON mode forces an object at the top level, so the list usually sits
/// under `test_cases` or `cases`; otherwise the first array value is used.
pub fn extract_generated_test_cases(content: &str) -> anyhow::Result<Vec<GeneratedTestCase>> {
    let value: Value = serde_json::from_str(content).context("decode generated JSON")?;

    let list = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map
            .remove("test_cases")
            .or_else(|| map.remove("cases"))
            .or_else(|| map.into_iter().map(|(_, v)| v).find(Value::is_array))
            .ok_or_else(|| anyhow!("generated JSON has no list of test cases"))?,
        other => return Err(anyhow!("unexpected generated JSON: {other}")),
    };

    serde_json::from_value(list).context("decode generated test cases")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSetUpload {
    pub test_set: TestSetRecord,
    pub cases: Vec<TestCaseRecord>,
}

/// Creates the test set, then each case in order. Stops at the first failure.
pub async fn upload_test_set<F>(
    client: &CovalClient,
    spec: &TestSetSpec,
    cases: Vec<GeneratedTestCase>,
    mut on_case: F,
) -> Result<TestSetUpload, SubmitError>
where
    F: FnMut(usize, &TestCaseRecord, &GeneratedTestCase),
{
    let test_set = client.create_test_set(spec).await?;
    log::info!("created test set {}", test_set.id);

    let mut created = Vec::with_capacity(cases.len());
    for (i, case) in cases.into_iter().enumerate() {
        let record = client
            .create_test_case(&case.clone().into_spec(&test_set.id))
            .await?;
        on_case(i + 1, &record, &case);
        created.push(record);
    }

    Ok(TestSetUpload {
        test_set,
        cases: created,
    })
}
