use crate::config::{ConfigError, require_in_range, require_non_empty};
use crate::transcript::TranscriptEntry;
use crate::types::TestSetId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_ITERATION_COUNT: u32 = 10;
pub const MAX_CONCURRENCY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub iteration_count: u32,
    pub concurrency: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            iteration_count: 1,
            concurrency: 1,
        }
    }
}

/// Body of `POST /runs`.
///
/// Only caller-owned fields exist here; the run id, status and creation time
/// are assigned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRunRequest {
    pub agent_id: String,
    pub persona_id: String,
    pub test_set_id: String,
    pub options: RunOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_ids: Vec<String>,
}

impl LaunchRunRequest {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("agent_id", &self.agent_id)?;
        require_non_empty("persona_id", &self.persona_id)?;
        require_non_empty("test_set_id", &self.test_set_id)?;
        require_in_range(
            "iteration_count",
            self.options.iteration_count,
            1,
            MAX_ITERATION_COUNT,
        )?;
        require_in_range("concurrency", self.options.concurrency, 1, MAX_CONCURRENCY)?;
        Ok(())
    }
}

/// Body of `POST /conversations:submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_conversation_id: Option<String>,
    // RFC 3339, UTC.
    pub occurred_at: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<String>,
}

impl ConversationSubmission {
    pub fn new(occurred_at: impl Into<String>) -> Self {
        Self {
            audio_url: None,
            transcript: Vec::new(),
            external_conversation_id: None,
            occurred_at: occurred_at.into(),
            metadata: BTreeMap::new(),
            metrics: Vec::new(),
        }
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn with_transcript(mut self, transcript: Vec<TranscriptEntry>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_conversation_id = Some(id.into());
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<String>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Inserts a metadata pair; `None` values are left out.
    pub fn with_metadata<V: Into<String>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.metadata.insert(key.to_string(), v.into());
        }
        self
    }
}

/// Body of `POST /test-sets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSetSpec {
    pub display_name: String,
    pub description: String,
    pub test_set_type: String,
}

impl Default for TestSetSpec {
    fn default() -> Self {
        Self {
            display_name: "LLM Generated Test Cases".into(),
            description: "Test cases generated via OpenAI".into(),
            test_set_type: "SCENARIO".into(),
        }
    }
}

/// Body of `POST /test-cases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseSpec {
    pub test_set_id: TestSetId,
    pub input_str: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A test case as produced by the generating model.
///
/// Models drift between `input` and `input_str` style keys, so both are
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTestCase {
    #[serde(default, alias = "input_str")]
    pub input: String,
    #[serde(default, alias = "expected_output_str")]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl GeneratedTestCase {
    pub fn into_spec(self, test_set_id: &TestSetId) -> TestCaseSpec {
        TestCaseSpec {
            test_set_id: test_set_id.clone(),
            input_str: self.input,
            expected_output_str: self.expected_output,
            description: self.description,
        }
    }

    /// Short label for progress output.
    pub fn label(&self) -> String {
        match &self.description {
            Some(d) => d.clone(),
            None => self.input.chars().take(40).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptRole;

    fn launch() -> LaunchRunRequest {
        LaunchRunRequest {
            agent_id: "agent".into(),
            persona_id: "persona".into(),
            test_set_id: "ts".into(),
            options: RunOptions::default(),
            metric_ids: vec![],
        }
    }

    #[test]
    fn launch_body_has_no_server_fields() {
        let json = serde_json::to_value(launch()).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["run_id", "status", "create_time", "metric_ids"] {
            assert!(!obj.contains_key(key), "unexpected key {key}");
        }
        assert_eq!(json["options"]["iteration_count"], 1);
        assert_eq!(json["options"]["concurrency"], 1);
    }

    #[test]
    fn launch_body_includes_metrics_when_present() {
        let mut req = launch();
        req.metric_ids = vec!["m1".into()];
        let json = serde_json::to_value(req).unwrap();
        assert_eq!(json["metric_ids"][0], "m1");
    }

    #[test]
    fn launch_validation() {
        assert!(launch().validate().is_ok());

        let mut req = launch();
        req.agent_id = "  ".into();
        assert_eq!(
            req.validate(),
            Err(ConfigError::Missing { field: "agent_id" })
        );

        let mut req = launch();
        req.options.iteration_count = 11;
        assert!(matches!(
            req.validate(),
            Err(ConfigError::OutOfRange {
                field: "iteration_count",
                ..
            })
        ));

        let mut req = launch();
        req.options.concurrency = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn conversation_body_omits_empty_optionals() {
        let sub = ConversationSubmission::new("2024-01-01T00:00:00Z")
            .with_audio_url("https://example.com/a.wav")
            .with_metadata("platform", Some("aws"))
            .with_metadata::<String>("customer_number", None);

        let json = serde_json::to_value(&sub).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["audio_url"], "https://example.com/a.wav");
        assert_eq!(obj["metadata"]["platform"], "aws");
        assert!(obj["metadata"].get("customer_number").is_none());
        for key in [
            "transcript",
            "metrics",
            "external_conversation_id",
            "conversation_id",
            "status",
        ] {
            assert!(!obj.contains_key(key), "unexpected key {key}");
        }
    }

    #[test]
    fn conversation_body_carries_transcript() {
        let sub = ConversationSubmission::new("t").with_transcript(vec![TranscriptEntry {
            role: TranscriptRole::User,
            content: "hello".into(),
            start_time: 2.0,
            end_time: 3.0,
            timestamp: None,
        }]);
        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["transcript"][0]["role"], "user");
        assert_eq!(json["transcript"][0]["end_time"], 3.0);
    }

    #[test]
    fn generated_case_accepts_both_key_styles() {
        let a: GeneratedTestCase =
            serde_json::from_str(r#"{"input":"refund?","expected_output":"explain policy"}"#)
                .unwrap();
        let b: GeneratedTestCase =
            serde_json::from_str(r#"{"input_str":"refund?","expected_output_str":"explain policy"}"#)
                .unwrap();
        assert_eq!(a, b);

        let spec = a.into_spec(&TestSetId::new("ts1"));
        assert_eq!(spec.input_str, "refund?");
        assert_eq!(spec.expected_output_str.as_deref(), Some("explain policy"));
    }

    #[test]
    fn generated_case_label_falls_back_to_input() {
        let case = GeneratedTestCase {
            input: "x".repeat(60),
            expected_output: None,
            description: None,
        };
        assert_eq!(case.label().len(), 40);
    }
}
