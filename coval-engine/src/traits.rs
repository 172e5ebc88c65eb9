use crate::client::SubmitError;
use async_trait::async_trait;
use coval_core::{GeneratedTestCase, MessageRecord, RunId, RunStatus};

#[async_trait]
pub trait RunStatusSource: Send + Sync {
    async fn run_status(&self, run_id: &RunId) -> Result<RunStatus, SubmitError>;
}

/// Yields a read URL for a call recording, e.g. a presigned object-store URL.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn resolve_audio_reference(&self) -> anyhow::Result<Option<String>>;
}

/// Yields a platform's call messages in their original labeling.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn list_messages(&self) -> anyhow::Result<Vec<MessageRecord>>;
}

#[async_trait]
pub trait TestCaseGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<GeneratedTestCase>>;
}
