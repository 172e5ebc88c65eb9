use anyhow::{Context, anyhow};
use coval_core::{ConversationRecord, RunRecord, TestCaseRecord, TestSetRecord};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    run: RunRecord,
}

#[derive(Debug, Deserialize)]
struct ConversationEnvelope {
    conversation: ConversationRecord,
}

#[derive(Debug, Deserialize)]
struct TestSetEnvelope {
    test_set: TestSetRecord,
}

#[derive(Debug, Deserialize)]
struct TestCaseEnvelope {
    test_case: TestCaseRecord,
}

pub fn parse_run_response(body: &[u8]) -> anyhow::Result<RunRecord> {
    let env: RunEnvelope = serde_json::from_slice(body).context("decode run JSON")?;
    Ok(env.run)
}

pub fn parse_conversation_response(body: &[u8]) -> anyhow::Result<ConversationRecord> {
    let env: ConversationEnvelope =
        serde_json::from_slice(body).context("decode conversation JSON")?;
    Ok(env.conversation)
}

pub fn parse_test_set_response(body: &[u8]) -> anyhow::Result<TestSetRecord> {
    let env: TestSetEnvelope = serde_json::from_slice(body).context("decode test set JSON")?;
    Ok(env.test_set)
}

pub fn parse_test_case_response(body: &[u8]) -> anyhow::Result<TestCaseRecord> {
    let env: TestCaseEnvelope = serde_json::from_slice(body).context("decode test case JSON")?;
    Ok(env.test_case)
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

pub fn parse_openai_chat_completion(body: &[u8]) -> anyhow::Result<String> {
    let resp: OpenAiChatResponse = serde_json::from_slice(body).context("decode chat JSON")?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("no content in chat completion response"))?;
    Ok(content)
}
