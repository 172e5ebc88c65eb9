use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Assistant,
    System,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
            TranscriptRole::System => "system",
        }
    }
}

/// One timed message in the evaluation service's transcript schema.
///
/// Times are seconds relative to the start of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub content: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// A message as reported by a third-party call platform, before relabeling.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageRecord {
    pub role: String,
    pub text: String,
    pub seconds_from_start: Option<f64>,
    pub duration_ms: Option<f64>,
    // Platform wall-clock time, passed through untouched.
    pub time: Option<f64>,
}

/// Lookup table from a platform's role labels to transcript roles.
///
/// Tables are platform specific. Do not reuse the Vapi table for another
/// platform; build a new one with [`RoleMap::with`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleMap {
    entries: Vec<(String, TranscriptRole)>,
}

impl RoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl Into<String>, target: TranscriptRole) -> Self {
        let source = source.into();
        self.entries.retain(|(s, _)| s != &source);
        self.entries.push((source, target));
        self
    }

    /// Vapi reverses the usual naming: its "user" is the voice agent and its
    /// "bot" is the caller.
    pub fn vapi() -> Self {
        Self::new()
            .with("user", TranscriptRole::Assistant)
            .with("bot", TranscriptRole::User)
            .with("system", TranscriptRole::System)
    }

    /// For sources that already speak user/assistant/system.
    pub fn passthrough() -> Self {
        Self::new()
            .with("user", TranscriptRole::User)
            .with("assistant", TranscriptRole::Assistant)
            .with("system", TranscriptRole::System)
    }

    pub fn lookup(&self, source: &str) -> Option<TranscriptRole> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, r)| *r)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMessage {
    pub index: usize,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscriptMapping {
    pub entries: Vec<TranscriptEntry>,
    pub skipped: Vec<SkippedMessage>,
}

/// Relabels and retimes platform messages into transcript entries.
///
/// Messages whose role is not in `roles` are dropped and reported in
/// `skipped`; they never fail the whole mapping. Input order is kept.
///
/// Not idempotent: with a reversing table such as [`RoleMap::vapi`], feeding
/// the output back in flips roles again and drops labels the table lacks.
pub fn map_transcript(messages: &[MessageRecord], roles: &RoleMap) -> TranscriptMapping {
    let mut out = TranscriptMapping::default();

    for (index, msg) in messages.iter().enumerate() {
        let Some(role) = roles.lookup(&msg.role) else {
            log::warn!("unknown role '{}' in message {index}, skipping", msg.role);
            out.skipped.push(SkippedMessage {
                index,
                role: msg.role.clone(),
            });
            continue;
        };

        let start_time = msg.seconds_from_start.unwrap_or(0.0);
        let duration_secs = msg.duration_ms.unwrap_or(0.0) / 1000.0;

        out.entries.push(TranscriptEntry {
            role,
            content: msg.text.clone(),
            start_time,
            end_time: start_time + duration_secs,
            timestamp: msg.time,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, text: &str, start: Option<f64>, duration_ms: Option<f64>) -> MessageRecord {
        MessageRecord {
            role: role.into(),
            text: text.into(),
            seconds_from_start: start,
            duration_ms,
            time: None,
        }
    }

    #[test]
    fn vapi_roles_are_reversed_and_timed() {
        let input = vec![
            msg("user", "hi", Some(1.0), Some(500.0)),
            msg("bot", "hello", Some(2.0), Some(1000.0)),
            msg("alien", "?", None, None),
        ];

        let out = map_transcript(&input, &RoleMap::vapi());
        assert_eq!(out.entries.len(), 2);

        assert_eq!(out.entries[0].role, TranscriptRole::Assistant);
        assert_eq!(out.entries[0].content, "hi");
        assert_eq!(out.entries[0].start_time, 1.0);
        assert_eq!(out.entries[0].end_time, 1.5);

        assert_eq!(out.entries[1].role, TranscriptRole::User);
        assert_eq!(out.entries[1].content, "hello");
        assert_eq!(out.entries[1].start_time, 2.0);
        assert_eq!(out.entries[1].end_time, 3.0);

        assert_eq!(
            out.skipped,
            vec![SkippedMessage {
                index: 2,
                role: "alien".into()
            }]
        );
    }

    #[test]
    fn missing_timing_defaults_to_zero() {
        let out = map_transcript(&[msg("system", "be nice", None, None)], &RoleMap::vapi());
        assert_eq!(out.entries[0].role, TranscriptRole::System);
        assert_eq!(out.entries[0].start_time, 0.0);
        assert_eq!(out.entries[0].end_time, 0.0);
    }

    #[test]
    fn order_is_preserved() {
        let input: Vec<_> = (0..5)
            .map(|i| msg("bot", &format!("m{i}"), Some(i as f64), Some(100.0)))
            .collect();
        let out = map_transcript(&input, &RoleMap::vapi());
        let texts: Vec<_> = out.entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(texts, ["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn remapping_output_is_not_idempotent() {
        let first = map_transcript(
            &[
                msg("user", "hi", Some(1.0), Some(500.0)),
                msg("bot", "hello", Some(2.0), Some(1000.0)),
            ],
            &RoleMap::vapi(),
        );

        let fed_back: Vec<_> = first
            .entries
            .iter()
            .map(|e| {
                msg(
                    e.role.as_str(),
                    &e.content,
                    Some(e.start_time),
                    Some((e.end_time - e.start_time) * 1000.0),
                )
            })
            .collect();
        let second = map_transcript(&fed_back, &RoleMap::vapi());

        // "assistant" is not a Vapi label; "user" flips to assistant again.
        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].role, TranscriptRole::Assistant);
        assert_eq!(second.entries[0].content, "hello");
        assert_eq!(second.skipped[0].role, "assistant");
        assert_ne!(first.entries, second.entries);
    }

    #[test]
    fn custom_tables_replace_entries() {
        let roles = RoleMap::new()
            .with("agent", TranscriptRole::User)
            .with("agent", TranscriptRole::Assistant)
            .with("customer", TranscriptRole::User);
        assert_eq!(roles.lookup("agent"), Some(TranscriptRole::Assistant));
        assert_eq!(roles.lookup("customer"), Some(TranscriptRole::User));
        assert_eq!(roles.lookup("bot"), None);
    }

    #[test]
    fn entry_serializes_without_absent_timestamp() {
        let entry = TranscriptEntry {
            role: TranscriptRole::Assistant,
            content: "hi".into(),
            start_time: 1.0,
            end_time: 1.5,
            timestamp: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("timestamp").is_none());
    }
}
