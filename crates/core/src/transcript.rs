//! Call transcript types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The person calling the shop
    Caller,
    /// The front desk agent
    Agent,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Caller => "caller",
            Speaker::Agent => "agent",
        }
    }

    /// Label shown in front of the line in a rendered transcript
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Caller => "You",
            Speaker::Agent => "Agent",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transcript line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Speaker of the line
    pub speaker: Speaker,
    /// Raw text as recognized or spoken
    pub text: String,
    /// When the line was appended
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Create a new entry stamped with the current time
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a caller entry
    pub fn caller(text: impl Into<String>) -> Self {
        Self::new(Speaker::Caller, text)
    }

    /// Create an agent entry
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Speaker::Agent, text)
    }
}

impl std::fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.speaker.label(), self.text)
    }
}

/// Append-only transcript scoped to one call
///
/// Entries are kept in the order they were appended. The only way to remove
/// lines is [`Transcript::clear`], used when a new call starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and return a reference to it
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) -> &TranscriptEntry {
        self.entries.push(TranscriptEntry::new(speaker, text));
        // just pushed
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TranscriptEntry;
    type IntoIter = std::slice::Iter<'a, TranscriptEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.push(Speaker::Caller, "hi");
        transcript.push(Speaker::Agent, "Hello!");
        transcript.push(Speaker::Caller, "bye");

        let speakers: Vec<Speaker> = transcript.iter().map(|e| e.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::Caller, Speaker::Agent, Speaker::Caller]
        );
        assert_eq!(transcript.last().unwrap().text, "bye");
        assert!(transcript.entries()[0].timestamp <= transcript.entries()[2].timestamp);
    }

    #[test]
    fn test_clear() {
        let mut transcript = Transcript::new();
        transcript.push(Speaker::Agent, "Hello!");
        assert_eq!(transcript.len(), 1);

        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(TranscriptEntry::caller("hello").to_string(), "You: hello");
        assert_eq!(TranscriptEntry::agent("Hi there").to_string(), "Agent: Hi there");
    }

    #[test]
    fn test_serializes_as_list() {
        let mut transcript = Transcript::new();
        transcript.push(Speaker::Caller, "hi");

        let value = serde_json::to_value(&transcript).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["speaker"], "caller");
        assert_eq!(value[0]["text"], "hi");
    }
}
