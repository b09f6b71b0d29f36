//! Documents accepted by the indexer.
//!
//! Reports arrive as JSON in a few historical shapes: analysis fields may sit
//! at the top level or under `analysis`, and several fields have aliases.
//! [`Report::from_json`] normalizes all of them once, at ingestion, so the
//! rest of the crate only sees the typed [`Report`].

use crate::error::{Result, VidsageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized AI analysis report for one video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub document_id: String,
    pub title: String,
    pub channel: Option<String>,
    pub main_topics: Vec<String>,
    pub key_points: Vec<String>,
    pub important_facts: Vec<String>,
    pub technical_details: Vec<String>,
    pub examples_and_stories: Vec<String>,
    pub important_segments: Vec<String>,
    pub detailed_summary: Option<String>,
    pub overall_summary: Option<String>,
    pub target_audience: Option<String>,
    pub tone_and_style: Option<String>,
    pub content_quality: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// A raw video transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub document_id: String,
    pub title: String,
    pub text: String,
}

/// Anything the indexer can ingest.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceDocument {
    Report(Report),
    Transcript(Transcript),
}

impl SourceDocument {
    pub fn document_id(&self) -> &str {
        match self {
            SourceDocument::Report(r) => &r.document_id,
            SourceDocument::Transcript(t) => &t.document_id,
        }
    }
}

impl From<Report> for SourceDocument {
    fn from(report: Report) -> Self {
        SourceDocument::Report(report)
    }
}

impl From<Transcript> for SourceDocument {
    fn from(transcript: Transcript) -> Self {
        SourceDocument::Transcript(transcript)
    }
}

/// Analysis fields, then top-level fields.
struct Fields<'a> {
    analysis: Option<&'a Map<String, Value>>,
    top: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn get(&self, names: &[&str]) -> Option<&'a Value> {
        let scopes = self.analysis.into_iter().chain(std::iter::once(self.top));
        for scope in scopes {
            for name in names {
                match scope.get(*name) {
                    None | Some(Value::Null) => continue,
                    Some(value) => return Some(value),
                }
            }
        }
        None
    }

    fn text(&self, names: &[&str]) -> Option<String> {
        self.get(names)
            .map(render_value)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn list(&self, names: &[&str]) -> Vec<String> {
        match self.get(names) {
            Some(Value::Array(items)) => items
                .iter()
                .map(render_value)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(other) => {
                let single = render_value(other).trim().to_string();
                if single.is_empty() {
                    Vec::new()
                } else {
                    vec![single]
                }
            }
            None => Vec::new(),
        }
    }
}

/// Render a JSON value as plain text.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

impl Report {
    /// Create a report with only identifying fields set.
    pub fn new(document_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Normalize a report JSON object.
    ///
    /// Accepts `video_id`/`document_id`, `video_title`/`title`, analysis
    /// fields top-level or under `analysis`, and the aliases `summary`,
    /// `technologies_mentioned`, `examples_and_segments` and `relevant_for`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let top = value.as_object().ok_or_else(|| {
            VidsageError::MalformedDocument("report must be a JSON object".to_string())
        })?;

        let fields = Fields {
            analysis: top.get("analysis").and_then(Value::as_object),
            top,
        };

        let analyzed_at = fields
            .text(&["analysis_timestamp", "analyzed_at"])
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let report = Self {
            document_id: top_level_text(top, &["video_id", "document_id", "id"]).unwrap_or_default(),
            title: top_level_text(top, &["video_title", "title"]).unwrap_or_default(),
            channel: top_level_text(top, &["channel_title", "channel"]),
            main_topics: fields.list(&["main_topics"]),
            key_points: fields.list(&["key_points"]),
            important_facts: fields.list(&["important_facts"]),
            technical_details: fields.list(&["technical_details", "technologies_mentioned"]),
            examples_and_stories: fields.list(&["examples_and_stories", "examples_and_segments"]),
            important_segments: fields.list(&["important_segments"]),
            detailed_summary: fields.text(&["detailed_summary"]),
            overall_summary: fields.text(&["overall_summary", "summary"]),
            target_audience: fields.text(&["target_audience", "relevant_for"]),
            tone_and_style: fields.text(&["tone_and_style"]),
            content_quality: fields.text(&["content_quality"]),
            analyzed_at,
        };

        report.validate()?;
        Ok(report)
    }

    /// Parse and normalize a report from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| VidsageError::MalformedDocument(format!("invalid report JSON: {}", e)))?;
        Self::from_json(&value)
    }

    /// Reject reports without identifying fields.
    pub fn validate(&self) -> Result<()> {
        validate_identity(&self.document_id, &self.title, "report")
    }

    /// Labeled text sections, in indexing order. Empty fields are omitted.
    pub fn sections(&self) -> Vec<String> {
        let mut sections = vec![format!("Video title: {}", self.title)];

        if let Some(channel) = &self.channel {
            sections.push(format!("Channel: {}", channel));
        }
        if !self.main_topics.is_empty() {
            sections.push(format!("Main topics: {}", self.main_topics.join(", ")));
        }

        for (label, items) in [
            ("Key points", &self.key_points),
            ("Important facts", &self.important_facts),
            ("Technical details", &self.technical_details),
            ("Examples and stories", &self.examples_and_stories),
            ("Important segments", &self.important_segments),
        ] {
            if !items.is_empty() {
                sections.push(bullet_section(label, items));
            }
        }

        for (label, value) in [
            ("Detailed summary", &self.detailed_summary),
            ("Overall summary", &self.overall_summary),
            ("Target audience", &self.target_audience),
            ("Tone and style", &self.tone_and_style),
            ("Content quality", &self.content_quality),
        ] {
            if let Some(value) = value {
                sections.push(format!("{}: {}", label, value));
            }
        }

        sections
    }

    /// Sections joined by blank lines; the text handed to the chunker.
    pub fn to_index_text(&self) -> String {
        self.sections().join("\n\n")
    }
}

impl Transcript {
    pub fn new(
        document_id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_identity(&self.document_id, &self.title, "transcript")
    }
}

fn top_level_text(top: &Map<String, Value>, names: &[&str]) -> Option<String> {
    Fields { analysis: None, top }.text(names)
}

fn bullet_section(label: &str, items: &[String]) -> String {
    let bullets: Vec<String> = items.iter().map(|item| format!("- {}", item)).collect();
    format!("{}:\n{}", label, bullets.join("\n"))
}

fn validate_identity(document_id: &str, title: &str, kind: &str) -> Result<()> {
    if document_id.trim().is_empty() {
        return Err(VidsageError::MalformedDocument(format!(
            "{} is missing a document id",
            kind
        )));
    }
    check_document_id(document_id)?;
    if title.trim().is_empty() {
        return Err(VidsageError::MalformedDocument(format!(
            "{} {} is missing a title",
            kind, document_id
        )));
    }
    Ok(())
}

/// Reject ids that cannot name a file inside the data directory.
pub fn check_document_id(document_id: &str) -> Result<()> {
    let unsafe_id = document_id.contains(['/', '\\', '\0'])
        || document_id == "."
        || document_id.contains("..");
    if unsafe_id {
        return Err(VidsageError::MalformedDocument(format!(
            "document id {:?} may not contain path separators, \"..\" or NUL",
            document_id
        )));
    }
    Ok(())
}
