//! Classification of decoded lines into stream events

use serde::{Deserialize, Serialize};

/// Sentinel payload that ends a stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A structured event recovered from one line of the response body
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Fragment of assistant output
    Delta(String),
    /// Mode or step announcement (e.g. "simple", "research")
    Mode(String),
    /// Retrieved source documents backing the answer
    Sources(Vec<Citation>),
    /// Stream finished normally
    Done,
    /// Server reported a failure
    Error(String),
}

impl StreamEvent {
    /// Completion and error end the exchange
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

/// A source document cited by an assistant turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Leading excerpt of the cited chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

// Wire types

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    sources: Option<Vec<WireSource>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSource {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    metadata: WireSourceMetadata,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSourceMetadata {
    #[serde(default)]
    document_title: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    chunk_index: Option<u64>,
}

impl From<WireSource> for Citation {
    fn from(wire: WireSource) -> Self {
        let WireSource {
            content,
            metadata,
            score,
            title,
            source,
            url,
        } = wire;

        Citation {
            title: metadata
                .document_title
                .or(metadata.title)
                .or(title)
                .unwrap_or_else(|| "Untitled".to_string()),
            file_reference: metadata.file_name.or(metadata.source).or(source),
            sequence_index: metadata.chunk_index,
            relevance_score: score,
            url,
            excerpt: content,
        }
    }
}

/// How a line relates to the SSE framing
enum LineKind<'a> {
    /// Blank line, comment, or a non-data field
    Ignorable,
    /// `data:` field with its payload
    Data(&'a str),
    /// Anything else; passed through as plain text
    Plain,
}

fn line_kind(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() || line.starts_with(':') {
        return LineKind::Ignorable;
    }
    if let Some(payload) = line.strip_prefix("data:") {
        return LineKind::Data(payload.strip_prefix(' ').unwrap_or(payload));
    }
    if ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
    {
        return LineKind::Ignorable;
    }
    LineKind::Plain
}

/// Map one decoded line to zero or one event.
///
/// Lines outside the SSE framing are treated as plain text deltas so a
/// non-conforming upstream still produces readable output. A malformed
/// structured payload is logged and skipped; it never aborts the stream.
pub fn classify_line(line: &str) -> Option<StreamEvent> {
    let payload = match line_kind(line) {
        LineKind::Ignorable => return None,
        LineKind::Plain => return Some(StreamEvent::Delta(line.to_string())),
        LineKind::Data(payload) => payload,
    };

    if payload.trim() == DONE_SENTINEL {
        tracing::debug!("Received [DONE] sentinel");
        return Some(StreamEvent::Done);
    }

    let frame: WireFrame = match serde_json::from_str(payload) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                error = %e,
                payload = %payload.chars().take(200).collect::<String>(),
                "Skipping malformed stream frame"
            );
            return None;
        }
    };

    match frame.kind.as_str() {
        "token" => frame
            .content
            .filter(|c| !c.is_empty())
            .map(StreamEvent::Delta),
        "step" => frame
            .content
            .filter(|c| !c.is_empty())
            .map(StreamEvent::Mode),
        "sources" => frame
            .sources
            .map(|sources| StreamEvent::Sources(sources.into_iter().map(Citation::from).collect())),
        "done" => Some(StreamEvent::Done),
        "error" => Some(StreamEvent::Error(
            frame.error.unwrap_or_else(|| "Unknown error".to_string()),
        )),
        other => {
            tracing::debug!(frame_type = %other, "Ignoring unknown frame type");
            None
        }
    }
}
