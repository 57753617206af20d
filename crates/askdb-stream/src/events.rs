//! Typed events decoded from the query stream.

use serde::Deserialize;

use crate::errors::ErrorInfo;

/// Tabular query result carried by a `data` event.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    /// Cells are strings, numbers, or null.
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub execution_time_ms: f64,
}

/// One recognized event from the stream.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedEvent {
    /// Reasoning text. A delta when `done` is false, the full text otherwise.
    Thought { content: String, done: bool },
    /// Generated SQL text.
    Sql { content: String },
    /// Result rows of the executed query.
    Data(TabularResult),
    /// Visualization options, passed through untouched.
    VizConfig(serde_json::Value),
    /// Failure reported by the service.
    Error(ErrorInfo),
    /// The service finished sending.
    Done,
}

impl DecodedEvent {
    /// Wire name of this event's type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thought { .. } => "thought",
            Self::Sql { .. } => "sql",
            Self::Data(_) => "data",
            Self::VizConfig(_) => "viz_config",
            Self::Error(_) => "error",
            Self::Done => "done",
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ThoughtPayload {
    pub content: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Deserialize)]
pub(crate) struct SqlPayload {
    pub content: String,
}

/// Diagnostic `state` payload; only logged.
#[derive(Deserialize)]
pub(crate) struct StagePayload {
    pub state: Option<String>,
}
