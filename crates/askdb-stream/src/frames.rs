//! Groups stream lines into event frames and decodes their payloads.

use tracing::debug;

use crate::errors::{Dropped, ErrorInfo};
use crate::events::{DecodedEvent, SqlPayload, StagePayload, TabularResult, ThoughtPayload};
use crate::lines::LineBuffer;

/// Event type used when a `data:` line arrives before any `event:` line.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// One `data:` line paired with the most recent event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    pub event_type: String,
    pub data: String,
}

/// Pairs `data:` lines with the event type most recently announced.
///
/// No blank-line terminator is needed: every non-empty `data:` line is its
/// own frame.
#[derive(Debug, Default)]
pub struct FrameParser {
    current_event: String,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one complete line. Returns a frame for each non-empty `data:`
    /// line, tagged with the most recent `event:` type.
    pub fn push_line(&mut self, line: &str) -> Option<EventFrame> {
        if let Some(rest) = line.strip_prefix("event:") {
            self.current_event = rest.trim().to_string();
            return None;
        }
        let data = line.strip_prefix("data:")?.trim();
        if data.is_empty() {
            // keepalive
            return None;
        }
        let event_type = if self.current_event.is_empty() {
            DEFAULT_EVENT_TYPE
        } else {
            self.current_event.as_str()
        };
        Some(EventFrame {
            event_type: event_type.to_string(),
            data: data.to_string(),
        })
    }
}

/// Decodes a frame into a typed event.
///
/// `Ok(None)` means the frame is well-formed but carries nothing to dispatch
/// (`state`, untagged, or unknown types).
pub fn decode_frame(frame: &EventFrame) -> Result<Option<DecodedEvent>, Dropped> {
    let value: serde_json::Value =
        serde_json::from_str(&frame.data).map_err(|e| Dropped::InvalidJson {
            event_type: frame.event_type.clone(),
            message: e.to_string(),
        })?;

    let event = match frame.event_type.as_str() {
        "thought" => {
            let payload: ThoughtPayload = from_payload(frame, value)?;
            DecodedEvent::Thought {
                content: payload.content,
                done: payload.done,
            }
        }
        "sql" => {
            let payload: SqlPayload = from_payload(frame, value)?;
            DecodedEvent::Sql {
                content: payload.content,
            }
        }
        "data" => DecodedEvent::Data(from_payload::<TabularResult>(frame, value)?),
        "viz_config" => DecodedEvent::VizConfig(value),
        "error" => DecodedEvent::Error(from_payload::<ErrorInfo>(frame, value)?),
        "done" => DecodedEvent::Done,
        "state" => {
            if let Ok(StagePayload { state: Some(stage) }) =
                serde_json::from_value::<StagePayload>(value)
            {
                debug!(stage = %stage, "service stage changed");
            }
            return Ok(None);
        }
        other => {
            debug!(event_type = %other, "ignoring unhandled event type");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

fn from_payload<T: serde::de::DeserializeOwned>(
    frame: &EventFrame,
    value: serde_json::Value,
) -> Result<T, Dropped> {
    serde_json::from_value(value).map_err(|e| Dropped::Shape {
        event_type: frame.event_type.clone(),
        message: e.to_string(),
    })
}

/// Turns raw chunks into decoded events for one request.
///
/// Events come out in exactly the order their lines arrived.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    lines: LineBuffer,
    frames: FrameParser,
    dropped: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns the events completed by them, in order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<DecodedEvent> {
        let mut events = Vec::new();
        for line in self.lines.feed(chunk) {
            let Some(frame) = self.frames.push_line(&line) else {
                continue;
            };
            match decode_frame(&frame) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(reason) => {
                    self.dropped += 1;
                    debug!(%reason, "dropping malformed stream line");
                }
            }
        }
        events
    }

    /// Number of lines dropped so far because their payload failed to decode.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Ends the stream; an unterminated trailing line is discarded.
    pub fn finish(self) {
        let discarded = self.lines.finish();
        if discarded > 0 {
            debug!(bytes = discarded, "discarding unterminated trailing line");
        }
    }
}
