use crate::errors::ErrorInfo;
use crate::events::{DecodedEvent, TabularResult};

/// Receivers for dispatched stream events.
///
/// All side effects of the pipeline happen inside these callbacks.
pub trait QueryCallbacks {
    /// Incremental reasoning text.
    fn on_thinking_delta(&mut self, delta: &str);
    /// Final reasoning text; `full` is the complete text, not a delta.
    fn on_thinking_done(&mut self, full: &str);
    /// Generated SQL text.
    fn on_sql(&mut self, sql: &str);
    /// Result rows of the executed query.
    fn on_data(&mut self, data: TabularResult);
    /// `options` is the visualization options object itself.
    fn on_viz_config(&mut self, options: serde_json::Value);
    /// A transport failure or an error reported by the service.
    fn on_error(&mut self, error: ErrorInfo);
    /// The service finished the query.
    fn on_done(&mut self);
}

/// Routes one decoded event to the matching callback.
pub fn dispatch<C: QueryCallbacks + ?Sized>(event: DecodedEvent, callbacks: &mut C) {
    match event {
        DecodedEvent::Thought { content, done: false } => callbacks.on_thinking_delta(&content),
        DecodedEvent::Thought { content, done: true } => callbacks.on_thinking_done(&content),
        DecodedEvent::Sql { content } => callbacks.on_sql(&content),
        DecodedEvent::Data(data) => callbacks.on_data(data),
        DecodedEvent::VizConfig(options) => callbacks.on_viz_config(options),
        DecodedEvent::Error(error) => callbacks.on_error(error),
        DecodedEvent::Done => callbacks.on_done(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl QueryCallbacks for Recorder {
        fn on_thinking_delta(&mut self, delta: &str) {
            self.calls.push(format!("delta:{delta}"));
        }
        fn on_thinking_done(&mut self, full: &str) {
            self.calls.push(format!("thinking_done:{full}"));
        }
        fn on_sql(&mut self, sql: &str) {
            self.calls.push(format!("sql:{sql}"));
        }
        fn on_data(&mut self, data: TabularResult) {
            self.calls.push(format!("data:{}", data.row_count));
        }
        fn on_viz_config(&mut self, options: serde_json::Value) {
            self.calls.push(format!("viz:{options}"));
        }
        fn on_error(&mut self, error: ErrorInfo) {
            self.calls.push(format!("error:{}", error.code));
        }
        fn on_done(&mut self) {
            self.calls.push("done".into());
        }
    }

    #[test]
    fn routes_each_event_to_its_callback() {
        let mut recorder = Recorder::default();
        let events = vec![
            DecodedEvent::Thought {
                content: "a".into(),
                done: false,
            },
            DecodedEvent::Thought {
                content: "ab".into(),
                done: true,
            },
            DecodedEvent::Sql {
                content: "SELECT 1".into(),
            },
            DecodedEvent::Data(TabularResult {
                columns: vec!["x".into()],
                rows: vec![vec![serde_json::json!(1)]],
                row_count: 1,
                execution_time_ms: 0.4,
            }),
            DecodedEvent::VizConfig(serde_json::json!({"title": "t"})),
            DecodedEvent::Error(ErrorInfo::new("E", "m")),
            DecodedEvent::Done,
        ];
        for event in events {
            dispatch(event, &mut recorder);
        }
        assert_eq!(
            recorder.calls,
            vec![
                "delta:a",
                "thinking_done:ab",
                "sql:SELECT 1",
                "data:1",
                "viz:{\"title\":\"t\"}",
                "error:E",
                "done",
            ]
        );
    }
}
