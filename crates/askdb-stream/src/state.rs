//! Query progress state machine with generation-based suppression.
//!
//! The live request's result fields sit behind a `watch` channel. Every
//! callback checks its request generation against the live one under the
//! channel's lock, so a superseded request can never mutate what observers
//! see, even while its read loop keeps running.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::dispatch::QueryCallbacks;
use crate::errors::ErrorInfo;
use crate::events::TabularResult;

/// Visible progress of the live request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    #[default]
    Idle,
    Thinking,
    ShowSql,
    ShowChart,
    Error,
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Thinking => "thinking",
            Self::ShowSql => "show_sql",
            Self::ShowChart => "show_chart",
            Self::Error => "error",
        })
    }
}

/// Everything an observer can see about the live request.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct QuerySnapshot {
    /// Generation of the request these fields belong to.
    pub generation: u64,
    pub request_id: Option<uuid::Uuid>,
    pub state: QueryState,
    /// Reasoning text accumulated from deltas, or the final full text.
    pub thinking: String,
    pub sql: Option<String>,
    pub viz_options: Option<serde_json::Value>,
    pub data: Option<TabularResult>,
    pub error: Option<ErrorInfo>,
    /// Set when the service sent `done`.
    pub finished: bool,
}

impl QuerySnapshot {
    fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    fn thinking(generation: u64, request_id: uuid::Uuid) -> Self {
        Self {
            generation,
            request_id: Some(request_id),
            state: QueryState::Thinking,
            ..Self::default()
        }
    }

    fn ignore_after_error(&self, event_type: &str) -> bool {
        if self.state == QueryState::Error {
            debug!(event_type, generation = self.generation, "ignoring event after error");
            return true;
        }
        false
    }
}

/// Pure transitions; generation checks happen in [`Request`].
impl QueryCallbacks for QuerySnapshot {
    fn on_thinking_delta(&mut self, delta: &str) {
        if self.ignore_after_error("thought") {
            return;
        }
        self.thinking.push_str(delta);
    }

    fn on_thinking_done(&mut self, full: &str) {
        if self.ignore_after_error("thought") {
            return;
        }
        self.thinking = full.to_string();
    }

    fn on_sql(&mut self, sql: &str) {
        if self.ignore_after_error("sql") {
            return;
        }
        self.sql = Some(sql.to_string());
        self.state = QueryState::ShowSql;
    }

    fn on_data(&mut self, data: TabularResult) {
        if self.ignore_after_error("data") {
            return;
        }
        self.data = Some(data);
    }

    fn on_viz_config(&mut self, options: serde_json::Value) {
        if self.ignore_after_error("viz_config") {
            return;
        }
        self.viz_options = Some(options);
        self.state = QueryState::ShowChart;
    }

    fn on_error(&mut self, error: ErrorInfo) {
        if self.ignore_after_error("error") {
            return;
        }
        self.error = Some(error);
        self.state = QueryState::Error;
    }

    fn on_done(&mut self) {
        self.finished = true;
    }
}

/// Owner of the live request's state; shared by the client and its requests.
pub struct QueryStateMachine {
    tx: watch::Sender<QuerySnapshot>,
}

impl Default for QueryStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryStateMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(QuerySnapshot::default());
        Self { tx }
    }

    /// Returns a receiver notified after every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.tx.subscribe()
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> QuerySnapshot {
        self.tx.borrow().clone()
    }

    /// Current live generation.
    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Starts a new request: clears all result fields, enters `Thinking`, and
    /// supersedes whatever request was live before.
    pub fn begin(self: &Arc<Self>) -> Request {
        let request_id = uuid::Uuid::new_v4();
        let mut generation = 0;
        self.tx.send_modify(|snap| {
            generation = snap.generation + 1;
            *snap = QuerySnapshot::thinking(generation, request_id);
        });
        debug!(%request_id, generation, "request started");
        Request {
            generation,
            request_id,
            machine: Arc::clone(self),
        }
    }

    /// Returns to `Idle`, clearing everything and invalidating every
    /// in-flight request.
    pub fn reset(&self) {
        self.tx.send_modify(|snap| {
            *snap = QuerySnapshot::idle(snap.generation + 1);
        });
        debug!(generation = self.generation(), "state machine reset");
    }

    /// Applies `f` only if `generation` is still live. Returns whether it did.
    fn update_live(&self, generation: u64, f: impl FnOnce(&mut QuerySnapshot)) -> bool {
        self.tx.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            f(snap);
            true
        })
    }
}

/// One submitted question. Its callbacks are no-ops once superseded.
pub struct Request {
    pub generation: u64,
    pub request_id: uuid::Uuid,
    machine: Arc<QueryStateMachine>,
}

impl Request {
    /// Whether this request is still the live one.
    pub fn is_live(&self) -> bool {
        self.machine.generation() == self.generation
    }

    fn apply(&self, event_type: &str, f: impl FnOnce(&mut QuerySnapshot)) {
        if !self.machine.update_live(self.generation, f) {
            trace!(
                request_id = %self.request_id,
                generation = self.generation,
                event_type,
                "suppressing callback from superseded request"
            );
        }
    }
}

impl QueryCallbacks for Request {
    fn on_thinking_delta(&mut self, delta: &str) {
        self.apply("thought", |snap| snap.on_thinking_delta(delta));
    }

    fn on_thinking_done(&mut self, full: &str) {
        self.apply("thought", |snap| snap.on_thinking_done(full));
    }

    fn on_sql(&mut self, sql: &str) {
        self.apply("sql", |snap| snap.on_sql(sql));
    }

    fn on_data(&mut self, data: TabularResult) {
        self.apply("data", |snap| snap.on_data(data));
    }

    fn on_viz_config(&mut self, options: serde_json::Value) {
        self.apply("viz_config", |snap| snap.on_viz_config(options));
    }

    fn on_error(&mut self, error: ErrorInfo) {
        self.apply("error", |snap| snap.on_error(error));
    }

    fn on_done(&mut self) {
        self.apply("done", QuerySnapshot::on_done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch;
    use crate::events::DecodedEvent;

    fn sample_data() -> TabularResult {
        TabularResult {
            columns: vec!["status".into(), "cnt".into()],
            rows: vec![vec![serde_json::json!("paid"), serde_json::json!(987)]],
            row_count: 1,
            execution_time_ms: 6.1,
        }
    }

    fn happy_path() -> Vec<DecodedEvent> {
        vec![
            DecodedEvent::Thought {
                content: "a".into(),
                done: false,
            },
            DecodedEvent::Thought {
                content: "a".into(),
                done: true,
            },
            DecodedEvent::Sql {
                content: "SELECT 1".into(),
            },
            DecodedEvent::Data(sample_data()),
            DecodedEvent::VizConfig(serde_json::json!({"series": []})),
            DecodedEvent::Done,
        ]
    }

    #[test]
    fn happy_path_state_sequence_is_deterministic() {
        let machine = Arc::new(QueryStateMachine::new());
        let mut request = machine.begin();
        let mut states = Vec::new();
        for event in happy_path() {
            dispatch(event, &mut request);
            states.push(machine.snapshot().state);
        }
        assert_eq!(
            states,
            vec![
                QueryState::Thinking,
                QueryState::Thinking,
                QueryState::ShowSql,
                QueryState::ShowSql,
                QueryState::ShowChart,
                QueryState::ShowChart,
            ]
        );
        let snap = machine.snapshot();
        assert_eq!(snap.thinking, "a");
        assert_eq!(snap.sql.as_deref(), Some("SELECT 1"));
        assert_eq!(snap.data, Some(sample_data()));
        assert!(snap.finished);
    }

    #[test]
    fn thinking_deltas_accumulate_and_done_replaces() {
        let mut snap = QuerySnapshot::thinking(1, uuid::Uuid::new_v4());
        snap.on_thinking_delta("用户");
        snap.on_thinking_delta("想查询");
        assert_eq!(snap.thinking, "用户想查询");
        snap.on_thinking_done("用户想查询各城市");
        assert_eq!(snap.thinking, "用户想查询各城市");
        assert_eq!(snap.state, QueryState::Thinking);
    }

    #[test]
    fn begin_clears_previous_results() {
        let machine = Arc::new(QueryStateMachine::new());
        let mut first = machine.begin();
        for event in happy_path() {
            dispatch(event, &mut first);
        }
        let second = machine.begin();
        let snap = machine.snapshot();
        assert_eq!(snap.generation, second.generation);
        assert_eq!(snap.request_id, Some(second.request_id));
        assert_eq!(snap.state, QueryState::Thinking);
        assert!(snap.thinking.is_empty());
        assert!(snap.sql.is_none() && snap.data.is_none() && snap.viz_options.is_none());
        assert!(!snap.finished);
    }

    #[test]
    fn reset_suppresses_in_flight_callbacks() {
        let machine = Arc::new(QueryStateMachine::new());
        let mut request = machine.begin();
        request.on_thinking_delta("partial");
        machine.reset();
        assert!(!request.is_live());

        request.on_sql("SELECT 1");
        request.on_error(ErrorInfo::new("LATE", "late"));
        let snap = machine.snapshot();
        assert_eq!(snap.state, QueryState::Idle);
        assert!(snap.thinking.is_empty());
        assert!(snap.sql.is_none());
        assert!(snap.error.is_none());
    }

    #[test]
    fn newer_submit_suppresses_older_request() {
        let machine = Arc::new(QueryStateMachine::new());
        let mut old = machine.begin();
        let mut new = machine.begin();
        new.on_sql("SELECT new");
        old.on_viz_config(serde_json::json!({"stale": true}));
        old.on_sql("SELECT old");
        let snap = machine.snapshot();
        assert_eq!(snap.state, QueryState::ShowSql);
        assert_eq!(snap.sql.as_deref(), Some("SELECT new"));
        assert!(snap.viz_options.is_none());
    }

    #[test]
    fn error_is_single_shot() {
        let machine = Arc::new(QueryStateMachine::new());
        let mut request = machine.begin();
        request.on_error(ErrorInfo::new("NO_SQL", "no valid SQL"));
        request.on_sql("SELECT 1");
        request.on_viz_config(serde_json::json!({}));
        request.on_error(ErrorInfo::new("OTHER", "second"));
        request.on_done();
        let snap = machine.snapshot();
        assert_eq!(snap.state, QueryState::Error);
        assert_eq!(snap.error, Some(ErrorInfo::new("NO_SQL", "no valid SQL")));
        assert!(snap.sql.is_none());
        assert!(snap.finished);
    }

    #[test]
    fn data_does_not_change_visible_state() {
        let mut snap = QuerySnapshot::thinking(1, uuid::Uuid::new_v4());
        snap.on_data(sample_data());
        assert_eq!(snap.state, QueryState::Thinking);
        snap.on_viz_config(serde_json::json!({}));
        snap.on_data(sample_data());
        assert_eq!(snap.state, QueryState::ShowChart);
    }

    #[test]
    fn done_keeps_last_visible_state() {
        let mut snap = QuerySnapshot::thinking(1, uuid::Uuid::new_v4());
        snap.on_sql("SELECT 1");
        snap.on_done();
        assert_eq!(snap.state, QueryState::ShowSql);
        assert!(snap.finished);
    }

    #[tokio::test]
    async fn subscribers_see_applied_transitions_only() {
        let machine = Arc::new(QueryStateMachine::new());
        let mut rx = machine.subscribe();
        let mut request = machine.begin();
        assert!(rx.has_changed().expect("sender alive"));
        let _ = rx.borrow_and_update();

        request.on_sql("SELECT 1");
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(rx.borrow_and_update().state, QueryState::ShowSql);

        machine.reset();
        let _ = rx.borrow_and_update();
        request.on_sql("SELECT 2");
        assert!(!rx.has_changed().expect("sender alive"));
    }
}
