use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt as _, StreamExt as _};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument as _, debug, info, info_span, warn};

use crate::dispatch::{QueryCallbacks, dispatch};
use crate::errors::{ClientError, ErrorInfo, TransportError, UNKNOWN};
use crate::frames::StreamDecoder;
use crate::state::{QuerySnapshot, QueryStateMachine, Request};
use crate::transport::{ClientConfig, QueryTransport, ReqwestTransport, select_endpoint};

/// Entry point: submits questions and exposes the resulting query state.
///
/// Results are never returned from [`QueryClient::submit`]; they surface as
/// state transitions observable through [`QueryClient::subscribe`].
#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn QueryTransport>,
    machine: Arc<QueryStateMachine>,
}

impl QueryClient {
    /// Creates a client over any transport.
    pub fn new(transport: Arc<dyn QueryTransport>) -> Self {
        Self {
            transport,
            machine: Arc::new(QueryStateMachine::new()),
        }
    }

    /// Creates a client over HTTP with the given configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(config)?)))
    }

    /// Creates a client over HTTP configured from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Submits a question without waiting for it.
    ///
    /// The new request supersedes any previous one before this returns, so a
    /// following [`QueryClient::reset`] already cancels it. Must be called
    /// within a tokio runtime.
    pub fn submit(&self, question: impl Into<String>) -> JoinHandle<()> {
        let request = self.machine.begin();
        tokio::spawn(drive(self.transport.clone(), request, question.into()))
    }

    /// Submits a question and waits until its stream ends.
    pub async fn run(&self, question: impl Into<String>) {
        let request = self.machine.begin();
        drive(self.transport.clone(), request, question.into()).await;
    }

    /// Returns to `Idle` and silences every in-flight request.
    pub fn reset(&self) {
        self.machine.reset();
    }

    /// Returns a copy of the current query state.
    pub fn snapshot(&self) -> QuerySnapshot {
        self.machine.snapshot()
    }

    /// Subscribes to snapshot updates. The receiver sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.machine.subscribe()
    }
}

async fn drive(transport: Arc<dyn QueryTransport>, mut request: Request, question: String) {
    let span = info_span!(
        "query",
        request_id = %request.request_id,
        generation = request.generation
    );
    let outcome = AssertUnwindSafe(stream_request(transport.as_ref(), &mut request, &question))
        .catch_unwind()
        .instrument(span.clone())
        .await;
    if outcome.is_err() {
        span.in_scope(|| warn!("query pipeline panicked"));
        request.on_error(ErrorInfo::new(UNKNOWN, "unexpected client failure"));
    }
}

async fn stream_request(transport: &dyn QueryTransport, request: &mut Request, question: &str) {
    let endpoint = select_endpoint(transport).await;
    info!(%endpoint, "opening query stream");

    let mut chunks = match transport.open_stream(endpoint, question).await {
        Ok(chunks) => chunks,
        Err(err) => {
            warn!(error = %err, code = err.code(), "query stream failed to open");
            request.on_error(err.to_error_info());
            return;
        }
    };

    let mut decoder = StreamDecoder::new();
    let mut dispatched = 0_usize;
    let mut received = 0_usize;
    let mut interrupted = false;
    while let Some(next) = chunks.next().await {
        match next {
            Ok(chunk) => {
                received += chunk.len();
                for event in decoder.push_chunk(&chunk) {
                    debug!(event_type = event.event_type(), live = request.is_live(), "dispatching event");
                    dispatch(event, request);
                    dispatched += 1;
                }
            }
            Err(err) => {
                warn!(error = %err, "query stream interrupted");
                interrupted = true;
                break;
            }
        }
    }
    info!(received, dispatched, dropped = decoder.dropped(), "query stream ended");
    decoder.finish();

    // A chunked body can close before sending anything.
    if received == 0 && !interrupted {
        let err = TransportError::NoBody;
        warn!(code = err.code(), "query stream ended without a body");
        request.on_error(err.to_error_info());
    }
}
