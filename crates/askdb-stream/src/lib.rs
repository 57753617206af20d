//! Streaming client core for the askdb natural-language query service.
//!
//! A question is posted to the service, which answers with a long-lived
//! event stream (`event: <type>` / `data: <json>` lines). This crate
//! reassembles the stream across arbitrary chunk boundaries, decodes the
//! events, and drives a small progress state machine
//! (`Idle → Thinking → ShowSql → ShowChart`, or `Error`).
//!
//! ```no_run
//! use askdb_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = QueryClient::from_config(ClientConfig::new("http://localhost:8000"))?;
//! client.run("各城市用户分布").await;
//!
//! let snapshot = client.snapshot();
//! match (snapshot.state, snapshot.error) {
//!     (QueryState::Error, Some(error)) => eprintln!("{error}"),
//!     (state, _) => println!("{state}: {}", snapshot.sql.unwrap_or_default()),
//! }
//! # Ok(())
//! # }
//! ```

/// Request orchestration: submit, reset, observe.
pub mod client;
/// Routing of decoded events to typed callbacks.
pub mod dispatch;
/// Error types and the fixed error-code taxonomy.
pub mod errors;
/// Typed stream events and payload shapes.
pub mod events;
/// Event frame parsing and payload decoding.
pub mod frames;
/// Line reassembly across chunk boundaries.
pub mod lines;
/// Logging initialization.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Query progress state machine.
pub mod state;
/// Connectivity probe, endpoint selection, and HTTP transport.
pub mod transport;

pub use client::QueryClient;
pub use dispatch::{QueryCallbacks, dispatch};
pub use errors::{ClientError, Dropped, ErrorInfo, TransportError};
pub use events::{DecodedEvent, TabularResult};
pub use frames::{EventFrame, FrameParser, StreamDecoder, decode_frame};
pub use lines::LineBuffer;
pub use state::{QuerySnapshot, QueryState, QueryStateMachine, Request};
pub use transport::{
    ByteStream, ClientConfig, Endpoint, HealthStatus, QueryTransport, ReqwestTransport,
    select_endpoint,
};
