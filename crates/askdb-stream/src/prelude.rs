//! Common imports for typical client usage.
pub use crate::{
    ClientConfig, ClientError, DecodedEvent, ErrorInfo, QueryClient, QuerySnapshot, QueryState,
    TabularResult,
};
