//! # btrc client
//!
//! A small blocking client for the administrative REST API of a cluster and the view engine
//! (`_set_view`) API exposed by every node.
//!
//! - **`ClusterClient`**: discovers nodes and design documents, then fetches or resets the view
//!   statistics of every (node, design document) pair
//! - **`Transport`**: the seam all HTTP traffic goes through; `HttpTransport` is backed by
//!   `reqwest::blocking`
//! - **`StubTransport`** (feature `test-util`): canned responses for tests

#[macro_use]
extern crate tracing;

mod client;
mod error;
#[cfg(any(test, feature = "test-util"))]
mod stub;
mod transport;
mod types;

pub use client::{
    ClusterClient,
    ResetSummary,
    StatsIter,
};
pub use error::{
    ClientError,
    TransportError,
};
#[cfg(any(test, feature = "test-util"))]
pub use stub::StubTransport;
pub use transport::{
    Credentials,
    HttpResponse,
    HttpTransport,
    Method,
    Transport,
};
pub use types::{
    Node,
    StatKind,
    StatSample,
    ViewDocId,
    ViewTarget,
};
