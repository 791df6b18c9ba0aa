//! HTTP/1.x protocol layer.
//!
//! Turns the bytes arriving on one connection into complete requests,
//! enforces the head and body limits, and hands each request to the
//! application callback or the static file fallback.
//!
//! # Architecture
//!
//! - **`buffer`**: per-connection byte accumulator and head terminator scan
//! - **`parser`**: request line and header block parsing
//! - **`body`**: body framing (`Content-Length`, basic chunked) and collection
//! - **`protocol`**: the per-connection [`HttpProtocol`] and request dispatch
//! - **`request`** / **`response`**: request and response types
//! - **`writer`**: response serialization
//! - **`static_files`**: public folder binding and path resolution
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌───────────────┐
//!   ┌──▶ │ AwaitingHead  │ ← scan for "\r\n\r\n", HTTP_HEAD_MAX_SIZE
//!   │    └──────┬────────┘
//!   │           │ head parsed, framing known
//!   │           ▼
//!   │    ┌───────────────┐
//!   │    │ AwaitingBody  │ ← collect body, maximum_body_size
//!   │    └──────┬────────┘   (skipped when the body is empty)
//!   │           │ body complete
//!   │           ▼
//!   │    ┌───────────────┐
//!   └─── │  Dispatching  │ ← on_request or static fallback
//!        └──────┬────────┘
//!               │ Connection: close, fatal error, transport close
//!               ▼
//!            Closed
//! ```
//!
//! # Example
//!
//! ```
//! use keel::http::protocol::{HttpProtocol, HttpSettings, RequestOutcome};
//! use keel::http::response::Response;
//! use keel::protocol::{ConnectionHandle, Protocol};
//! use std::sync::Arc;
//!
//! let settings = HttpSettings::builder()
//!     .on_request(|req| RequestOutcome::Respond(Response::ok(req.path.clone())))
//!     .build()
//!     .unwrap();
//!
//! let (conn, mut outbound) = ConnectionHandle::channel(1, None);
//! let mut http = HttpProtocol::new(Arc::new(settings), conn);
//! http.on_data(b"GET /hi HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
//! assert!(outbound.try_recv().is_ok());
//! ```

pub mod body;
pub mod buffer;
pub mod mime;
pub mod parser;
pub mod protocol;
pub mod request;
pub mod response;
pub mod static_files;
pub mod writer;

pub use protocol::{HttpProtocol, HttpProtocolFactory, HttpSettings, RequestOutcome};

/// Largest accepted request head, terminating blank line included.
pub const HTTP_HEAD_MAX_SIZE: usize = 8192;
