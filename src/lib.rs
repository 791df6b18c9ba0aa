//! Keel - HTTP/1.x protocol layer
//!
//! Parses requests arriving on server connections, enforces protocol limits,
//! and dispatches to an application callback or a static public folder.

pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod server;
