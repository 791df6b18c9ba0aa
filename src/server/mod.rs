//! Minimal server core: accepts TCP connections and drives one
//! [`Protocol`](crate::protocol::Protocol) instance per connection.

pub mod connection;
pub mod listener;
