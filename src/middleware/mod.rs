//! Middleware layer.
//!
//! Cross-cutting concerns that wrap every request regardless of route.
//!
//! - [`trace`]: a per-request span plus one access-log line with remote
//!   address, method, path, status, byte count, user agent and latency.

pub mod trace;
