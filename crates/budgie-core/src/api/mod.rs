//! API failure model: classification of transport and HTTP failures.
//!
//! Every failure the client can hit (connection refused, timeout, HTTP
//! status, structured API error body) is folded into one typed error,
//! `ApiError`, before it reaches a caller. Retry decisions and user
//! messages are both driven off that one type.

pub mod classify;
mod error;

pub use error::{ApiError, ErrorKind};
