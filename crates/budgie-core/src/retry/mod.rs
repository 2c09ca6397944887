//! Retry and backoff policy.
//!
//! Decides, per failed attempt, whether to try again and how long to
//! wait first. The server's own `Retry-After` hint always wins over the
//! computed exponential backoff; jitter desynchronizes concurrent
//! callers so they do not retry in lockstep.

mod policy;

pub use policy::{RetryDecision, RetryPolicy};
