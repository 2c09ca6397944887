//! Request admission: token bucket tied to the remote service quota.
//!
//! The budgeting API enforces a hard cap of requests per rolling window
//! (200 per hour as published). This module gates every outbound call so
//! the client never trips that cap: callers acquire a permit before the
//! request goes out, and wait (cooperatively) when the bucket is empty.

mod bucket;

pub use bucket::{QuotaConfig, QuotaError, QuotaStatus, TokenBucket};
