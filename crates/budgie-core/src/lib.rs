pub mod config;
pub mod logging;

// Core modules
pub mod api;
pub mod client;
pub mod quota;
pub mod retry;
