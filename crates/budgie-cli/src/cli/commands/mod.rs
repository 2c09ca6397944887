mod config;
mod quota;
mod request;

pub use config::run_config;
pub use quota::run_quota;
pub use request::run_request;
