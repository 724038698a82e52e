pub mod client;
pub mod error;
pub mod retry;

pub use client::ApiClient;
pub use error::ClientError;
pub use retry::RetryConfig;
pub use tallyback_api;
