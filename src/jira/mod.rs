pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod options;
pub mod types;

pub use cached_client::CachedJiraClient;
pub use client::JiraClient;
pub use error::ApiError;
