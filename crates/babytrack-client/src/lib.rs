//! Typed client for the babytrack HTTP API.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ClientError, extract_error_message};
