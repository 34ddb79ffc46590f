//! HTTP transport shared by provider integrations

pub mod client;

pub use client::{HttpClient, HttpClientBuilder, RetryPolicy};
