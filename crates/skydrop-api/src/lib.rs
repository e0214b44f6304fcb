// skydrop-api: Async Rust client for the Skydrop irrigation cloud API

pub mod auth;
pub mod client;
pub mod controllers;
pub mod error;
pub mod models;
pub mod oauth;
pub mod transport;

pub use auth::{ClientCredentials, DEFAULT_TOKEN_TTL_SECS, TokenSnapshot, TokenState};
pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::Error;
pub use transport::TransportConfig;
