//! Entity model and write convergence for the Skydrop irrigation API.
//!
//! This crate sits between `skydrop-api` (raw HTTP, OAuth, wire models)
//! and applications:
//!
//! - **[`Client`]**: One user session. Owns the shared [`ApiClient`]
//!   (and with it the OAuth token state) and the controllers found by
//!   [`discover_controllers()`](Client::discover_controllers), which falls
//!   back to single-controller discovery after an upstream 504.
//!
//! - **[`Controller`]**: A physical controller. Refreshes merge
//!   `all.config` and `water.state` snapshots into its [`Zone`]s in place;
//!   zones appear on first sight and are never dropped.
//!
//! - **[`Zone`]**: Derived, I/O-free properties over the last
//!   configuration and live-state snapshots. Commands go through
//!   [`ZoneControl`], which borrows the owning controller.
//!
//! - **Convergence** ([`Convergence`], [`ConvergencePolicy`]): Configuration
//!   writes are applied asynchronously by the service, so every write is
//!   followed by polling until the submitted fields read back or the
//!   deadline passes. A timeout is reported, not raised.
//!
//! [`ApiClient`]: skydrop_api::ApiClient

pub mod client;
pub mod config;
pub mod controller;
pub mod converge;
pub mod error;
pub mod zone;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::Client;
pub use config::{ClientConfig, ConvergencePolicy};
pub use controller::Controller;
pub use converge::{ConfigPatch, Convergence};
pub use error::CoreError;
pub use zone::{Zone, ZoneControl};

// Wire types callers need for patches and snapshots.
pub use skydrop_api::models::{
    ControllerData, ControllerPatch, ZoneData, ZonePatch, ZoneStateData,
};
pub use skydrop_api::{TokenSnapshot, TokenState};
