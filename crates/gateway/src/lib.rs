//! HTTP surface: the Meta webhook plus a small operational API.
//!
//! Everything routes through one axum app with [`server::AppState`] behind
//! it. The webhook side never blocks on turn handling; it admits events into
//! the engine queue and acknowledges immediately.

pub mod blacklist_routes;
pub mod server;
pub mod webhook_routes;

pub use server::{AppState, build_router, serve};
