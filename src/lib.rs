// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Academy session: client-side authentication for the learning platform
//!
//! This crate owns "who is logged in": it talks to the platform's `/auth/*`
//! API, validates and refreshes session tokens, and keeps memory, persistent
//! storage and cookies consistent. A small axum gate reads the mirrored
//! cookies for server-rendered pages.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;
pub mod token;

use config::Config;

pub use services::SessionManager;

/// Shared state of the session gate server.
pub struct AppState {
    pub config: Config,
}
