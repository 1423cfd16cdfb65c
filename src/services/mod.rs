// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - API client and session management.

pub mod api;
pub mod session;

pub use api::{AuthApiClient, AuthPayload};
pub use session::{is_auth_route, Navigator, RecordingNavigator, SessionManager};
