// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the session layer.

pub mod auth;
pub mod user;

pub use auth::{AuthPhase, AuthResponse, AuthState, Credentials, LoginOutcome, Message, TokenPair};
pub use user::{User, UserId};
