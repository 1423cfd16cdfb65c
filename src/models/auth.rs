// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth state and request/response types of the session manager.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::AuthError;
use crate::models::User;

/// Lifecycle phase of the auth state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    Uninitialized,
    Hydrating,
    Authenticated,
    Anonymous,
}

/// In-memory projection of the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Uninitialized,
            user: None,
            is_loading: false,
            error: None,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated && self.user.is_some()
    }
}

/// Login form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Result of a successful login, registration or verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

/// Confirmation text returned by password and verification flows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub message: String,
}

/// Uniform `{success, error}` envelope for callers that branch on a flag.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<Result<T, AuthError>> for AuthResponse<T> {
    fn from(result: Result<T, AuthError>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_response_failure_shape() {
        let response = AuthResponse::from(Err::<Message, _>(AuthError::NoRefreshToken));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": false, "error": "Refresh token bulunamadı"})
        );
    }

    #[test]
    fn test_auth_response_success_shape() {
        let response = AuthResponse::from(Ok::<_, AuthError>(Message {
            message: "sent".to_string(),
        }));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "message": "sent"})
        );
    }

    #[test]
    fn test_default_state_is_uninitialized() {
        let state = AuthState::default();
        assert_eq!(state.phase, AuthPhase::Uninitialized);
        assert!(!state.is_authenticated());
    }
}
