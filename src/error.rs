// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the session manager and the server-side session gate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::store::StorageError;

/// Errors surfaced by session manager operations.
///
/// The `Display` text of every variant is safe to show to end users; transport
/// details are kept as the error source for logging.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request never produced an HTTP response.
    #[error("{}", AuthError::NETWORK_MESSAGE)]
    Network(#[source] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx response without the fields the operation needs.
    #[error("Sunucudan geçersiz yanıt alındı")]
    InvalidResponse,

    #[error("Refresh token bulunamadı")]
    NoRefreshToken,

    #[error("Oturum geçersiz veya süresi dolmuş")]
    InvalidToken,

    #[error("Oturum açılmamış")]
    NotAuthenticated,

    #[error("Oturum bilgileri kaydedilemedi")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Generic message for transport failures.
    pub const NETWORK_MESSAGE: &'static str = "Sunucuya bağlanılamadı. Lütfen tekrar deneyin.";

    /// HTTP status for server errors, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API rejected the presented credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::Server { status: 401, .. }
                | AuthError::NoRefreshToken
                | AuthError::InvalidToken
                | AuthError::NotAuthenticated
        )
    }
}

/// Why the session gate turned a request away. Both map to 401.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = match &self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details: self.to_string(),
        };

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
