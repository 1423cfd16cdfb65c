// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use academy_session::error::{AppError, AuthError};
use academy_session::store::StorageError;
use axum::{http::StatusCode, response::IntoResponse};

#[test]
fn test_server_error_displays_server_message() {
    let err = AuthError::Server {
        status: 401,
        message: "invalid credentials".to_string(),
    };
    assert_eq!(err.to_string(), "invalid credentials");
    assert_eq!(err.status(), Some(401));
    assert!(err.is_unauthorized());
}

#[test]
fn test_is_unauthorized_no_match() {
    let err = AuthError::Server {
        status: 500,
        message: "Internal Server Error".to_string(),
    };
    assert!(!err.is_unauthorized());

    assert!(!AuthError::InvalidResponse.is_unauthorized());

    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    assert!(!AuthError::from(StorageError::from(io)).is_unauthorized());
}

#[test]
fn test_session_errors_are_unauthorized() {
    assert!(AuthError::NoRefreshToken.is_unauthorized());
    assert!(AuthError::InvalidToken.is_unauthorized());
    assert!(AuthError::NotAuthenticated.is_unauthorized());
    assert_eq!(AuthError::NoRefreshToken.status(), None);
}

#[test]
fn test_storage_error_hides_details() {
    let io = std::io::Error::other("disk full at /var/lib/x");
    let err = AuthError::from(StorageError::from(io));
    assert!(!err.to_string().contains("/var/lib"));
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_app_error_responses() {
    for (error, code) in [
        (AppError::Unauthorized, "unauthorized"),
        (AppError::InvalidToken, "invalid_token"),
    ] {
        let details = error.to_string();
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], code);
        assert_eq!(body["details"], details);
    }
}
