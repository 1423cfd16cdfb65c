// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session gate middleware for server-rendered pages.
//!
//! Server-side contexts cannot see the client's persistent storage, so they
//! read the mirrored `access_token` and `user` cookies instead and apply the
//! same structural and expiry checks as the client.

use crate::error::AppError;
use crate::models::User;
use crate::services::is_auth_route;
use crate::store::keys;
use crate::token::{self, TokenClaims};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Session extracted from request cookies.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// Mirrored user record; `None` for bearer-only sessions.
    pub user: Option<User>,
    pub claims: TokenClaims,
}

/// Middleware that requires a valid session cookie (or bearer token).
///
/// Pages redirect to the login entry point with the original location in
/// `redirect`; `/api/` paths get a 401 JSON body saying whether the session
/// was missing or its token invalid.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_auth_route(&path) {
        return next.run(request).await;
    }

    match session_from_parts(&jar, request.headers()) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(rejection) if path.starts_with("/api/") => rejection.into_response(),
        Err(_) => {
            let original = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or(path);
            tracing::debug!(path = %original, "No valid session, redirecting to login");
            Redirect::temporary(&login_redirect(&state.config.login_path, &original))
                .into_response()
        }
    }
}

/// Read and validate the session from cookies, falling back to the bearer
/// header for the token.
///
/// A cookie session needs both the `access_token` and `user` cookies, the
/// same pair `is_authenticated` requires on the client. A bearer token alone
/// is accepted for API callers that never had the cookies; `user` is `None`
/// for those sessions.
///
/// Fails with `Unauthorized` when no session is presented and `InvalidToken`
/// when the presented token is malformed or expired.
pub fn session_from_parts(jar: &CookieJar, headers: &HeaderMap) -> Result<SessionUser, AppError> {
    let cookie_token = jar
        .get(keys::ACCESS_TOKEN)
        .map(|c| decode_cookie_value(c.value()))
        .filter(|t| !t.is_empty());
    let from_cookie = cookie_token.is_some();
    let token = cookie_token
        .or_else(|| bearer_token(headers))
        .ok_or(AppError::Unauthorized)?;

    let claims = token::validate(&token).map_err(|rejection| {
        tracing::debug!(?rejection, "Rejected session token");
        AppError::InvalidToken
    })?;

    if !from_cookie {
        return Ok(SessionUser { user: None, claims });
    }

    // The jar may or may not have percent-decoded the value already.
    let user = jar
        .get(keys::USER)
        .and_then(|c| {
            serde_json::from_str::<User>(c.value())
                .or_else(|_| serde_json::from_str::<User>(&decode_cookie_value(c.value())))
                .ok()
        })
        .ok_or(AppError::Unauthorized)?;

    Ok(SessionUser {
        user: Some(user),
        claims,
    })
}

/// Login URL carrying the page to come back to.
pub fn login_redirect(login_path: &str, original: &str) -> String {
    if original.is_empty() || original == "/" {
        return login_path.to_string();
    }
    format!("{}?redirect={}", login_path, urlencoding::encode(original))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn decode_cookie_value(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect() {
        assert_eq!(login_redirect("/login", "/"), "/login");
        assert_eq!(
            login_redirect("/login", "/courses/7?tab=quests"),
            "/login?redirect=%2Fcourses%2F7%3Ftab%3Dquests"
        );
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Basic Zm9v".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
