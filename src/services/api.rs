// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform auth API client.
//!
//! Handles:
//! - The `/auth/*` endpoints (login, registration, refresh, recovery, verification)
//! - Bearer token attachment
//! - Cookie cooperation through the shared [`SessionCookies`] jar
//! - Lenient response parsing (an unparsable body is an empty payload)
//! - Server error message extraction

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::AuthError;
use crate::models::{TokenPair, User};
use crate::store::SessionCookies;

/// API paths, relative to the configured base URL.
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login/";
    pub const REGISTER: &str = "/auth/register/";
    pub const LOGOUT: &str = "/auth/logout/";
    pub const REFRESH_TOKEN: &str = "/auth/refresh-token/";
    pub const REQUEST_PASSWORD_RESET: &str = "/auth/request-password-reset/";
    pub const RESET_PASSWORD: &str = "/auth/reset-password/";
    pub const RESET_PASSWORD_WITH_CODE: &str = "/auth/reset-password-with-code/";
    pub const VERIFY_EMAIL: &str = "/auth/verify-email/";
    pub const VERIFY_EMAIL_WITH_CODE: &str = "/auth/verify-email-with-code/";
    pub const RESEND_VERIFICATION_CODE: &str = "/auth/resend-verification-code/";
}

/// Fallback messages used when the server gives no usable error text.
pub mod fallback {
    pub const LOGIN: &str = "Giriş başarısız";
    pub const REGISTER: &str = "Kayıt başarısız";
    pub const LOGOUT: &str = "Çıkış isteği başarısız";
    pub const REFRESH: &str = "Token yenilenemedi";
    pub const REQUEST_PASSWORD_RESET: &str = "Şifre sıfırlama isteği gönderilemedi";
    pub const RESET_PASSWORD: &str = "Şifre sıfırlanamadı";
    pub const VERIFY_EMAIL: &str = "E-posta doğrulanamadı";
    pub const RESEND_VERIFICATION_CODE: &str = "Doğrulama kodu gönderilemedi";
}

/// User and tokens returned by login, registration and code verification.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub user: User,
    pub tokens: TokenPair,
}

/// Platform auth API client.
#[derive(Clone)]
pub struct AuthApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthApiClient {
    /// Create a client whose requests carry (and update) the given cookie jar.
    pub fn new(base_url: impl Into<String>, cookies: Arc<SessionCookies>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .cookie_provider(cookies)
            .build()
            .map_err(AuthError::Network)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange credentials for a user and tokens. Never sends a bearer token.
    pub async fn login<C: Serialize + ?Sized>(&self, credentials: &C) -> Result<AuthPayload, AuthError> {
        let payload = self
            .post(endpoints::LOGIN, credentials, None, fallback::LOGIN)
            .await?;
        parse_auth_payload(&payload).ok_or(AuthError::InvalidResponse)
    }

    /// Create an account; the response logs the new user in.
    pub async fn register<U: Serialize + ?Sized>(&self, user_data: &U) -> Result<AuthPayload, AuthError> {
        let payload = self
            .post(endpoints::REGISTER, user_data, None, fallback::REGISTER)
            .await?;
        parse_auth_payload(&payload).ok_or(AuthError::InvalidResponse)
    }

    /// Invalidate the session server-side.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let body = match refresh_token {
            Some(refresh) => json!({ "refresh_token": refresh }),
            None => json!({}),
        };
        self.post(endpoints::LOGOUT, &body, access_token, fallback::LOGOUT)
            .await?;
        Ok(())
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        access_token: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let payload = self
            .post(
                endpoints::REFRESH_TOKEN,
                &json!({ "refresh_token": refresh_token }),
                access_token,
                fallback::REFRESH,
            )
            .await?;
        extract_tokens(&payload).ok_or(AuthError::InvalidResponse)
    }

    pub async fn request_password_reset(
        &self,
        email: &str,
        access_token: Option<&str>,
    ) -> Result<Value, AuthError> {
        self.post(
            endpoints::REQUEST_PASSWORD_RESET,
            &json!({ "email": email }),
            access_token,
            fallback::REQUEST_PASSWORD_RESET,
        )
        .await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        access_token: Option<&str>,
    ) -> Result<Value, AuthError> {
        self.post(
            endpoints::RESET_PASSWORD,
            &json!({ "token": token, "newPassword": new_password }),
            access_token,
            fallback::RESET_PASSWORD,
        )
        .await
    }

    pub async fn reset_password_with_code(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        access_token: Option<&str>,
    ) -> Result<Value, AuthError> {
        self.post(
            endpoints::RESET_PASSWORD_WITH_CODE,
            &json!({ "email": email, "code": code, "new_password": new_password }),
            access_token,
            fallback::RESET_PASSWORD,
        )
        .await
    }

    pub async fn verify_email(&self, token: &str, access_token: Option<&str>) -> Result<Value, AuthError> {
        self.post(
            endpoints::VERIFY_EMAIL,
            &json!({ "token": token }),
            access_token,
            fallback::VERIFY_EMAIL,
        )
        .await
    }

    pub async fn verify_email_with_code(
        &self,
        email: &str,
        code: &str,
        access_token: Option<&str>,
    ) -> Result<Value, AuthError> {
        self.post(
            endpoints::VERIFY_EMAIL_WITH_CODE,
            &json!({ "email": email, "code": code }),
            access_token,
            fallback::VERIFY_EMAIL,
        )
        .await
    }

    pub async fn resend_verification_code(
        &self,
        email: &str,
        access_token: Option<&str>,
    ) -> Result<Value, AuthError> {
        self.post(
            endpoints::RESEND_VERIFICATION_CODE,
            &json!({ "email": email }),
            access_token,
            fallback::RESEND_VERIFICATION_CODE,
        )
        .await
    }

    /// POST a JSON body and return the parsed response payload.
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        access_token: Option<&str>,
        fallback_message: &str,
    ) -> Result<Value, AuthError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(path, error = %e, "Auth API request failed");
            AuthError::Network(e)
        })?;

        self.check_response_json(path, response, fallback_message)
            .await
    }

    /// Check response status and parse the JSON body leniently.
    async fn check_response_json(
        &self,
        path: &str,
        response: reqwest::Response,
        fallback_message: &str,
    ) -> Result<Value, AuthError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let payload = parse_lenient(&body);

        if status.is_success() {
            return Ok(payload);
        }

        let message = server_message(&payload).unwrap_or_else(|| fallback_message.to_string());
        tracing::info!(path, status = status.as_u16(), "Auth API rejected request");

        Err(AuthError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

/// Parse a body as JSON; anything unparsable is an empty object.
pub fn parse_lenient(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Extract a human-readable error message from an API error payload.
///
/// Looks at `error`, `message` and `detail`, then at the first message of a
/// field-error map such as `{"email": ["already taken"]}`.
pub fn server_message(payload: &Value) -> Option<String> {
    let object = payload.as_object()?;

    for key in ["error", "message", "detail"] {
        match object.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Object(nested)) => {
                if let Some(Value::String(s)) = nested.get("message") {
                    return Some(s.clone());
                }
            }
            _ => {}
        }
    }

    object.values().find_map(|value| match value {
        Value::Array(items) => items.iter().find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    })
}

/// Pull an access/refresh pair out of the shapes the API uses:
/// `{tokens: {access, refresh}}`, `{token}` and `{access_token, refresh_token}`.
pub fn extract_tokens(payload: &Value) -> Option<TokenPair> {
    let root = payload.as_object()?;
    let nested = root.get("tokens").and_then(Value::as_object);

    let lookup = |keys: &[&str]| -> Option<String> {
        nested
            .into_iter()
            .chain(std::iter::once(root))
            .flat_map(|object| keys.iter().filter_map(move |key| object.get(*key)))
            .find_map(|value| value.as_str().filter(|s| !s.is_empty()).map(str::to_string))
    };

    let access_token = lookup(&["access", "access_token", "accessToken", "token"])?;
    let refresh_token = lookup(&["refresh", "refresh_token", "refreshToken"]);

    Some(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Parse the `{user, tokens}` payload of a successful login.
pub fn parse_auth_payload(payload: &Value) -> Option<AuthPayload> {
    let user = payload
        .get("user")
        .and_then(|u| serde_json::from_value::<User>(u.clone()).ok())?;
    let tokens = extract_tokens(payload)?;
    Some(AuthPayload { user, tokens })
}
