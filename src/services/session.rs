// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager: the single source of truth for "who is logged in".
//!
//! Handles:
//! - Startup hydration from persistent storage
//! - Login, registration and logout
//! - Access token refresh
//! - Password reset and email verification flows
//!
//! Every write goes through [`SessionStore`], which keeps memory, persistent
//! storage and cookies in step. Operations that replace or remove the session
//! are serialized by an internal lock, so two concurrent logins cannot
//! interleave their reset and write.

use std::sync::{Arc, Mutex};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::Config;
use crate::error::AuthError;
use crate::models::{AuthPhase, AuthState, Credentials, LoginOutcome, Message, TokenPair, User};
use crate::services::api::{parse_auth_payload, AuthApiClient, AuthPayload};
use crate::store::{FileStore, KeyValueStore, MemoryStore, SessionCookies, SessionStore, StoredSession};
use crate::token;

/// Routes that drive the auth flow themselves; hydrating there would bounce
/// the user between the page and the login redirect.
pub const AUTH_ROUTES: [&str; 5] = [
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
    "/verify-email",
];

/// Anti-enumeration texts: identical whether or not the account exists.
pub const PASSWORD_RESET_REQUESTED: &str =
    "Eğer bu e-posta adresiyle kayıtlı bir hesap varsa, şifre sıfırlama talimatları gönderildi.";
pub const VERIFICATION_CODE_RESENT: &str =
    "Eğer bu e-posta adresiyle doğrulanmamış bir hesap varsa, yeni doğrulama kodu gönderildi.";

const PASSWORD_RESET_DONE: &str = "Şifreniz başarıyla güncellendi";
const EMAIL_VERIFIED: &str = "E-posta adresiniz doğrulandı";

/// Whether `path` (optionally with a query string) is an auth-flow route.
pub fn is_auth_route(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    AUTH_ROUTES.iter().any(|route| {
        path == *route
            || path
                .strip_prefix(route)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Performs full-page navigations requested by the session layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for headless clients: records the target and logs it.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visits().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "Navigating");
        self.visits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(path.to_string());
    }
}

/// Client-side session manager.
pub struct SessionManager {
    api: AuthApiClient,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    /// Serializes operations that replace or remove the session.
    op_lock: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(
        api: AuthApiClient,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            navigator,
            login_path: login_path.into(),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Wire up storage, cookie jar and API client from configuration.
    pub fn from_config(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self, AuthError> {
        let persistent: Arc<dyn KeyValueStore> = match &config.session_store_path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let cookies = Arc::new(SessionCookies::new());
        let store = SessionStore::new(persistent, cookies.clone(), config.cookie_max_age_secs);
        let api = AuthApiClient::new(&config.api_base_url, cookies)?;

        tracing::info!(
            api = %config.api_base_url,
            persistent = config.session_store_path.is_some(),
            "Session manager configured"
        );

        Ok(Self::new(api, store, navigator, config.login_path.clone()))
    }

    // ─── State ───────────────────────────────────────────────────────────────

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> AuthState {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.store.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.store.state().user
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn clear_error(&self) {
        self.store.update_state(|state| state.error = None);
    }

    /// `Authorization` header for other API callers; empty without a token.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self
            .store
            .access_token()
            .and_then(|t| HeaderValue::from_str(&format!("Bearer {}", t)).ok())
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// True only if a user record and a well-formed, unexpired access token
    /// are both in persistent storage.
    pub fn is_authenticated(&self) -> bool {
        if self.store.stored_user().is_none() {
            return false;
        }
        self.store
            .access_token()
            .is_some_and(|t| token::is_token_valid(&t))
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Hydrate the auth state from storage at application start.
    ///
    /// Skipped on auth-flow routes. A stored session that fails validation is
    /// cleared as a whole.
    pub async fn initialize(&self, current_route: &str) -> AuthPhase {
        let _guard = self.op_lock.lock().await;

        if is_auth_route(current_route) {
            tracing::debug!(route = current_route, "Auth route, skipping session hydration");
            self.store.update_state(|state| {
                state.phase = AuthPhase::Anonymous;
                state.is_loading = false;
            });
            return AuthPhase::Anonymous;
        }

        self.store.update_state(|state| {
            state.phase = AuthPhase::Hydrating;
            state.is_loading = true;
        });

        match self.store.stored_user() {
            Some(user) if self.is_authenticated() => {
                tracing::info!(user_id = %user.id, "Restored session from storage");
                self.store.update_state(|state| {
                    state.phase = AuthPhase::Authenticated;
                    state.user = Some(user);
                    state.is_loading = false;
                });
                AuthPhase::Authenticated
            }
            stored => {
                if stored.is_some() || self.store.access_token().is_some() {
                    tracing::info!("Stored session is invalid or expired, clearing");
                }
                self.store.clear();
                AuthPhase::Anonymous
            }
        }
    }

    // ─── Sign in / out ───────────────────────────────────────────────────────

    /// Log in with email and password.
    ///
    /// Any existing session is cleared before the request is sent, whatever
    /// its outcome.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        let _guard = self.op_lock.lock().await;

        self.store.clear();
        self.begin();

        let result = self.api.login(credentials).await;
        self.complete_sign_in(result, "login")
    }

    /// Register a new account. Success logs the new user in.
    pub async fn register<U: Serialize + ?Sized>(
        &self,
        user_data: &U,
    ) -> Result<LoginOutcome, AuthError> {
        let _guard = self.op_lock.lock().await;

        self.store.clear();
        self.begin();

        let result = self.api.register(user_data).await;
        self.complete_sign_in(result, "register")
    }

    /// Log out. Always ends with an empty session and a navigation to the
    /// login page; the server notification is best effort.
    pub async fn logout(&self) {
        let _guard = self.op_lock.lock().await;

        let access = self.store.access_token();
        let refresh = self.store.refresh_token();

        if let Err(e) = self.api.logout(access.as_deref(), refresh.as_deref()).await {
            tracing::warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        self.store.clear();
        tracing::info!("Signed out");
        self.navigator.navigate(&self.login_path);
    }

    /// Exchange the stored refresh token for a new token pair.
    ///
    /// The user record is left alone. If the server does not rotate the
    /// refresh token, the current one is kept.
    pub async fn refresh_token(&self) -> Result<TokenPair, AuthError> {
        let _guard = self.op_lock.lock().await;

        let Some(refresh) = self.store.refresh_token() else {
            tracing::debug!("No refresh token stored");
            return Err(AuthError::NoRefreshToken);
        };
        let access = self.store.access_token();

        let issued = self.api.refresh_token(&refresh, access.as_deref()).await?;
        let tokens = TokenPair {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token.or(Some(refresh)),
        };

        self.store.persist_tokens(&tokens)?;
        tracing::info!("Access token refreshed");
        Ok(tokens)
    }

    /// Replace the user record of the current session (e.g. after a profile edit).
    pub async fn update_user(&self, user: User) -> Result<(), AuthError> {
        let _guard = self.op_lock.lock().await;

        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        self.store.persist_user(&user)?;
        Ok(())
    }

    // ─── Password reset ──────────────────────────────────────────────────────

    /// Ask for a reset link. Any OK response yields the same message, so the
    /// caller cannot learn whether the account exists.
    pub async fn request_password_reset(&self, email: &str) -> Result<Message, AuthError> {
        let access = self.store.access_token();
        self.api
            .request_password_reset(email, access.as_deref())
            .await?;
        Ok(Message {
            message: PASSWORD_RESET_REQUESTED.to_string(),
        })
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Message, AuthError> {
        let access = self.store.access_token();
        let payload = self
            .api
            .reset_password(token, new_password, access.as_deref())
            .await?;
        Ok(message_or(&payload, PASSWORD_RESET_DONE))
    }

    pub async fn reset_password_with_code(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<Message, AuthError> {
        let access = self.store.access_token();
        let payload = self
            .api
            .reset_password_with_code(email, code, new_password, access.as_deref())
            .await?;
        Ok(message_or(&payload, PASSWORD_RESET_DONE))
    }

    // ─── Email verification ──────────────────────────────────────────────────

    /// Verify an email with the link token. A response carrying a user and
    /// tokens also signs the user in.
    pub async fn verify_email(&self, token: &str) -> Result<Message, AuthError> {
        let _guard = self.op_lock.lock().await;

        let access = self.store.access_token();
        let payload = self.api.verify_email(token, access.as_deref()).await?;
        self.adopt_verified_session(&payload)?;
        Ok(message_or(&payload, EMAIL_VERIFIED))
    }

    /// Verify an email with the short code sent after registration.
    pub async fn verify_email_with_code(&self, email: &str, code: &str) -> Result<Message, AuthError> {
        let _guard = self.op_lock.lock().await;

        let access = self.store.access_token();
        let payload = self
            .api
            .verify_email_with_code(email, code, access.as_deref())
            .await?;
        self.adopt_verified_session(&payload)?;
        Ok(message_or(&payload, EMAIL_VERIFIED))
    }

    /// Send a new verification code; same message whether or not the
    /// account exists.
    pub async fn resend_verification_code(&self, email: &str) -> Result<Message, AuthError> {
        let access = self.store.access_token();
        self.api
            .resend_verification_code(email, access.as_deref())
            .await?;
        Ok(Message {
            message: VERIFICATION_CODE_RESENT.to_string(),
        })
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn begin(&self) {
        self.store.update_state(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn fail(&self, error: &AuthError) {
        let message = error.to_string();
        self.store.update_state(|state| {
            state.is_loading = false;
            state.error = Some(message);
        });
    }

    fn complete_sign_in(
        &self,
        result: Result<AuthPayload, AuthError>,
        flow: &'static str,
    ) -> Result<LoginOutcome, AuthError> {
        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                tracing::info!(flow, error = %e, "Sign-in failed");
                self.fail(&e);
                return Err(e);
            }
        };

        if let Err(e) = check_issued_token(&payload.tokens) {
            tracing::warn!(flow, "Sign-in response carried an unusable access token");
            self.fail(&e);
            return Err(e);
        }

        let session = StoredSession {
            access_token: payload.tokens.access_token.clone(),
            refresh_token: payload.tokens.refresh_token.clone(),
            user: payload.user.clone(),
        };
        if let Err(e) = self.store.persist(&session) {
            let err = AuthError::from(e);
            self.fail(&err);
            return Err(err);
        }

        tracing::info!(flow, user_id = %payload.user.id, "Signed in");
        Ok(LoginOutcome {
            user: payload.user,
            token: payload.tokens.access_token,
        })
    }

    fn adopt_verified_session(&self, payload: &Value) -> Result<(), AuthError> {
        let Some(auth) = parse_auth_payload(payload) else {
            return Ok(());
        };
        check_issued_token(&auth.tokens)?;
        self.store.persist(&StoredSession {
            access_token: auth.tokens.access_token,
            refresh_token: auth.tokens.refresh_token,
            user: auth.user.clone(),
        })?;
        tracing::info!(user_id = %auth.user.id, "Email verified, signed in");
        Ok(())
    }
}

/// A session is only stored with a token that `is_authenticated` would accept.
fn check_issued_token(tokens: &TokenPair) -> Result<(), AuthError> {
    token::validate(&tokens.access_token)
        .map(|_| ())
        .map_err(|rejection| {
            tracing::debug!(?rejection, "Rejected issued access token");
            AuthError::InvalidToken
        })
}

fn message_or(payload: &Value, default: &str) -> Message {
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string();
    Message { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_auth_route() {
        assert!(is_auth_route("/login"));
        assert!(is_auth_route("/login?next=/courses"));
        assert!(is_auth_route("/reset-password/abc123"));
        assert!(is_auth_route("/verify-email"));
        assert!(is_auth_route("/forgot-password#top"));

        assert!(!is_auth_route("/"));
        assert!(!is_auth_route("/courses"));
        assert!(!is_auth_route("/login-history"));
        assert!(!is_auth_route("/profile/register"));
    }

    #[test]
    fn test_message_or() {
        let payload = serde_json::json!({"message": "Tamam"});
        assert_eq!(message_or(&payload, "x").message, "Tamam");
        assert_eq!(message_or(&serde_json::json!({}), "x").message, "x");
        assert_eq!(message_or(&serde_json::json!({"message": ""}), "x").message, "x");
    }

    #[test]
    fn test_recording_navigator() {
        let navigator = RecordingNavigator::new();
        navigator.navigate("/login");
        navigator.navigate("/login");
        assert_eq!(navigator.visits().len(), 2);
        assert_eq!(navigator.last().as_deref(), Some("/login"));
    }
}
