// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The same configuration drives the client-side session manager (API base
//! URL, persistent store location, cookie lifetime) and the server-side
//! session gate binary.

use std::env;
use std::path::PathBuf;

/// Default API host for local development.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Mirrored session cookies live for 24 hours.
pub const DEFAULT_COOKIE_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the platform REST API (no trailing slash)
    pub api_base_url: String,
    /// Location of the persistent session store; in-memory when `None`
    pub session_store_path: Option<PathBuf>,
    /// Max-Age applied to mirrored session cookies
    pub cookie_max_age_secs: i64,
    /// Login entry point used for logout navigation and gate redirects
    pub login_path: String,
    /// Frontend URL (CORS origin for the gate)
    pub frontend_url: String,
    /// Server port for the gate binary
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_store_path: None,
            cookie_max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
            login_path: "/login".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every value has a development default, so a bare environment yields a
    /// working local setup.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = env::var("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid("API_BASE_URL", api_base_url));
        }

        let cookie_max_age_secs = match env::var("COOKIE_MAX_AGE_SECS") {
            Ok(v) => match v.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::Invalid("COOKIE_MAX_AGE_SECS", v)),
            },
            Err(_) => DEFAULT_COOKIE_MAX_AGE_SECS,
        };

        let port = match env::var("PORT") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", v))?,
            Err(_) => 8080,
        };

        let login_path = env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string());
        if !login_path.starts_with('/') {
            return Err(ConfigError::Invalid("LOGIN_PATH", login_path));
        }

        Ok(Self {
            api_base_url,
            session_store_path: env::var("SESSION_STORE_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            cookie_max_age_secs,
            login_path,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port,
        })
    }

    /// Build the full URL for an API path such as `/auth/login/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("API_BASE_URL", "https://api.example.com/api/");
        env::set_var("COOKIE_MAX_AGE_SECS", "3600");
        env::remove_var("LOGIN_PATH");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_base_url, "https://api.example.com/api");
        assert_eq!(config.cookie_max_age_secs, 3600);
        assert_eq!(config.login_path, "/login");
        assert_eq!(
            config.endpoint("/auth/login/"),
            "https://api.example.com/api/auth/login/"
        );

        for bad in ["0", "-5", "soon"] {
            env::set_var("COOKIE_MAX_AGE_SECS", bad);
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::Invalid("COOKIE_MAX_AGE_SECS", _))
            ));
        }
        env::remove_var("COOKIE_MAX_AGE_SECS");

        env::set_var("PORT", "80800");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("PORT", _))
        ));
        env::remove_var("PORT");

        env::remove_var("API_BASE_URL");
    }

    #[test]
    fn test_default_endpoint() {
        let config = Config::default();
        assert_eq!(
            config.endpoint("/auth/refresh-token/"),
            "http://localhost:8000/api/auth/refresh-token/"
        );
        assert_eq!(config.cookie_max_age_secs, 86400);
    }
}
