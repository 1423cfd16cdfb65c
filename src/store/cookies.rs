// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side cookie jar.
//!
//! Holds the mirrored session cookies (`access_token`, `refresh_token`,
//! `user`) and whatever cookies the API sets. It is also the cookie provider
//! of the HTTP client, so every API request carries the jar's cookies.

use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::header::HeaderValue;
use reqwest::Url;

struct StoredCookie {
    cookie: Cookie<'static>,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Thread-safe cookie jar shared between the session store and the HTTP client.
#[derive(Default)]
pub struct SessionCookies {
    jar: DashMap<String, StoredCookie>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie on `/` with the given lifetime. The value is
    /// percent-encoded so JSON survives the cookie syntax.
    pub fn set(&self, name: &str, value: &str, max_age: time::Duration) {
        let cookie = Cookie::build((name.to_string(), urlencoding::encode(value).into_owned()))
            .path("/")
            .max_age(max_age)
            .build();
        let expires_at = expiry_after(Utc::now(), max_age.whole_seconds());
        self.jar.insert(name.to_string(), StoredCookie { cookie, expires_at });
    }

    /// Decoded value of a live cookie.
    pub fn get(&self, name: &str) -> Option<String> {
        let entry = self.jar.get(name)?;
        if !entry.is_live(Utc::now()) {
            return None;
        }
        let raw = entry.cookie.value();
        Some(
            urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string()),
        )
    }

    /// The full cookie (attributes included), for inspection.
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.jar.get(name).map(|entry| entry.cookie.clone())
    }

    pub fn remove(&self, name: &str) {
        self.jar.remove(name);
    }

    /// Drop every cookie in the jar.
    pub fn clear(&self) {
        self.jar.clear();
    }

    /// Names of the live cookies.
    pub fn names(&self) -> Vec<String> {
        let now = Utc::now();
        self.jar
            .iter()
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    /// `Cookie` request header for the given path, if any cookie applies.
    pub fn header_for_path(&self, request_path: &str) -> Option<String> {
        let now = Utc::now();
        let mut pairs: Vec<String> = self
            .jar
            .iter()
            .filter(|entry| entry.is_live(now))
            .filter(|entry| request_path.starts_with(entry.cookie.path().unwrap_or("/")))
            .map(|entry| format!("{}={}", entry.cookie.name(), entry.cookie.value()))
            .collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        Some(pairs.join("; "))
    }

    /// Store a cookie received from the server, honoring deletion by
    /// `Max-Age=0` or an `Expires` in the past.
    fn absorb(&self, cookie: Cookie<'static>) {
        let now = Utc::now();
        let expires_at = if let Some(max_age) = cookie.max_age() {
            if max_age.whole_seconds() <= 0 {
                self.jar.remove(cookie.name());
                return;
            }
            expiry_after(now, max_age.whole_seconds())
        } else {
            cookie
                .expires_datetime()
                .and_then(|at| DateTime::from_timestamp(at.unix_timestamp(), 0))
        };

        if expires_at.is_some_and(|at| at <= now) {
            self.jar.remove(cookie.name());
            return;
        }

        self.jar.insert(
            cookie.name().to_string(),
            StoredCookie { cookie, expires_at },
        );
    }
}

/// Expiry `secs` after `now`. A lifetime too large to represent never expires.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    chrono::Duration::try_seconds(secs).and_then(|delta| now.checked_add_signed(delta))
}

impl reqwest::cookie::CookieStore for SessionCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            match Cookie::parse(raw.to_owned()) {
                Ok(cookie) => self.absorb(cookie),
                Err(e) => tracing::debug!(error = %e, "Ignoring malformed Set-Cookie header"),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for_path(url.path())
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    fn url() -> Url {
        Url::parse("http://localhost:8000/api/auth/login/").unwrap()
    }

    #[test]
    fn test_set_encodes_and_get_decodes() {
        let jar = SessionCookies::new();
        jar.set("user", r#"{"id":1,"name":"A; B"}"#, time::Duration::hours(24));

        assert_eq!(jar.get("user").as_deref(), Some(r#"{"id":1,"name":"A; B"}"#));
        let cookie = jar.cookie("user").unwrap();
        assert!(!cookie.value().contains(';'));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
    }

    #[test]
    fn test_expired_cookie_is_invisible() {
        let jar = SessionCookies::new();
        jar.set("access_token", "t", time::Duration::seconds(0));
        assert!(jar.get("access_token").is_none());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_absorbs_server_cookies() {
        let jar = SessionCookies::new();
        let headers = [
            HeaderValue::from_static("sessionid=abc; Path=/; HttpOnly"),
            HeaderValue::from_static("csrftoken=xyz; Path=/api; Max-Age=3600"),
        ];
        jar.set_cookies(&mut headers.iter(), &url());

        assert_eq!(jar.get("sessionid").as_deref(), Some("abc"));
        let header = jar.cookies(&url()).unwrap();
        assert_eq!(header.to_str().unwrap(), "csrftoken=xyz; sessionid=abc");

        let other = Url::parse("http://localhost:8000/static/app.js").unwrap();
        assert_eq!(jar.cookies(&other).unwrap().to_str().unwrap(), "sessionid=abc");
    }

    #[test]
    fn test_huge_max_age_does_not_overflow() {
        let jar = SessionCookies::new();
        let headers = [HeaderValue::from_static(
            "sessionid=abc; Path=/; Max-Age=99999999999999999999",
        )];
        jar.set_cookies(&mut headers.iter(), &url());

        assert_eq!(jar.get("sessionid").as_deref(), Some("abc"));

        jar.set("user", "{}", time::Duration::seconds(i64::MAX));
        assert_eq!(jar.get("user").as_deref(), Some("{}"));
    }

    #[test]
    fn test_server_deletion_removes_cookie() {
        let jar = SessionCookies::new();
        jar.set("sessionid", "abc", time::Duration::hours(1));

        let headers = [HeaderValue::from_static("sessionid=; Path=/; Max-Age=0")];
        jar.set_cookies(&mut headers.iter(), &url());

        assert!(jar.get("sessionid").is_none());
        assert!(jar.cookies(&url()).is_none());
    }
}
