// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User record as returned by the platform API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User identifier. The API issues numeric ids, older accounts carry UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// Authenticated principal.
///
/// Only the fields the session layer reads are typed; everything else the
/// backend sends (avatar, XP, wallet address, ...) is kept in `extra` so the
/// record survives a storage round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Platform role (e.g. "student", "instructor", "admin")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub extra: Map<String, Value>,
}

impl User {
    /// Name to show in greetings: full name, then username, then email.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        self.username
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Whether the user carries the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_keeps_unknown_fields() {
        let json = r#"{"id":7,"email":"a@b.com","role":"student","xp":120,"avatar":"x.png"}"#;
        let user: User = serde_json::from_str(json).unwrap();

        assert_eq!(user.id, UserId::Number(7));
        assert!(user.has_role("student"));
        assert_eq!(user.extra.get("xp"), Some(&Value::from(120)));

        let back: Value = serde_json::to_value(&user).unwrap();
        assert_eq!(back["avatar"], "x.png");
        assert_eq!(back["email"], "a@b.com");
        assert!(back.get("username").is_none());
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut user: User =
            serde_json::from_str(r#"{"id":"u-1","username":"ada","email":"a@b.com"}"#).unwrap();
        assert_eq!(user.display_name(), "ada");

        user.first_name = Some("Ada".to_string());
        user.last_name = Some("Lovelace".to_string());
        assert_eq!(user.display_name(), "Ada Lovelace");

        let bare: User = serde_json::from_str(r#"{"id":"u-2"}"#).unwrap();
        assert_eq!(bare.display_name(), "u-2");
    }
}
