// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Response headers for session-gated pages.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Headers applied to every gate response. Gated responses depend on the
/// caller's cookies, so they must never be stored by shared caches.
const SESSION_HEADERS: [(&str, &str); 6] = [
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("Referrer-Policy", "same-origin"),
    (
        "Strict-Transport-Security",
        "max-age=31536000; includeSubDomains",
    ),
    ("Cache-Control", "no-store"),
    ("Vary", "Cookie, Authorization"),
];

/// Add security and caching headers to all responses.
pub async fn add_session_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    for (name, value) in SESSION_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}
