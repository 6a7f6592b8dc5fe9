//! Client identity derivation from request headers.

use axum::http::HeaderMap;
use tracing::trace;

/// Standard proxy header carrying the original client chain.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Single-address header set by nginx-style proxies.
pub const REAL_IP: &str = "x-real-ip";
/// Client address header set by Cloudflare.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
/// Key used when no identifying header is present.
pub const UNKNOWN: &str = "unknown";

/// The identity under which a caller's requests are counted.
///
/// All callers without identifying headers share the [`UNKNOWN`] key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Derive the key from headers, preferring `x-forwarded-for` (first
    /// hop), then `x-real-ip`, then `cf-connecting-ip`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if let Some(forwarded) = header_str(headers, FORWARDED_FOR) {
            let first = forwarded.split(',').next().unwrap_or_default();
            return Self(first.trim().to_string());
        }

        header_str(headers, REAL_IP)
            .or_else(|| header_str(headers, CF_CONNECTING_IP))
            .map(|value| Self(value.to_string()))
            .unwrap_or_else(Self::unknown)
    }

    /// The shared fallback key.
    pub fn unknown() -> Self {
        Self(UNKNOWN.to_string())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?;
    match value.to_str() {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(_) => {
            trace!(header = name, "Skipping client header with non-ASCII value");
            None
        }
    }
}
