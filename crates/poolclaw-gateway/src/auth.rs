//! Authentication handling

use axum::http::{header, HeaderMap};
use poolclaw_core::{Error, Result};

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() { return false; }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Bearer token check. No token configured means every request is accepted.
#[derive(Clone, Debug, Default)]
pub struct ResolvedAuth {
    pub token: Option<String>,
}

impl ResolvedAuth {
    pub fn from_config(token: Option<String>, env_token: Option<String>) -> Self {
        let token = token.or(env_token).filter(|t| !t.is_empty());
        Self { token }
    }

    pub fn enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn verify_token(&self, provided: Option<&str>) -> Result<()> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };
        let provided = provided.ok_or_else(|| Error::auth_failed("token required"))?;
        if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
            return Err(Error::auth_failed("invalid token"));
        }
        Ok(())
    }

    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<()> {
        self.verify_token(bearer_token(headers))
    }
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}
