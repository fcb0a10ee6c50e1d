// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Where the handshake token comes from.

/// Supplies the bearer token sent in each `auth` handshake.
///
/// Queried on every connection attempt, so a refreshed token is picked up
/// on the next reconnect. `None` sends a `null` token.
pub trait AuthTokenProvider: Send {
    fn current_token(&self) -> Option<String>;
}

/// A fixed token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticToken(pub Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        StaticToken(Some(token.into()))
    }

    /// No token at all.
    pub fn none() -> Self {
        StaticToken(None)
    }
}

impl AuthTokenProvider for StaticToken {
    fn current_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads `UNILINK_TOKEN` on every attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvToken;

impl AuthTokenProvider for EnvToken {
    fn current_token(&self) -> Option<String> {
        crate::env::token()
    }
}

impl<F> AuthTokenProvider for F
where
    F: Fn() -> Option<String> + Send,
{
    fn current_token(&self) -> Option<String> {
        self()
    }
}
