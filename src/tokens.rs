use chrono::Utc;
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use crate::error::AppError;

/// SeedToken
///
/// One pre-provisioned registry entry, as read from `TOKEN_SEED_FILE`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedToken {
    pub mail_address: String,
    pub token: String,
}

/// TokenRegistry
///
/// Server-side allowlist of issued session tokens, keyed by mail address.
/// A signed token is only honoured while its exact `(mail address, token)`
/// pair is present here, so a restart (the registry is never persisted) or a
/// user deletion revokes tokens that are still cryptographically valid.
///
/// Each entry may carry the token's `exp` (seconds since the epoch). Entries
/// past it are pruned whenever a new token is registered; seeded entries have
/// no expiry and stay until revoked.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct TokenRegistry {
    tokens: Arc<RwLock<HashMap<String, HashMap<String, Option<i64>>>>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(entries: impl IntoIterator<Item = SeedToken>) -> Self {
        let registry = Self::new();
        for entry in entries {
            registry.insert(&entry.mail_address, &entry.token);
        }
        registry
    }

    /// Reads a JSON array of `{ "mailAddress", "token" }` objects.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::internal(format!("cannot read token seed file {}: {}", path.display(), e))
        })?;
        let entries: Vec<SeedToken> = serde_json::from_str(&raw)
            .map_err(|e| AppError::internal(format!("invalid token seed file: {}", e)))?;
        tracing::info!("Token registry seeded with {} entries", entries.len());
        Ok(Self::seeded(entries))
    }

    /// Registers a token with no expiry of its own.
    pub fn insert(&self, mail_address: &str, token: &str) {
        self.store(mail_address, token, None);
    }

    /// Registers a token that lapses at `expires_at`, dropping every entry
    /// that has already lapsed.
    pub fn insert_expiring(&self, mail_address: &str, token: &str, expires_at: i64) {
        self.store(mail_address, token, Some(expires_at));
    }

    fn store(&self, mail_address: &str, token: &str, expires_at: Option<i64>) {
        // A poisoned lock still guards a consistent map of strings.
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().timestamp();
        tokens.retain(|_, issued| {
            issued.retain(|_, exp| exp.is_none_or(|exp| exp > now));
            !issued.is_empty()
        });
        tokens
            .entry(mail_address.to_string())
            .or_default()
            .insert(token.to_string(), expires_at);
    }

    pub fn is_valid(&self, mail_address: &str, token: &str) -> bool {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(mail_address)
            .is_some_and(|issued| issued.contains_key(token))
    }

    /// Revokes a single token. Returns whether it was registered.
    pub fn revoke(&self, mail_address: &str, token: &str) -> bool {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let Some(issued) = tokens.get_mut(mail_address) else {
            return false;
        };
        let removed = issued.remove(token).is_some();
        if issued.is_empty() {
            tokens.remove(mail_address);
        }
        removed
    }

    /// Revokes every token issued to `mail_address`, returning how many were dropped.
    pub fn revoke_all(&self, mail_address: &str) -> usize {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.remove(mail_address).map_or(0, |issued| issued.len())
    }

    pub fn count(&self, mail_address: &str) -> usize {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens.get(mail_address).map_or(0, HashMap::len)
    }
}
