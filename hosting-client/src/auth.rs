//! App-level JWT signing and the process-wide installation-token cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

use crate::error::{HostingError, HostingResult};

#[derive(Debug, Serialize)]
struct AppJwtClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// Signs the app-level JWT (`RS256` over `{iat: now-60, exp: now+600,
/// iss: app_id}`) exchanged for a per-installation access token.
pub fn generate_app_jwt(app_id: &str, private_key_pem: &[u8]) -> HostingResult<String> {
    let now = now_unix();
    let claims = AppJwtClaims {
        iat: now - 60,
        exp: now + 600,
        iss: app_id.to_string(),
    };
    let key = EncodingKey::from_rsa_pem(private_key_pem)
        .map_err(|err| HostingError::Auth(format!("invalid app private key: {err}")))?;
    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|err| HostingError::Auth(format!("failed to sign app jwt: {err}")))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

struct CachedToken {
    token: String,
    not_after: DateTime<Utc>,
}

/// Process-wide, mutex-protected map of installation id to cached access
/// token, with a 60 s safety margin before the platform-advertised expiry.
/// Eviction is lazy: a stale entry is simply ignored on next lookup and
/// overwritten once refreshed.
#[derive(Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<i64, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, installation_id: i64) -> Option<String> {
        let entries = self.entries.lock().expect("token cache poisoned");
        entries.get(&installation_id).and_then(|entry| {
            if entry.not_after > Utc::now() {
                Some(entry.token.clone())
            } else {
                None
            }
        })
    }

    pub fn insert(&self, installation_id: i64, token: String, expires_at: DateTime<Utc>) {
        let not_after = expires_at - chrono::Duration::seconds(60);
        let mut entries = self.entries.lock().expect("token cache poisoned");
        entries.insert(installation_id, CachedToken { token, not_after });
    }

    pub fn invalidate(&self, installation_id: i64) {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        entries.remove(&installation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_rejects_entries_inside_the_safety_margin() {
        let cache = TokenCache::new();
        cache.insert(1, "tok".into(), Utc::now() + chrono::Duration::seconds(30));
        // expires_at - 60s margin is already in the past.
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn cache_returns_fresh_entries() {
        let cache = TokenCache::new();
        cache.insert(1, "tok".into(), Utc::now() + chrono::Duration::hours(1));
        assert_eq!(cache.get(1).as_deref(), Some("tok"));
    }
}
