use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use super::domain::AdminId;

const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone)]
struct Session {
    admin_id: AdminId,
    expires_at: DateTime<Utc>,
}

/// In-process bearer-token table. Tokens are opaque random strings with a
/// fixed TTL; expired entries are dropped on resolution.
pub struct TokenSessions {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl TokenSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for the admin, valid for the configured TTL.
    pub fn issue(&self, admin_id: &AdminId, now: DateTime<Utc>) -> String {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.insert(
            token.clone(),
            Session {
                admin_id: admin_id.clone(),
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Resolve a token to the admin it was issued for, dropping it when
    /// expired.
    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<AdminId> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        match sessions.get(token) {
            Some(session) if session.expires_at > now => Some(session.admin_id.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.remove(token);
    }
}
