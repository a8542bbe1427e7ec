use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::events::SecurityEvent;

const MAX_SESSIONS: usize = 4;

/// `hash = SHA-256(salt || password)`; `salt` is 16 random bytes generated
/// once per password.
#[derive(Debug, Clone)]
pub struct PasswordAuth {
    salt: [u8; 16],
    hash: [u8; 32],
}

impl PasswordAuth {
    pub fn set_password(password: &str) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = Self::compute_hash(&salt, password);
        Self { salt, hash }
    }

    fn compute_hash(salt: &[u8; 16], password: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }

    /// Constant-time in the comparison: every byte is inspected regardless
    /// of where the first mismatch falls.
    pub fn validate(&self, password: &str) -> bool {
        let candidate = Self::compute_hash(&self.salt, password);
        constant_time_eq(&candidate, &self.hash)
    }
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff = 0u8;
    for i in 0..32 {
        diff |= a[i] ^ b[i];
    }
    diff == 0
}

struct Session {
    token: String,
    created_ms: u64,
}

/// Up to [`MAX_SESSIONS`] concurrent session tokens. Expired tokens are
/// invalidated lazily on next access; creating a fifth token evicts the
/// oldest.
#[derive(Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
    session_timeout_ms: u64,
}

impl SessionStore {
    pub fn new(session_timeout_ms: u64) -> Self {
        Self {
            sessions: Vec::new(),
            session_timeout_ms,
        }
    }

    fn evict_expired(&mut self, now_ms: u64) {
        self.sessions
            .retain(|s| now_ms.saturating_sub(s.created_ms) <= self.session_timeout_ms);
    }

    /// Creates a new 32-hex-char session token. Evicts the oldest session if
    /// the table is already full, and fires [`SecurityEvent::SessionEvicted`]
    /// via `on_event` when that happens.
    pub fn create(&mut self, now_ms: u64, mut on_event: impl FnMut(SecurityEvent)) -> String {
        self.evict_expired(now_ms);
        if self.sessions.len() >= MAX_SESSIONS {
            self.sessions.remove(0);
            on_event(SecurityEvent::SessionEvicted);
        }
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = hex::encode(raw);
        self.sessions.push(Session {
            token: token.clone(),
            created_ms: now_ms,
        });
        on_event(SecurityEvent::SessionCreated);
        token
    }

    pub fn is_valid(&mut self, token: &str, now_ms: u64) -> bool {
        self.evict_expired(now_ms);
        self.sessions.iter().any(|s| s.token == token)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
