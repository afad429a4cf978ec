//! Authentication freshness and nonce replay journal

use chrono::{DateTime, Duration, Utc};
use smartlock_crypto::AuthenticationMessage;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayError {
    /// The message date is further from the lock clock than the window allows
    Stale,
    /// The nonce was already accepted inside the window
    Replayed,
}

/// Remembers accepted nonces for one window
#[derive(Debug)]
pub struct NonceJournal {
    window: Duration,
    seen: Mutex<HashMap<[u8; 16], DateTime<Utc>>>,
}

impl NonceJournal {
    pub fn new(window: Duration) -> Self {
        NonceJournal {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Accept `message` once, if its date lies within the window around `now`
    pub fn check(
        &self,
        message: &AuthenticationMessage,
        now: DateTime<Utc>,
    ) -> Result<(), ReplayError> {
        let skew = (now - message.date()).abs();
        if skew > self.window {
            warn!(skew_secs = skew.num_seconds(), "stale authentication date");
            return Err(ReplayError::Stale);
        }

        let mut nonce = [0u8; 16];
        nonce.copy_from_slice(message.nonce().as_slice());

        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let horizon = now - self.window;
        seen.retain(|_, date| *date >= horizon);
        if seen.contains_key(&nonce) {
            warn!("replayed authentication nonce");
            return Err(ReplayError::Replayed);
        }
        seen.insert(nonce, message.date());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
