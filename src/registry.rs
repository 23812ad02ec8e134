//! Session registry: one independent session per wallet.
//!
//! The wallet id is whatever opaque account identifier the host's wallet
//! provider hands out; it is used as a key and never validated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

use crate::coin::{self, CoinSource};
use crate::config::AppConfig;
use crate::session::{BettingSession, SessionSettings, SharedSession};

/// Builds the coin for each new session.
pub type CoinFactory = Arc<dyn Fn() -> Box<dyn CoinSource> + Send + Sync>;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
    settings: SessionSettings,
    spin_delay: Duration,
    coin_factory: CoinFactory,
}

impl SessionRegistry {
    /// Registry whose sessions follow `cfg`. With `session.rng_seed` set,
    /// every session gets its own coin seeded identically, so each one
    /// replays the same draw sequence.
    pub fn new(cfg: &AppConfig) -> Self {
        let seed = cfg.session.rng_seed;
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings: SessionSettings::from(cfg),
            spin_delay: cfg.session.spin_delay(),
            coin_factory: Arc::new(move || coin::from_seed(seed)),
        }
    }

    /// Replace the coin used for sessions created from now on.
    pub fn with_coin_factory(mut self, factory: CoinFactory) -> Self {
        self.coin_factory = factory;
        self
    }

    pub fn with_spin_delay(mut self, spin_delay: Duration) -> Self {
        self.spin_delay = spin_delay;
        self
    }

    pub async fn get(&self, wallet: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(wallet).cloned()
    }

    /// The wallet's session, created fresh on first access.
    pub async fn get_or_create(&self, wallet: &str) -> SharedSession {
        if let Some(existing) = self.get(wallet).await {
            return existing;
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have created it between the two locks.
        if let Some(existing) = sessions.get(wallet) {
            return existing.clone();
        }

        let session = BettingSession::with_settings(self.settings.clone(), (self.coin_factory)())
            .with_wallet(wallet);
        info!(wallet, session = %session.id(), balance = %session.balance(), "Session created");

        let shared = SharedSession::new(session, self.spin_delay);
        sessions.insert(wallet.to_string(), shared.clone());
        shared
    }

    /// Drop the wallet's session. Returns whether one existed.
    pub async fn remove(&self, wallet: &str) -> bool {
        let removed = self.sessions.write().await.remove(wallet).is_some();
        if removed {
            info!(wallet, "Session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
