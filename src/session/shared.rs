//! Shared session handle with a timed spin.
//!
//! Wraps a `BettingSession` in `Arc<tokio::sync::Mutex<_>>` so HTTP
//! handlers and background tasks can drive the same session. `flip()`
//! runs the two-phase protocol with the configured spin delay between
//! `begin_flip` and `complete_flip`; the lock is only held for the
//! transitions themselves, never across the spin.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::{BettingSession, FlightTicket, SessionSnapshot};
use crate::types::{BetRecord, SessionError};

#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<BettingSession>>,
    spin_delay: Duration,
}

impl SharedSession {
    pub fn new(session: BettingSession, spin_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
            spin_delay,
        }
    }

    pub fn spin_delay(&self) -> Duration {
        self.spin_delay
    }

    /// Exclusive access for selections and reads.
    pub async fn lock(&self) -> MutexGuard<'_, BettingSession> {
        self.inner.lock().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn begin_flip(&self) -> Result<FlightTicket, SessionError> {
        self.inner.lock().await.begin_flip()
    }

    pub async fn complete_flip(&self, ticket: FlightTicket) -> Result<BetRecord, SessionError> {
        self.inner.lock().await.complete_flip(ticket)
    }

    pub async fn cancel_flip(&self, ticket: FlightTicket) -> Result<(), SessionError> {
        self.inner.lock().await.cancel_flip(ticket)
    }

    /// Start a flip, wait out the spin, then resolve it.
    ///
    /// A second `flip()` arriving during the spin fails immediately with
    /// `FlightInProgress`. If this future is dropped mid-spin the flight
    /// is cancelled, leaving balance and history untouched.
    pub async fn flip(&self) -> Result<BetRecord, SessionError> {
        self.flip_with_snapshot().await.map(|(record, _)| record)
    }

    /// `flip()`, plus the session state as it stood when the bet
    /// settled, read under the same lock.
    pub async fn flip_with_snapshot(&self) -> Result<(BetRecord, SessionSnapshot), SessionError> {
        let ticket = self.begin_flip().await?;
        let pending = PendingFlight {
            session: self.inner.clone(),
            ticket: Some(ticket),
        };

        if !self.spin_delay.is_zero() {
            tokio::time::sleep(self.spin_delay).await;
        }

        pending.complete().await
    }
}

// ---------------------------------------------------------------------------
// Pending flight guard
// ---------------------------------------------------------------------------

/// Holds the ticket across the spin and cancels it if never completed.
struct PendingFlight {
    session: Arc<Mutex<BettingSession>>,
    ticket: Option<FlightTicket>,
}

impl PendingFlight {
    async fn complete(mut self) -> Result<(BetRecord, SessionSnapshot), SessionError> {
        let mut session = self.session.lock().await;
        let ticket = self.ticket.take().ok_or(SessionError::UnknownFlight)?;
        let record = session.complete_flip(ticket)?;
        Ok((record, session.snapshot()))
    }
}

impl Drop for PendingFlight {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };

        let deferred = match self.session.try_lock() {
            Ok(mut session) => {
                if let Err(e) = session.cancel_flip(ticket) {
                    debug!(error = %e, "Abandoned flight already settled");
                }
                None
            }
            Err(_) => Some(ticket),
        };

        if let Some(ticket) = deferred {
            warn!(flight = ticket.flight_id(), "Flip abandoned while session locked, cancelling later");
            let session = self.session.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = session.lock().await.cancel_flip(ticket) {
                        debug!(error = %e, "Abandoned flight already settled");
                    }
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
