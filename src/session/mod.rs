//! Betting session: the bet state machine.
//!
//! A session owns the balance, the pending selections, the streak
//! counters, and the append-only history. Each bet cycle runs
//! `Idle → StakeSelected → SideSelected → Flipping → Idle`.
//!
//! Resolution is either one-shot (`resolve_bet`) or two-phase
//! (`begin_flip` then `complete_flip`), the latter letting a front end
//! show a spin between the two calls while the flight flag keeps any
//! second flip out.

pub mod shared;
pub mod stats;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::coin::CoinSource;
use crate::config::AppConfig;
use crate::types::{
    BetOutcome, BetRecord, BetStateProblem, SessionError, SessionPhase, Side, StakeMode,
    StakeTiers,
};

pub use shared::SharedSession;
pub use stats::SessionStats;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Per-session rules, usually taken from `AppConfig`.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub initial_balance: Decimal,
    pub tiers: StakeTiers,
    pub clear_stake_on_mode_change: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            initial_balance: cfg.session.initial_balance,
            tiers: cfg.stakes.clone(),
            clear_stake_on_mode_change: cfg.session.clear_stake_on_mode_change,
        }
    }
}

// ---------------------------------------------------------------------------
// Flight tickets
// ---------------------------------------------------------------------------

/// Proof of an outstanding flip, handed out by `begin_flip`.
///
/// Not `Clone`: completing or cancelling consumes it, so one flight is
/// resolved at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct FlightTicket {
    session: Uuid,
    flight: u64,
}

impl FlightTicket {
    pub fn session_id(&self) -> Uuid {
        self.session
    }

    pub fn flight_id(&self) -> u64 {
        self.flight
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only view of everything a front end displays.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub wallet: Option<String>,
    pub balance: Decimal,
    pub mode: StakeMode,
    pub phase: SessionPhase,
    pub allowed_stakes: Vec<Decimal>,
    pub pending_stake: Option<Decimal>,
    pub pending_side: Option<Side>,
    pub last_result: Option<Side>,
    pub win_streak: u32,
    pub loss_streak: u32,
    pub history: Vec<BetRecord>,
    /// History rendered as display lines, oldest first.
    pub history_lines: Vec<String>,
    pub stats: SessionStats,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct BettingSession {
    id: Uuid,
    wallet: Option<String>,
    settings: SessionSettings,
    coin: Box<dyn CoinSource>,
    balance: Decimal,
    peak_balance: Decimal,
    mode: StakeMode,
    pending_stake: Option<Decimal>,
    pending_side: Option<Side>,
    win_streak: u32,
    loss_streak: u32,
    history: Vec<BetRecord>,
    last_result: Option<Side>,
    flight: Option<u64>,
    next_flight: u64,
    created_at: DateTime<Utc>,
}

impl fmt::Debug for BettingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BettingSession")
            .field("id", &self.id)
            .field("wallet", &self.wallet)
            .field("balance", &self.balance)
            .field("mode", &self.mode)
            .field("pending_stake", &self.pending_stake)
            .field("pending_side", &self.pending_side)
            .field("win_streak", &self.win_streak)
            .field("loss_streak", &self.loss_streak)
            .field("bets", &self.history.len())
            .field("flight", &self.flight)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for BettingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self
            .last_result
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "[{}] {} | balance={} | mode={} | streak=W{}/L{} | last={} | bets={}",
            self.id,
            self.phase(),
            self.balance.normalize(),
            self.mode,
            self.win_streak,
            self.loss_streak,
            last,
            self.history.len(),
        )
    }
}

impl BettingSession {
    /// A fresh session with default settings: balance 100, Normal mode.
    pub fn new(coin: Box<dyn CoinSource>) -> Self {
        Self::with_settings(SessionSettings::default(), coin)
    }

    pub fn with_settings(settings: SessionSettings, coin: Box<dyn CoinSource>) -> Self {
        let balance = settings.initial_balance;
        Self {
            id: Uuid::new_v4(),
            wallet: None,
            settings,
            coin,
            balance,
            peak_balance: balance,
            mode: StakeMode::Normal,
            pending_stake: None,
            pending_side: None,
            win_streak: 0,
            loss_streak: 0,
            history: Vec::new(),
            last_result: None,
            flight: None,
            next_flight: 1,
            created_at: Utc::now(),
        }
    }

    /// Tag the session with the host's opaque wallet/account id.
    pub fn with_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet = Some(wallet.into());
        self
    }

    /// Start from a specific balance instead of the configured one.
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self.peak_balance = balance;
        self
    }

    // -- Accessors --------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn wallet(&self) -> Option<&str> {
        self.wallet.as_deref()
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn mode(&self) -> StakeMode {
        self.mode
    }

    pub fn pending_stake(&self) -> Option<Decimal> {
        self.pending_stake
    }

    pub fn pending_side(&self) -> Option<Side> {
        self.pending_side
    }

    pub fn win_streak(&self) -> u32 {
        self.win_streak
    }

    pub fn loss_streak(&self) -> u32 {
        self.loss_streak
    }

    pub fn last_result(&self) -> Option<Side> {
        self.last_result
    }

    /// Resolved bets, oldest first.
    pub fn history(&self) -> &[BetRecord] {
        &self.history
    }

    /// Stakes offered in the current mode.
    pub fn allowed_stakes(&self) -> &[Decimal] {
        self.settings.tiers.for_mode(self.mode)
    }

    pub fn is_flipping(&self) -> bool {
        self.flight.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.flight.is_some() {
            SessionPhase::Flipping
        } else if self.pending_side.is_some() {
            SessionPhase::SideSelected
        } else if self.pending_stake.is_some() {
            SessionPhase::StakeSelected
        } else {
            SessionPhase::Idle
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::compute(&self.history, self.peak_balance)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            wallet: self.wallet.clone(),
            balance: self.balance,
            mode: self.mode,
            phase: self.phase(),
            allowed_stakes: self.allowed_stakes().to_vec(),
            pending_stake: self.pending_stake,
            pending_side: self.pending_side,
            last_result: self.last_result,
            win_streak: self.win_streak,
            loss_streak: self.loss_streak,
            history: self.history.clone(),
            history_lines: self.history.iter().map(|r| r.to_string()).collect(),
            stats: self.stats(),
            created_at: self.created_at,
        }
    }

    // -- Selection --------------------------------------------------------

    /// Switch stake tier. Never fails. A pending stake survives the
    /// switch unless `clear_stake_on_mode_change` is set and the new
    /// tier does not offer it.
    pub fn set_mode(&mut self, mode: StakeMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;

        if self.settings.clear_stake_on_mode_change && self.flight.is_none() {
            if let Some(stake) = self.pending_stake {
                if !self.settings.tiers.allows(mode, stake) {
                    debug!(session = %self.id, %stake, %mode, "Pending stake dropped on mode change");
                    self.pending_stake = None;
                    self.pending_side = None;
                }
            }
        }

        debug!(session = %self.id, %mode, "Mode changed");
    }

    /// The "God Mode" button: flip between Normal and Elevated.
    pub fn toggle_mode(&mut self) -> StakeMode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    pub fn select_stake(&mut self, stake: Decimal) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if !self.settings.tiers.allows(self.mode, stake) {
            return Err(SessionError::InvalidStake {
                stake,
                mode: self.mode,
            });
        }
        self.pending_stake = Some(stake);
        debug!(session = %self.id, %stake, "Stake selected");
        Ok(())
    }

    pub fn select_side(&mut self, side: Side) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if self.pending_stake.is_none() {
            return Err(SessionError::NoStakeSelected);
        }
        self.pending_side = Some(side);
        debug!(session = %self.id, %side, "Side selected");
        Ok(())
    }

    // -- Resolution -------------------------------------------------------

    /// Enter `Flipping`. The returned ticket completes or cancels the
    /// flight; until then no other flip can start or resolve.
    pub fn begin_flip(&mut self) -> Result<FlightTicket, SessionError> {
        if self.flight.is_some() {
            return Err(SessionError::FlightInProgress);
        }
        self.ready_bet()?;

        let flight = self.next_flight;
        self.next_flight += 1;
        self.flight = Some(flight);

        debug!(session = %self.id, flight, "Flip started");
        Ok(FlightTicket {
            session: self.id,
            flight,
        })
    }

    /// Resolve the flight `ticket` was issued for.
    pub fn complete_flip(&mut self, ticket: FlightTicket) -> Result<BetRecord, SessionError> {
        self.check_ticket(&ticket)?;
        let (stake, side) = self.ready_bet()?;
        self.flight = None;
        Ok(self.settle(stake, side))
    }

    /// Abandon the flight `ticket` was issued for. Selections are kept;
    /// balance, streaks, and history are untouched.
    pub fn cancel_flip(&mut self, ticket: FlightTicket) -> Result<(), SessionError> {
        self.check_ticket(&ticket)?;
        self.flight = None;
        info!(session = %self.id, flight = ticket.flight, "Flip cancelled");
        Ok(())
    }

    /// One-shot resolution: draw and settle the pending bet now.
    pub fn resolve_bet(&mut self) -> Result<BetRecord, SessionError> {
        if self.flight.is_some() {
            return Err(SessionError::FlightInProgress);
        }
        let (stake, side) = self.ready_bet()?;
        Ok(self.settle(stake, side))
    }

    // -- Balance ----------------------------------------------------------

    /// Credit `amount` to the balance. Not a bet: streaks and history
    /// are left alone.
    pub fn top_up(&mut self, amount: Decimal) -> Result<Decimal, SessionError> {
        self.ensure_idle()?;
        if amount <= Decimal::ZERO {
            return Err(SessionError::InvalidAmount(amount));
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(SessionError::InvalidAmount(amount))?;
        self.update_peak();
        info!(session = %self.id, %amount, balance = %self.balance, "Balance topped up");
        Ok(self.balance)
    }

    /// Back to the creation state. Id and wallet are kept.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.balance = self.settings.initial_balance;
        self.peak_balance = self.balance;
        self.mode = StakeMode::Normal;
        self.pending_stake = None;
        self.pending_side = None;
        self.win_streak = 0;
        self.loss_streak = 0;
        self.history.clear();
        self.last_result = None;
        info!(session = %self.id, balance = %self.balance, "Session reset");
        Ok(())
    }

    // -- Internals --------------------------------------------------------

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.flight.is_some() {
            Err(SessionError::SessionBusy)
        } else {
            Ok(())
        }
    }

    fn check_ticket(&self, ticket: &FlightTicket) -> Result<(), SessionError> {
        if ticket.session == self.id && self.flight == Some(ticket.flight) {
            Ok(())
        } else {
            Err(SessionError::UnknownFlight)
        }
    }

    /// Stake and side of a bet that may be resolved now.
    fn ready_bet(&self) -> Result<(Decimal, Side), SessionError> {
        let stake = self
            .pending_stake
            .ok_or(SessionError::InvalidBetState(BetStateProblem::MissingStake))?;
        let side = self
            .pending_side
            .ok_or(SessionError::InvalidBetState(BetStateProblem::MissingSide))?;
        if self.balance < stake {
            return Err(SessionError::InvalidBetState(
                BetStateProblem::InsufficientBalance {
                    needed: stake,
                    available: self.balance,
                },
            ));
        }
        if self.balance.checked_add(stake).is_none() {
            return Err(SessionError::InvalidBetState(BetStateProblem::BalanceLimit {
                balance: self.balance,
                stake,
            }));
        }
        Ok((stake, side))
    }

    /// Draw the coin and apply the result. `ready_bet` has already ruled
    /// out a short balance and an overflowing win, so nothing here fails
    /// once the draw is made.
    fn settle(&mut self, stake: Decimal, side: Side) -> BetRecord {
        let result = Side::from_draw(self.coin.draw());
        self.last_result = Some(result);

        let (outcome, delta) = if result == side {
            self.win_streak += 1;
            self.loss_streak = 0;
            (BetOutcome::Win, stake)
        } else {
            self.loss_streak += 1;
            self.win_streak = 0;
            (BetOutcome::Loss, -stake)
        };
        self.balance += delta;
        self.update_peak();

        let record = BetRecord {
            sequence: self.history.len() as u64 + 1,
            side,
            stake,
            result,
            outcome,
            delta,
            balance_after: self.balance,
            timestamp: Utc::now(),
        };
        self.history.push(record.clone());

        self.pending_stake = None;
        self.pending_side = None;

        info!(
            session = %self.id,
            bet = record.sequence,
            %side,
            %result,
            %outcome,
            delta = %delta,
            balance = %self.balance,
            win_streak = self.win_streak,
            loss_streak = self.loss_streak,
            "Bet resolved"
        );

        record
    }

    fn update_peak(&mut self) {
        if self.balance > self.peak_balance {
            self.peak_balance = self.balance;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
