//! Shared types for the COINFLIP engine.
//!
//! These types form the data model used across all modules.
//! They carry no behaviour beyond formatting and small lookups, so the
//! session, server, and registry modules can depend on them freely.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A coin face. Used both for the player's call and the flip result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "Heads", alias = "HEADS")]
    Heads,
    #[serde(alias = "Tails", alias = "TAILS")]
    Tails,
}

impl Side {
    /// Map a fair coin draw onto a face: `true` is Heads.
    pub fn from_draw(draw: bool) -> Self {
        if draw {
            Side::Heads
        } else {
            Side::Tails
        }
    }

    /// The opposite face.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Heads => Side::Tails,
            Side::Tails => Side::Heads,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Heads => write!(f, "Heads"),
            Side::Tails => write!(f, "Tails"),
        }
    }
}

/// Attempt to parse a string into a Side (case-insensitive).
impl std::str::FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "heads" | "head" | "h" => Ok(Side::Heads),
            "tails" | "tail" | "t" => Ok(Side::Tails),
            _ => Err(anyhow::anyhow!("Unknown side: {s}")),
        }
    }
}

/// Stake tier. `Elevated` is the "God Mode" toggle of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeMode {
    #[default]
    Normal,
    #[serde(alias = "god")]
    Elevated,
}

impl StakeMode {
    /// The other tier.
    pub fn toggled(&self) -> Self {
        match self {
            StakeMode::Normal => StakeMode::Elevated,
            StakeMode::Elevated => StakeMode::Normal,
        }
    }
}

impl fmt::Display for StakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakeMode::Normal => write!(f, "Normal"),
            StakeMode::Elevated => write!(f, "Elevated"),
        }
    }
}

impl std::str::FromStr for StakeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(StakeMode::Normal),
            "elevated" | "god" | "god_mode" | "godmode" => Ok(StakeMode::Elevated),
            _ => Err(anyhow::anyhow!("Unknown stake mode: {s}")),
        }
    }
}

/// Outcome of a resolved bet from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetOutcome {
    Win,
    Loss,
}

impl fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetOutcome::Win => write!(f, "Win"),
            BetOutcome::Loss => write!(f, "Loss"),
        }
    }
}

/// Where a session sits in its bet cycle.
///
/// `Resolved` is never observable: resolution returns the session to
/// `Idle` in the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    StakeSelected,
    SideSelected,
    Flipping,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::StakeSelected => write!(f, "stake selected"),
            SessionPhase::SideSelected => write!(f, "side selected"),
            SessionPhase::Flipping => write!(f, "flipping"),
        }
    }
}

// ---------------------------------------------------------------------------
// Stake tiers
// ---------------------------------------------------------------------------

/// Permitted stakes for each mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeTiers {
    pub normal: Vec<Decimal>,
    pub elevated: Vec<Decimal>,
}

impl Default for StakeTiers {
    fn default() -> Self {
        Self {
            normal: vec![dec!(0.05), dec!(0.1), dec!(0.25), dec!(0.5), dec!(1.0), dec!(2)],
            elevated: vec![dec!(10), dec!(20)],
        }
    }
}

impl StakeTiers {
    /// The stake set offered in `mode`.
    pub fn for_mode(&self, mode: StakeMode) -> &[Decimal] {
        match mode {
            StakeMode::Normal => &self.normal,
            StakeMode::Elevated => &self.elevated,
        }
    }

    /// Whether `stake` is offered in `mode`. Compares by value, so
    /// `1.0` and `1` are the same stake.
    pub fn allows(&self, mode: StakeMode, stake: Decimal) -> bool {
        self.for_mode(mode).iter().any(|s| *s == stake)
    }
}

// ---------------------------------------------------------------------------
// Bet records
// ---------------------------------------------------------------------------

/// One resolved bet, as appended to the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    /// 1-based position in the session history.
    pub sequence: u64,
    /// The side the player called.
    pub side: Side,
    pub stake: Decimal,
    /// The face the coin landed on.
    pub result: Side,
    pub outcome: BetOutcome,
    /// Signed balance change: `+stake` on a win, `-stake` on a loss.
    pub delta: Decimal,
    pub balance_after: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Renders the fixed history line, e.g. `Heads (0.25): Win +0.25`.
impl fmt::Display for BetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.delta.is_sign_negative() { "-" } else { "+" };
        write!(
            f,
            "{} ({}): {} {sign}{}",
            self.side,
            self.stake.normalize(),
            self.outcome,
            self.delta.abs().normalize(),
        )
    }
}

impl BetRecord {
    pub fn is_win(&self) -> bool {
        self.outcome == BetOutcome::Win
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a bet cannot be resolved right now.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BetStateProblem {
    #[error("no stake selected")]
    MissingStake,

    #[error("no side selected")]
    MissingSide,

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("balance {balance} cannot absorb a win of {stake}")]
    BalanceLimit { balance: Decimal, stake: Decimal },
}

/// Session errors. All are recoverable and leave the session unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Stake {stake} is not offered in {mode} mode")]
    InvalidStake { stake: Decimal, mode: StakeMode },

    #[error("Select a stake before choosing a side")]
    NoStakeSelected,

    #[error("Please select a valid bet and option, or reload more balance ({0})")]
    InvalidBetState(BetStateProblem),

    #[error("Session is busy flipping")]
    SessionBusy,

    #[error("A flip is already in progress")]
    FlightInProgress,

    #[error("Flight ticket does not match the outstanding flip")]
    UnknownFlight,

    #[error("Top-up amount must be positive and fit the balance, got {0}")]
    InvalidAmount(Decimal),
}

impl SessionError {
    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::InvalidStake { .. } => "invalid_stake",
            SessionError::NoStakeSelected => "no_stake_selected",
            SessionError::InvalidBetState(_) => "invalid_bet_state",
            SessionError::SessionBusy => "session_busy",
            SessionError::FlightInProgress => "flight_in_progress",
            SessionError::UnknownFlight => "unknown_flight",
            SessionError::InvalidAmount(_) => "invalid_amount",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
