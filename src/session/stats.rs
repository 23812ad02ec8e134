//! Session statistics derived from the bet history.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::types::{BetOutcome, BetRecord};

/// Aggregate figures for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub bets: u64,
    pub wins: u64,
    pub losses: u64,
    /// Fraction of bets won (0.0–1.0). 0.0 when no bets.
    pub win_rate: f64,
    /// Sum of all signed deltas.
    pub net_pnl: Decimal,
    pub total_wagered: Decimal,
    pub peak_balance: Decimal,
    pub longest_win_streak: u32,
    pub longest_loss_streak: u32,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bets={} (W{}/L{}) | win_rate={:.1}% | pnl={} | wagered={} | peak={}",
            self.bets,
            self.wins,
            self.losses,
            self.win_rate * 100.0,
            self.net_pnl.normalize(),
            self.total_wagered.normalize(),
            self.peak_balance.normalize(),
        )
    }
}

impl SessionStats {
    /// Fold the history into stats. `peak_balance` is tracked by the
    /// session itself since top-ups move the balance outside of bets.
    pub fn compute(history: &[BetRecord], peak_balance: Decimal) -> Self {
        let mut wins = 0u64;
        let mut losses = 0u64;
        let mut net_pnl = Decimal::ZERO;
        let mut total_wagered = Decimal::ZERO;
        let mut longest_win_streak = 0u32;
        let mut longest_loss_streak = 0u32;
        let mut run = 0u32;
        let mut last: Option<BetOutcome> = None;

        for record in history {
            net_pnl += record.delta;
            total_wagered += record.stake;

            run = if last == Some(record.outcome) { run + 1 } else { 1 };
            last = Some(record.outcome);

            match record.outcome {
                BetOutcome::Win => {
                    wins += 1;
                    longest_win_streak = longest_win_streak.max(run);
                }
                BetOutcome::Loss => {
                    losses += 1;
                    longest_loss_streak = longest_loss_streak.max(run);
                }
            }
        }

        let bets = wins + losses;
        let win_rate = if bets == 0 {
            0.0
        } else {
            wins as f64 / bets as f64
        };

        Self {
            bets,
            wins,
            losses,
            win_rate,
            net_pnl,
            total_wagered,
            peak_balance,
            longest_win_streak,
            longest_loss_streak,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
