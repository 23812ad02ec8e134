//! Coin sources.
//!
//! Defines the `CoinSource` trait, the single capability a session needs
//! from the outside world to resolve a bet, and provides implementations:
//! - `ThreadCoin`: thread-local RNG, unseeded (production default)
//! - `SeededCoin`: deterministic `StdRng`, reproducible trajectories
//! - `ScriptedCoin`: replays fixed faces, for tests and demos

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::debug;

use crate::types::Side;

/// Abstraction over the source of randomness.
///
/// One method: draw a fair boolean (p = 0.5). `true` maps to Heads.
#[cfg_attr(test, mockall::automock)]
pub trait CoinSource: Send {
    fn draw(&mut self) -> bool;
}

/// Build the coin for a configured seed: seeded when present,
/// thread RNG otherwise.
pub fn from_seed(seed: Option<u64>) -> Box<dyn CoinSource> {
    match seed {
        Some(seed) => {
            debug!(seed, "Using seeded coin");
            Box::new(SeededCoin::new(seed))
        }
        None => Box::new(ThreadCoin),
    }
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// Fair coin backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadCoin;

impl CoinSource for ThreadCoin {
    fn draw(&mut self) -> bool {
        rand::rng().random_bool(0.5)
    }
}

/// Fair coin with a fixed seed. Two coins built from the same seed
/// produce the same sequence.
#[derive(Debug, Clone)]
pub struct SeededCoin {
    rng: StdRng,
}

impl SeededCoin {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CoinSource for SeededCoin {
    fn draw(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }
}

/// Replays a queue of faces, then keeps returning `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedCoin {
    faces: VecDeque<Side>,
    fallback: Side,
}

impl ScriptedCoin {
    pub fn new(faces: impl IntoIterator<Item = Side>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            fallback: Side::Heads,
        }
    }

    /// A coin that always lands on `side`.
    pub fn always(side: Side) -> Self {
        Self {
            faces: VecDeque::new(),
            fallback: side,
        }
    }

    /// Face returned once the script runs out.
    pub fn with_fallback(mut self, side: Side) -> Self {
        self.fallback = side;
        self
    }

    /// Faces still queued.
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl CoinSource for ScriptedCoin {
    fn draw(&mut self) -> bool {
        let face = self.faces.pop_front().unwrap_or(self.fallback);
        face == Side::Heads
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
