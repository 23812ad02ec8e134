//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section is optional; missing values fall back to the widget's
//! defaults (100 token balance, 1 second spin, standard stake tiers).

use anyhow::{ensure, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::{StakeMode, StakeTiers};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub stakes: StakeTiers,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub initial_balance: Decimal,
    /// Presentation-only delay between starting and resolving a flip.
    pub spin_delay_ms: u64,
    /// Drop a pending stake that the new mode does not offer.
    pub clear_stake_on_mode_change: bool,
    /// Seed for a reproducible coin. Unset means thread RNG.
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(100),
            spin_delay_ms: 1000,
            clear_stake_on_mode_change: false,
            rng_seed: None,
        }
    }
}

impl SessionConfig {
    pub fn spin_delay(&self) -> Duration {
        Duration::from_millis(self.spin_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject stake tiers a session could never bet from.
    pub fn validate(&self) -> Result<()> {
        for mode in [StakeMode::Normal, StakeMode::Elevated] {
            let stakes = self.stakes.for_mode(mode);
            ensure!(!stakes.is_empty(), "{mode} stake tier is empty");
            ensure!(
                stakes.iter().all(|s| *s > Decimal::ZERO),
                "{mode} stake tier contains a non-positive stake"
            );
        }
        Ok(())
    }
}
