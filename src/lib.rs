//! COINFLIP: coin-flip betting session engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod coin;
pub mod config;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;
