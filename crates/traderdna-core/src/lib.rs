//! # TraderDNA Core
//!
//! Wallet skill analysis engine. Separates a wallet's genuine trading skill
//! (alpha) from passive market exposure (beta), and detects whether its
//! success is concentrated, decaying, or statistically fragile.
//!
//! The engine is pure and synchronous: callers hand it a trade ledger and a
//! benchmark return series, and get back one immutable [`WalletReport`].

pub mod alpha_beta;
pub mod assessment;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod models;
pub mod profile;
pub mod report;
pub mod returns;
pub mod risk;
pub mod tags;
pub mod time_decay;

mod stats;

pub use assessment::*;
pub use config::*;
pub use engine::Engine;
pub use error::*;
pub use models::*;
pub use report::{ReportAssembler, WalletReport};
pub use time_decay::TimeDecayResult;
