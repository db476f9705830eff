//! Error types for the TraderDNA command line

use thiserror::Error;
use traderdna_core::{AnalysisError, WalletError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid analysis configuration: {0}")]
    AnalysisConfig(#[from] AnalysisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request on line {line}: {source}")]
    Input {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Analysis(#[from] WalletError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Stable code written to batch output lines.
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) | CliError::AnalysisConfig(_) => "CONFIG_ERROR",
            CliError::Io(_) => "IO_ERROR",
            CliError::Input { .. } | CliError::InvalidParameter(_) => "INPUT_ERROR",
            CliError::Analysis(e) => e.code(),
            CliError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Validate a wallet identifier
pub fn validate_wallet(wallet: &str) -> Result<()> {
    if wallet.trim().is_empty() {
        return Err(CliError::InvalidParameter("Wallet address cannot be empty".into()));
    }
    if wallet.len() > 128 {
        return Err(CliError::InvalidParameter("Wallet address too long".into()));
    }
    if wallet.chars().any(char::is_whitespace) {
        return Err(CliError::InvalidParameter(
            "Wallet address cannot contain whitespace".into(),
        ));
    }
    Ok(())
}
