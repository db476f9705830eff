//! Error types for TraderDNA Core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Report assembly failed: {0}")]
    Assembly(String),
}

impl AnalysisError {
    /// Stable machine-readable code, used by batch callers.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::InsufficientData(_) => "INSUFFICIENT_DATA",
            AnalysisError::Validation(_) => "VALIDATION_ERROR",
            AnalysisError::Assembly(_) => "ASSEMBLY_ERROR",
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// An analysis failure scoped to a single wallet.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("wallet {wallet}: {source}")]
pub struct WalletError {
    pub wallet: String,
    #[source]
    pub source: AnalysisError,
}

impl WalletError {
    pub fn new(wallet: impl Into<String>, source: AnalysisError) -> Self {
        Self {
            wallet: wallet.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        self.source.code()
    }
}
