//! Transaction discipline selection.

use std::str::FromStr;

use thiserror::Error;

/// The transaction discipline the coordinator drives after order
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    TwoPc,
    Tcc,
    SagaOrch,
    SagaChor,
    Outbox,
    None,
}

/// Raised when `TX_MODE` holds a value outside the closed set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown tx mode {0:?}, expected one of twopc|tcc|saga-orch|saga-chor|outbox|none")]
pub struct UnknownTxMode(pub String);

impl TxMode {
    /// Returns the configuration token for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxMode::TwoPc => "twopc",
            TxMode::Tcc => "tcc",
            TxMode::SagaOrch => "saga-orch",
            TxMode::SagaChor => "saga-chor",
            TxMode::Outbox => "outbox",
            TxMode::None => "none",
        }
    }
}

impl FromStr for TxMode {
    type Err = UnknownTxMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twopc" => Ok(TxMode::TwoPc),
            "tcc" => Ok(TxMode::Tcc),
            "saga-orch" => Ok(TxMode::SagaOrch),
            "saga-chor" => Ok(TxMode::SagaChor),
            "outbox" => Ok(TxMode::Outbox),
            "none" => Ok(TxMode::None),
            other => Err(UnknownTxMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for TxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
