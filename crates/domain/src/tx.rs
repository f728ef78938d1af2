//! Coordinator transaction log states.

use serde::{Deserialize, Serialize};

/// The status of a two-phase-commit coordinator log entry.
///
/// Transitions are linear:
/// ```text
/// STARTED ──► PREPARING ──┬──► COMMITTING ──┬──► COMMITTED
///                         │                 └──► ABORTING ──► ABORTED
///                         └──► ABORTING ──► ABORTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Started,
    Preparing,
    Committing,
    Aborting,
    Committed,
    Aborted,
}

impl TxStatus {
    /// Returns the status name as persisted and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Started => "STARTED",
            TxStatus::Preparing => "PREPARING",
            TxStatus::Committing => "COMMITTING",
            TxStatus::Aborting => "ABORTING",
            TxStatus::Committed => "COMMITTED",
            TxStatus::Aborted => "ABORTED",
        }
    }

    /// Parses a persisted status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STARTED" => Some(TxStatus::Started),
            "PREPARING" => Some(TxStatus::Preparing),
            "COMMITTING" => Some(TxStatus::Committing),
            "ABORTING" => Some(TxStatus::Aborting),
            "COMMITTED" => Some(TxStatus::Committed),
            "ABORTED" => Some(TxStatus::Aborted),
            _ => None,
        }
    }

    /// Returns true if the transaction reached a terminal decision.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Committed | TxStatus::Aborted)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for status in [
            TxStatus::Started,
            TxStatus::Preparing,
            TxStatus::Committing,
            TxStatus::Aborting,
            TxStatus::Committed,
            TxStatus::Aborted,
        ] {
            assert_eq!(TxStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TxStatus::parse("DONE"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TxStatus::Committed.is_terminal());
        assert!(TxStatus::Aborted.is_terminal());
        assert!(!TxStatus::Started.is_terminal());
        assert!(!TxStatus::Preparing.is_terminal());
        assert!(!TxStatus::Committing.is_terminal());
        assert!(!TxStatus::Aborting.is_terminal());
    }
}
