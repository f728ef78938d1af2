use thiserror::Error;

/// Errors from participant calls. Every kind classifies as a NO vote in
/// 2PC and as a compensation trigger in TCC/saga.
#[derive(Debug, Error)]
pub enum ParticipantError {
    /// The participant answered outside the 2xx class.
    #[error("{participant} answered status {status}")]
    Status { participant: String, status: u16 },

    /// The participant explicitly voted NO on prepare.
    #[error("{participant} voted no: {reason}")]
    VoteNo { participant: String, reason: String },

    /// The request never completed (connect failure, timeout, …).
    #[error("transport error calling {participant}: {source}")]
    Transport {
        participant: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ParticipantError {
    /// The participant the failure came from.
    pub fn participant(&self) -> &str {
        match self {
            ParticipantError::Status { participant, .. }
            | ParticipantError::VoteNo { participant, .. }
            | ParticipantError::Transport { participant, .. } => participant,
        }
    }
}
