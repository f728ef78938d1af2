//! The participant capability trait.

use async_trait::async_trait;

use crate::error::ParticipantError;
use crate::protocol::{AbortRequest, CommitRequest, PrepareRequest, PrepareResponse, StepRequest};

/// A downstream transaction participant.
///
/// The first three operations form the 2PC capability set, the last
/// three the TCC/saga set. The same service exposes both; the
/// coordinator only ever uses one set per transaction.
#[async_trait]
pub trait ParticipantClient: Send + Sync {
    /// The participant name used in logs and the coordinator log
    /// (`inventory`, `payment`, `shipping`).
    fn name(&self) -> &str;

    /// Phase-1 vote request. An error return is a NO vote.
    async fn prepare(&self, req: &PrepareRequest) -> Result<PrepareResponse, ParticipantError>;

    /// Phase-2 commit.
    async fn commit(&self, req: &CommitRequest) -> Result<(), ParticipantError>;

    /// Phase-2 abort. Callers treat failures as best-effort.
    async fn abort(&self, req: &AbortRequest) -> Result<(), ParticipantError>;

    /// TCC Try: reserve resources for the step.
    async fn try_step(&self, req: &StepRequest) -> Result<(), ParticipantError>;

    /// TCC Confirm: finalize a successful Try.
    async fn confirm(&self, req: &StepRequest) -> Result<(), ParticipantError>;

    /// TCC Cancel: release a successful Try. Callers treat failures as
    /// best-effort.
    async fn cancel(&self, req: &StepRequest) -> Result<(), ParticipantError>;
}
