//! In-memory participant for tests.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::client::ParticipantClient;
use crate::error::ParticipantError;
use crate::protocol::{AbortRequest, CommitRequest, PrepareRequest, PrepareResponse, StepRequest};

/// One operation observed by a [`MockParticipant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Prepare,
    Commit,
    Abort,
    Try { step: String },
    Confirm { step: String },
    Cancel { step: String },
}

/// A shared, ordered record of calls across several participants.
/// Lets tests assert cross-participant ordering, e.g. that
/// compensations run in strict reverse of the successful prefix.
pub type CallJournal = Arc<RwLock<Vec<(String, RecordedCall)>>>;

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    fail_on_prepare: bool,
    fail_on_commit: bool,
    fail_on_try: bool,
    fail_on_confirm: bool,
    fail_on_cancel: bool,
    vote_no: bool,
}

/// In-memory participant that records every call and can be told to
/// fail any operation.
#[derive(Debug, Clone)]
pub struct MockParticipant {
    name: String,
    state: Arc<RwLock<MockState>>,
    journal: Option<CallJournal>,
}

impl MockParticipant {
    /// Creates a participant that succeeds on every operation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(MockState::default())),
            journal: None,
        }
    }

    /// Creates a participant that additionally records into a journal
    /// shared with other participants.
    pub fn with_journal(name: impl Into<String>, journal: CallJournal) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(MockState::default())),
            journal: Some(journal),
        }
    }

    fn record(&self, call: RecordedCall) {
        if let Some(journal) = &self.journal {
            journal.write().unwrap().push((self.name.clone(), call.clone()));
        }
        self.state.write().unwrap().calls.push(call);
    }

    pub fn set_fail_on_prepare(&self, fail: bool) {
        self.state.write().unwrap().fail_on_prepare = fail;
    }

    pub fn set_fail_on_commit(&self, fail: bool) {
        self.state.write().unwrap().fail_on_commit = fail;
    }

    pub fn set_fail_on_try(&self, fail: bool) {
        self.state.write().unwrap().fail_on_try = fail;
    }

    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm = fail;
    }

    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Makes `prepare` answer 2xx with an explicit NO vote instead of
    /// an error status.
    pub fn set_vote_no(&self, vote_no: bool) {
        self.state.write().unwrap().vote_no = vote_no;
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().unwrap().calls.clone()
    }

    /// Number of calls matching a predicate.
    pub fn count(&self, pred: impl Fn(&RecordedCall) -> bool) -> usize {
        self.state.read().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    fn status_error(&self) -> ParticipantError {
        ParticipantError::Status {
            participant: self.name.clone(),
            status: 500,
        }
    }
}

#[async_trait]
impl ParticipantClient for MockParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self, _req: &PrepareRequest) -> Result<PrepareResponse, ParticipantError> {
        self.record(RecordedCall::Prepare);
        let state = self.state.read().unwrap();
        if state.fail_on_prepare {
            return Err(self.status_error());
        }
        if state.vote_no {
            return Err(ParticipantError::VoteNo {
                participant: self.name.clone(),
                reason: "declined".to_string(),
            });
        }
        Ok(PrepareResponse::default())
    }

    async fn commit(&self, _req: &CommitRequest) -> Result<(), ParticipantError> {
        self.record(RecordedCall::Commit);
        if self.state.read().unwrap().fail_on_commit {
            return Err(self.status_error());
        }
        Ok(())
    }

    async fn abort(&self, _req: &AbortRequest) -> Result<(), ParticipantError> {
        self.record(RecordedCall::Abort);
        Ok(())
    }

    async fn try_step(&self, req: &StepRequest) -> Result<(), ParticipantError> {
        self.record(RecordedCall::Try {
            step: req.step.clone(),
        });
        if self.state.read().unwrap().fail_on_try {
            return Err(self.status_error());
        }
        Ok(())
    }

    async fn confirm(&self, req: &StepRequest) -> Result<(), ParticipantError> {
        self.record(RecordedCall::Confirm {
            step: req.step.clone(),
        });
        if self.state.read().unwrap().fail_on_confirm {
            return Err(self.status_error());
        }
        Ok(())
    }

    async fn cancel(&self, req: &StepRequest) -> Result<(), ParticipantError> {
        self.record(RecordedCall::Cancel {
            step: req.step.clone(),
        });
        if self.state.read().unwrap().fail_on_cancel {
            return Err(self.status_error());
        }
        Ok(())
    }
}
