//! Clients for the downstream transaction participants.
//!
//! Each participant (inventory, payment, shipping) exposes two capability
//! sets over HTTP: `/2pc/{prepare,commit,abort}` for two-phase commit and
//! `/tcc/{try,confirm,cancel}` for Try/Confirm/Cancel and sagas. The
//! [`ParticipantClient`] trait abstracts both; [`HttpParticipant`] is the
//! production variant, [`MockParticipant`] the call-recording test double.

pub mod client;
pub mod error;
pub mod http;
pub mod mock;
pub mod protocol;

pub use client::ParticipantClient;
pub use error::ParticipantError;
pub use http::HttpParticipant;
pub use mock::{CallJournal, MockParticipant, RecordedCall};
pub use protocol::{
    AbortRequest, CommitRequest, PrepareRequest, PrepareResponse, StepRequest, steps,
};
