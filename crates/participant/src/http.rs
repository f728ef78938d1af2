//! HTTP-backed participant client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::ParticipantClient;
use crate::error::ParticipantError;
use crate::protocol::{AbortRequest, CommitRequest, PrepareRequest, PrepareResponse, StepRequest};

/// A participant reached over HTTP.
///
/// One instance per configured base URL; the `reqwest` client is
/// connection-pooled and shared across requests.
#[derive(Debug, Clone)]
pub struct HttpParticipant {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpParticipant {
    /// Creates a participant client with the given per-request timeout.
    /// Trailing slashes on the base URL are trimmed.
    pub fn new(name: impl Into<String>, base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn post_json<B: Serialize, R: DeserializeOwned + Default>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ParticipantError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ParticipantError::Transport {
                participant: self.name.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParticipantError::Status {
                participant: self.name.clone(),
                status: status.as_u16(),
            });
        }

        // Participants may answer 2xx with an empty body.
        Ok(response.json::<R>().await.unwrap_or_default())
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct Empty {}

#[async_trait]
impl ParticipantClient for HttpParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    async fn prepare(&self, req: &PrepareRequest) -> Result<PrepareResponse, ParticipantError> {
        let response: PrepareResponse = self.post_json("/2pc/prepare", req).await?;
        if !response.vote_yes {
            return Err(ParticipantError::VoteNo {
                participant: self.name.clone(),
                reason: response
                    .reason
                    .clone()
                    .unwrap_or_else(|| "no reason given".to_string()),
            });
        }
        Ok(response)
    }

    async fn commit(&self, req: &CommitRequest) -> Result<(), ParticipantError> {
        self.post_json::<_, Empty>("/2pc/commit", req).await?;
        Ok(())
    }

    async fn abort(&self, req: &AbortRequest) -> Result<(), ParticipantError> {
        self.post_json::<_, Empty>("/2pc/abort", req).await?;
        Ok(())
    }

    async fn try_step(&self, req: &StepRequest) -> Result<(), ParticipantError> {
        self.post_json::<_, Empty>("/tcc/try", req).await?;
        Ok(())
    }

    async fn confirm(&self, req: &StepRequest) -> Result<(), ParticipantError> {
        self.post_json::<_, Empty>("/tcc/confirm", req).await?;
        Ok(())
    }

    async fn cancel(&self, req: &StepRequest) -> Result<(), ParticipantError> {
        self.post_json::<_, Empty>("/tcc/cancel", req).await?;
        Ok(())
    }
}
