use async_trait::async_trait;
use drive_core::model::{Choice, Scenario, ScenarioId};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::{AttemptSubmission, ScenarioBackend};
use crate::auth::AuthToken;
use crate::config::BackendConfig;
use crate::error::BackendError;

/// `reqwest` implementation of [`ScenarioBackend`].
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        Ok(check_status(response)?.json().await?)
    }
}

fn check_status(response: Response) -> Result<Response, BackendError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Unauthorized),
        status => Err(BackendError::HttpStatus(status)),
    }
}

#[async_trait]
impl ScenarioBackend for HttpBackend {
    async fn list_scenarios(
        &self,
        range: Option<(ScenarioId, ScenarioId)>,
    ) -> Result<Vec<Scenario>, BackendError> {
        let mut url = self.config.endpoint("scenarios")?;
        if let Some((from, to)) = range {
            url.query_pairs_mut()
                .append_pair("id_from", &from.to_string())
                .append_pair("id_to", &to.to_string());
        }
        self.get_json(url).await
    }

    async fn list_choices(&self, scenario_id: ScenarioId) -> Result<Vec<Choice>, BackendError> {
        let primary = self
            .config
            .endpoint(&format!("scenario_choices/{scenario_id}"))?;
        match self.get_json(primary).await {
            Ok(choices) => Ok(choices),
            Err(err) => {
                tracing::warn!(%scenario_id, error = %err, "choice listing failed, trying nested route");
                let fallback = self
                    .config
                    .endpoint(&format!("scenarios/{scenario_id}/choices"))?;
                self.get_json(fallback).await
            }
        }
    }

    async fn submit_attempt(
        &self,
        token: &AuthToken,
        submission: &AttemptSubmission,
    ) -> Result<(), BackendError> {
        let url = self.config.endpoint("attempts")?;
        tracing::debug!(%url, scenario_id = %submission.scenario_id, "POST attempt");
        let response = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .json(submission)
            .send()
            .await?;
        let status = check_status(response)?.status();
        tracing::debug!(scenario_id = %submission.scenario_id, %status, "attempt accepted");
        Ok(())
    }
}
