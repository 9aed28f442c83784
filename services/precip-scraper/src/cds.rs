//! Climate data store client.
//!
//! A retrieval is an asynchronous job: submit the request, poll the job until
//! it settles, then download the result asset.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use aggregation::request::DATASET;
use aggregation::{GridRequest, GridRetriever, RetrievalError};

use crate::config::CdsConfig;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobState {
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: JobState,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
}

/// Retrieves grid files from the climate data store.
pub struct CdsClient {
    client: Client,
    config: CdsConfig,
}

impl CdsClient {
    pub fn new(config: CdsConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn execution_url(&self) -> String {
        format!(
            "{}/retrieve/v1/processes/{}/execution",
            self.base_url(),
            DATASET
        )
    }

    fn job_url(&self, id: &str) -> String {
        format!("{}/retrieve/v1/jobs/{}", self.base_url(), id)
    }

    fn results_url(&self, id: &str) -> String {
        format!("{}/results", self.job_url(id))
    }

    async fn submit(&self, request: &GridRequest) -> Result<String, RetrievalError> {
        let response = self
            .client
            .post(self.execution_url())
            .header(TOKEN_HEADER, &self.config.key)
            .json(&serde_json::json!({ "inputs": request }))
            .send()
            .await
            .map_err(transport)?;
        let job: JobStatus = check_status(response)?.json().await.map_err(response_error)?;
        info!(job = %job.job_id, status = ?job.status, "Submitted retrieval job");
        Ok(job.job_id)
    }

    /// Poll until the job succeeds, fails or polling is exhausted.
    async fn wait(&self, id: &str) -> Result<(), RetrievalError> {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        for poll in 1..=self.config.max_polls {
            let response = self
                .client
                .get(self.job_url(id))
                .header(TOKEN_HEADER, &self.config.key)
                .send()
                .await
                .map_err(transport)?;
            let job: JobStatus = check_status(response)?.json().await.map_err(response_error)?;

            match job.status {
                JobState::Successful => return Ok(()),
                JobState::Failed | JobState::Dismissed | JobState::Rejected => {
                    return Err(RetrievalError::JobFailed {
                        id: id.to_string(),
                        reason: job
                            .message
                            .unwrap_or_else(|| format!("{:?}", job.status).to_lowercase()),
                    });
                }
                JobState::Accepted | JobState::Running | JobState::Unknown => {
                    debug!(job = id, poll = poll, status = ?job.status, "Job not finished");
                    tokio::time::sleep(interval).await;
                }
            }
        }
        Err(RetrievalError::Timeout {
            id: id.to_string(),
            polls: self.config.max_polls,
        })
    }

    async fn asset_href(&self, id: &str) -> Result<String, RetrievalError> {
        let response = self
            .client
            .get(self.results_url(id))
            .header(TOKEN_HEADER, &self.config.key)
            .send()
            .await
            .map_err(transport)?;
        let results: JobResults = check_status(response)?.json().await.map_err(response_error)?;
        Ok(results.asset.value.href)
    }

    /// Stream `href` to a `.partial` file next to `target`, then move it into place.
    async fn download(&self, href: &str, target: &Path) -> Result<u64, RetrievalError> {
        let response = self.client.get(href).send().await.map_err(transport)?;
        let response = check_status(response)?;

        let partial = target.with_extension("partial");
        let mut file = fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        fs::rename(&partial, target).await?;
        Ok(written)
    }
}

#[async_trait]
impl GridRetriever for CdsClient {
    #[instrument(skip(self, request, target), fields(year = request.year(), months = ?request.months()))]
    async fn retrieve(&self, request: &GridRequest, target: &Path) -> Result<(), RetrievalError> {
        let id = self.submit(request).await?;
        self.wait(&id).await?;
        let href = self.asset_href(&id).await?;
        let bytes = self.download(&href, target).await?;
        info!(job = %id, bytes = bytes, path = %target.display(), "Downloaded grid file");
        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response, RetrievalError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RetrievalError::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

fn transport(e: reqwest::Error) -> RetrievalError {
    RetrievalError::Transport(e.to_string())
}

fn response_error(e: reqwest::Error) -> RetrievalError {
    RetrievalError::Response(e.to_string())
}
