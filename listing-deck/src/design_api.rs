//! # Design host client
//!
//! [`DesignApiClient`] connects the core pipeline to a REST design host. It
//! implements the three host-facing collaborator traits from
//! [`listing_deck_core::contract`]:
//!
//! - [`ContextProvider`]: `GET /v1/context` (`204` means no active design).
//! - [`DocumentComposer`]: `POST /v1/designs/{design_id}/pages`.
//! - [`ExportRequester`]: `POST /v1/exports`, then `GET /v1/exports/{id}`
//!   polled until the job reaches `success` or `failed`.
//!
//! Every request carries `Authorization: Bearer <token>`. Polling has no
//! upper bound of its own; the export coordinator in the core bounds the wait.

use async_trait::async_trait;
use listing_deck_core::contract::{
    ContextProvider, DocumentComposer, ExportOutcome, ExportRequest, ExportRequester, NewPage,
    PageContext,
};
use listing_deck_core::error::HostError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

pub struct DesignApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    design_id: Option<String>,
    poll_interval: Duration,
}

#[derive(Debug, Serialize)]
struct PageBody<'a> {
    title: &'a str,
    elements: Vec<ElementBody<'a>>,
}

#[derive(Debug, Serialize)]
struct ElementBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data_url: &'a str,
    alt_text: Option<&'a str>,
    top: i32,
    left: i32,
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct ExportBody<'a> {
    design_id: &'a str,
    accepted_file_types: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    design_id: String,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    job: ExportJob,
}

#[derive(Debug, Deserialize)]
struct ExportJob {
    id: String,
    status: String,
    #[serde(default)]
    urls: Vec<String>,
    #[serde(default)]
    error: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ExportJob {
    /// `None` while the job is still running.
    fn outcome(self) -> Option<ExportOutcome> {
        match self.status.as_str() {
            "success" => Some(ExportOutcome::Completed {
                bundle_urls: self.urls,
            }),
            "failed" => {
                let reason = self
                    .error
                    .and_then(|e| e.message.or(e.code))
                    .unwrap_or_else(|| "export job failed".to_string());
                Some(ExportOutcome::Failed { reason })
            }
            _ => None,
        }
    }
}

impl DesignApiClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        design_id: Option<String>,
        poll_interval: Duration,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        info!(
            base_url = %base_url,
            pinned_design = ?design_id,
            timeout_secs = request_timeout.as_secs(),
            "Initialised design API client"
        );
        Ok(Self {
            client,
            base_url,
            token: token.into(),
            design_id,
            poll_interval,
        })
    }

    /// The underlying HTTP client, for sharing with an asset fetcher. It
    /// carries the per-request timeout.
    pub fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn target_design(&self) -> Result<String, HostError> {
        match self.current_context().await? {
            Some(ctx) => Ok(ctx.design_id),
            None => Err("no active design to act on".into()),
        }
    }

    async fn fetch_job(&self, job_id: &str) -> Result<ExportJob, HostError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/exports/{job_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = check_status(response, "export job status").await?;
        Ok(response.json::<JobResponse>().await?.job)
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response, HostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(status = %status, body = %body, "Design API rejected {what}");
    Err(format!("{what} failed with HTTP {status}: {body}").into())
}

#[async_trait]
impl ContextProvider for DesignApiClient {
    async fn current_context(&self) -> Result<Option<PageContext>, HostError> {
        if let Some(design_id) = &self.design_id {
            return Ok(Some(PageContext {
                design_id: design_id.clone(),
            }));
        }

        let response = self
            .client
            .get(self.url("/v1/context"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            info!("Design host reports no active design");
            return Ok(None);
        }
        let response = check_status(response, "context query").await?;
        let ctx: ContextResponse = response.json().await?;
        debug!(design_id = %ctx.design_id, "Resolved active design");
        Ok(Some(PageContext {
            design_id: ctx.design_id,
        }))
    }
}

#[async_trait]
impl DocumentComposer for DesignApiClient {
    async fn insert_page(&self, page: NewPage) -> Result<(), HostError> {
        let design_id = self.target_design().await?;
        let body = PageBody {
            title: &page.title,
            elements: page
                .elements
                .iter()
                .map(|el| ElementBody {
                    kind: "image",
                    data_url: &el.source,
                    alt_text: el.alt_text.as_deref(),
                    top: el.position.top,
                    left: el.position.left,
                    width: el.size.width,
                    height: el.size.height,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.url(&format!("/v1/designs/{design_id}/pages")))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check_status(response, "page insertion").await?;
        info!(design_id = %design_id, title = %page.title, "Inserted page");
        Ok(())
    }
}

#[async_trait]
impl ExportRequester for DesignApiClient {
    async fn request_export(&self, request: ExportRequest) -> Result<ExportOutcome, HostError> {
        let design_id = self.target_design().await?;
        let body = ExportBody {
            design_id: &design_id,
            accepted_file_types: request.accepted_file_types.iter().map(|t| t.as_str()).collect(),
        };

        let response = self
            .client
            .post(self.url("/v1/exports"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "export request").await?;
        let mut job = response.json::<JobResponse>().await?.job;
        info!(design_id = %design_id, job_id = %job.id, status = %job.status, "Export job created");

        loop {
            let job_id = job.id.clone();
            if let Some(outcome) = job.outcome() {
                info!(job_id = %job_id, outcome = ?outcome, "Export job finished");
                return Ok(outcome);
            }
            tokio::time::sleep(self.poll_interval).await;
            job = self.fetch_job(&job_id).await?;
            debug!(job_id = %job.id, status = %job.status, "Polled export job");
        }
    }
}
