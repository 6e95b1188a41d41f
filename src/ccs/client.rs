use std::future::Future;
use std::time::Duration;

use crate::ccs::types::{CraneDetails, Job};
use crate::error::Result;

/// Answer of the crane to a job or cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CraneReply {
    Accepted,
    Rejected { status: u16, body: String },
}

impl CraneReply {
    /// The crane acknowledges with a 2xx status or a literal `OK` body.
    pub fn from_response(status: u16, body: String) -> Self {
        if (200..300).contains(&status) || body.trim() == "OK" {
            CraneReply::Accepted
        } else {
            CraneReply::Rejected { status, body }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, CraneReply::Accepted)
    }
}

/// Outbound calls to the crane control system.
pub trait CraneEndpoint: Send + Sync + 'static {
    fn send_job(&self, job: &Job) -> impl Future<Output = Result<CraneReply>> + Send;

    fn cancel_job(&self) -> impl Future<Output = Result<CraneReply>> + Send;

    fn fetch_details(&self) -> impl Future<Output = Result<CraneDetails>> + Send;
}

/// [`CraneEndpoint`] over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpCraneClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCraneClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn reply(response: reqwest::Response) -> Result<CraneReply> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(CraneReply::from_response(status, body))
    }
}

impl CraneEndpoint for HttpCraneClient {
    async fn send_job(&self, job: &Job) -> Result<CraneReply> {
        let response = self.client.post(self.url("job")).json(job).send().await?;
        Self::reply(response).await
    }

    async fn cancel_job(&self) -> Result<CraneReply> {
        let response = self.client.post(self.url("job_cancel")).send().await?;
        Self::reply(response).await
    }

    async fn fetch_details(&self) -> Result<CraneDetails> {
        let text = self
            .client
            .get(self.url("details"))
            .send()
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&text)?)
    }
}
