//! HTTP client for the beacon server's JSON API.

use anyhow::Context;
use serde::Deserialize;

/// A queued audit, as returned by the submission endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAudit {
    /// Identifier of the queued job.
    pub job_id: String,
    /// Server-relative URL the report will appear at. Does not exist yet.
    pub report_url: String,
}

/// Lifecycle status of a job.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatus {
    pub state: String,
    /// Report URL, present once the job has completed.
    #[serde(default)]
    pub result: Option<String>,
}

/// Thin blocking client over the server's JSON API.
pub struct ApiClient {
    base: String,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(base: String) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Joins a server-relative path (like a report URL) onto the base.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Submits an audit. Success means accepted, not completed.
    pub fn submit(&self, url: &str, profile: &str) -> anyhow::Result<QueuedAudit> {
        let response = self
            .agent
            .post(&format!("{}/audit", self.base))
            .send_json(serde_json::json!({
                "url": url,
                "deviceProfile": profile,
            }))
            .context("submitting audit")?;

        response
            .into_json()
            .context("decoding submission response")
    }

    /// Fetches the current state of a job.
    pub fn status(&self, job_id: &str) -> anyhow::Result<AuditStatus> {
        let response = self
            .agent
            .get(&format!("{}/audit-status/{}", self.base, job_id))
            .call()
            .context("fetching job status")?;

        response.into_json().context("decoding status response")
    }
}
