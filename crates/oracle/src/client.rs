//! Oracle HTTP client.
//!
//! Classification is a job flow: submit names → poll status → fetch results.
//! Duplicate judgment is a single request per pair.

use std::thread;
use std::time::{Duration, Instant};

use payeekit_core::{CallError, CancelToken};
use payeekit_dedup::JudgeVerdict;
use payeekit_recon::ClassificationResult;

use crate::wire::{
    JobResultsResponse, JobStatus, JobStatusResponse, JudgeRequest, JudgeResponse,
    SubmitJobRequest, SubmitJobResponse,
};

/// Oracle API client (blocking).
#[derive(Clone)]
pub struct OracleClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    options: OracleOptions,
    cancel: CancelToken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleOptions {
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Upper bound on waiting for one job to reach a terminal status.
    pub max_wait: Duration,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(3600),
        }
    }
}

/// Error type for oracle operations.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleError {
    /// No API key configured
    NotConfigured,
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
    /// Job reached a terminal status other than `done`
    JobFailed { job_id: String, status: JobStatus },
    /// Job did not finish within `max_wait`
    Timeout(Duration),
    /// The caller's token was cancelled while polling
    Cancelled,
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::NotConfigured => write!(f, "Oracle API key not configured"),
            OracleError::Network(msg) => write!(f, "Network error: {}", msg),
            OracleError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            OracleError::Parse(msg) => write!(f, "Parse error: {}", msg),
            OracleError::JobFailed { job_id, status } => {
                write!(f, "Job {} ended with status '{}'", job_id, status.as_str())
            }
            OracleError::Timeout(d) => {
                write!(f, "Timeout: job did not complete within {}s", d.as_secs())
            }
            OracleError::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::error::Error for OracleError {}

impl From<OracleError> for CallError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Network(_) => CallError::Transport(err.to_string()),
            OracleError::Http(code, _) if code == 429 || code >= 500 => {
                CallError::Transport(err.to_string())
            }
            OracleError::JobFailed {
                status: JobStatus::Expired,
                ..
            } => CallError::Transport(err.to_string()),
            OracleError::Timeout(d) => CallError::Timeout(d),
            OracleError::Cancelled => CallError::Cancelled,
            OracleError::NotConfigured
            | OracleError::Http(..)
            | OracleError::Parse(_)
            | OracleError::JobFailed { .. } => CallError::Rejected(err.to_string()),
        }
    }
}

impl OracleClient {
    /// Create a client for `api_base` (no trailing slash needed).
    pub fn new(api_base: &str, api_key: &str, options: OracleOptions) -> Result<Self, OracleError> {
        if api_key.trim().is_empty() {
            return Err(OracleError::NotConfigured);
        }
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("payee/{}", env!("CARGO_PKG_VERSION")))
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            options,
            cancel: CancelToken::new(),
        })
    }

    /// Observe `cancel` while polling; a cancelled poll also cancels the job server-side.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &OracleOptions {
        &self.options
    }

    /// Classify `names` end to end. Results are in input order.
    pub fn classify_blocking(&self, names: &[String]) -> Result<Vec<ClassificationResult>, OracleError> {
        self.classify_until(names, &CancelToken::new())
    }

    /// Like [`classify_blocking`](Self::classify_blocking), but also stops (and
    /// cancels the job server-side) once `abort` is cancelled.
    pub fn classify_until(
        &self,
        names: &[String],
        abort: &CancelToken,
    ) -> Result<Vec<ClassificationResult>, OracleError> {
        let job_id = self.submit_job(names)?;
        log::info!("oracle job {job_id} submitted with {} names", names.len());
        self.wait_for_job_until(&job_id, abort)?;
        let results = self.fetch_results(&job_id)?;
        log::info!("oracle job {job_id} returned {} results", results.len());
        Ok(results)
    }

    /// Submit a classification job. Returns the job id.
    pub fn submit_job(&self, names: &[String]) -> Result<String, OracleError> {
        let url = format!("{}/v1/classify/jobs", self.api_base);
        let resp = self.post_json(&url, &SubmitJobRequest { names })?;
        let body: SubmitJobResponse = resp.json().map_err(|e| OracleError::Parse(e.to_string()))?;
        Ok(body.job_id)
    }

    /// Current status of a job.
    pub fn job_status(&self, job_id: &str) -> Result<JobStatus, OracleError> {
        let url = format!("{}/v1/classify/jobs/{}", self.api_base, job_id);
        let resp = self.get(&url)?;
        let body: JobStatusResponse = resp.json().map_err(|e| OracleError::Parse(e.to_string()))?;
        if let (Some(done), Some(total)) = (body.processed, body.total) {
            log::debug!("oracle job {job_id}: {} ({done}/{total})", body.status.as_str());
        } else {
            log::debug!("oracle job {job_id}: {}", body.status.as_str());
        }
        Ok(body.status)
    }

    /// Poll until the job is `done`, fails, or `max_wait` elapses.
    pub fn wait_for_job(&self, job_id: &str) -> Result<(), OracleError> {
        self.wait_for_job_until(job_id, &CancelToken::new())
    }

    fn wait_for_job_until(&self, job_id: &str, abort: &CancelToken) -> Result<(), OracleError> {
        let start = Instant::now();
        loop {
            if self.cancel.is_cancelled() || abort.is_cancelled() {
                log::info!("oracle job {job_id} abandoned, cancelling");
                self.cancel_job(job_id);
                return Err(OracleError::Cancelled);
            }
            if start.elapsed() > self.options.max_wait {
                self.cancel_job(job_id);
                return Err(OracleError::Timeout(self.options.max_wait));
            }

            match self.job_status(job_id)? {
                JobStatus::Done => return Ok(()),
                status if status.is_terminal() => {
                    return Err(OracleError::JobFailed {
                        job_id: job_id.to_string(),
                        status,
                    });
                }
                _ => {}
            }

            thread::sleep(self.options.poll_interval);
        }
    }

    /// Fetch the results of a finished job.
    pub fn fetch_results(&self, job_id: &str) -> Result<Vec<ClassificationResult>, OracleError> {
        let url = format!("{}/v1/classify/jobs/{}/results", self.api_base, job_id);
        let resp = self.get(&url)?;
        let body: JobResultsResponse = resp.json().map_err(|e| OracleError::Parse(e.to_string()))?;
        Ok(body.results.into_iter().map(|r| r.into_result()).collect())
    }

    /// Best-effort server-side cancellation.
    pub fn cancel_job(&self, job_id: &str) {
        let url = format!("{}/v1/classify/jobs/{}/cancel", self.api_base, job_id);
        if let Err(e) = self.post_json(&url, &serde_json::json!({})) {
            log::warn!("could not cancel oracle job {job_id}: {e}");
        }
    }

    /// Ask the judge whether two raw names denote the same entity.
    pub fn judge_blocking(&self, name_a: &str, name_b: &str) -> Result<JudgeVerdict, OracleError> {
        let url = format!("{}/v1/duplicates/judge", self.api_base);
        let resp = self.post_json(&url, &JudgeRequest { name_a, name_b })?;
        resp.json::<JudgeResponse>().map_err(|e| OracleError::Parse(e.to_string()))
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, OracleError> {
        let response = self.http.get(url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| OracleError::Network(e.to_string()))?;
        check_status(response)
    }

    fn post_json<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<reqwest::blocking::Response, OracleError> {
        let response = self.http.post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| OracleError::Network(e.to_string()))?;
        check_status(response)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, OracleError> {
    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().unwrap_or_default();
        return Err(OracleError::Http(status, body));
    }
    Ok(response)
}
