use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "UploadScanner/1.0";

/// A normalized, scheme-qualified host to scan (e.g. `http://example.com`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    /// Normalize a raw host or URL: default the scheme to `http://` and strip trailing slashes.
    ///
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let url = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };
        Some(Self(url.trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a candidate path to this target.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of one probe request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    Found,
    NotFound,
    Error,
}

/// Classification of one upload attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    UploadSuccess,
    UploadFailed,
    UploadError,
}

impl ProbeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeStatus::Found => "FOUND",
            ProbeStatus::NotFound => "NOT_FOUND",
            ProbeStatus::Error => "ERROR",
        }
    }
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::UploadSuccess => "UPLOAD_SUCCESS",
            UploadStatus::UploadFailed => "UPLOAD_FAILED",
            UploadStatus::UploadError => "UPLOAD_ERROR",
        }
    }
}

/// Result of checking one (target, candidate path) pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub target: Target,
    pub path: String,
    pub status: ProbeStatus,
    pub code: Option<u16>,
    pub latency_ms: u64,
    pub message: String,
}

/// Result of one file submission to a confirmed endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub url: String,
    pub status: UploadStatus,
    pub code: Option<u16>,
    pub latency_ms: u64,
    pub message: String,
}

/// A task that failed outside outcome classification (executor error or panic).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskException {
    pub url: String,
    pub message: String,
}

/// One entry of the scan result collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Probe(ProbeOutcome),
    Upload(UploadOutcome),
    Exception(TaskException),
}

impl Outcome {
    /// Target for probe and exception entries, endpoint URL for uploads.
    pub fn url(&self) -> &str {
        match self {
            Outcome::Probe(p) => p.target.as_str(),
            Outcome::Upload(u) => &u.url,
            Outcome::Exception(e) => &e.url,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Outcome::Probe(p) => Some(&p.path),
            _ => None,
        }
    }

    pub fn status_str(&self) -> &'static str {
        match self {
            Outcome::Probe(p) => p.status.as_str(),
            Outcome::Upload(u) => u.status.as_str(),
            Outcome::Exception(_) => "EXCEPTION",
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            Outcome::Probe(p) => p.code,
            Outcome::Upload(u) => u.code,
            Outcome::Exception(_) => None,
        }
    }

    /// Response time as shown to users: `0.42s`, or `N/A` for exceptions.
    pub fn elapsed_display(&self) -> String {
        let ms = match self {
            Outcome::Probe(p) => p.latency_ms,
            Outcome::Upload(u) => u.latency_ms,
            Outcome::Exception(_) => return "N/A".to_string(),
        };
        format!("{:.2}s", ms as f64 / 1000.0)
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Probe(p) => &p.message,
            Outcome::Upload(u) => &u.message,
            Outcome::Exception(e) => &e.message,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Probe(p) if p.status == ProbeStatus::Found)
    }

    /// Positive hits: found endpoints and successful uploads.
    pub fn is_hit(&self) -> bool {
        match self {
            Outcome::Probe(p) => p.status == ProbeStatus::Found,
            Outcome::Upload(u) => u.status == UploadStatus::UploadSuccess,
            Outcome::Exception(_) => false,
        }
    }

    /// Everything except FOUND, NOT_FOUND and UPLOAD_SUCCESS.
    pub fn is_error(&self) -> bool {
        match self {
            Outcome::Probe(p) => p.status == ProbeStatus::Error,
            Outcome::Upload(u) => u.status != UploadStatus::UploadSuccess,
            Outcome::Exception(_) => true,
        }
    }
}

/// Scan settings consumed by the orchestrator and the HTTP executor.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub concurrency: usize,
    pub timeout: Duration,
    pub verify_tls: bool,
    pub user_agent: Option<String>,
    pub upload_file: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(10),
            verify_tls: false,
            user_agent: None,
            upload_file: None,
        }
    }
}

impl ScanConfig {
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// Aggregate results and progress counters.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanResults {
    pub targets_total: u64,
    pub targets_done: u64,
    pub found_count: u64,
    pub started_at: String,
    pub finished_at: String,
    pub entries: Vec<Outcome>,
}
