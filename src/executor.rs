use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION};
use reqwest::{redirect, Client};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::types::{ProbeOutcome, ProbeStatus, ScanConfig, Target, UploadOutcome, UploadStatus};

const PROBE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml";
const MAX_REDIRECTS: usize = 10;

/// Performs the network work for one task. Implementations must classify every
/// request failure into an outcome; an `Err` from `probe` means the task itself broke.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Check every candidate path on `target`, sequentially, in catalog order.
    async fn probe(&self, target: &Target, paths: &[String]) -> Result<Vec<ProbeOutcome>>;

    /// Submit `file` to `url` exactly once.
    async fn upload(&self, url: &str, file: &Path) -> UploadOutcome;
}

/// `reqwest`-backed executor. Cheap to clone; all clones share one client.
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(config.user_agent())
            .default_headers(headers)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }

    async fn probe_one(&self, target: &Target, path: &str) -> ProbeOutcome {
        let url = target.join(path);
        let start = Instant::now();
        let res = self
            .client
            .get(&url)
            .header(ACCEPT, PROBE_ACCEPT)
            .send()
            .await;
        let latency_ms = elapsed_ms(start.elapsed());

        let (status, code, message) = match res {
            Ok(resp) if resp.status().as_u16() == 200 => (
                ProbeStatus::Found,
                Some(200),
                format!("Upload form found at: {url}"),
            ),
            Ok(resp) => {
                let code = resp.status().as_u16();
                (
                    ProbeStatus::NotFound,
                    Some(code),
                    format!("Upload form not found (Status: {code}): {url}"),
                )
            }
            Err(e) => (
                ProbeStatus::Error,
                None,
                format!("Error checking {url}: {}", error_chain(&e)),
            ),
        };
        debug!(%url, status = status.as_str(), ?code, latency_ms, "probe finished");

        ProbeOutcome {
            target: target.clone(),
            path: path.to_string(),
            status,
            code,
            latency_ms,
            message,
        }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn probe(&self, target: &Target, paths: &[String]) -> Result<Vec<ProbeOutcome>> {
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            out.push(self.probe_one(target, path).await);
        }
        Ok(out)
    }

    async fn upload(&self, url: &str, file: &Path) -> UploadOutcome {
        let start = Instant::now();
        let failed = |message: String, start: Instant| UploadOutcome {
            url: url.to_string(),
            status: UploadStatus::UploadError,
            code: None,
            latency_ms: elapsed_ms(start.elapsed()),
            message,
        };

        let bytes = match tokio::fs::read(file).await {
            Ok(b) => b,
            Err(e) => {
                warn!(file = %file.display(), "cannot read upload file: {e}");
                return failed(
                    format!("Error uploading to {url}: cannot read {}: {e}", file.display()),
                    start,
                );
            }
        };

        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let mime = mime_guess::from_path(&filename).first_or_octet_stream();

        let part = match reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime.essence_str())
        {
            Ok(p) => p,
            Err(e) => {
                let message = format!("Error uploading to {url}: {}", error_chain(&e));
                return failed(message, start);
            }
        };
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self.client.post(url).multipart(form).send().await;
        let latency_ms = elapsed_ms(start.elapsed());

        let (status, code, message) = match res {
            Ok(resp) if resp.status().as_u16() == 200 => (
                UploadStatus::UploadSuccess,
                Some(200),
                format!("File uploaded successfully to: {url}"),
            ),
            Ok(resp) => {
                let code = resp.status().as_u16();
                (
                    UploadStatus::UploadFailed,
                    Some(code),
                    format!("File upload failed (Status: {code}): {url}"),
                )
            }
            Err(e) => (
                UploadStatus::UploadError,
                None,
                format!("Error uploading to {url}: {}", error_chain(&e)),
            ),
        };
        debug!(%url, status = status.as_str(), ?code, latency_ms, "upload finished");

        UploadOutcome {
            url: url.to_string(),
            status,
            code,
            latency_ms,
            message,
        }
    }
}

fn elapsed_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// `reqwest` errors hide the useful cause (refused, timed out, dns) in their source chain.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
