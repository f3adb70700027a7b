//! Audit execution: the seam over the external Lighthouse capability.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::models::job::DeviceProfile;

/// Flags passed to the Chrome instance Lighthouse launches.
const CHROME_FLAGS: &str = "--headless --disable-gpu --no-sandbox --disable-dev-shm-usage";

/// Maximum stderr characters carried into a diagnostic message.
const STDERR_SNIPPET_CHARS: usize = 2048;

/// Errors produced by an audit run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to launch audit process: {0}")]
    Launch(#[from] std::io::Error),

    #[error("audit exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("audit produced an empty report")]
    EmptyReport,
}

/// Runs a performance audit against a URL under a device profile and
/// returns the HTML report blob.
///
/// Implementations must acquire and release the underlying capability per
/// call; nothing may be shared or reused between jobs.
pub trait AuditRunner: Send + Sync + 'static {
    fn run(
        &self,
        url: &str,
        profile: DeviceProfile,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, RunnerError>> + Send;
}

/// [`AuditRunner`] backed by the `lighthouse` CLI.
///
/// Each run spawns a fresh process, which launches and reaps its own
/// headless Chrome; the report is read from stdout. There is no timeout on
/// the call: the run either completes or fails when the tool itself errors.
#[derive(Debug, Clone)]
pub struct LighthouseRunner {
    bin: PathBuf,
}

impl LighthouseRunner {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

impl AuditRunner for LighthouseRunner {
    async fn run(&self, url: &str, profile: DeviceProfile) -> Result<Vec<u8>, RunnerError> {
        tracing::info!(%url, %profile, "launching lighthouse audit");

        let (width, height, dsf) = profile.screen_emulation();
        let mobile = profile == DeviceProfile::Mobile;

        let output = Command::new(&self.bin)
            .arg(url)
            .arg("--output=html")
            .arg("--output-path=stdout")
            .arg("--only-categories=performance")
            .arg("--quiet")
            .arg(format!("--form-factor={}", profile.as_str()))
            .arg(format!("--screenEmulation.mobile={mobile}"))
            .arg(format!("--screenEmulation.width={width}"))
            .arg(format!("--screenEmulation.height={height}"))
            .arg(format!("--screenEmulation.deviceScaleFactor={dsf}"))
            .arg(format!("--emulatedUserAgent={}", profile.user_agent()))
            // Measure under actual network conditions, no simulated throttling.
            .arg("--throttling-method=provided")
            .arg(format!("--chrome-flags={CHROME_FLAGS}"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(STDERR_SNIPPET_CHARS)
                .collect();
            return Err(RunnerError::Failed {
                status: output.status,
                stderr,
            });
        }

        if output.stdout.is_empty() {
            return Err(RunnerError::EmptyReport);
        }

        tracing::info!(%url, bytes = output.stdout.len(), "lighthouse audit completed");
        Ok(output.stdout)
    }
}
