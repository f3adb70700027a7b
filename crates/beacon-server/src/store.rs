//! Filesystem-backed artifact store and deterministic locator naming.
//!
//! A locator is a pure function of the request (url, profile, submission
//! timestamp), so the submission API can hand it to clients before the
//! worker has produced anything at that name.

use std::path::{Path, PathBuf};

use crate::models::job::DeviceProfile;

/// File extension of stored reports.
pub const REPORT_EXT: &str = "html";

/// Route prefix under which reports are served.
pub const REPORTS_ROUTE: &str = "/reports";

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize_url(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Deterministic artifact filename for a submission.
///
/// Distinct submission timestamps keep repeated audits of the same URL
/// from colliding; an artifact is never overwritten.
pub fn artifact_filename(url: &str, profile: DeviceProfile, submitted_at_ms: i64) -> String {
    format!(
        "{}_{}_{}.{}",
        sanitize_url(url),
        profile.as_str(),
        submitted_at_ms,
        REPORT_EXT
    )
}

/// Server-relative URL an artifact becomes retrievable at.
pub fn report_url(filename: &str) -> String {
    format!("{REPORTS_ROUTE}/{filename}")
}

/// Directory of finished audit reports.
///
/// The worker is the sole writer; every file is written once and never
/// mutated. Readers (static serving, HEAD probes) only ever see complete
/// files because writes land under a temporary name and are renamed in.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Opens the store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path an artifact filename maps to.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Whether the artifact has been fully written.
    pub async fn exists(&self, filename: &str) -> bool {
        tokio::fs::try_exists(self.path_for(filename))
            .await
            .unwrap_or(false)
    }

    /// Writes a report blob under `filename`.
    ///
    /// The blob goes to a `.tmp` sibling first and is renamed into place,
    /// so the final name never refers to a partially written file.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let final_path = self.path_for(filename);
        let tmp_path = self.root.join(format!("{filename}.tmp"));

        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_non_alphanumerics() {
        assert_eq!(sanitize_url("https://example.com"), "https___example_com");
        assert_eq!(sanitize_url("abc123"), "abc123");
        assert_eq!(sanitize_url("a.b/c?d=e"), "a_b_c_d_e");
    }

    #[test]
    fn test_filename_matches_reference_shape() {
        let name = artifact_filename("https://example.com", DeviceProfile::Mobile, 1700000000000);
        assert!(name.ends_with("example_com_mobile_1700000000000.html"));
        assert_eq!(report_url(&name), format!("/reports/{name}"));
    }

    #[test]
    fn test_distinct_timestamps_never_collide() {
        let a = artifact_filename("https://example.com", DeviceProfile::Mobile, 1700000000000);
        let b = artifact_filename("https://example.com", DeviceProfile::Mobile, 1700000000001);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_write_then_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).await.unwrap();

        assert!(!store.exists("report.html").await);

        let path = store.write("report.html", b"<html>ok</html>").await.unwrap();
        assert!(store.exists("report.html").await);
        assert_eq!(std::fs::read(path).unwrap(), b"<html>ok</html>");

        // No temporary residue is left behind.
        assert!(!dir.path().join("report.html.tmp").exists());
    }
}
