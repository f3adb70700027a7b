//! Job model: one queued audit request and its lifecycle state.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a job.
///
/// Transitions are strictly `queued -> active -> {completed | failed}`;
/// a job never leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobState {
    /// Lowercase name, as stored and as serialized over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device profile an audit is run under.
///
/// Submissions default to mobile. Desktop is part of the data model and
/// fully supported by the runner, but no UI path requests it yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DeviceProfile {
    #[default]
    Mobile,
    Desktop,
}

impl DeviceProfile {
    /// Lowercase name used in artifact locators and lighthouse flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceProfile::Mobile => "mobile",
            DeviceProfile::Desktop => "desktop",
        }
    }

    /// Emulated screen as `(width, height, device_scale_factor)`.
    pub fn screen_emulation(&self) -> (u32, u32, f32) {
        match self {
            DeviceProfile::Mobile => (360, 640, 2.625),
            DeviceProfile::Desktop => (1350, 940, 1.0),
        }
    }

    /// User agent presented to the audited page.
    pub fn user_agent(&self) -> &'static str {
        match self {
            DeviceProfile::Mobile => {
                "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/90.0.4430.91 Mobile Safari/537.36"
            }
            DeviceProfile::Desktop => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/90.0.4430.91 Safari/537.36"
            }
        }
    }
}

impl std::fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queued audit request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique identifier, assigned at enqueue time and never reused.
    pub id: Uuid,
    /// Target to audit. Validated only as non-empty at the API boundary.
    pub url: String,
    /// Device profile the audit runs under.
    pub device_profile: DeviceProfile,
    /// Submission time in epoch milliseconds; part of the artifact locator.
    pub submitted_at_ms: i64,
    /// Current lifecycle state.
    pub state: JobState,
    /// Report URL, present once the job has completed.
    pub result: Option<String>,
    /// Diagnostic message, present once the job has failed.
    /// Kept internal; never returned verbatim to API clients.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobState::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(JobState::Active.to_string(), "active");
    }

    #[test]
    fn test_device_profile_defaults_to_mobile() {
        assert_eq!(DeviceProfile::default(), DeviceProfile::Mobile);
        let parsed: DeviceProfile = serde_json::from_str("\"desktop\"").unwrap();
        assert_eq!(parsed, DeviceProfile::Desktop);
    }

    #[test]
    fn test_mobile_emulation_settings() {
        let (width, height, dsf) = DeviceProfile::Mobile.screen_emulation();
        assert_eq!((width, height), (360, 640));
        assert!((dsf - 2.625).abs() < f32::EPSILON);
        assert!(DeviceProfile::Mobile.user_agent().contains("Mobile"));
    }
}
