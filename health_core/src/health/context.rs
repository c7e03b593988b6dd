//! Process-wide facts captured once at startup

use tokio::time::Instant;

/// Reported when neither the deployment nor the build supplies a version.
pub const UNKNOWN_VERSION: &str = "0.0.0";

#[derive(Debug, Clone)]
pub struct ProcessContext {
    version: String,
    started_at: Instant,
}

impl ProcessContext {
    pub fn capture(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            started_at: Instant::now(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Picks the deployment-supplied version, then the build version, then
/// [`UNKNOWN_VERSION`]. Blank values count as absent.
pub fn resolve_version(deployment: Option<&str>, build: Option<&str>) -> String {
    deployment
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| build.map(str::trim).filter(|v| !v.is_empty()))
        .unwrap_or(UNKNOWN_VERSION)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_resolve_version_precedence() {
        assert_eq!(resolve_version(Some("2.1.0"), Some("0.1.0")), "2.1.0");
        assert_eq!(resolve_version(None, Some("0.1.0")), "0.1.0");
        assert_eq!(resolve_version(Some("   "), Some("0.1.0")), "0.1.0");
        assert_eq!(resolve_version(None, None), UNKNOWN_VERSION);
        assert_eq!(resolve_version(Some(""), Some("")), UNKNOWN_VERSION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uptime_tracks_elapsed_time() {
        let context = ProcessContext::capture("1.0.0");
        assert_eq!(context.uptime_seconds(), 0);

        tokio::time::advance(Duration::from_secs(42)).await;
        assert_eq!(context.uptime_seconds(), 42);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(context.uptime_seconds(), 42);
    }
}
