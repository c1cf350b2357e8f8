use thiserror::Error;

use crate::renderer::RenderError;
use crate::snapshot::SnapshotError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("page did not become ready: {0}")]
    RenderTimeout(String),
    #[error("browser session unavailable: {0}")]
    RenderUnavailable(String),
    #[error("no classes found after {attempts} attempt(s)")]
    EmptyResult { attempts: u32 },
    #[error("failed to persist snapshot: {0}")]
    Persistence(#[from] SnapshotError),
}

impl From<RenderError> for ScrapeError {
    fn from(value: RenderError) -> Self {
        match value {
            RenderError::Timeout { .. } => ScrapeError::RenderTimeout(value.to_string()),
            RenderError::Unavailable(msg) => ScrapeError::RenderUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_render_errors_map_to_render_variants() {
        let timeout: ScrapeError = RenderError::Timeout {
            selector: "tr".to_string(),
            timeout: Duration::from_secs(60),
        }
        .into();
        assert!(matches!(timeout, ScrapeError::RenderTimeout(ref msg) if msg.contains("`tr`")));

        let unavailable: ScrapeError = RenderError::Unavailable("no chrome".into()).into();
        assert!(matches!(unavailable, ScrapeError::RenderUnavailable(ref msg) if msg == "no chrome"));
    }

    #[test]
    fn test_persistence_error_names_path() {
        let err = ScrapeError::from(SnapshotError::Io {
            path: "/nope/schedule.json".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });
        assert!(matches!(err, ScrapeError::Persistence(_)));
        assert!(err.to_string().contains("/nope/schedule.json"));
    }
}
