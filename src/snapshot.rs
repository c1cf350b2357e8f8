use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::models::ScheduleSnapshot;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sibling temp file, so the final rename never crosses a filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Replaces the file at `path` with `snapshot`. Readers see either the old
/// file or the new one, never a partial write.
pub async fn write_snapshot(path: &Path, snapshot: &ScheduleSnapshot) -> Result<(), SnapshotError> {
    let body = serde_json::to_vec_pretty(snapshot)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_error(parent))?;
    }

    let tmp = temp_path(path);
    let written = match fs::write(&tmp, &body).await {
        Ok(()) => fs::rename(&tmp, path).await.map_err(io_error(path)),
        Err(source) => Err(io_error(&tmp)(source)),
    };

    if written.is_err() {
        if let Err(err) = fs::remove_file(&tmp).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %err, "failed to remove temp snapshot");
            }
        }
    } else {
        debug!(path = %path.display(), bytes = body.len(), "snapshot written");
    }
    written
}

pub async fn read_snapshot(path: &Path) -> Result<ScheduleSnapshot, SnapshotError> {
    let body = fs::read(path).await.map_err(io_error(path))?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::category::Category;
    use crate::models::FitnessClass;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fitness-schedule-snapshot-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn snapshot(names: &[&str]) -> ScheduleSnapshot {
        let classes = names
            .iter()
            .map(|name| FitnessClass {
                name: name.to_string(),
                date: "2024-06-01".to_string(),
                time: "6:00 AM".to_string(),
                location: "Gym".to_string(),
                category: Category::General,
                activity_id: None,
            })
            .collect();
        ScheduleSnapshot::new(classes, Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        assert_eq!(
            temp_path(Path::new("data/schedule.json")),
            PathBuf::from("data/.schedule.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_write_creates_parent_and_round_trips() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("nested").join("schedule.json");

        write_snapshot(&path, &snapshot(&["Yoga"])).await.unwrap();
        let loaded = read_snapshot(&path).await.unwrap();

        assert_eq!(loaded.class_count, 1);
        assert_eq!(loaded.classes[0].name, "Yoga");
        assert!(!temp_path(&path).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_replaces_previous_snapshot() {
        let dir = scratch_dir("replace");
        let path = dir.join("schedule.json");

        write_snapshot(&path, &snapshot(&["A", "B", "C"])).await.unwrap();
        write_snapshot(&path, &snapshot(&[])).await.unwrap();

        let loaded = read_snapshot(&path).await.unwrap();
        assert_eq!(loaded.class_count, 0);
        assert!(loaded.classes.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unwritable_location_is_reported() {
        let dir = scratch_dir("unwritable");
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = write_snapshot(&blocker.join("schedule.json"), &snapshot(&["A"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
