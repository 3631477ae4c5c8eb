//! File I/O for resumable database builds.
//!
//! Layout of a build directory:
//! - `backlog.json`: the initial ordered array of pending records
//! - `batches/progress_batch_{k}.json`: the whole backlog after batch `k`
//! - `config.json`: the checkpoint `{ "last_completed_batch", "current_index" }`
//!
//! Every file is written to a temporary sibling first and renamed into
//! place, so a crash never leaves a truncated file behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::store::DatabaseRecord;

const BACKLOG_JSON: &str = "backlog.json";
const CHECKPOINT_JSON: &str = "config.json";
const BATCHES_DIR: &str = "batches";

/// Resumable cursor into the backlog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCheckpoint {
    /// Number of batches committed so far.
    pub last_completed_batch: usize,
    /// Index of the first backlog entry not yet covered by a committed batch.
    pub current_index: usize,
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(File::create(&staging)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    fs::rename(&staging, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BuildError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn snapshot_path(dir: &Path, batch: usize) -> PathBuf {
    dir.join(BATCHES_DIR)
        .join(format!("progress_batch_{batch}.json"))
}

/// Loads the checkpoint, or a zeroed one if none was written yet.
pub fn load_checkpoint(dir: &Path) -> Result<BuildCheckpoint, BuildError> {
    let path = dir.join(CHECKPOINT_JSON);
    if !path.exists() {
        return Ok(BuildCheckpoint::default());
    }
    read_json(&path)
}

pub fn save_checkpoint(dir: &Path, checkpoint: &BuildCheckpoint) -> Result<(), BuildError> {
    write_json(&dir.join(CHECKPOINT_JSON), checkpoint)
}

/// Writes the initial backlog and resets the checkpoint.
pub fn save_backlog(dir: &Path, records: &[DatabaseRecord]) -> Result<(), BuildError> {
    write_json(&dir.join(BACKLOG_JSON), records)?;
    save_checkpoint(dir, &BuildCheckpoint::default())
}

pub fn load_backlog(dir: &Path) -> Result<Vec<DatabaseRecord>, BuildError> {
    read_json(&dir.join(BACKLOG_JSON))
}

pub fn save_snapshot(
    dir: &Path,
    batch: usize,
    records: &[DatabaseRecord],
) -> Result<(), BuildError> {
    write_json(&snapshot_path(dir, batch), records)
}

pub fn load_snapshot(dir: &Path, batch: usize) -> Result<Vec<DatabaseRecord>, BuildError> {
    read_json(&snapshot_path(dir, batch))
}

/// Loads the records a resumed build continues from.
///
/// That is the snapshot of the last committed batch, or the initial backlog
/// when no batch has been committed.
pub fn load_progress(
    dir: &Path,
    checkpoint: &BuildCheckpoint,
) -> Result<Vec<DatabaseRecord>, BuildError> {
    match checkpoint.last_completed_batch.checked_sub(1) {
        Some(batch) => load_snapshot(dir, batch),
        None => load_backlog(dir),
    }
}

/// Saves a store's records as one JSON array.
pub fn save_table(path: &Path, records: &[DatabaseRecord]) -> Result<(), BuildError> {
    write_json(path, records)
}

/// Loads a saved table, or nothing if the file does not exist.
pub fn load_table(path: &Path) -> Result<Vec<DatabaseRecord>, BuildError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_json(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A fresh directory under the system temp dir, removed on drop.
    pub(crate) struct ScratchDir(pub PathBuf);

    impl ScratchDir {
        pub(crate) fn new(name: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("slider-{}-{name}", std::process::id()));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_missing_checkpoint_starts_at_zero() {
        let dir = ScratchDir::new("missing-checkpoint");
        assert_eq!(load_checkpoint(&dir.0).unwrap(), BuildCheckpoint::default());
    }

    #[test]
    fn test_checkpoint_file_format() {
        let dir = ScratchDir::new("checkpoint-format");
        let checkpoint = BuildCheckpoint {
            last_completed_batch: 3,
            current_index: 15,
        };
        save_checkpoint(&dir.0, &checkpoint).unwrap();

        let text = fs::read_to_string(dir.0.join(CHECKPOINT_JSON)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["last_completed_batch"], 3);
        assert_eq!(value["current_index"], 15);
        assert_eq!(load_checkpoint(&dir.0).unwrap(), checkpoint);
        assert!(!dir.0.join("config.json.tmp").exists());
    }

    #[test]
    fn test_progress_prefers_latest_snapshot() {
        let dir = ScratchDir::new("progress");
        let backlog = vec![DatabaseRecord::pending("1,2,3,4,5,6,7,8,0")];
        save_backlog(&dir.0, &backlog).unwrap();

        let mut done = backlog.clone();
        done[0].visited = true;
        done[0].cost_total = Some(0);
        save_snapshot(&dir.0, 0, &done).unwrap();

        let fresh = load_progress(&dir.0, &BuildCheckpoint::default()).unwrap();
        assert_eq!(fresh, backlog);

        let resumed = load_progress(
            &dir.0,
            &BuildCheckpoint {
                last_completed_batch: 1,
                current_index: 1,
            },
        )
        .unwrap();
        assert_eq!(resumed, done);
        assert!(snapshot_path(&dir.0, 0).ends_with("batches/progress_batch_0.json"));
    }

    #[test]
    fn test_missing_table_is_empty() {
        let dir = ScratchDir::new("table");
        assert!(load_table(&dir.0.join("absent.json")).unwrap().is_empty());
    }
}
