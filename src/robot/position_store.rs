//! Durable record of the three axis positions.
//!
//! The motors have no absolute encoders, so the last accepted position is
//! written to disk after every move and read back at startup. A missing file
//! is recoverable (all axes default to zero) but is logged, since it usually
//! means the rig needs homing before it can be trusted.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PositionRecord {
    #[serde(rename = "X")]
    x: i64,
    #[serde(rename = "Y")]
    y: i64,
    #[serde(rename = "Z")]
    z: i64,
}

#[derive(Debug)]
pub struct PositionStore {
    path: PathBuf,
    x: i64,
    y: i64,
    z: i64,
}

impl PositionStore {
    /// Open the store, reading the persisted record if one exists.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let record = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<PositionRecord>(&raw) {
                Ok(record) => record,
                Err(err) => {
                    warn!(path = %path.display(), %err, "position record unreadable, defaulting to zero");
                    PositionRecord { x: 0, y: 0, z: 0 }
                }
            },
            Err(err) => {
                warn!(path = %path.display(), %err, "no persisted position, defaulting to zero");
                PositionRecord { x: 0, y: 0, z: 0 }
            }
        };
        PositionStore {
            path,
            x: record.x,
            y: record.y,
            z: record.z,
        }
    }

    pub fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: i64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// Write the current record to disk.
    pub fn save(&self) -> io::Result<()> {
        let record = PositionRecord {
            x: self.x,
            y: self.y,
            z: self.z,
        };
        let raw = serde_json::to_string_pretty(&record).expect("position record serializes");
        std::fs::write(&self.path, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = PositionStore::load(dir.path().join("position.json"));
        assert_eq!(store.get(Axis::X), 0);
        assert_eq!(store.get(Axis::Y), 0);
        assert_eq!(store.get(Axis::Z), 0);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("position.json");

        let mut store = PositionStore::load(&path);
        store.set(Axis::X, -120);
        store.set(Axis::Y, -4500);
        store.set(Axis::Z, -30_000);
        store.save().unwrap();

        let reloaded = PositionStore::load(&path);
        assert_eq!(reloaded.get(Axis::X), -120);
        assert_eq!(reloaded.get(Axis::Y), -4500);
        assert_eq!(reloaded.get(Axis::Z), -30_000);
    }

    #[test]
    fn test_corrupt_record_defaults_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("position.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = PositionStore::load(&path);
        assert_eq!(store.get(Axis::Z), 0);
    }
}
