//! Choosing a pre-synced local snapshot to resume from.
//!
//! A snapshot is identified by the highest L1 height its data covers. Resuming
//! from the closest snapshot at or below a target height keeps the range that
//! still has to be scanned as small as possible.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A pre-synced snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub path: PathBuf,
    /// Highest L1 height covered by the snapshot.
    pub latest_l1_height: u64,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>, latest_l1_height: u64) -> Self {
        Self {
            path: path.into(),
            latest_l1_height,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A set of candidate snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    snapshots: Vec<Snapshot>,
}

impl SnapshotCatalog {
    pub fn new(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            snapshots: snapshots.into_iter().collect(),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot covering the most blocks.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.iter().max_by_key(|s| s.latest_l1_height)
    }

    /// The highest snapshot that does not go past `target`.
    pub fn closest_at_or_below(&self, target: u64) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.latest_l1_height <= target)
            .max_by_key(|s| s.latest_l1_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SnapshotCatalog {
        SnapshotCatalog::new([
            Snapshot::new("zkopru-5800000.db", 5_800_000),
            Snapshot::new("zkopru-5900000.db", 5_900_000),
            Snapshot::new("zkopru-5700000.db", 5_700_000),
        ])
    }

    #[test]
    fn picks_nearest_below_target() {
        let c = catalog();
        assert_eq!(c.closest_at_or_below(5_850_000).unwrap().latest_l1_height, 5_800_000);
        assert_eq!(c.closest_at_or_below(5_900_000).unwrap().latest_l1_height, 5_900_000);
        assert!(c.closest_at_or_below(5_000_000).is_none());
    }

    #[test]
    fn latest_is_the_maximum() {
        assert_eq!(
            catalog().latest().unwrap().path(),
            Path::new("zkopru-5900000.db")
        );
        assert!(SnapshotCatalog::default().latest().is_none());
    }
}
