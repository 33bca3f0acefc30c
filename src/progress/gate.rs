use std::cmp::Ordering;

use crate::progress::record::{ProgressRecord, ProgressStatus};

/// The part of a progress row the gate reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub progress_percentage: i64,
    pub status: ProgressStatus,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            progress_percentage: 0,
            status: ProgressStatus::NotStarted,
        }
    }
}

impl From<&ProgressRecord> for Snapshot {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            progress_percentage: record.progress_percentage,
            status: record.status,
        }
    }
}

/// Decide whether a proposed update may be applied over the current state,
/// and if so what to write. `None` means skip: regressing or redundant
/// candidates are silently dropped rather than treated as errors, so
/// late-arriving or duplicate updates converge instead of failing.
pub fn decide(current: Snapshot, proposed: Snapshot) -> Option<Snapshot> {
    match proposed.progress_percentage.cmp(&current.progress_percentage) {
        Ordering::Less => None,
        Ordering::Equal => {
            // Same percentage: only a strictly higher-priority status gets
            // through, and the percentage stays pinned to the current value.
            if proposed.status.priority() > current.status.priority() {
                Some(Snapshot {
                    progress_percentage: current.progress_percentage,
                    status: proposed.status,
                })
            } else {
                None
            }
        }
        Ordering::Greater => Some(Snapshot {
            progress_percentage: current
                .progress_percentage
                .max(proposed.progress_percentage),
            status: proposed.status,
        }),
    }
}
