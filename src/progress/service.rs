//! Cascade orchestration: a leaf update flows upward through the path and
//! class-instance aggregates, each level re-reading its own current row and
//! passing the recomputed candidate through the monotonicity gate before
//! writing.
//!
//! No locks or transactions are taken. Two concurrent cascades for the same
//! learner can both read a stale aggregate and both write, but every
//! candidate is derived from true leaf state and re-gated against a fresh
//! read, so the persisted value never drops below the true maximum; the only
//! cost is a redundant write. Partial failure is not rolled back: a write
//! that fails mid-cascade leaves the earlier levels committed and the error
//! propagates to the caller.

use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::debug;

use crate::catalog;
use crate::events::ProgressNotifier;
use crate::progress::gate::{self, Snapshot};
use crate::progress::record::{
    self, ItemType, ProgressRecord, ProgressStatus, ProgressUpdate,
};
use crate::progress::rollup;

#[derive(Debug, Clone)]
pub struct ProgressService {
    database: SqlitePool,
    notifier: ProgressNotifier,
}

impl ProgressService {
    pub fn new(database: SqlitePool, notifier: ProgressNotifier) -> Self {
        Self { database, notifier }
    }

    /// Record progress on a lesson and cascade upward. Returns `None` when
    /// the gate rejected the update (nothing persisted, nothing emitted).
    ///
    /// The lesson's own notification goes out only after the path and
    /// class-instance recomputes have finished, so subscribers observe the
    /// upward-propagated state no later than the leaf event that caused it.
    pub async fn update_lesson_progress(
        &self,
        lesson_id: i64,
        user_id: &str,
        update: ProgressUpdate,
    ) -> anyhow::Result<Option<ProgressRecord>> {
        let Some(applied) = self
            .apply_leaf(ItemType::Lesson, lesson_id, user_id, update)
            .await?
        else {
            return Ok(None);
        };
        if let Some(path_id) = catalog::lesson_path(&self.database, lesson_id).await? {
            self.recompute_path(path_id, user_id).await?;
        } else {
            debug!(lesson_id, "lesson has no path, skipping cascade");
        }
        self.notifier.emit(
            ItemType::Lesson,
            lesson_id,
            applied.progress_percentage,
            applied.status,
        );
        Ok(Some(applied))
    }

    /// Record progress on an assessment and cascade upward. Unlike lessons,
    /// the assessment's notification goes out right after its own persist.
    /// Course-level assessments (no path, no lesson) cascade straight into
    /// the class-instance recompute.
    pub async fn update_assessment_progress(
        &self,
        assessment_id: i64,
        user_id: &str,
        update: ProgressUpdate,
    ) -> anyhow::Result<Option<ProgressRecord>> {
        let Some(applied) = self
            .apply_leaf(ItemType::Assessment, assessment_id, user_id, update)
            .await?
        else {
            return Ok(None);
        };
        self.notifier.emit(
            ItemType::Assessment,
            assessment_id,
            applied.progress_percentage,
            applied.status,
        );
        match catalog::assessment_parent(&self.database, assessment_id).await? {
            Some(parent) => {
                if let Some(path_id) = parent.path_id {
                    self.recompute_path(path_id, user_id).await?;
                } else if let Some(lesson_id) = parent.lesson_id {
                    if let Some(path_id) = catalog::lesson_path(&self.database, lesson_id).await? {
                        self.recompute_path(path_id, user_id).await?;
                    }
                } else if let Some(course_id) = parent.course_id {
                    self.recompute_class_instance(course_id, user_id).await?;
                } else {
                    debug!(assessment_id, "assessment has no parent, skipping cascade");
                }
            }
            None => debug!(assessment_id, "unknown assessment, skipping cascade"),
        }
        Ok(Some(applied))
    }

    /// Read-gate-persist for one leaf. Fills in defaults before gating: an
    /// absent percentage keeps the current one (so status-only upgrades flow
    /// through the equal-percentage branch), an absent status defaults to
    /// in_progress, and the percentage is clamped to 0..=100.
    async fn apply_leaf(
        &self,
        item_type: ItemType,
        item_id: i64,
        user_id: &str,
        update: ProgressUpdate,
    ) -> anyhow::Result<Option<ProgressRecord>> {
        let current = record::get_progress(&self.database, user_id, item_type, item_id).await?;
        let current_snapshot = current.as_ref().map(Snapshot::from).unwrap_or_default();
        let proposed = Snapshot {
            progress_percentage: update
                .progress_percentage
                .unwrap_or(current_snapshot.progress_percentage)
                .clamp(0, 100),
            status: update.status.unwrap_or(ProgressStatus::InProgress),
        };
        let Some(safe) = gate::decide(current_snapshot, proposed) else {
            debug!(?item_type, item_id, user_id, "update rejected by gate");
            return Ok(None);
        };
        let applied = ProgressRecord {
            user_id: user_id.to_owned(),
            item_type,
            item_id,
            status: safe.status,
            progress_percentage: safe.progress_percentage,
            last_position: update.last_position,
            updated_at: OffsetDateTime::now_utc(),
        };
        record::upsert_progress(&self.database, &applied).await?;
        Ok(Some(applied))
    }

    /// Recompute a path aggregate from its children. The class-instance
    /// recompute runs even when this path's own value did not move: a
    /// sibling path may have changed the course-level picture.
    async fn recompute_path(&self, path_id: i64, user_id: &str) -> anyhow::Result<()> {
        let counts = catalog::path_rollup_counts(&self.database, path_id, user_id).await?;
        let candidate = rollup::weighted_rollup(&counts);
        let current = record::get_progress(&self.database, user_id, ItemType::Path, path_id)
            .await?
            .as_ref()
            .map(Snapshot::from)
            .unwrap_or_default();
        match gate::decide(current, candidate) {
            Some(safe) => {
                let applied = ProgressRecord {
                    user_id: user_id.to_owned(),
                    item_type: ItemType::Path,
                    item_id: path_id,
                    status: safe.status,
                    progress_percentage: safe.progress_percentage,
                    last_position: None,
                    updated_at: OffsetDateTime::now_utc(),
                };
                record::upsert_progress(&self.database, &applied).await?;
                self.notifier.emit(
                    ItemType::Path,
                    path_id,
                    applied.progress_percentage,
                    applied.status,
                );
            }
            None => debug!(path_id, user_id, "path rollup unchanged"),
        }
        if let Some(course_id) = catalog::path_course(&self.database, path_id).await? {
            self.recompute_class_instance(course_id, user_id).await?;
        }
        Ok(())
    }

    /// Recompute the learner's class-instance aggregate for a course. An
    /// unenrolled (self-paced) learner is a legitimate terminal state, not
    /// an error.
    async fn recompute_class_instance(&self, course_id: i64, user_id: &str) -> anyhow::Result<()> {
        let Some(class_instance_id) =
            catalog::enrolled_class_instance(&self.database, user_id, course_id).await?
        else {
            debug!(course_id, user_id, "no enrollment, skipping class instance");
            return Ok(());
        };
        let counts = catalog::course_rollup_counts(&self.database, course_id, user_id).await?;
        let candidate = rollup::weighted_rollup(&counts);
        let current = record::get_progress(
            &self.database,
            user_id,
            ItemType::ClassInstance,
            class_instance_id,
        )
        .await?
        .as_ref()
        .map(Snapshot::from)
        .unwrap_or_default();
        match gate::decide(current, candidate) {
            Some(safe) => {
                let applied = ProgressRecord {
                    user_id: user_id.to_owned(),
                    item_type: ItemType::ClassInstance,
                    item_id: class_instance_id,
                    status: safe.status,
                    progress_percentage: safe.progress_percentage,
                    last_position: None,
                    updated_at: OffsetDateTime::now_utc(),
                };
                record::upsert_progress(&self.database, &applied).await?;
                self.notifier.emit(
                    ItemType::ClassInstance,
                    class_instance_id,
                    applied.progress_percentage,
                    applied.status,
                );
            }
            None => debug!(class_instance_id, user_id, "class instance rollup unchanged"),
        }
        Ok(())
    }
}
