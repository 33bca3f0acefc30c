use crate::progress::gate::Snapshot;
use crate::progress::record::ProgressStatus;

/// Child completion counts for one composite (a path or a whole course, as
/// seen through a class instance), for one learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupCounts {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub total_assessments: i64,
    pub completed_assessments: i64,
}

/// Weighted roll-up of child counts into a candidate aggregate snapshot.
///
/// When both lessons and assessments exist, lessons carry 80% of the weight
/// and assessments 20%. When only one kind exists it carries the full 100% —
/// a path of nothing but lessons completes at 100, not 80.
pub fn weighted_rollup(counts: &RollupCounts) -> Snapshot {
    let lesson_pct = ratio_pct(counts.completed_lessons, counts.total_lessons);
    let assessment_pct = ratio_pct(counts.completed_assessments, counts.total_assessments);
    let overall = match (counts.total_lessons > 0, counts.total_assessments > 0) {
        (true, true) => lesson_pct * 0.8 + assessment_pct * 0.2,
        (true, false) => lesson_pct,
        (false, true) => assessment_pct,
        (false, false) => 0.0,
    };
    let progress_percentage = overall.round() as i64;
    Snapshot {
        progress_percentage,
        status: status_for_percentage(progress_percentage),
    }
}

fn ratio_pct(completed: i64, total: i64) -> f64 {
    if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Aggregates only ever carry not_started / in_progress / completed;
/// passed and failed are leaf assessment outcomes.
pub fn status_for_percentage(percentage: i64) -> ProgressStatus {
    match percentage {
        0 => ProgressStatus::NotStarted,
        100 => ProgressStatus::Completed,
        _ => ProgressStatus::InProgress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(
        total_lessons: i64,
        completed_lessons: i64,
        total_assessments: i64,
        completed_assessments: i64,
    ) -> RollupCounts {
        RollupCounts {
            total_lessons,
            completed_lessons,
            total_assessments,
            completed_assessments,
        }
    }

    #[test]
    fn lessons_only_not_scaled_to_eighty() {
        let snap = weighted_rollup(&counts(4, 3, 0, 0));
        assert_eq!(snap.progress_percentage, 75);
        assert_eq!(snap.status, ProgressStatus::InProgress);
    }

    #[test]
    fn assessments_only_not_scaled_to_twenty() {
        let snap = weighted_rollup(&counts(0, 0, 2, 1));
        assert_eq!(snap.progress_percentage, 50);
    }

    #[test]
    fn mixed_children_weighted_eighty_twenty() {
        // 1/2 lessons = 50%, 2/2 assessments = 100% -> 50*0.8 + 100*0.2 = 60
        let snap = weighted_rollup(&counts(2, 1, 2, 2));
        assert_eq!(snap.progress_percentage, 60);
        assert_eq!(snap.status, ProgressStatus::InProgress);
    }

    #[test]
    fn no_children_is_zero_not_started() {
        let snap = weighted_rollup(&counts(0, 0, 0, 0));
        assert_eq!(snap.progress_percentage, 0);
        assert_eq!(snap.status, ProgressStatus::NotStarted);
    }

    #[test]
    fn everything_complete_is_completed() {
        let snap = weighted_rollup(&counts(3, 3, 2, 2));
        assert_eq!(snap.progress_percentage, 100);
        assert_eq!(snap.status, ProgressStatus::Completed);
    }

    #[test]
    fn rounds_to_nearest() {
        // 1/3 lessons only -> 33.33 -> 33
        assert_eq!(weighted_rollup(&counts(3, 1, 0, 0)).progress_percentage, 33);
        // 2/3 lessons only -> 66.67 -> 67
        assert_eq!(weighted_rollup(&counts(3, 2, 0, 0)).progress_percentage, 67);
    }
}
