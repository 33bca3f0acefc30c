//! Read-only lookups against the course hierarchy: parent resolution for
//! leaves, roster resolution for class instances, and the per-learner child
//! completion counts the aggregator rolls up.

use sqlx::SqlitePool;
use tracing::debug;

use crate::progress::rollup::RollupCounts;

pub async fn lesson_path(database: &SqlitePool, lesson_id: i64) -> anyhow::Result<Option<i64>> {
    let path_id = sqlx::query_scalar("select path_id from lesson where id = ?")
        .bind(lesson_id)
        .fetch_optional(database)
        .await?;
    Ok(path_id)
}

pub async fn path_course(database: &SqlitePool, path_id: i64) -> anyhow::Result<Option<i64>> {
    let course_id = sqlx::query_scalar("select course_id from learning_path where id = ?")
        .bind(path_id)
        .fetch_optional(database)
        .await?;
    Ok(course_id)
}

/// Where an assessment hangs in the hierarchy. At most one of the fields is
/// set for a well-formed row; all three absent means no cascade target.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct AssessmentParent {
    pub path_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub course_id: Option<i64>,
}

pub async fn assessment_parent(
    database: &SqlitePool,
    assessment_id: i64,
) -> anyhow::Result<Option<AssessmentParent>> {
    let parent = sqlx::query_as::<_, AssessmentParent>(
        "select path_id, lesson_id, course_id from assessment where id = ?",
    )
    .bind(assessment_id)
    .fetch_optional(database)
    .await?;
    Ok(parent)
}

/// Resolve the class instance a learner is enrolled in under the given
/// course. Progress is tracked per class instance, but the aggregation inputs
/// are scoped to the course template, which may have several instances.
///
/// No student enrollment, or enrollments only in other courses (the
/// base-class mismatch guard): `None`, the learner is self-paced and
/// class-instance aggregation is skipped.
pub async fn enrolled_class_instance(
    database: &SqlitePool,
    user_id: &str,
    course_id: i64,
) -> anyhow::Result<Option<i64>> {
    let enrollments: Vec<(i64, i64)> = sqlx::query_as(
        "select ci.id, ci.course_id from enrollment e \
         inner join class_instance ci on e.class_instance_id = ci.id \
         where e.user_id = ? and e.role = 'student'",
    )
    .bind(user_id)
    .fetch_all(database)
    .await?;
    let matched = enrollments
        .iter()
        .find(|(_, enrolled_course)| *enrolled_course == course_id)
        .map(|(class_instance_id, _)| *class_instance_id);
    if matched.is_none() && !enrollments.is_empty() {
        debug!(
            user_id,
            course_id, "enrollments exist but none under this course, skipping"
        );
    }
    Ok(matched)
}

/// Child counts for one path: its own lessons, plus assessments attached to
/// the path or to any lesson in it.
pub async fn path_rollup_counts(
    database: &SqlitePool,
    path_id: i64,
    user_id: &str,
) -> anyhow::Result<RollupCounts> {
    let total_lessons: i64 = sqlx::query_scalar("select count(*) from lesson where path_id = ?")
        .bind(path_id)
        .fetch_one(database)
        .await?;
    let completed_lessons: i64 = sqlx::query_scalar(
        "select count(*) from progress p \
         inner join lesson l on p.item_id = l.id \
         where l.path_id = ? and p.user_id = ? and p.item_type = 'lesson' \
           and p.status = 'completed'",
    )
    .bind(path_id)
    .bind(user_id)
    .fetch_one(database)
    .await?;
    let total_assessments: i64 = sqlx::query_scalar(
        "select count(*) from assessment a \
         where a.path_id = ? or a.lesson_id in (select id from lesson where path_id = ?)",
    )
    .bind(path_id)
    .bind(path_id)
    .fetch_one(database)
    .await?;
    let completed_assessments: i64 = sqlx::query_scalar(
        "select count(*) from progress p \
         inner join assessment a on p.item_id = a.id \
         where (a.path_id = ? or a.lesson_id in (select id from lesson where path_id = ?)) \
           and p.user_id = ? and p.item_type = 'assessment' \
           and p.status in ('completed', 'passed')",
    )
    .bind(path_id)
    .bind(path_id)
    .bind(user_id)
    .fetch_one(database)
    .await?;
    Ok(RollupCounts {
        total_lessons,
        completed_lessons,
        total_assessments,
        completed_assessments,
    })
}

/// Child counts across a whole course: lessons under every path, and every
/// assessment reachable from the course (course-level, path-scoped, or
/// lesson-scoped — each is a single row, so no dedup step is needed).
pub async fn course_rollup_counts(
    database: &SqlitePool,
    course_id: i64,
    user_id: &str,
) -> anyhow::Result<RollupCounts> {
    let total_lessons: i64 = sqlx::query_scalar(
        "select count(*) from lesson l \
         inner join learning_path lp on l.path_id = lp.id \
         where lp.course_id = ?",
    )
    .bind(course_id)
    .fetch_one(database)
    .await?;
    let completed_lessons: i64 = sqlx::query_scalar(
        "select count(*) from progress p \
         inner join lesson l on p.item_id = l.id \
         inner join learning_path lp on l.path_id = lp.id \
         where lp.course_id = ? and p.user_id = ? and p.item_type = 'lesson' \
           and p.status = 'completed'",
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_one(database)
    .await?;
    let total_assessments: i64 = sqlx::query_scalar(
        "select count(*) from assessment a \
         where a.course_id = ? \
            or a.path_id in (select id from learning_path where course_id = ?) \
            or a.lesson_id in ( \
                select l.id from lesson l \
                inner join learning_path lp on l.path_id = lp.id \
                where lp.course_id = ?)",
    )
    .bind(course_id)
    .bind(course_id)
    .bind(course_id)
    .fetch_one(database)
    .await?;
    let completed_assessments: i64 = sqlx::query_scalar(
        "select count(*) from progress p \
         inner join assessment a on p.item_id = a.id \
         where (a.course_id = ? \
            or a.path_id in (select id from learning_path where course_id = ?) \
            or a.lesson_id in ( \
                select l.id from lesson l \
                inner join learning_path lp on l.path_id = lp.id \
                where lp.course_id = ?)) \
           and p.user_id = ? and p.item_type = 'assessment' \
           and p.status in ('completed', 'passed')",
    )
    .bind(course_id)
    .bind(course_id)
    .bind(course_id)
    .bind(user_id)
    .fetch_one(database)
    .await?;
    Ok(RollupCounts {
        total_lessons,
        completed_lessons,
        total_assessments,
        completed_assessments,
    })
}
