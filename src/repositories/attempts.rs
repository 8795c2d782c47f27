use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::AttemptRow;
use crate::services::scoring::AttemptStore;
use crate::services::submission::NewAttempt;

/// `attempts` has no mock column, so it is projected as NULL to share `AttemptRow`.
const PRIMARY_COLUMNS: &str = "\
    id, student_id, exam_variant_id, NULL::text AS mock_variant_id, total_marks, \
    attempted_count, skipped_count, correct_count, wrong_count, not_visited_count, \
    auto_submitted, started_at, ended_at, answers, submitted_at";

const MOCK_COLUMNS: &str = "\
    id, student_id, exam_variant_id, mock_variant_id, total_marks, \
    attempted_count, skipped_count, correct_count, wrong_count, not_visited_count, \
    auto_submitted, started_at, ended_at, answers, submitted_at";

pub(crate) async fn insert(pool: &PgPool, attempt: &NewAttempt) -> Result<(), sqlx::Error> {
    let query = match attempt.store {
        AttemptStore::Primary => sqlx::query(
            "INSERT INTO attempts (
                id, student_id, exam_variant_id, total_marks,
                attempted_count, skipped_count, correct_count, wrong_count, not_visited_count,
                auto_submitted, started_at, ended_at, answers, submitted_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)",
        )
        .bind(&attempt.id)
        .bind(attempt.student_id.as_deref())
        .bind(&attempt.exam_variant_id),
        AttemptStore::Mock => sqlx::query(
            "INSERT INTO mock_attempts (
                id, student_id, exam_variant_id, total_marks,
                attempted_count, skipped_count, correct_count, wrong_count, not_visited_count,
                auto_submitted, started_at, ended_at, answers, submitted_at, mock_variant_id
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
        )
        .bind(&attempt.id)
        .bind(attempt.student_id.as_deref())
        .bind(&attempt.exam_variant_id),
    };

    let query = query
        .bind(attempt.totals.total_marks)
        .bind(attempt.totals.attempted_count)
        .bind(attempt.totals.skipped_count)
        .bind(attempt.totals.correct_count)
        .bind(attempt.totals.wrong_count)
        .bind(attempt.totals.not_visited_count)
        .bind(attempt.auto_submitted)
        .bind(attempt.started_at)
        .bind(attempt.ended_at)
        .bind(Json(&attempt.answers))
        .bind(attempt.submitted_at);

    let query = match attempt.store {
        AttemptStore::Primary => query,
        AttemptStore::Mock => query.bind(attempt.mock_variant_id.as_deref()),
    };

    query.execute(pool).await?;
    Ok(())
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<AttemptRow>, sqlx::Error> {
    let primary = sqlx::query_as::<_, AttemptRow>(&format!(
        "SELECT {PRIMARY_COLUMNS} FROM attempts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    if primary.is_some() {
        return Ok(primary);
    }

    sqlx::query_as::<_, AttemptRow>(&format!("SELECT {MOCK_COLUMNS} FROM mock_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Main and mock attempts of one student, newest first.
pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<AttemptRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptRow>(&format!(
        "SELECT {PRIMARY_COLUMNS} FROM attempts WHERE student_id = $1
         UNION ALL
         SELECT {MOCK_COLUMNS} FROM mock_attempts WHERE student_id = $1
         ORDER BY submitted_at DESC, id",
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_variant(
    pool: &PgPool,
    exam_variant_id: &str,
    mock_variant_id: Option<&str>,
) -> Result<Vec<AttemptRow>, sqlx::Error> {
    match mock_variant_id {
        Some(mock_variant_id) => {
            sqlx::query_as::<_, AttemptRow>(&format!(
                "SELECT {MOCK_COLUMNS} FROM mock_attempts
                 WHERE exam_variant_id = $1 AND mock_variant_id = $2
                 ORDER BY submitted_at DESC, id",
            ))
            .bind(exam_variant_id)
            .bind(mock_variant_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, AttemptRow>(&format!(
                "SELECT {PRIMARY_COLUMNS} FROM attempts
                 WHERE exam_variant_id = $1
                 ORDER BY submitted_at DESC, id",
            ))
            .bind(exam_variant_id)
            .fetch_all(pool)
            .await
        }
    }
}
