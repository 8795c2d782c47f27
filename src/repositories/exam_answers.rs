use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::LegacyAnswerRow;
use crate::services::scoring::AnswerRecord;

const COLUMNS: &str = "\
    id, submission_id, student_id, exam_variant_id, question_number, status, marks, \
    is_correct, snapshot, created_at";

/// Deletes the student's rows for the variant and inserts `answers` in the
/// same transaction, so readers never observe an empty set mid-replace.
pub(crate) async fn replace_for_student(
    pool: &PgPool,
    student_id: &str,
    exam_variant_id: &str,
    submission_id: &str,
    answers: &[AnswerRecord],
    created_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM exam_answers WHERE student_id = $1 AND exam_variant_id = $2")
        .bind(student_id)
        .bind(exam_variant_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if !answers.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO exam_answers (
                id, submission_id, student_id, exam_variant_id, question_number, status, marks,
                is_correct, snapshot, created_at
            ) ",
        );
        builder.push_values(answers, |mut row, answer| {
            row.push_bind(Uuid::new_v4().to_string())
                .push_bind(submission_id)
                .push_bind(student_id)
                .push_bind(exam_variant_id)
                .push_bind(answer.question_number)
                .push_bind(answer.status)
                .push_bind(answer.marks)
                .push_bind(answer.is_correct)
                .push_bind(Json(answer.clone()))
                .push_bind(created_at);
        });
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::debug!(
        student_id = %student_id,
        exam_variant_id = %exam_variant_id,
        removed,
        inserted = answers.len(),
        "Replaced legacy answer rows"
    );
    Ok(())
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
    exam_variant_id: &str,
) -> Result<Vec<LegacyAnswerRow>, sqlx::Error> {
    sqlx::query_as::<_, LegacyAnswerRow>(&format!(
        "SELECT {COLUMNS} FROM exam_answers
         WHERE student_id = $1 AND exam_variant_id = $2
         ORDER BY question_number",
    ))
    .bind(student_id)
    .bind(exam_variant_id)
    .fetch_all(pool)
    .await
}
