use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::QuestionRow;
use crate::db::types::QuestionType;
use crate::services::question_bank::{
    ensure_unlinked, smallest_available, LinkedChildren, ValidatedQuestion,
};
use crate::services::scoring::BankSource;

pub(crate) const COLUMNS: &str = "\
    id, exam_variant_id, mock_variant_id, question_number, question_type, question_text, \
    options, correct_answer, correct_answers, parent_question, branch_key, \
    confidence_required, created_at";

/// One numbering scope: the primary bank of a variant or one mock bank.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Bank<'a> {
    Primary { exam_variant_id: &'a str },
    Mock { exam_variant_id: &'a str, mock_variant_id: &'a str },
}

impl<'a> Bank<'a> {
    pub(crate) fn new(exam_variant_id: &'a str, mock_variant_id: Option<&'a str>) -> Self {
        match mock_variant_id {
            Some(mock_variant_id) => Self::Mock { exam_variant_id, mock_variant_id },
            None => Self::Primary { exam_variant_id },
        }
    }

    fn lock_key(&self) -> String {
        match self {
            Self::Primary { exam_variant_id } => format!("questions:{exam_variant_id}"),
            Self::Mock { mock_variant_id, .. } => format!("mock_questions:{mock_variant_id}"),
        }
    }
}

/// Questions of one bank source in question-number order.
pub(crate) async fn list_for_source(
    pool: &PgPool,
    source: BankSource,
    exam_variant_id: &str,
    mock_variant_id: Option<&str>,
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    match (source, mock_variant_id) {
        (BankSource::Primary, _) => {
            sqlx::query_as::<_, QuestionRow>(&format!(
                "SELECT {COLUMNS} FROM questions
                 WHERE exam_variant_id = $1 AND mock_variant_id IS NULL
                 ORDER BY question_number",
            ))
            .bind(exam_variant_id)
            .fetch_all(pool)
            .await
        }
        (BankSource::MockDedicated, Some(mock_variant_id)) => {
            sqlx::query_as::<_, QuestionRow>(&format!(
                "SELECT {COLUMNS} FROM mock_questions
                 WHERE exam_variant_id = $1 AND mock_variant_id = $2
                 ORDER BY question_number",
            ))
            .bind(exam_variant_id)
            .bind(mock_variant_id)
            .fetch_all(pool)
            .await
        }
        (BankSource::LegacyCoMingled, Some(mock_variant_id)) => {
            sqlx::query_as::<_, QuestionRow>(&format!(
                "SELECT {COLUMNS} FROM questions
                 WHERE exam_variant_id = $1 AND mock_variant_id = $2
                 ORDER BY question_number",
            ))
            .bind(exam_variant_id)
            .bind(mock_variant_id)
            .fetch_all(pool)
            .await
        }
        (BankSource::MockDedicated | BankSource::LegacyCoMingled, None) => Ok(Vec::new()),
    }
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<QuestionRow>, sqlx::Error> {
    let primary = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    if primary.is_some() {
        return Ok(primary);
    }

    sqlx::query_as::<_, QuestionRow>(&format!("SELECT {COLUMNS} FROM mock_questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Stored type of question `number` in `bank`; `None` when no such question exists.
pub(crate) async fn find_type_by_number(
    pool: &PgPool,
    bank: Bank<'_>,
    number: i32,
) -> Result<Option<QuestionType>, sqlx::Error> {
    let row: Option<Option<QuestionType>> = match bank {
        Bank::Primary { exam_variant_id } => {
            sqlx::query_scalar(
                "SELECT question_type FROM questions
                 WHERE exam_variant_id = $1 AND mock_variant_id IS NULL AND question_number = $2",
            )
            .bind(exam_variant_id)
            .bind(number)
            .fetch_optional(pool)
            .await?
        }
        Bank::Mock { mock_variant_id, .. } => {
            sqlx::query_scalar(
                "SELECT question_type FROM mock_questions
                 WHERE mock_variant_id = $1 AND question_number = $2",
            )
            .bind(mock_variant_id)
            .bind(number)
            .fetch_optional(pool)
            .await?
        }
    };
    Ok(row.flatten())
}

async fn used_numbers(
    tx: &mut Transaction<'_, Postgres>,
    bank: Bank<'_>,
) -> Result<Vec<i32>, sqlx::Error> {
    match bank {
        Bank::Primary { exam_variant_id } => {
            sqlx::query_scalar(
                "SELECT question_number FROM questions
                 WHERE exam_variant_id = $1 AND mock_variant_id IS NULL",
            )
            .bind(exam_variant_id)
            .fetch_all(&mut **tx)
            .await
        }
        Bank::Mock { mock_variant_id, .. } => {
            sqlx::query_scalar("SELECT question_number FROM mock_questions WHERE mock_variant_id = $1")
                .bind(mock_variant_id)
                .fetch_all(&mut **tx)
                .await
        }
    }
}

/// Inserts a question under the smallest free number of its bank. The
/// advisory lock serialises concurrent creates within one bank.
pub(crate) async fn create_numbered(
    pool: &PgPool,
    id: &str,
    bank: Bank<'_>,
    question: &ValidatedQuestion,
    created_at: PrimitiveDateTime,
) -> Result<QuestionRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(bank.lock_key())
        .execute(&mut *tx)
        .await?;

    let number = smallest_available(&used_numbers(&mut tx, bank).await?);
    let (table, exam_variant_id, mock_variant_id) = match bank {
        Bank::Primary { exam_variant_id } => ("questions", exam_variant_id, None),
        Bank::Mock { exam_variant_id, mock_variant_id } => {
            ("mock_questions", exam_variant_id, Some(mock_variant_id))
        }
    };

    let row = sqlx::query_as::<_, QuestionRow>(&format!(
        "INSERT INTO {table} (
            id, exam_variant_id, mock_variant_id, question_number, question_type, question_text,
            options, correct_answer, correct_answers, parent_question, branch_key,
            confidence_required, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(exam_variant_id)
    .bind(mock_variant_id)
    .bind(number)
    .bind(question.question_type)
    .bind(&question.question_text)
    .bind(Json(&question.options))
    .bind(question.correct_answer.as_deref())
    .bind(Json(&question.correct_answers))
    .bind(question.parent_question)
    .bind(question.branch_key.as_deref())
    .bind(question.confidence_required)
    .bind(created_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

#[derive(Debug)]
pub(crate) enum Removal {
    Deleted,
    NotFound,
    Blocked(LinkedChildren),
}

/// Removes the question from whichever table holds it, unless other questions
/// in its bank still link to it as their parent. Holds the same per-bank lock
/// as `create_numbered`, so a freed number cannot be reused mid-check.
pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<Removal, sqlx::Error> {
    let mut tx = pool.begin().await?;

    for (table, dedicated_mock) in [("questions", false), ("mock_questions", true)] {
        let Some(target) =
            sqlx::query_as::<_, QuestionRow>(&format!("SELECT {COLUMNS} FROM {table} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            continue;
        };

        let bank = if dedicated_mock {
            Bank::new(&target.exam_variant_id, target.mock_variant_id.as_deref())
        } else {
            Bank::Primary { exam_variant_id: &target.exam_variant_id }
        };
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(bank.lock_key())
            .execute(&mut *tx)
            .await?;

        let siblings = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {COLUMNS} FROM {table}
             WHERE exam_variant_id = $1 AND mock_variant_id IS NOT DISTINCT FROM $2",
        ))
        .bind(&target.exam_variant_id)
        .bind(target.mock_variant_id.as_deref())
        .fetch_all(&mut *tx)
        .await?;
        if let Err(linked) = ensure_unlinked(&target, &siblings) {
            return Ok(Removal::Blocked(linked));
        }

        sqlx::query(&format!("DELETE FROM {table} WHERE id = $1")).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        return Ok(Removal::Deleted);
    }

    Ok(Removal::NotFound)
}

/// Rows still lacking an explicit type, for the one-off backfill.
pub(crate) async fn list_untyped(pool: &PgPool) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE question_type IS NULL
         UNION ALL
         SELECT {COLUMNS} FROM mock_questions WHERE question_type IS NULL
         ORDER BY exam_variant_id, question_number",
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn set_type(
    pool: &PgPool,
    id: &str,
    question_type: QuestionType,
) -> Result<(), sqlx::Error> {
    for table in ["questions", "mock_questions"] {
        let result = sqlx::query(&format!(
            "UPDATE {table} SET question_type = $1 WHERE id = $2 AND question_type IS NULL"
        ))
        .bind(question_type)
        .bind(id)
        .execute(pool)
        .await?;
        if result.rows_affected() > 0 {
            break;
        }
    }
    Ok(())
}
