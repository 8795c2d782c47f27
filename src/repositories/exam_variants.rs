use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{ExamVariant, MockVariant};

const COLUMNS: &str = "id, title, description, created_by, created_at";
const MOCK_COLUMNS: &str = "id, exam_variant_id, title, created_at";

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    title: &str,
    description: Option<&str>,
    created_by: &str,
    created_at: PrimitiveDateTime,
) -> Result<ExamVariant, sqlx::Error> {
    sqlx::query_as::<_, ExamVariant>(&format!(
        "INSERT INTO exam_variants (id, title, description, created_by, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(created_by)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<ExamVariant>, sqlx::Error> {
    sqlx::query_as::<_, ExamVariant>(&format!(
        "SELECT {COLUMNS} FROM exam_variants ORDER BY created_at DESC, id"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<ExamVariant>, sqlx::Error> {
    sqlx::query_as::<_, ExamVariant>(&format!("SELECT {COLUMNS} FROM exam_variants WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn create_mock(
    pool: &PgPool,
    id: &str,
    exam_variant_id: &str,
    title: &str,
    created_at: PrimitiveDateTime,
) -> Result<MockVariant, sqlx::Error> {
    sqlx::query_as::<_, MockVariant>(&format!(
        "INSERT INTO mock_variants (id, exam_variant_id, title, created_at)
         VALUES ($1, $2, $3, $4)
         RETURNING {MOCK_COLUMNS}",
    ))
    .bind(id)
    .bind(exam_variant_id)
    .bind(title)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_mocks(
    pool: &PgPool,
    exam_variant_id: &str,
) -> Result<Vec<MockVariant>, sqlx::Error> {
    sqlx::query_as::<_, MockVariant>(&format!(
        "SELECT {MOCK_COLUMNS} FROM mock_variants
         WHERE exam_variant_id = $1
         ORDER BY created_at, id",
    ))
    .bind(exam_variant_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_mock(
    pool: &PgPool,
    exam_variant_id: &str,
    mock_variant_id: &str,
) -> Result<Option<MockVariant>, sqlx::Error> {
    sqlx::query_as::<_, MockVariant>(&format!(
        "SELECT {MOCK_COLUMNS} FROM mock_variants WHERE exam_variant_id = $1 AND id = $2"
    ))
    .bind(exam_variant_id)
    .bind(mock_variant_id)
    .fetch_optional(pool)
    .await
}
