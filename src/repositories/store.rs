use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::time::primitive_now_utc;
use crate::db::models::AttemptRow;
use crate::repositories;
use crate::services::scoring::{AnswerRecord, BankSource, Question};
use crate::services::submission::{
    AttemptReader, AttemptReplacer, AttemptWriter, NewAttempt, QuestionBankReader, StoreError,
};

/// Postgres-backed implementation of the submission collaborators.
#[derive(Clone)]
pub(crate) struct PgExamStore {
    pool: PgPool,
}

impl PgExamStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionBankReader for PgExamStore {
    async fn find_in(
        &self,
        source: BankSource,
        exam_variant_id: &str,
        mock_variant_id: Option<&str>,
    ) -> Result<Vec<Question>, StoreError> {
        let rows = repositories::questions::list_for_source(
            &self.pool,
            source,
            exam_variant_id,
            mock_variant_id,
        )
        .await?;

        rows.into_iter()
            .map(|row| Question::try_from(row).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl AttemptWriter for PgExamStore {
    async fn save(&self, attempt: &NewAttempt) -> Result<String, StoreError> {
        repositories::attempts::insert(&self.pool, attempt).await?;
        Ok(attempt.id.clone())
    }
}

#[async_trait]
impl AttemptReplacer for PgExamStore {
    async fn replace(
        &self,
        student_id: &str,
        exam_variant_id: &str,
        submission_id: &str,
        answers: &[AnswerRecord],
    ) -> Result<(), StoreError> {
        repositories::exam_answers::replace_for_student(
            &self.pool,
            student_id,
            exam_variant_id,
            submission_id,
            answers,
            primitive_now_utc(),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AttemptReader for PgExamStore {
    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<AttemptRow>, StoreError> {
        Ok(repositories::attempts::find_by_id(&self.pool, attempt_id).await?)
    }

    async fn list_for_student(&self, student_id: &str) -> Result<Vec<AttemptRow>, StoreError> {
        Ok(repositories::attempts::list_for_student(&self.pool, student_id).await?)
    }

    async fn list_for_variant(
        &self,
        exam_variant_id: &str,
        mock_variant_id: Option<&str>,
    ) -> Result<Vec<AttemptRow>, StoreError> {
        Ok(repositories::attempts::list_for_variant(&self.pool, exam_variant_id, mock_variant_id)
            .await?)
    }
}
