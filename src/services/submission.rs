use async_trait::async_trait;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::AttemptRow;
use crate::schemas::attempt::RawAnswer;
use crate::services::scoring::{
    score_attempt, AnswerRecord, AttemptStore, AttemptTotals, BankSource, ExamTarget,
    MissingExamVariant, Question, QuestionDataError, ScoredAttempt,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("invalid question data: {0}")]
    InvalidQuestion(#[from] QuestionDataError),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SubmissionError {
    #[error(transparent)]
    MissingExamVariant(#[from] MissingExamVariant),
    #[error("at most {limit} answers may be submitted")]
    TooManyAnswers { limit: usize },
    #[error("legacy submissions only cover the main exam")]
    LegacyMockUnsupported,
    #[error("no questions found for this variant")]
    EmptyBank,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SubmissionError {
    /// Metric label for rejected submissions; `None` for server faults.
    pub(crate) fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            Self::MissingExamVariant(_) => Some("missing_exam_variant"),
            Self::TooManyAnswers { .. } => Some("too_many_answers"),
            Self::LegacyMockUnsupported => Some("legacy_mock"),
            Self::EmptyBank => Some("empty_bank"),
            Self::Store(_) => None,
        }
    }
}

#[async_trait]
pub(crate) trait QuestionBankReader: Send + Sync {
    async fn find_in(
        &self,
        source: BankSource,
        exam_variant_id: &str,
        mock_variant_id: Option<&str>,
    ) -> Result<Vec<Question>, StoreError>;

    /// Tries the target's sources in order and returns the first non-empty bank.
    async fn find_by_variant(&self, target: &ExamTarget) -> Result<Vec<Question>, StoreError> {
        for source in target.bank_sources() {
            let questions =
                self.find_in(*source, target.exam_variant_id(), target.mock_variant_id()).await?;
            if !questions.is_empty() {
                if *source == BankSource::LegacyCoMingled {
                    tracing::info!(
                        exam_variant_id = %target.exam_variant_id(),
                        mock_variant_id = ?target.mock_variant_id(),
                        "Serving mock bank from co-mingled question rows"
                    );
                }
                return Ok(questions);
            }
        }
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewAttempt {
    pub(crate) id: String,
    pub(crate) store: AttemptStore,
    pub(crate) student_id: Option<String>,
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) totals: AttemptTotals,
    pub(crate) auto_submitted: bool,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) ended_at: Option<PrimitiveDateTime>,
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[async_trait]
pub(crate) trait AttemptWriter: Send + Sync {
    /// Single insert of the whole attempt.
    async fn save(&self, attempt: &NewAttempt) -> Result<String, StoreError>;
}

#[async_trait]
pub(crate) trait AttemptReplacer: Send + Sync {
    /// Swaps every stored answer of `student_id` for `exam_variant_id` in one transaction.
    async fn replace(
        &self,
        student_id: &str,
        exam_variant_id: &str,
        submission_id: &str,
        answers: &[AnswerRecord],
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub(crate) trait AttemptReader: Send + Sync {
    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<AttemptRow>, StoreError>;

    async fn list_for_student(&self, student_id: &str) -> Result<Vec<AttemptRow>, StoreError>;

    async fn list_for_variant(
        &self,
        exam_variant_id: &str,
        mock_variant_id: Option<&str>,
    ) -> Result<Vec<AttemptRow>, StoreError>;
}

pub(crate) trait ExamStore: QuestionBankReader + AttemptWriter + AttemptReplacer + AttemptReader {}

impl<T> ExamStore for T where T: QuestionBankReader + AttemptWriter + AttemptReplacer + AttemptReader {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PersistMode {
    Attempt,
    /// Legacy per-question rows, replaced for this student on every submission.
    ReplaceForStudent { student_id: String },
}

#[derive(Debug, Clone)]
pub(crate) struct Submission {
    pub(crate) exam_variant_id: Option<String>,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) auto_submitted: bool,
    pub(crate) started_at: Option<OffsetDateTime>,
    pub(crate) ended_at: Option<OffsetDateTime>,
    pub(crate) answers: Vec<RawAnswer>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmissionOutcome {
    pub(crate) attempt_id: String,
    pub(crate) target: ExamTarget,
    pub(crate) scored: ScoredAttempt,
}

pub(crate) async fn submit(
    store: &dyn ExamStore,
    submission: Submission,
    mode: PersistMode,
    max_answers: usize,
) -> Result<SubmissionOutcome, SubmissionError> {
    let result = run_submission(store, submission, mode, max_answers).await;
    if let Err(err) = &result {
        if let Some(reason) = err.rejection_reason() {
            crate::core::metrics::record_rejected_submission(reason);
        }
    }
    result
}

async fn run_submission(
    store: &dyn ExamStore,
    submission: Submission,
    mode: PersistMode,
    max_answers: usize,
) -> Result<SubmissionOutcome, SubmissionError> {
    let target = ExamTarget::select(
        submission.exam_variant_id.as_deref(),
        submission.mock_variant_id.as_deref(),
    )?;
    if submission.answers.len() > max_answers {
        return Err(SubmissionError::TooManyAnswers { limit: max_answers });
    }
    if matches!(mode, PersistMode::ReplaceForStudent { .. }) && target.store() == AttemptStore::Mock
    {
        return Err(SubmissionError::LegacyMockUnsupported);
    }

    let questions = store.find_by_variant(&target).await?;
    if questions.is_empty() {
        tracing::info!(
            exam_variant_id = %target.exam_variant_id(),
            mock_variant_id = ?target.mock_variant_id(),
            "Submission rejected: empty question bank"
        );
        return Err(SubmissionError::EmptyBank);
    }

    let scored = score_attempt(&questions, &submission.answers, &target.profile());
    let attempt_id = Uuid::new_v4().to_string();

    let store_label = match &mode {
        PersistMode::Attempt => {
            let attempt = NewAttempt {
                id: attempt_id.clone(),
                store: target.store(),
                student_id: submission.student_id.clone(),
                exam_variant_id: target.exam_variant_id().to_string(),
                mock_variant_id: target.mock_variant_id().map(str::to_string),
                totals: scored.totals,
                auto_submitted: submission.auto_submitted,
                started_at: submission.started_at.map(to_primitive_utc),
                ended_at: submission.ended_at.map(to_primitive_utc),
                answers: scored.records.clone(),
                submitted_at: primitive_now_utc(),
            };
            store.save(&attempt).await?;
            target.label()
        }
        PersistMode::ReplaceForStudent { student_id } => {
            store
                .replace(student_id, target.exam_variant_id(), &attempt_id, &scored.records)
                .await?;
            "legacy"
        }
    };

    crate::core::metrics::record_attempt(store_label, scored.totals.total_marks);
    tracing::info!(
        attempt_id = %attempt_id,
        store = store_label,
        exam_variant_id = %target.exam_variant_id(),
        mock_variant_id = ?target.mock_variant_id(),
        student_id = ?submission.student_id,
        questions = scored.records.len(),
        total_marks = scored.totals.total_marks,
        auto_submitted = submission.auto_submitted,
        "Attempt scored and stored"
    );

    Ok(SubmissionOutcome { attempt_id, target, scored })
}
