use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AnswerStatus, QuestionType, UserRole};
use crate::services::scoring::AnswerRecord;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) email: Option<String>,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamVariant {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct MockVariant {
    pub(crate) id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) title: String,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Flat storage shape shared by `questions` and `mock_questions`.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) question_number: i32,
    /// Nullable only for rows imported before the type column existed.
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) question_text: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) correct_answers: Json<Vec<String>>,
    pub(crate) parent_question: Option<i32>,
    pub(crate) branch_key: Option<String>,
    pub(crate) confidence_required: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AttemptRow {
    pub(crate) id: String,
    pub(crate) student_id: Option<String>,
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) attempted_count: i32,
    pub(crate) skipped_count: i32,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) not_visited_count: i32,
    pub(crate) auto_submitted: bool,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) ended_at: Option<PrimitiveDateTime>,
    pub(crate) answers: Json<Vec<AnswerRecord>>,
    pub(crate) submitted_at: PrimitiveDateTime,
}

/// One row per question in the legacy per-student answer table.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct LegacyAnswerRow {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) student_id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) question_number: i32,
    pub(crate) status: AnswerStatus,
    pub(crate) marks: f64,
    pub(crate) is_correct: Option<bool>,
    pub(crate) snapshot: Json<AnswerRecord>,
    pub(crate) created_at: PrimitiveDateTime,
}
