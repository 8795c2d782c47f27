use serde::{Deserialize, Serialize};

use crate::db::types::QuestionType;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VariantAnalyticsQuery {
    #[serde(default)]
    #[serde(alias = "mockVariantId")]
    pub(crate) mock_variant_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct VariantAnalyticsResponse {
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) attempt_count: usize,
    pub(crate) distinct_students: usize,
    pub(crate) guest_attempts: usize,
    pub(crate) auto_submitted_count: usize,
    pub(crate) average_total_marks: Option<f64>,
    pub(crate) min_total_marks: Option<f64>,
    pub(crate) max_total_marks: Option<f64>,
    pub(crate) questions: Vec<QuestionStatsResponse>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct QuestionStatsResponse {
    pub(crate) question_number: i32,
    pub(crate) question_type: QuestionType,
    /// Attempts in which this question was part of the scored subset.
    pub(crate) in_scope: usize,
    pub(crate) attempted: usize,
    pub(crate) correct: usize,
    pub(crate) wrong: usize,
    pub(crate) skipped: usize,
    pub(crate) not_visited: usize,
    pub(crate) average_marks: Option<f64>,
    pub(crate) correct_rate: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct StudentAnalyticsResponse {
    pub(crate) student_id: String,
    pub(crate) attempt_count: usize,
    pub(crate) mock_attempt_count: usize,
    pub(crate) best_total_marks: Option<f64>,
    pub(crate) average_total_marks: Option<f64>,
    pub(crate) attempts: Vec<StudentAttemptSummary>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct StudentAttemptSummary {
    pub(crate) attempt_id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) duration_ms: Option<i64>,
    pub(crate) submitted_at: String,
}
