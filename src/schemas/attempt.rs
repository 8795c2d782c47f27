use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime};
use validator::Validate;

use crate::core::time::{duration_ms, format_primitive};
use crate::db::models::{AttemptRow, LegacyAnswerRow};
use crate::db::types::AnswerStatus;
use crate::services::scoring::{AnswerRecord, AttemptTotals};

/// Body of `POST /attempts` and `POST /attempts/legacy`.
///
/// `exam_variant_id` is optional at the serde level so a missing identifier
/// surfaces as a domain validation error instead of a generic JSON rejection.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAttemptRequest {
    #[serde(default)]
    #[serde(alias = "examVariantId")]
    pub(crate) exam_variant_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "mockVariantId")]
    pub(crate) mock_variant_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "autoSubmitted")]
    pub(crate) auto_submitted: bool,
    #[serde(default, deserialize_with = "deserialize_option_timestamp")]
    #[serde(alias = "startedAt")]
    pub(crate) started_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_option_timestamp")]
    #[serde(alias = "endedAt")]
    pub(crate) ended_at: Option<OffsetDateTime>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) attempts: Vec<RawAnswer>,
}

/// One client-reported answer. Values are untrusted; the scoring engine
/// normalises them instead of rejecting.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub(crate) struct RawAnswer {
    #[serde(alias = "questionNumber")]
    #[validate(range(min = 1, message = "question_number must be positive"))]
    pub(crate) question_number: i32,
    #[serde(default)]
    #[serde(alias = "selectedAnswer")]
    pub(crate) selected_answer: Option<String>,
    #[serde(default)]
    #[serde(alias = "selectedAnswers")]
    pub(crate) selected_answers: Vec<String>,
    #[serde(default)]
    pub(crate) confidence: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    #[serde(alias = "firstVisitLatencyMs")]
    #[validate(range(min = 0, message = "first_visit_latency_ms must be non-negative"))]
    pub(crate) first_visit_latency_ms: Option<i64>,
    #[serde(default)]
    #[serde(alias = "visitDurationsMs")]
    #[validate(custom(function = "validate_durations"))]
    pub(crate) visit_durations_ms: Vec<i64>,
    #[serde(default)]
    #[serde(alias = "answerChanges")]
    pub(crate) answer_changes: Vec<AnswerChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AnswerChange {
    #[serde(default)]
    pub(crate) from: Option<String>,
    #[serde(default)]
    pub(crate) to: Option<String>,
    #[serde(alias = "atMs")]
    pub(crate) at_ms: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) attempted_count: i32,
    pub(crate) skipped_count: i32,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) not_visited_count: i32,
    pub(crate) detailed_attempts: Vec<AnswerRecord>,
}

impl SubmitAttemptResponse {
    pub(crate) fn new(
        attempt_id: String,
        exam_variant_id: String,
        mock_variant_id: Option<String>,
        totals: AttemptTotals,
        detailed_attempts: Vec<AnswerRecord>,
    ) -> Self {
        Self {
            attempt_id,
            exam_variant_id,
            mock_variant_id,
            total_marks: totals.total_marks,
            attempted_count: totals.attempted_count,
            skipped_count: totals.skipped_count,
            correct_count: totals.correct_count,
            wrong_count: totals.wrong_count,
            not_visited_count: totals.not_visited_count,
            detailed_attempts,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummaryResponse {
    pub(crate) id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) attempted_count: i32,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) auto_submitted: bool,
    pub(crate) submitted_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptDetailResponse {
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
    pub(crate) started_at: Option<String>,
    pub(crate) ended_at: Option<String>,
    pub(crate) duration_ms: Option<i64>,
    pub(crate) submitted_at: String,
    pub(crate) answers: Vec<AnswerRecord>,
}

impl From<AttemptRow> for AttemptSummaryResponse {
    fn from(row: AttemptRow) -> Self {
        Self {
            id: row.id,
            exam_variant_id: row.exam_variant_id,
            mock_variant_id: row.mock_variant_id,
            total_marks: row.total_marks,
            attempted_count: row.attempted_count,
            correct_count: row.correct_count,
            wrong_count: row.wrong_count,
            auto_submitted: row.auto_submitted,
            submitted_at: format_primitive(row.submitted_at),
        }
    }
}

impl From<AttemptRow> for AttemptDetailResponse {
    fn from(row: AttemptRow) -> Self {
        let duration_ms = match (row.started_at, row.ended_at) {
            (Some(start), Some(end)) => duration_ms(start.assume_utc(), end.assume_utc()),
            _ => None,
        };
        Self {
            id: row.id,
            student_id: row.student_id,
            exam_variant_id: row.exam_variant_id,
            mock_variant_id: row.mock_variant_id,
            total_marks: row.total_marks,
            attempted_count: row.attempted_count,
            skipped_count: row.skipped_count,
            correct_count: row.correct_count,
            wrong_count: row.wrong_count,
            not_visited_count: row.not_visited_count,
            auto_submitted: row.auto_submitted,
            started_at: row.started_at.map(format_primitive),
            ended_at: row.ended_at.map(format_primitive),
            duration_ms,
            submitted_at: format_primitive(row.submitted_at),
            answers: row.answers.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyAnswersQuery {
    #[serde(alias = "examVariantId")]
    pub(crate) exam_variant_id: String,
}

/// Stored legacy answer for one question.
#[derive(Debug, Serialize)]
pub(crate) struct LegacyAnswerResponse {
    pub(crate) submission_id: String,
    pub(crate) question_number: i32,
    pub(crate) status: AnswerStatus,
    pub(crate) marks: f64,
    pub(crate) is_correct: Option<bool>,
    pub(crate) answer: AnswerRecord,
    pub(crate) created_at: String,
}

impl From<LegacyAnswerRow> for LegacyAnswerResponse {
    fn from(row: LegacyAnswerRow) -> Self {
        Self {
            submission_id: row.submission_id,
            question_number: row.question_number,
            status: row.status,
            marks: row.marks,
            is_correct: row.is_correct,
            answer: row.snapshot.0,
            created_at: format_primitive(row.created_at),
        }
    }
}

fn validate_durations(durations: &[i64]) -> Result<(), validator::ValidationError> {
    if durations.iter().any(|value| *value < 0) {
        return Err(validator::ValidationError::new("visit_durations_must_be_non_negative"));
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

fn parse_timestamp_text(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    time::PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
    .map(|value| value.assume_utc())
}

fn deserialize_option_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimestamp::Millis(millis)) => {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid timestamp: {millis}")))
        }
        Some(RawTimestamp::Text(text)) => parse_timestamp_text(&text)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {text}"))),
    }
}
