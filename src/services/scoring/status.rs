use crate::db::types::{AnswerStatus, QuestionType};

use super::normalize::NormalizedAnswer;

/// Settles the claimed status against the selection actually present.
///
/// A skipped answer keeps its status and loses its selection, so after this
/// step `Attempted` holds exactly when a selection exists.
pub(crate) fn reconcile_status(
    question_type: QuestionType,
    answer: NormalizedAnswer,
    claimed: Option<&str>,
) -> (AnswerStatus, NormalizedAnswer) {
    let has_selection = answer.has_selection(question_type);

    match AnswerStatus::parse_lenient(claimed) {
        AnswerStatus::Attempted if has_selection => (AnswerStatus::Attempted, answer),
        AnswerStatus::Attempted => (AnswerStatus::NotVisited, answer),
        AnswerStatus::NotVisited if has_selection => (AnswerStatus::Attempted, answer),
        AnswerStatus::NotVisited => (AnswerStatus::NotVisited, answer),
        AnswerStatus::Skipped => (AnswerStatus::Skipped, answer.cleared()),
    }
}
