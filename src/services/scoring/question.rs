use std::collections::BTreeSet;

use crate::db::models::QuestionRow;
use crate::db::types::{BranchKey, OptionLabel, QuestionType};

/// A bank question with its scoring data checked and typed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) number: i32,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QuestionKind {
    Simple { correct: OptionLabel },
    Multiple { correct: BTreeSet<OptionLabel> },
    Confidence { correct: OptionLabel },
    BranchParent,
    /// `link` is `None` when the stored parent reference is unusable; such a
    /// child is scored like a simple question.
    BranchChild { correct: OptionLabel, link: Option<BranchLink> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BranchLink {
    pub(crate) parent_question: i32,
    pub(crate) branch_key: BranchKey,
}

impl QuestionKind {
    pub(crate) fn question_type(&self) -> QuestionType {
        match self {
            Self::Simple { .. } => QuestionType::Simple,
            Self::Multiple { .. } => QuestionType::Multiple,
            Self::Confidence { .. } => QuestionType::Confidence,
            Self::BranchParent => QuestionType::BranchParent,
            Self::BranchChild { .. } => QuestionType::BranchChild,
        }
    }

    pub(crate) fn correct_answer(&self) -> Option<OptionLabel> {
        match self {
            Self::Simple { correct }
            | Self::Confidence { correct }
            | Self::BranchChild { correct, .. } => Some(*correct),
            Self::Multiple { .. } | Self::BranchParent => None,
        }
    }

    pub(crate) fn correct_answers(&self) -> Vec<OptionLabel> {
        match self {
            Self::Multiple { correct } => correct.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn branch_link(&self) -> Option<BranchLink> {
        match self {
            Self::BranchChild { link, .. } => *link,
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum QuestionDataError {
    #[error("question {number} has no question_type")]
    MissingType { number: i32 },
    #[error("question {number} has no correct_answer")]
    MissingCorrectAnswer { number: i32 },
    #[error("question {number} has invalid correct answer label {value:?}")]
    InvalidCorrectAnswer { number: i32, value: String },
    #[error("question {number} has an empty correct_answers set")]
    EmptyCorrectSet { number: i32 },
}

impl TryFrom<QuestionRow> for Question {
    type Error = QuestionDataError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let number = row.question_number;
        let stored_type = row.question_type.ok_or(QuestionDataError::MissingType { number })?;
        let effective_type =
            if row.confidence_required { QuestionType::Confidence } else { stored_type };

        let kind = match effective_type {
            QuestionType::Simple => QuestionKind::Simple {
                correct: single_correct(number, row.correct_answer.as_deref())?,
            },
            QuestionType::Confidence => QuestionKind::Confidence {
                correct: single_correct(number, row.correct_answer.as_deref())?,
            },
            QuestionType::Multiple => {
                let mut correct = BTreeSet::new();
                for value in row.correct_answers.0.iter() {
                    let label = OptionLabel::parse(value).ok_or_else(|| {
                        QuestionDataError::InvalidCorrectAnswer { number, value: value.clone() }
                    })?;
                    correct.insert(label);
                }
                if correct.is_empty() {
                    return Err(QuestionDataError::EmptyCorrectSet { number });
                }
                QuestionKind::Multiple { correct }
            }
            QuestionType::BranchParent => QuestionKind::BranchParent,
            QuestionType::BranchChild => {
                let correct = single_correct(number, row.correct_answer.as_deref())?;
                let link = branch_link(row.parent_question, row.branch_key.as_deref());
                if link.is_none() {
                    tracing::warn!(
                        question_id = %row.id,
                        question_number = number,
                        parent_question = ?row.parent_question,
                        branch_key = ?row.branch_key,
                        "branch_child without a usable parent link; scoring as always visible"
                    );
                }
                QuestionKind::BranchChild { correct, link }
            }
        };

        Ok(Self {
            id: row.id,
            number,
            text: row.question_text,
            options: row.options.0,
            kind,
        })
    }
}

fn single_correct(number: i32, value: Option<&str>) -> Result<OptionLabel, QuestionDataError> {
    let value = value.ok_or(QuestionDataError::MissingCorrectAnswer { number })?;
    OptionLabel::parse(value)
        .ok_or_else(|| QuestionDataError::InvalidCorrectAnswer { number, value: value.to_string() })
}

fn branch_link(parent_question: Option<i32>, branch_key: Option<&str>) -> Option<BranchLink> {
    let parent_question = parent_question.filter(|value| *value > 0)?;
    let branch_key = BranchKey::parse(branch_key?)?;
    Some(BranchLink { parent_question, branch_key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn row(question_type: Option<QuestionType>) -> QuestionRow {
        QuestionRow {
            id: "q-1".to_string(),
            exam_variant_id: "ev-1".to_string(),
            mock_variant_id: None,
            question_number: 3,
            question_type,
            question_text: "Pick one".to_string(),
            options: Json(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
            correct_answer: Some("B".to_string()),
            correct_answers: Json(Vec::new()),
            parent_question: None,
            branch_key: None,
            confidence_required: false,
            created_at: crate::core::time::primitive_now_utc(),
        }
    }

    #[test]
    fn simple_row_converts() {
        let question = Question::try_from(row(Some(QuestionType::Simple))).unwrap();
        assert_eq!(question.kind, QuestionKind::Simple { correct: OptionLabel::B });
        assert_eq!(question.number, 3);
    }

    #[test]
    fn confidence_required_forces_confidence_kind() {
        let mut source = row(Some(QuestionType::Simple));
        source.confidence_required = true;
        let question = Question::try_from(source).unwrap();
        assert_eq!(question.kind, QuestionKind::Confidence { correct: OptionLabel::B });
    }

    #[test]
    fn missing_type_is_a_data_error() {
        assert_eq!(
            Question::try_from(row(None)).unwrap_err(),
            QuestionDataError::MissingType { number: 3 }
        );
    }

    #[test]
    fn multiple_requires_valid_non_empty_set() {
        let mut source = row(Some(QuestionType::Multiple));
        source.correct_answers = Json(vec!["A".into(), "C".into(), "A".into()]);
        let question = Question::try_from(source.clone()).unwrap();
        assert_eq!(question.kind.correct_answers(), vec![OptionLabel::A, OptionLabel::C]);

        source.correct_answers = Json(Vec::new());
        assert_eq!(
            Question::try_from(source.clone()).unwrap_err(),
            QuestionDataError::EmptyCorrectSet { number: 3 }
        );

        source.correct_answers = Json(vec!["E".into()]);
        assert!(matches!(
            Question::try_from(source),
            Err(QuestionDataError::InvalidCorrectAnswer { .. })
        ));
    }

    #[test]
    fn branch_child_keeps_link_or_falls_back() {
        let mut source = row(Some(QuestionType::BranchChild));
        source.parent_question = Some(1);
        source.branch_key = Some("B".to_string());
        let linked = Question::try_from(source.clone()).unwrap();
        assert_eq!(
            linked.kind.branch_link(),
            Some(BranchLink { parent_question: 1, branch_key: BranchKey::B })
        );

        source.branch_key = Some("C".to_string());
        let fallback = Question::try_from(source.clone()).unwrap();
        assert_eq!(fallback.kind.branch_link(), None);
        assert_eq!(fallback.kind.question_type(), QuestionType::BranchChild);

        source.branch_key = Some("A".to_string());
        source.parent_question = None;
        assert_eq!(Question::try_from(source).unwrap().kind.branch_link(), None);
    }
}
