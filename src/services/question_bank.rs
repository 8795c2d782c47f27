use std::collections::BTreeSet;

use crate::db::models::QuestionRow;
use crate::db::types::{BranchKey, OptionLabel, QuestionType};
use crate::schemas::question::QuestionCreate;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum BankValidationError {
    #[error("{question_type} questions need exactly {expected} options")]
    OptionCount { question_type: &'static str, expected: usize },
    #[error("correct_answer must be one of A, B, C, D")]
    InvalidCorrectAnswer,
    #[error("correct_answers must be a non-empty set of A, B, C, D")]
    InvalidCorrectAnswers,
    #[error("branch_parent questions carry no correct answer")]
    ParentWithAnswer,
    #[error("branch_child questions need parent_question and branch_key A or B")]
    MissingBranchLink,
    #[error("parent_question {0} is not a branch_parent in this bank")]
    UnknownParent(i32),
    #[error("only branch_child questions may set parent_question or branch_key")]
    UnexpectedBranchLink,
}

/// Deleting a parent would strand children that still point at its number.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("question {number} is the parent of questions {children:?}; delete those first")]
pub(crate) struct LinkedChildren {
    pub(crate) number: i32,
    pub(crate) children: Vec<i32>,
}

/// A question ready to insert, with labels in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidatedQuestion {
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) correct_answers: Vec<String>,
    pub(crate) parent_question: Option<i32>,
    pub(crate) branch_key: Option<String>,
    pub(crate) confidence_required: bool,
}

/// Checks a new question against the bank rules. `parent_type` is the stored
/// type of the question named by `parent_question`, if it exists in the bank.
pub(crate) fn validate_question(
    payload: &QuestionCreate,
    parent_type: Option<QuestionType>,
) -> Result<ValidatedQuestion, BankValidationError> {
    let question_type =
        if payload.confidence_required { QuestionType::Confidence } else { payload.question_type };

    let expected_options = if question_type == QuestionType::BranchParent { 2 } else { 4 };
    if payload.options.len() != expected_options {
        return Err(BankValidationError::OptionCount {
            question_type: question_type.as_str(),
            expected: expected_options,
        });
    }

    let mut correct_answer = None;
    let mut correct_answers = Vec::new();
    match question_type {
        QuestionType::Simple | QuestionType::Confidence | QuestionType::BranchChild => {
            let label = payload
                .correct_answer
                .as_deref()
                .and_then(OptionLabel::parse)
                .ok_or(BankValidationError::InvalidCorrectAnswer)?;
            correct_answer = Some(label.to_string());
        }
        QuestionType::Multiple => {
            let mut labels = BTreeSet::new();
            for value in &payload.correct_answers {
                labels.insert(
                    OptionLabel::parse(value).ok_or(BankValidationError::InvalidCorrectAnswers)?,
                );
            }
            if labels.is_empty() {
                return Err(BankValidationError::InvalidCorrectAnswers);
            }
            correct_answers = labels.iter().map(ToString::to_string).collect();
        }
        QuestionType::BranchParent => {
            if payload.correct_answer.is_some() || !payload.correct_answers.is_empty() {
                return Err(BankValidationError::ParentWithAnswer);
            }
        }
    }

    let (parent_question, branch_key) = if question_type == QuestionType::BranchChild {
        let parent = payload.parent_question.ok_or(BankValidationError::MissingBranchLink)?;
        let key = payload
            .branch_key
            .as_deref()
            .and_then(BranchKey::parse)
            .ok_or(BankValidationError::MissingBranchLink)?;
        if parent_type != Some(QuestionType::BranchParent) {
            return Err(BankValidationError::UnknownParent(parent));
        }
        (Some(parent), Some(key.as_str().to_string()))
    } else {
        if payload.parent_question.is_some() || payload.branch_key.is_some() {
            return Err(BankValidationError::UnexpectedBranchLink);
        }
        (None, None)
    };

    Ok(ValidatedQuestion {
        question_type,
        question_text: payload.question_text.trim().to_string(),
        options: payload.options.iter().map(|option| option.trim().to_string()).collect(),
        correct_answer,
        correct_answers,
        parent_question,
        branch_key,
        confidence_required: payload.confidence_required,
    })
}

/// Smallest positive number absent from `used`.
pub(crate) fn smallest_available(used: &[i32]) -> i32 {
    let taken: BTreeSet<i32> = used.iter().copied().filter(|number| *number > 0).collect();
    let mut candidate = 1;
    for number in taken {
        if number != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

/// Fails when another question in `bank` names `target` as its parent.
pub(crate) fn ensure_unlinked(target: &QuestionRow, bank: &[QuestionRow]) -> Result<(), LinkedChildren> {
    let mut children: Vec<i32> = bank
        .iter()
        .filter(|row| row.id != target.id && row.parent_question == Some(target.question_number))
        .map(|row| row.question_number)
        .collect();
    if children.is_empty() {
        return Ok(());
    }
    children.sort_unstable();
    Err(LinkedChildren { number: target.question_number, children })
}

/// Type of a row stored before the type column existed, read off its shape.
/// Checked in order: two options, a branch link, the confidence flag, a
/// correct-answer set; anything else is `simple`.
pub(crate) fn infer_question_type(row: &QuestionRow) -> QuestionType {
    if row.options.0.len() == 2 {
        QuestionType::BranchParent
    } else if row.parent_question.is_some() && row.branch_key.is_some() {
        QuestionType::BranchChild
    } else if row.confidence_required {
        QuestionType::Confidence
    } else if !row.correct_answers.0.is_empty() {
        QuestionType::Multiple
    } else {
        QuestionType::Simple
    }
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;

    use super::*;
    use crate::core::time::primitive_now_utc;

    fn payload(question_type: QuestionType) -> QuestionCreate {
        QuestionCreate {
            mock_variant_id: None,
            question_type,
            question_text: " What is 2 + 2? ".to_string(),
            options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            correct_answer: Some("D".to_string()),
            correct_answers: Vec::new(),
            parent_question: None,
            branch_key: None,
            confidence_required: false,
        }
    }

    #[test]
    fn gap_filling_numbering() {
        assert_eq!(smallest_available(&[]), 1);
        assert_eq!(smallest_available(&[1, 2, 3]), 4);
        assert_eq!(smallest_available(&[3, 1, 4]), 2);
        assert_eq!(smallest_available(&[2, 2, 5]), 1);
        assert_eq!(smallest_available(&[0, -1, 1]), 2);
    }

    #[test]
    fn simple_question_is_normalized() {
        let validated = validate_question(&payload(QuestionType::Simple), None).unwrap();
        assert_eq!(validated.question_text, "What is 2 + 2?");
        assert_eq!(validated.correct_answer.as_deref(), Some("D"));
    }

    #[test]
    fn option_counts_are_enforced() {
        let mut parent = payload(QuestionType::BranchParent);
        parent.correct_answer = None;
        assert_eq!(
            validate_question(&parent, None).unwrap_err(),
            BankValidationError::OptionCount { question_type: "branch_parent", expected: 2 }
        );

        parent.options.truncate(2);
        assert!(validate_question(&parent, None).is_ok());
    }

    #[test]
    fn confidence_required_forces_type() {
        let mut draft = payload(QuestionType::Simple);
        draft.confidence_required = true;
        let validated = validate_question(&draft, None).unwrap();
        assert_eq!(validated.question_type, QuestionType::Confidence);
    }

    #[test]
    fn multiple_needs_valid_set() {
        let mut draft = payload(QuestionType::Multiple);
        draft.correct_answers = vec!["C".into(), "A".into(), "C".into()];
        let validated = validate_question(&draft, None).unwrap();
        assert_eq!(validated.correct_answers, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(validated.correct_answer, None);

        draft.correct_answers = vec!["A".into(), "F".into()];
        assert_eq!(
            validate_question(&draft, None).unwrap_err(),
            BankValidationError::InvalidCorrectAnswers
        );
    }

    #[test]
    fn branch_child_needs_existing_parent() {
        let mut draft = payload(QuestionType::BranchChild);
        draft.parent_question = Some(1);
        draft.branch_key = Some("B".to_string());

        assert!(validate_question(&draft, Some(QuestionType::BranchParent)).is_ok());
        assert_eq!(
            validate_question(&draft, Some(QuestionType::Simple)).unwrap_err(),
            BankValidationError::UnknownParent(1)
        );

        draft.branch_key = Some("C".to_string());
        assert_eq!(
            validate_question(&draft, Some(QuestionType::BranchParent)).unwrap_err(),
            BankValidationError::MissingBranchLink
        );

        let mut stray = payload(QuestionType::Simple);
        stray.parent_question = Some(1);
        assert_eq!(
            validate_question(&stray, None).unwrap_err(),
            BankValidationError::UnexpectedBranchLink
        );
    }

    fn untyped_row(options: usize) -> QuestionRow {
        QuestionRow {
            id: "q-1".to_string(),
            exam_variant_id: "ev-1".to_string(),
            mock_variant_id: None,
            question_number: 1,
            question_type: None,
            question_text: "Legacy".to_string(),
            options: Json((0..options).map(|i| format!("option {i}")).collect()),
            correct_answer: Some("A".to_string()),
            correct_answers: Json(Vec::new()),
            parent_question: None,
            branch_key: None,
            confidence_required: false,
            created_at: primitive_now_utc(),
        }
    }

    fn numbered(id: &str, number: i32, parent_question: Option<i32>) -> QuestionRow {
        QuestionRow {
            id: id.to_string(),
            question_number: number,
            parent_question,
            branch_key: parent_question.map(|_| "A".to_string()),
            ..untyped_row(4)
        }
    }

    #[test]
    fn parent_with_children_cannot_be_removed() {
        let parent = QuestionRow { id: "p".to_string(), ..untyped_row(2) };
        let bank = vec![
            parent.clone(),
            numbered("c3", 3, Some(1)),
            numbered("c2", 2, Some(1)),
            numbered("s4", 4, None),
        ];

        let err = ensure_unlinked(&parent, &bank).unwrap_err();
        assert_eq!(err, LinkedChildren { number: 1, children: vec![2, 3] });

        let orphaned: Vec<QuestionRow> = bank.into_iter().filter(|row| row.id != "c2" && row.id != "c3").collect();
        assert!(ensure_unlinked(&parent, &orphaned).is_ok());
    }

    #[test]
    fn children_and_plain_questions_are_removable() {
        let bank = vec![numbered("p", 1, None), numbered("c2", 2, Some(1)), numbered("s3", 3, None)];
        assert!(ensure_unlinked(&bank[1], &bank).is_ok());
        assert!(ensure_unlinked(&bank[2], &bank).is_ok());
    }

    #[test]
    fn infers_type_from_row_shape() {
        assert_eq!(infer_question_type(&untyped_row(2)), QuestionType::BranchParent);
        assert_eq!(infer_question_type(&untyped_row(4)), QuestionType::Simple);

        let child = QuestionRow {
            parent_question: Some(1),
            branch_key: Some("A".to_string()),
            ..untyped_row(4)
        };
        assert_eq!(infer_question_type(&child), QuestionType::BranchChild);

        let confidence = QuestionRow { confidence_required: true, ..untyped_row(4) };
        assert_eq!(infer_question_type(&confidence), QuestionType::Confidence);

        let multiple = QuestionRow {
            correct_answer: None,
            correct_answers: Json(vec!["A".to_string(), "B".to_string()]),
            ..untyped_row(4)
        };
        assert_eq!(infer_question_type(&multiple), QuestionType::Multiple);
    }
}
