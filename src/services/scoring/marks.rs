use crate::db::types::{AnswerStatus, ConfidenceLevel, OptionLabel};

use super::normalize::NormalizedAnswer;
use super::question::QuestionKind;

const SIMPLE_CORRECT: f64 = 1.0;
const SIMPLE_WRONG: f64 = -0.25;
const MULTIPLE_FULL_CREDIT: f64 = 2.0;

/// Penalties that differ between the primary and mock banks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PenaltyTable {
    pub(crate) wrong_multiple: f64,
}

impl PenaltyTable {
    pub(crate) const MAIN: Self = Self { wrong_multiple: -0.25 };
    pub(crate) const MOCK: Self = Self { wrong_multiple: -0.5 };
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MarkOutcome {
    pub(crate) marks: f64,
    pub(crate) is_correct: Option<bool>,
    pub(crate) reason: String,
}

impl MarkOutcome {
    fn unscored(reason: &str) -> Self {
        Self { marks: 0.0, is_correct: None, reason: reason.to_string() }
    }

    pub(crate) fn branch_parent() -> Self {
        Self::unscored("branch parent: choice only, 0")
    }

    pub(crate) fn branch_not_taken() -> Self {
        Self::unscored("branch not taken: 0")
    }

    fn graded(marks: f64, is_correct: bool, label: &str) -> Self {
        Self { marks, is_correct: Some(is_correct), reason: format!("{label}: {}", fmt_marks(marks)) }
    }
}

fn confidence_marks(level: ConfidenceLevel) -> (f64, f64) {
    match level {
        ConfidenceLevel::High => (2.0, -0.5),
        ConfidenceLevel::Mid => (1.0, -0.25),
        ConfidenceLevel::Low => (0.25, -0.10),
    }
}

pub(crate) fn score_answer(
    kind: &QuestionKind,
    answer: &NormalizedAnswer,
    status: AnswerStatus,
    penalties: &PenaltyTable,
) -> MarkOutcome {
    if matches!(kind, QuestionKind::BranchParent) {
        return MarkOutcome::branch_parent();
    }
    match status {
        AnswerStatus::Attempted => {}
        AnswerStatus::Skipped => return MarkOutcome::unscored("skipped: 0"),
        AnswerStatus::NotVisited => return MarkOutcome::unscored("not visited: 0"),
    }

    match kind {
        QuestionKind::Simple { correct } | QuestionKind::BranchChild { correct, .. } => {
            match answer.selected_answer {
                None => MarkOutcome::unscored("no answer: 0"),
                Some(selected) if selected == *correct => {
                    MarkOutcome::graded(SIMPLE_CORRECT, true, "correct")
                }
                Some(_) => MarkOutcome::graded(SIMPLE_WRONG, false, "wrong"),
            }
        }
        QuestionKind::Confidence { correct } => {
            let (reward, penalty) = confidence_marks(answer.confidence);
            let level = answer.confidence.as_str();
            match answer.selected_answer {
                None => MarkOutcome::unscored("no answer: 0"),
                Some(selected) if selected == *correct => {
                    MarkOutcome::graded(reward, true, &format!("correct at {level} confidence"))
                }
                Some(_) => MarkOutcome::graded(penalty, false, &format!("wrong at {level} confidence")),
            }
        }
        QuestionKind::Multiple { correct } => {
            score_multiple(correct, &answer.selected_answers, penalties)
        }
        QuestionKind::BranchParent => MarkOutcome::branch_parent(),
    }
}

fn score_multiple(
    correct: &std::collections::BTreeSet<OptionLabel>,
    selected: &[OptionLabel],
    penalties: &PenaltyTable,
) -> MarkOutcome {
    if selected.is_empty() {
        return MarkOutcome::unscored("no answer: 0");
    }
    if selected.iter().any(|label| !correct.contains(label)) {
        return MarkOutcome::graded(penalties.wrong_multiple, false, "wrong option selected");
    }

    let matched = selected.len();
    if matched == correct.len() {
        return MarkOutcome::graded(MULTIPLE_FULL_CREDIT, true, "all correct options");
    }

    let per_option = MULTIPLE_FULL_CREDIT / correct.len() as f64;
    MarkOutcome::graded(
        per_option * matched as f64,
        false,
        &format!("partial {matched}/{} correct options", correct.len()),
    )
}

/// Signed marks with at most two decimals, e.g. `+1`, `-0.25`, `+0.67`.
pub(crate) fn fmt_marks(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }

    let mut digits = format!("{:.2}", rounded.abs());
    while digits.ends_with('0') {
        digits.pop();
    }
    if digits.ends_with('.') {
        digits.pop();
    }
    let sign = if rounded > 0.0 { '+' } else { '-' };
    format!("{sign}{digits}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn single(label: Option<OptionLabel>, confidence: ConfidenceLevel) -> NormalizedAnswer {
        NormalizedAnswer { selected_answer: label, selected_answers: Vec::new(), confidence }
    }

    fn many(labels: &[OptionLabel]) -> NormalizedAnswer {
        NormalizedAnswer { selected_answers: labels.to_vec(), ..NormalizedAnswer::default() }
    }

    fn multiple(labels: &[OptionLabel]) -> QuestionKind {
        QuestionKind::Multiple { correct: labels.iter().copied().collect::<BTreeSet<_>>() }
    }

    #[test]
    fn simple_table() {
        let kind = QuestionKind::Simple { correct: OptionLabel::B };
        let right = score_answer(
            &kind,
            &single(Some(OptionLabel::B), ConfidenceLevel::Mid),
            AnswerStatus::Attempted,
            &PenaltyTable::MAIN,
        );
        assert_eq!((right.marks, right.is_correct), (1.0, Some(true)));
        assert_eq!(right.reason, "correct: +1");

        let wrong = score_answer(
            &kind,
            &single(Some(OptionLabel::C), ConfidenceLevel::Mid),
            AnswerStatus::Attempted,
            &PenaltyTable::MAIN,
        );
        assert_eq!((wrong.marks, wrong.is_correct), (-0.25, Some(false)));
        assert_eq!(wrong.reason, "wrong: -0.25");

        let skipped =
            score_answer(&kind, &NormalizedAnswer::default(), AnswerStatus::Skipped, &PenaltyTable::MAIN);
        assert_eq!((skipped.marks, skipped.is_correct), (0.0, None));
    }

    #[test]
    fn confidence_table() {
        let kind = QuestionKind::Confidence { correct: OptionLabel::A };
        let cases = [
            (ConfidenceLevel::High, OptionLabel::A, 2.0, true),
            (ConfidenceLevel::High, OptionLabel::B, -0.5, false),
            (ConfidenceLevel::Mid, OptionLabel::A, 1.0, true),
            (ConfidenceLevel::Mid, OptionLabel::B, -0.25, false),
            (ConfidenceLevel::Low, OptionLabel::A, 0.25, true),
            (ConfidenceLevel::Low, OptionLabel::B, -0.10, false),
        ];

        for (level, selected, marks, correct) in cases {
            let outcome = score_answer(
                &kind,
                &single(Some(selected), level),
                AnswerStatus::Attempted,
                &PenaltyTable::MOCK,
            );
            assert_eq!(outcome.marks, marks, "{level:?} {selected:?}");
            assert_eq!(outcome.is_correct, Some(correct));
        }
    }

    #[test]
    fn multiple_exact_partial_and_wrong() {
        let kind = multiple(&[OptionLabel::A, OptionLabel::C]);

        let exact = score_answer(
            &kind,
            &many(&[OptionLabel::C, OptionLabel::A]),
            AnswerStatus::Attempted,
            &PenaltyTable::MOCK,
        );
        assert_eq!((exact.marks, exact.is_correct), (2.0, Some(true)));

        let partial =
            score_answer(&kind, &many(&[OptionLabel::A]), AnswerStatus::Attempted, &PenaltyTable::MOCK);
        assert_eq!((partial.marks, partial.is_correct), (1.0, Some(false)));

        for (table, expected) in [(PenaltyTable::MAIN, -0.25), (PenaltyTable::MOCK, -0.5)] {
            let wrong = score_answer(
                &kind,
                &many(&[OptionLabel::A, OptionLabel::C, OptionLabel::D]),
                AnswerStatus::Attempted,
                &table,
            );
            assert_eq!((wrong.marks, wrong.is_correct), (expected, Some(false)));
        }
    }

    #[test]
    fn multiple_boundary_over_all_subsets() {
        let correct = [OptionLabel::A, OptionLabel::B, OptionLabel::D];
        let kind = multiple(&correct);

        for mask in 1u8..16 {
            let selected: Vec<OptionLabel> = OptionLabel::ALL
                .iter()
                .enumerate()
                .filter(|(index, _)| mask & (1 << index) != 0)
                .map(|(_, label)| *label)
                .collect();
            let outcome =
                score_answer(&kind, &many(&selected), AnswerStatus::Attempted, &PenaltyTable::MOCK);

            if selected.contains(&OptionLabel::C) {
                assert_eq!(outcome.marks, -0.5);
                assert_eq!(outcome.is_correct, Some(false));
            } else if selected.len() == correct.len() {
                assert_eq!(outcome.marks, 2.0);
                assert_eq!(outcome.is_correct, Some(true));
            } else {
                assert!(outcome.marks > 0.0 && outcome.marks < 2.0, "{selected:?}");
                assert_eq!(outcome.is_correct, Some(false));
            }
        }
    }

    #[test]
    fn branch_parent_never_scores() {
        let outcome = score_answer(
            &QuestionKind::BranchParent,
            &single(Some(OptionLabel::A), ConfidenceLevel::Mid),
            AnswerStatus::Attempted,
            &PenaltyTable::MAIN,
        );
        assert_eq!((outcome.marks, outcome.is_correct), (0.0, None));
    }

    #[test]
    fn formats_marks() {
        assert_eq!(fmt_marks(1.0), "+1");
        assert_eq!(fmt_marks(-0.25), "-0.25");
        assert_eq!(fmt_marks(2.0 / 3.0), "+0.67");
        assert_eq!(fmt_marks(-0.1), "-0.1");
        assert_eq!(fmt_marks(0.0), "0");
    }
}
