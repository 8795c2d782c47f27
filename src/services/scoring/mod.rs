//! Scoring of one exam submission against a question bank.
//!
//! Per question: normalise the raw answer, settle its status, apply branch
//! visibility, then score by question type. Totals are summed from the same
//! records that get persisted.

mod aggregate;
mod branch;
mod marks;
mod normalize;
mod question;
mod status;
mod variant;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::types::{AnswerStatus, BranchKey, ConfidenceLevel, OptionLabel, QuestionType};
use crate::schemas::attempt::{AnswerChange, RawAnswer};

pub(crate) use aggregate::AttemptTotals;
pub(crate) use branch::{BranchChoiceMap, Visibility};
pub(crate) use marks::MarkOutcome;
pub(crate) use question::{BranchLink, Question, QuestionDataError, QuestionKind};
pub(crate) use variant::{AttemptStore, BankSource, ExamTarget, MissingExamVariant, ScoringProfile};

use marks::score_answer;
use normalize::{normalize_answer, NormalizedAnswer};
use status::reconcile_status;

/// Per-question result, snapshotting the question as it was when scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    pub(crate) question_number: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<OptionLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) correct_answers: Vec<OptionLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) parent_question: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) branch_key: Option<BranchKey>,
    pub(crate) selected_answer: Option<OptionLabel>,
    #[serde(default)]
    pub(crate) selected_answers: Vec<OptionLabel>,
    #[serde(default)]
    pub(crate) confidence: Option<ConfidenceLevel>,
    pub(crate) status: AnswerStatus,
    pub(crate) marks: f64,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_reason: String,
    /// False for branch parents and for children of an untaken branch.
    pub(crate) scored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) telemetry: Option<QuestionTelemetry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionTelemetry {
    pub(crate) first_visit_latency_ms: Option<i64>,
    pub(crate) visit_durations_ms: Vec<i64>,
    pub(crate) total_visit_ms: i64,
    pub(crate) visit_count: i32,
    pub(crate) answer_changes: Vec<AnswerChange>,
}

impl QuestionTelemetry {
    fn from_raw(raw: Option<&RawAnswer>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        Self {
            first_visit_latency_ms: raw.first_visit_latency_ms,
            visit_durations_ms: raw.visit_durations_ms.clone(),
            total_visit_ms: raw
                .visit_durations_ms
                .iter()
                .fold(0i64, |total, ms| total.saturating_add((*ms).max(0))),
            visit_count: i32::try_from(raw.visit_durations_ms.len()).unwrap_or(i32::MAX),
            answer_changes: raw.answer_changes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoredAttempt {
    pub(crate) records: Vec<AnswerRecord>,
    pub(crate) totals: AttemptTotals,
}

/// Scores `raw_answers` against `questions`, producing one record per bank
/// question in bank order. Later duplicates of a question number win and
/// answers for numbers outside the bank are ignored.
pub(crate) fn score_attempt(
    questions: &[Question],
    raw_answers: &[RawAnswer],
    profile: &ScoringProfile,
) -> ScoredAttempt {
    let mut by_number: HashMap<i32, &RawAnswer> = HashMap::with_capacity(raw_answers.len());
    for raw in raw_answers {
        by_number.insert(raw.question_number, raw);
    }

    let choices = BranchChoiceMap::resolve(questions, &by_number);
    let records: Vec<AnswerRecord> = questions
        .iter()
        .map(|question| {
            score_question(question, by_number.get(&question.number).copied(), &choices, profile)
        })
        .collect();
    let totals = AttemptTotals::summarize(&records);

    ScoredAttempt { records, totals }
}

fn score_question(
    question: &Question,
    raw: Option<&RawAnswer>,
    choices: &BranchChoiceMap,
    profile: &ScoringProfile,
) -> AnswerRecord {
    let question_type = question.kind.question_type();
    let normalized = raw.map(|raw| normalize_answer(question_type, raw)).unwrap_or_default();
    let (mut status, mut answer) =
        reconcile_status(question_type, normalized, raw.and_then(|raw| raw.status.as_deref()));

    let visibility = choices.visibility(question);
    let outcome = match visibility {
        Visibility::Scored => score_answer(&question.kind, &answer, status, &profile.penalties),
        Visibility::ParentOnly => MarkOutcome::branch_parent(),
        Visibility::Hidden => {
            status = AnswerStatus::NotVisited;
            answer = NormalizedAnswer::default();
            MarkOutcome::branch_not_taken()
        }
    };

    let confidence = (question_type == QuestionType::Confidence
        && status == AnswerStatus::Attempted)
        .then_some(answer.confidence);
    let link = question.kind.branch_link();

    AnswerRecord {
        question_number: question.number,
        question_type,
        question_text: question.text.clone(),
        options: question.options.clone(),
        correct_answer: question.kind.correct_answer(),
        correct_answers: question.kind.correct_answers(),
        parent_question: link.map(|link| link.parent_question),
        branch_key: link.map(|link| link.branch_key),
        selected_answer: answer.selected_answer,
        selected_answers: answer.selected_answers,
        confidence,
        status,
        marks: outcome.marks,
        is_correct: outcome.is_correct,
        marks_reason: outcome.reason,
        scored: visibility == Visibility::Scored,
        telemetry: profile.telemetry_enabled.then(|| QuestionTelemetry::from_raw(raw)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn question(number: i32, kind: QuestionKind) -> Question {
        let options = match kind {
            QuestionKind::BranchParent => vec!["first".into(), "second".into()],
            _ => vec!["a".into(), "b".into(), "c".into(), "d".into()],
        };
        Question { id: format!("q-{number}"), number, text: format!("Question {number}"), options, kind }
    }

    fn simple(number: i32, correct: OptionLabel) -> Question {
        question(number, QuestionKind::Simple { correct })
    }

    fn child(number: i32, parent: i32, key: BranchKey) -> Question {
        question(
            number,
            QuestionKind::BranchChild {
                correct: OptionLabel::A,
                link: Some(BranchLink { parent_question: parent, branch_key: key }),
            },
        )
    }

    fn pick(number: i32, label: &str) -> RawAnswer {
        RawAnswer {
            question_number: number,
            selected_answer: Some(label.to_string()),
            status: Some("attempted".to_string()),
            ..RawAnswer::default()
        }
    }

    fn main_profile() -> ScoringProfile {
        ExamTarget::Main { exam_variant_id: "ev".into() }.profile()
    }

    fn mock_profile() -> ScoringProfile {
        ExamTarget::Mock { exam_variant_id: "ev".into(), mock_variant_id: "m".into() }.profile()
    }

    #[test]
    fn simple_correct_and_wrong() {
        let bank = vec![simple(1, OptionLabel::B), simple(2, OptionLabel::B)];
        let scored = score_attempt(&bank, &[pick(1, "B"), pick(2, "C")], &main_profile());

        assert_eq!(scored.records[0].marks, 1.0);
        assert_eq!(scored.records[0].is_correct, Some(true));
        assert_eq!(scored.records[1].marks, -0.25);
        assert_eq!(scored.records[1].is_correct, Some(false));
        assert_eq!(scored.totals.total_marks, 0.75);
        assert_eq!(scored.totals.correct_count, 1);
        assert_eq!(scored.totals.wrong_count, 1);
        assert_eq!(scored.totals.attempted_count, 2);
    }

    #[test]
    fn confident_wrong_answer_costs_half_mark() {
        let bank = vec![question(1, QuestionKind::Confidence { correct: OptionLabel::A })];
        let mut answer = pick(1, "D");
        answer.confidence = Some("high".to_string());

        let scored = score_attempt(&bank, &[answer], &main_profile());
        let record = &scored.records[0];
        assert_eq!(record.marks, -0.5);
        assert_eq!(record.is_correct, Some(false));
        assert_eq!(record.confidence, Some(ConfidenceLevel::High));
    }

    #[test]
    fn multiple_half_credit() {
        let correct: BTreeSet<_> = [OptionLabel::A, OptionLabel::C].into_iter().collect();
        let bank = vec![question(1, QuestionKind::Multiple { correct })];
        let answer = RawAnswer {
            question_number: 1,
            selected_answers: vec!["A".to_string()],
            status: Some("attempted".to_string()),
            ..RawAnswer::default()
        };

        let scored = score_attempt(&bank, &[answer], &mock_profile());
        let record = &scored.records[0];
        assert_eq!(record.marks, 1.0);
        assert_eq!(record.is_correct, Some(false));
        assert_eq!(record.correct_answers, vec![OptionLabel::A, OptionLabel::C]);
        assert_eq!(record.selected_answer, None);
    }

    #[test]
    fn untaken_branch_is_forced_not_visited() {
        let bank = vec![
            question(1, QuestionKind::BranchParent),
            child(2, 1, BranchKey::A),
            child(3, 1, BranchKey::B),
        ];
        let scored =
            score_attempt(&bank, &[pick(1, "A"), pick(2, "A"), pick(3, "A")], &main_profile());

        let parent = &scored.records[0];
        assert_eq!(parent.status, AnswerStatus::Attempted);
        assert_eq!(parent.selected_answer, Some(OptionLabel::A));
        assert_eq!(parent.marks, 0.0);
        assert!(!parent.scored);

        let taken = &scored.records[1];
        assert_eq!((taken.marks, taken.is_correct), (1.0, Some(true)));
        assert!(taken.scored);

        let hidden = &scored.records[2];
        assert_eq!(hidden.status, AnswerStatus::NotVisited);
        assert_eq!(hidden.selected_answer, None);
        assert!(hidden.selected_answers.is_empty());
        assert_eq!(hidden.marks, 0.0);
        assert_eq!(hidden.is_correct, None);
        assert!(!hidden.scored);

        assert_eq!(scored.totals.total_marks, 1.0);
        assert_eq!(scored.totals.attempted_count, 1);
        assert_eq!(scored.totals.not_visited_count, 0);
    }

    #[test]
    fn unanswered_parent_hides_every_child() {
        let bank = vec![
            simple(1, OptionLabel::C),
            question(2, QuestionKind::BranchParent),
            child(3, 2, BranchKey::A),
            child(4, 2, BranchKey::B),
        ];
        let scored = score_attempt(&bank, &[pick(1, "C"), pick(3, "B"), pick(4, "A")], &main_profile());

        for record in &scored.records[2..] {
            assert_eq!(record.status, AnswerStatus::NotVisited);
            assert_eq!(record.marks, 0.0);
            assert!(!record.scored);
        }
        assert_eq!(scored.totals.total_marks, 1.0);
        assert_eq!(scored.totals.attempted_count, 1);
        assert_eq!(scored.totals.wrong_count, 0);
        assert_eq!(scored.totals.not_visited_count, 0);
    }

    #[test]
    fn one_record_per_question_in_bank_order() {
        let bank = vec![simple(3, OptionLabel::A), simple(1, OptionLabel::B), simple(2, OptionLabel::C)];
        let answers = vec![pick(2, "A"), pick(99, "A"), pick(2, "C")];
        let scored = score_attempt(&bank, &answers, &main_profile());

        let numbers: Vec<i32> = scored.records.iter().map(|record| record.question_number).collect();
        assert_eq!(numbers, vec![3, 1, 2]);
        assert_eq!(scored.records[2].selected_answer, Some(OptionLabel::C));
        assert_eq!(scored.records[2].is_correct, Some(true));
        assert_eq!(scored.totals.not_visited_count, 2);
    }

    #[test]
    fn telemetry_only_on_mock_profile() {
        let bank = vec![simple(1, OptionLabel::A), simple(2, OptionLabel::B)];
        let mut answer = pick(1, "A");
        answer.first_visit_latency_ms = Some(1500);
        answer.visit_durations_ms = vec![4000, 2500];
        answer.answer_changes = vec![AnswerChange { from: None, to: Some("A".into()), at_ms: 5200 }];

        let main = score_attempt(&bank, std::slice::from_ref(&answer), &main_profile());
        assert!(main.records.iter().all(|record| record.telemetry.is_none()));

        let mock = score_attempt(&bank, &[answer], &mock_profile());
        let telemetry = mock.records[0].telemetry.as_ref().unwrap();
        assert_eq!(telemetry.first_visit_latency_ms, Some(1500));
        assert_eq!(telemetry.total_visit_ms, 6500);
        assert_eq!(telemetry.visit_count, 2);
        assert_eq!(telemetry.answer_changes.len(), 1);
        assert_eq!(mock.records[1].telemetry, Some(QuestionTelemetry::default()));
    }

    #[test]
    fn visit_total_saturates_instead_of_overflowing() {
        let bank = vec![simple(1, OptionLabel::A)];
        let mut answer = pick(1, "A");
        answer.visit_durations_ms = vec![i64::MAX, 1, 250];

        let scored = score_attempt(&bank, &[answer], &mock_profile());
        let telemetry = scored.records[0].telemetry.as_ref().unwrap();
        assert_eq!(telemetry.total_visit_ms, i64::MAX);
        assert_eq!(telemetry.visit_count, 3);
    }

    #[test]
    fn skipped_parent_still_opens_its_branch() {
        let bank = vec![
            question(1, QuestionKind::BranchParent),
            child(2, 1, BranchKey::A),
            child(3, 1, BranchKey::B),
        ];
        let mut parent = pick(1, "A");
        parent.status = Some("skipped".to_string());

        let scored = score_attempt(&bank, &[parent, pick(2, "A"), pick(3, "A")], &main_profile());

        assert_eq!(scored.records[0].status, AnswerStatus::Skipped);
        assert_eq!(scored.records[0].selected_answer, None);

        let taken = &scored.records[1];
        assert_eq!(taken.status, AnswerStatus::Attempted);
        assert_eq!((taken.marks, taken.is_correct), (1.0, Some(true)));
        assert!(taken.scored);

        assert_eq!(scored.records[2].status, AnswerStatus::NotVisited);
        assert_eq!(scored.totals.total_marks, 1.0);
    }

    #[test]
    fn invariants_hold_across_answer_combinations() {
        let correct: BTreeSet<_> = [OptionLabel::B, OptionLabel::D].into_iter().collect();
        let bank = vec![
            question(1, QuestionKind::BranchParent),
            child(2, 1, BranchKey::A),
            child(3, 1, BranchKey::B),
            simple(4, OptionLabel::A),
            question(5, QuestionKind::Multiple { correct }),
            question(6, QuestionKind::Confidence { correct: OptionLabel::C }),
            question(7, QuestionKind::BranchChild { correct: OptionLabel::D, link: None }),
        ];
        let selections = [None, Some("A"), Some("B"), Some("D"), Some("Q")];
        let statuses = [None, Some("attempted"), Some("skipped"), Some("not_visited"), Some("done")];

        for (seed, selection) in selections.iter().enumerate() {
            for (offset, status) in statuses.iter().enumerate() {
                let answers: Vec<RawAnswer> = (1..=7)
                    .map(|number| {
                        let rotate = |len: usize| (seed + offset + number as usize) % len;
                        RawAnswer {
                            question_number: number,
                            selected_answer: selections[rotate(selections.len())].map(str::to_string),
                            selected_answers: selection.iter().map(|value| value.to_string()).collect(),
                            confidence: Some(["low", "mid", "high", "full"][rotate(4)].to_string()),
                            status: statuses[rotate(statuses.len())].map(str::to_string),
                            ..RawAnswer::default()
                        }
                    })
                    .chain(std::iter::once(RawAnswer {
                        question_number: 1,
                        selected_answer: selection.map(str::to_string),
                        status: status.map(str::to_string),
                        ..RawAnswer::default()
                    }))
                    .collect();

                let scored = score_attempt(&bank, &answers, &mock_profile());
                let choices = BranchChoiceMap::resolve(
                    &bank,
                    &answers.iter().map(|raw| (raw.question_number, raw)).collect(),
                );

                let mut sum = 0.0;
                for (record, question) in scored.records.iter().zip(&bank) {
                    let has_selection = match record.question_type {
                        QuestionType::Multiple => !record.selected_answers.is_empty(),
                        _ => record.selected_answer.is_some(),
                    };
                    assert_eq!(record.status == AnswerStatus::Attempted, has_selection);

                    if let Some(link) = question.kind.branch_link() {
                        if record.status == AnswerStatus::Attempted {
                            assert_eq!(choices.choice(link.parent_question), Some(link.branch_key));
                        }
                        if !record.scored {
                            assert_eq!(record.status, AnswerStatus::NotVisited);
                            assert_eq!(record.marks, 0.0);
                        }
                    }
                    if record.question_type == QuestionType::BranchParent {
                        assert_eq!(record.marks, 0.0);
                    }
                    if record.scored {
                        sum += record.marks;
                    }
                }
                assert!((scored.totals.total_marks - sum).abs() < 1e-9);
            }
        }
    }
}
