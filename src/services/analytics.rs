use std::collections::{BTreeMap, HashSet};

use crate::core::time::{duration_ms, format_primitive};
use crate::db::models::AttemptRow;
use crate::db::types::{AnswerStatus, QuestionType};
use crate::schemas::analytics::{
    QuestionStatsResponse, StudentAnalyticsResponse, StudentAttemptSummary,
    VariantAnalyticsResponse,
};

#[derive(Debug, Default)]
struct QuestionAccumulator {
    question_type: Option<QuestionType>,
    in_scope: usize,
    attempted: usize,
    correct: usize,
    wrong: usize,
    skipped: usize,
    not_visited: usize,
    marks: f64,
}

impl QuestionAccumulator {
    fn finish(self, question_number: i32) -> Option<QuestionStatsResponse> {
        let question_type = self.question_type?;
        Some(QuestionStatsResponse {
            question_number,
            question_type,
            in_scope: self.in_scope,
            attempted: self.attempted,
            correct: self.correct,
            wrong: self.wrong,
            skipped: self.skipped,
            not_visited: self.not_visited,
            average_marks: ratio(self.marks, self.in_scope),
            correct_rate: ratio(self.correct as f64, self.attempted),
        })
    }
}

fn ratio(numerator: f64, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator / denominator as f64)
}

/// Re-derives per-variant statistics from stored attempt snapshots.
pub(crate) fn summarize_variant(
    exam_variant_id: &str,
    mock_variant_id: Option<&str>,
    attempts: &[AttemptRow],
) -> VariantAnalyticsResponse {
    let mut students = HashSet::new();
    let mut guest_attempts = 0;
    let mut auto_submitted_count = 0;
    let mut marks_sum = 0.0;
    let mut min_total: Option<f64> = None;
    let mut max_total: Option<f64> = None;
    let mut questions: BTreeMap<i32, QuestionAccumulator> = BTreeMap::new();

    for attempt in attempts {
        match attempt.student_id.as_deref() {
            Some(student_id) => {
                students.insert(student_id);
            }
            None => guest_attempts += 1,
        }
        if attempt.auto_submitted {
            auto_submitted_count += 1;
        }
        marks_sum += attempt.total_marks;
        min_total = Some(min_total.map_or(attempt.total_marks, |value| value.min(attempt.total_marks)));
        max_total = Some(max_total.map_or(attempt.total_marks, |value| value.max(attempt.total_marks)));

        for record in attempt.answers.0.iter() {
            let entry = questions.entry(record.question_number).or_default();
            entry.question_type = Some(record.question_type);
            if !record.scored {
                continue;
            }
            entry.in_scope += 1;
            entry.marks += record.marks;
            match record.status {
                AnswerStatus::Attempted => entry.attempted += 1,
                AnswerStatus::Skipped => entry.skipped += 1,
                AnswerStatus::NotVisited => entry.not_visited += 1,
            }
            match record.is_correct {
                Some(true) => entry.correct += 1,
                Some(false) => entry.wrong += 1,
                None => {}
            }
        }
    }

    VariantAnalyticsResponse {
        exam_variant_id: exam_variant_id.to_string(),
        mock_variant_id: mock_variant_id.map(str::to_string),
        attempt_count: attempts.len(),
        distinct_students: students.len(),
        guest_attempts,
        auto_submitted_count,
        average_total_marks: ratio(marks_sum, attempts.len()),
        min_total_marks: min_total,
        max_total_marks: max_total,
        questions: questions
            .into_iter()
            .filter_map(|(number, accumulator)| accumulator.finish(number))
            .collect(),
    }
}

/// `attempts` is expected newest first, as the repository returns them.
pub(crate) fn summarize_student(student_id: &str, attempts: &[AttemptRow]) -> StudentAnalyticsResponse {
    let best_total_marks = attempts
        .iter()
        .map(|attempt| attempt.total_marks)
        .fold(None, |best: Option<f64>, value| Some(best.map_or(value, |best| best.max(value))));
    let marks_sum: f64 = attempts.iter().map(|attempt| attempt.total_marks).sum();

    StudentAnalyticsResponse {
        student_id: student_id.to_string(),
        attempt_count: attempts.len(),
        mock_attempt_count: attempts.iter().filter(|attempt| attempt.mock_variant_id.is_some()).count(),
        best_total_marks,
        average_total_marks: ratio(marks_sum, attempts.len()),
        attempts: attempts
            .iter()
            .map(|attempt| StudentAttemptSummary {
                attempt_id: attempt.id.clone(),
                exam_variant_id: attempt.exam_variant_id.clone(),
                mock_variant_id: attempt.mock_variant_id.clone(),
                total_marks: attempt.total_marks,
                correct_count: attempt.correct_count,
                wrong_count: attempt.wrong_count,
                duration_ms: match (attempt.started_at, attempt.ended_at) {
                    (Some(start), Some(end)) => duration_ms(start.assume_utc(), end.assume_utc()),
                    _ => None,
                },
                submitted_at: format_primitive(attempt.submitted_at),
            })
            .collect(),
    }
}
