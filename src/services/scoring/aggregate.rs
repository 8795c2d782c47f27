use serde::{Deserialize, Serialize};

use crate::db::types::AnswerStatus;

use super::AnswerRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct AttemptTotals {
    pub(crate) total_marks: f64,
    pub(crate) attempted_count: i32,
    pub(crate) skipped_count: i32,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) not_visited_count: i32,
}

impl AttemptTotals {
    /// Marks are summed over every record; counts only cover the scored subset.
    pub(crate) fn summarize(records: &[AnswerRecord]) -> Self {
        let mut totals = Self::default();

        for record in records {
            totals.total_marks += record.marks;
            if !record.scored {
                continue;
            }

            match record.status {
                AnswerStatus::Attempted => totals.attempted_count += 1,
                AnswerStatus::Skipped => totals.skipped_count += 1,
                AnswerStatus::NotVisited => totals.not_visited_count += 1,
            }
            match record.is_correct {
                Some(true) => totals.correct_count += 1,
                Some(false) => totals.wrong_count += 1,
                None => {}
            }
        }

        totals
    }
}
