use crate::db::types::{BranchKey, ConfidenceLevel, OptionLabel, QuestionType};
use crate::schemas::attempt::RawAnswer;

/// Canonical form of one client answer. Multiple-select questions only carry
/// `selected_answers`; every other type only carries `selected_answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NormalizedAnswer {
    pub(crate) selected_answer: Option<OptionLabel>,
    pub(crate) selected_answers: Vec<OptionLabel>,
    pub(crate) confidence: ConfidenceLevel,
}

impl Default for NormalizedAnswer {
    fn default() -> Self {
        Self { selected_answer: None, selected_answers: Vec::new(), confidence: ConfidenceLevel::Mid }
    }
}

impl NormalizedAnswer {
    pub(crate) fn has_selection(&self, question_type: QuestionType) -> bool {
        match question_type {
            QuestionType::Multiple => !self.selected_answers.is_empty(),
            _ => self.selected_answer.is_some(),
        }
    }

    /// Drops the selection, keeping the confidence label.
    pub(crate) fn cleared(self) -> Self {
        Self { confidence: self.confidence, ..Self::default() }
    }
}

pub(crate) fn normalize_answer(question_type: QuestionType, raw: &RawAnswer) -> NormalizedAnswer {
    let confidence = ConfidenceLevel::normalize(raw.confidence.as_deref());

    match question_type {
        QuestionType::Multiple => {
            let mut selected = Vec::with_capacity(raw.selected_answers.len());
            for label in raw.selected_answers.iter().filter_map(|value| OptionLabel::parse(value)) {
                if !selected.contains(&label) {
                    selected.push(label);
                }
            }
            NormalizedAnswer { selected_answer: None, selected_answers: selected, confidence }
        }
        QuestionType::BranchParent => NormalizedAnswer {
            selected_answer: raw
                .selected_answer
                .as_deref()
                .and_then(BranchKey::parse)
                .map(BranchKey::label),
            selected_answers: Vec::new(),
            confidence,
        },
        QuestionType::Simple | QuestionType::Confidence | QuestionType::BranchChild => {
            NormalizedAnswer {
                selected_answer: raw.selected_answer.as_deref().and_then(OptionLabel::parse),
                selected_answers: Vec::new(),
                confidence,
            }
        }
    }
}
