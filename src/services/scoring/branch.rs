use std::collections::HashMap;

use crate::db::types::{BranchKey, QuestionType};
use crate::schemas::attempt::RawAnswer;

use super::normalize::normalize_answer;
use super::question::{Question, QuestionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visibility {
    Scored,
    /// Branch parents are recorded but never carry marks.
    ParentOnly,
    /// A branch child whose parent choice does not select it.
    Hidden,
}

/// Parent question number to the branch the student chose there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BranchChoiceMap {
    choices: HashMap<i32, BranchKey>,
}

impl BranchChoiceMap {
    /// The parent's normalised selection is its choice, whatever status the
    /// client reported for it.
    pub(crate) fn resolve(questions: &[Question], answers: &HashMap<i32, &RawAnswer>) -> Self {
        let mut choices = HashMap::new();

        for question in questions {
            if !matches!(question.kind, QuestionKind::BranchParent) {
                continue;
            }
            let Some(raw) = answers.get(&question.number) else {
                continue;
            };

            let normalized = normalize_answer(QuestionType::BranchParent, raw);
            if let Some(key) = normalized.selected_answer.and_then(BranchKey::from_label) {
                choices.insert(question.number, key);
            }
        }

        Self { choices }
    }

    pub(crate) fn choice(&self, parent_question: i32) -> Option<BranchKey> {
        self.choices.get(&parent_question).copied()
    }

    pub(crate) fn visibility(&self, question: &Question) -> Visibility {
        match &question.kind {
            QuestionKind::BranchParent => Visibility::ParentOnly,
            QuestionKind::BranchChild { link: Some(link), .. } => {
                if self.choice(link.parent_question) == Some(link.branch_key) {
                    Visibility::Scored
                } else {
                    Visibility::Hidden
                }
            }
            _ => Visibility::Scored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::OptionLabel;
    use crate::services::scoring::question::BranchLink;

    fn parent(number: i32) -> Question {
        Question {
            id: format!("q-{number}"),
            number,
            text: "Which path?".to_string(),
            options: vec!["left".into(), "right".into()],
            kind: QuestionKind::BranchParent,
        }
    }

    fn child(number: i32, link: Option<BranchLink>) -> Question {
        Question {
            id: format!("q-{number}"),
            number,
            text: "Follow-up".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            kind: QuestionKind::BranchChild { correct: OptionLabel::A, link },
        }
    }

    fn answer(number: i32, selected: &str, status: &str) -> RawAnswer {
        RawAnswer {
            question_number: number,
            selected_answer: Some(selected.to_string()),
            status: Some(status.to_string()),
            ..RawAnswer::default()
        }
    }

    fn link(parent_question: i32, branch_key: BranchKey) -> Option<BranchLink> {
        Some(BranchLink { parent_question, branch_key })
    }

    #[test]
    fn records_choice_and_selects_matching_child() {
        let questions = vec![parent(1), child(2, link(1, BranchKey::A)), child(3, link(1, BranchKey::B))];
        let raw = answer(1, "A", "attempted");
        let answers = HashMap::from([(1, &raw)]);

        let choices = BranchChoiceMap::resolve(&questions, &answers);
        assert_eq!(choices.choice(1), Some(BranchKey::A));
        assert_eq!(choices.visibility(&questions[0]), Visibility::ParentOnly);
        assert_eq!(choices.visibility(&questions[1]), Visibility::Scored);
        assert_eq!(choices.visibility(&questions[2]), Visibility::Hidden);
    }

    #[test]
    fn unanswered_or_invalid_parent_hides_all_children() {
        let questions = vec![parent(1), child(2, link(1, BranchKey::A)), child(3, link(1, BranchKey::B))];

        let none = BranchChoiceMap::resolve(&questions, &HashMap::new());
        assert_eq!(none.visibility(&questions[1]), Visibility::Hidden);
        assert_eq!(none.visibility(&questions[2]), Visibility::Hidden);

        let invalid = answer(1, "C", "attempted");
        let choices = BranchChoiceMap::resolve(&questions, &HashMap::from([(1, &invalid)]));
        assert_eq!(choices.choice(1), None);
    }

    #[test]
    fn skipped_parent_selection_still_picks_branch() {
        let questions = vec![parent(1), child(2, link(1, BranchKey::A)), child(3, link(1, BranchKey::B))];
        let skipped = answer(1, "B", "skipped");
        let choices = BranchChoiceMap::resolve(&questions, &HashMap::from([(1, &skipped)]));

        assert_eq!(choices.choice(1), Some(BranchKey::B));
        assert_eq!(choices.visibility(&questions[1]), Visibility::Hidden);
        assert_eq!(choices.visibility(&questions[2]), Visibility::Scored);
    }

    #[test]
    fn selection_with_stale_status_still_counts_as_choice() {
        let questions = vec![parent(1), child(2, link(1, BranchKey::B))];
        let raw = answer(1, "B", "not_visited");
        let choices = BranchChoiceMap::resolve(&questions, &HashMap::from([(1, &raw)]));
        assert_eq!(choices.visibility(&questions[1]), Visibility::Scored);
    }

    #[test]
    fn child_without_link_is_always_scored() {
        let questions = vec![parent(1), child(2, None)];
        let choices = BranchChoiceMap::resolve(&questions, &HashMap::new());
        assert_eq!(choices.visibility(&questions[1]), Visibility::Scored);
    }
}
