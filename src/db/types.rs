use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    Simple,
    Multiple,
    Confidence,
    BranchParent,
    BranchChild,
}

impl QuestionType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Multiple => "multiple",
            Self::Confidence => "confidence",
            Self::BranchParent => "branch_parent",
            Self::BranchChild => "branch_child",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "answerstatus", rename_all = "snake_case")]
pub(crate) enum AnswerStatus {
    Attempted,
    Skipped,
    NotVisited,
}

impl AnswerStatus {
    /// Anything outside the three legal values degrades to `NotVisited`.
    pub(crate) fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("attempted") => Self::Attempted,
            Some("skipped") => Self::Skipped,
            Some("not_visited") => Self::NotVisited,
            _ => Self::NotVisited,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Attempted => "attempted",
            Self::Skipped => "skipped",
            Self::NotVisited => "not_visited",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfidenceLevel {
    Low,
    Mid,
    High,
}

impl ConfidenceLevel {
    /// Maps client labels onto the three levels. Older clients sent `full` and
    /// `middle`; missing or unknown labels fall back to `Mid`.
    pub(crate) fn normalize(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::Mid;
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" | "full" => Self::High,
            "mid" | "middle" => Self::Mid,
            _ => Self::Mid,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub(crate) enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub(crate) const ALL: [OptionLabel; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two-way choice carried by a branch parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum BranchKey {
    A,
    B,
}

impl BranchKey {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        OptionLabel::parse(value).and_then(Self::from_label)
    }

    pub(crate) fn from_label(label: OptionLabel) -> Option<Self> {
        match label {
            OptionLabel::A => Some(Self::A),
            OptionLabel::B => Some(Self::B),
            OptionLabel::C | OptionLabel::D => None,
        }
    }

    pub(crate) fn label(self) -> OptionLabel {
        match self {
            Self::A => OptionLabel::A,
            Self::B => OptionLabel::B,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        self.label().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_translates_legacy_labels() {
        assert_eq!(ConfidenceLevel::normalize(Some("full")), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::normalize(Some("middle")), ConfidenceLevel::Mid);
        assert_eq!(ConfidenceLevel::normalize(Some("low")), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::normalize(Some("high")), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::normalize(Some("certain")), ConfidenceLevel::Mid);
        assert_eq!(ConfidenceLevel::normalize(None), ConfidenceLevel::Mid);
    }

    #[test]
    fn status_outside_legal_set_is_not_visited() {
        assert_eq!(AnswerStatus::parse_lenient(Some("attempted")), AnswerStatus::Attempted);
        assert_eq!(AnswerStatus::parse_lenient(Some("skipped")), AnswerStatus::Skipped);
        assert_eq!(AnswerStatus::parse_lenient(Some("answered")), AnswerStatus::NotVisited);
        assert_eq!(AnswerStatus::parse_lenient(None), AnswerStatus::NotVisited);
    }

    #[test]
    fn option_labels_are_exact() {
        assert_eq!(OptionLabel::parse("C"), Some(OptionLabel::C));
        assert_eq!(OptionLabel::parse(" D "), Some(OptionLabel::D));
        assert_eq!(OptionLabel::parse("E"), None);
        assert_eq!(OptionLabel::parse("a"), None);
        assert_eq!(OptionLabel::parse(""), None);
    }

    #[test]
    fn branch_keys_only_cover_a_and_b() {
        assert_eq!(BranchKey::parse("A"), Some(BranchKey::A));
        assert_eq!(BranchKey::parse("B"), Some(BranchKey::B));
        assert_eq!(BranchKey::parse("C"), None);
        assert_eq!(BranchKey::B.label(), OptionLabel::B);
    }

    #[test]
    fn question_type_serializes_snake_case() {
        let value = serde_json::to_value(QuestionType::BranchChild).unwrap();
        assert_eq!(value, "branch_child");
        assert_eq!(QuestionType::BranchParent.as_str(), "branch_parent");
    }
}
