use super::marks::PenaltyTable;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("examVariantId required")]
pub(crate) struct MissingExamVariant;

/// Which bank and attempt store govern one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExamTarget {
    Main { exam_variant_id: String },
    Mock { exam_variant_id: String, mock_variant_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BankSource {
    Primary,
    MockDedicated,
    /// Mock rows stored in the primary table with `mock_variant_id` set.
    LegacyCoMingled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptStore {
    Primary,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoringProfile {
    pub(crate) penalties: PenaltyTable,
    pub(crate) telemetry_enabled: bool,
}

impl ExamTarget {
    /// Blank identifiers count as absent.
    pub(crate) fn select(
        exam_variant_id: Option<&str>,
        mock_variant_id: Option<&str>,
    ) -> Result<Self, MissingExamVariant> {
        let exam_variant_id = non_blank(exam_variant_id).ok_or(MissingExamVariant)?;

        Ok(match non_blank(mock_variant_id) {
            Some(mock_variant_id) => Self::Mock { exam_variant_id, mock_variant_id },
            None => Self::Main { exam_variant_id },
        })
    }

    pub(crate) fn exam_variant_id(&self) -> &str {
        match self {
            Self::Main { exam_variant_id } | Self::Mock { exam_variant_id, .. } => exam_variant_id,
        }
    }

    pub(crate) fn mock_variant_id(&self) -> Option<&str> {
        match self {
            Self::Main { .. } => None,
            Self::Mock { mock_variant_id, .. } => Some(mock_variant_id),
        }
    }

    pub(crate) fn profile(&self) -> ScoringProfile {
        match self {
            Self::Main { .. } => {
                ScoringProfile { penalties: PenaltyTable::MAIN, telemetry_enabled: false }
            }
            Self::Mock { .. } => {
                ScoringProfile { penalties: PenaltyTable::MOCK, telemetry_enabled: true }
            }
        }
    }

    pub(crate) fn store(&self) -> AttemptStore {
        match self {
            Self::Main { .. } => AttemptStore::Primary,
            Self::Mock { .. } => AttemptStore::Mock,
        }
    }

    /// Sources tried in order until one returns questions.
    pub(crate) fn bank_sources(&self) -> &'static [BankSource] {
        match self {
            Self::Main { .. } => &[BankSource::Primary],
            Self::Mock { .. } => &[BankSource::MockDedicated, BankSource::LegacyCoMingled],
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Main { .. } => "main",
            Self::Mock { .. } => "mock",
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
