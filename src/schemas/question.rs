use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{ExamVariant, MockVariant, QuestionRow};
use crate::db::types::QuestionType;
use crate::services::scoring::Question;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamVariantCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct MockVariantCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(default)]
    #[serde(alias = "mockVariantId")]
    pub(crate) mock_variant_id: Option<String>,
    #[serde(alias = "type", alias = "questionType")]
    pub(crate) question_type: QuestionType,
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, max = 5000, message = "question_text must be 1-5000 characters"))]
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    #[serde(alias = "correctAnswers")]
    pub(crate) correct_answers: Vec<String>,
    #[serde(default)]
    #[serde(alias = "parentQuestion")]
    pub(crate) parent_question: Option<i32>,
    #[serde(default)]
    #[serde(alias = "branchKey")]
    pub(crate) branch_key: Option<String>,
    #[serde(default)]
    #[serde(alias = "confidenceRequired")]
    pub(crate) confidence_required: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BankQuery {
    #[serde(default)]
    #[serde(alias = "mockVariantId")]
    pub(crate) mock_variant_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamVariantResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl From<ExamVariant> for ExamVariantResponse {
    fn from(variant: ExamVariant) -> Self {
        Self {
            id: variant.id,
            title: variant.title,
            description: variant.description,
            created_by: variant.created_by,
            created_at: format_primitive(variant.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MockVariantResponse {
    pub(crate) id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) title: String,
    pub(crate) created_at: String,
}

impl From<MockVariant> for MockVariantResponse {
    fn from(variant: MockVariant) -> Self {
        Self {
            id: variant.id,
            exam_variant_id: variant.exam_variant_id,
            title: variant.title,
            created_at: format_primitive(variant.created_at),
        }
    }
}

/// Admin view including the answer key.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_variant_id: String,
    pub(crate) mock_variant_id: Option<String>,
    pub(crate) question_number: i32,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) correct_answers: Vec<String>,
    pub(crate) parent_question: Option<i32>,
    pub(crate) branch_key: Option<String>,
    pub(crate) confidence_required: bool,
    pub(crate) created_at: String,
}

impl From<QuestionRow> for QuestionResponse {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            exam_variant_id: row.exam_variant_id,
            mock_variant_id: row.mock_variant_id,
            question_number: row.question_number,
            question_type: row.question_type,
            question_text: row.question_text,
            options: row.options.0,
            correct_answer: row.correct_answer,
            correct_answers: row.correct_answers.0,
            parent_question: row.parent_question,
            branch_key: row.branch_key,
            confidence_required: row.confidence_required,
            created_at: format_primitive(row.created_at),
        }
    }
}

/// Candidate view of a question: no answer key.
#[derive(Debug, Serialize)]
pub(crate) struct PaperQuestionResponse {
    pub(crate) question_number: i32,
    pub(crate) question_type: QuestionType,
    pub(crate) question_text: String,
    pub(crate) options: Vec<String>,
    pub(crate) parent_question: Option<i32>,
    pub(crate) branch_key: Option<String>,
}

impl From<Question> for PaperQuestionResponse {
    fn from(question: Question) -> Self {
        let link = question.kind.branch_link();
        Self {
            question_number: question.number,
            question_type: question.kind.question_type(),
            question_text: question.text,
            options: question.options,
            parent_question: link.map(|link| link.parent_question),
            branch_key: link.map(|link| link.branch_key.as_str().to_string()),
        }
    }
}
