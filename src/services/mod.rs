pub(crate) mod analytics;
pub(crate) mod question_bank;
pub(crate) mod scoring;
pub(crate) mod submission;
