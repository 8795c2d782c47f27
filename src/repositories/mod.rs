pub(crate) mod attempts;
pub(crate) mod exam_answers;
pub(crate) mod exam_variants;
pub(crate) mod health;
pub(crate) mod questions;
pub(crate) mod store;
pub(crate) mod users;
