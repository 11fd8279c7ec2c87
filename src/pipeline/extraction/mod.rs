//! Structured extraction: document-type classification plus two extraction
//! strategies: a deterministic lookup-table pass and an AI-assisted pass.

pub mod assisted;
pub mod classify;
pub mod parse;
pub mod tables;
