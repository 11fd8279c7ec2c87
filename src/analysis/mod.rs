//! Read-only consumers of the persisted pipeline output.

pub mod evaluation;
pub mod trends;
