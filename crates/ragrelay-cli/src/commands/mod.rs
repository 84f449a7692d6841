//! CLI command implementations

pub mod cache;
pub mod embed;
pub mod query;
