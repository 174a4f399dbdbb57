//! Report output
//!
//! This module handles:
//! - Checking identifiers against the catalog
//! - Check digit reports
//! - Deriving the ISSN to ISSN-L mapping from a dump

mod check;
mod mapping;

pub use check::{
    check_identifier, validate_line, write_check_report, CheckResult, CheckStatus, CheckSummary,
};
pub use mapping::{write_mapping, MappingStats};
