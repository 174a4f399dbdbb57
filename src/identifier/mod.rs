//! Identifier handling
//!
//! This module provides:
//! - Normalization of raw ISSN input into canonical `NNNN-NNNC` form
//! - ISSN check digit computation
//! - A string set with set algebra for ignore lists and membership checks

mod issn;
mod set;

pub use issn::{check_digit, Issn};
pub use set::IdentifierSet;
