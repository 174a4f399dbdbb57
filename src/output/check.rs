//! Registration checks and check digit reports
//!
//! Both reports are tab separated, one line per input, in input order.

use crate::identifier::{IdentifierSet, Issn};
use crate::IdentifierResult;
use std::io::{self, Write};

/// Outcome of looking up one identifier in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    /// Listed in the sitemap
    Registered,
    /// Well formed but not listed
    NotFound,
    /// Could not be normalized
    Invalid,
}

impl CheckStatus {
    /// Token printed in the report
    pub fn token(&self) -> &'static str {
        match self {
            CheckStatus::Registered => "registered",
            CheckStatus::NotFound => "not-found",
            CheckStatus::Invalid => "invalid",
        }
    }
}

/// One line of a check report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Canonical form, or the trimmed raw input when it could not be normalized
    pub value: String,
    pub status: CheckStatus,
}

impl CheckResult {
    pub fn to_line(&self) -> String {
        format!("{}\t{}", self.value, self.status.token())
    }
}

/// Line counts of a finished check report
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub registered: usize,
    pub not_found: usize,
    pub invalid: usize,
}

/// Normalizes `raw` and looks it up in `known`
pub fn check_identifier(raw: &str, known: &IdentifierSet) -> CheckResult {
    match Issn::normalize(raw) {
        Ok(issn) => {
            let status = if known.contains(issn.as_str()) {
                CheckStatus::Registered
            } else {
                CheckStatus::NotFound
            };
            CheckResult {
                value: issn.to_string(),
                status,
            }
        }
        Err(e) => {
            tracing::debug!("{}", e);
            CheckResult {
                value: raw.trim().to_string(),
                status: CheckStatus::Invalid,
            }
        }
    }
}

/// Checks every input and writes `<value>\t<status>` lines to `out`
///
/// # Arguments
///
/// * `inputs` - Raw identifiers, blank entries are skipped
/// * `known` - Identifiers of the current catalog
/// * `out` - Report destination
///
/// # Returns
///
/// * `Ok(CheckSummary)` - Counts per status
/// * `Err(io::Error)` - Writing the report failed
pub fn write_check_report<I, S, W>(
    inputs: I,
    known: &IdentifierSet,
    out: &mut W,
) -> io::Result<CheckSummary>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    W: Write,
{
    let mut summary = CheckSummary::default();

    for raw in inputs {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            continue;
        }
        let result = check_identifier(raw, known);
        match result.status {
            CheckStatus::Registered => summary.registered += 1,
            CheckStatus::NotFound => summary.not_found += 1,
            CheckStatus::Invalid => summary.invalid += 1,
        }
        writeln!(out, "{}", result.to_line())?;
    }

    out.flush()?;
    Ok(summary)
}

/// Check digit report line for one input
///
/// Seven digits are completed with their check character
/// (`4444222` gives `4444222\t4444-222X`); a full identifier is printed in
/// canonical form next to whether its check character is correct
/// (`12345679` gives `1234-5679\ttrue`).
pub fn validate_line(raw: &str) -> IdentifierResult<String> {
    let input = raw.trim();
    let compact: String = input.chars().filter(|c| *c != '-').collect();

    if compact.chars().count() == 7 {
        let issn = Issn::complete(&compact)?;
        return Ok(format!("{}\t{}", input, issn));
    }

    let issn = Issn::normalize(input)?;
    Ok(format!("{}\t{}", issn, issn.has_valid_check_digit()))
}
