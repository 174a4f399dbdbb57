//! Output record schema
//!
//! A dump line is one JSON-LD document. Its `@graph` array holds nodes whose
//! `@id` names the resource, e.g. `resource/ISSN/0378-5955#KeyTitle` or
//! `resource/ISSN-L/0378-5955`.

use serde_json::{Map, Value};

/// One decoded metadata document
pub type FetchRecord = Map<String, Value>;

/// `@id` prefix of nodes describing the ISSN itself
pub const ISSN_ID_PREFIX: &str = "resource/ISSN/";

/// `@id` prefix of nodes describing the linking ISSN
pub const ISSNL_ID_PREFIX: &str = "resource/ISSN-L/";

/// Identifiers found in a record's `@graph`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordIds {
    pub issn: Option<String>,
    pub issnl: Option<String>,
}

/// Extracts the ISSN and ISSN-L of a record
///
/// Returns `None` when the document has no `@graph` array. The first node
/// matching each prefix wins; fragments (`#...`) are stripped.
pub fn record_ids(record: &Value) -> Option<RecordIds> {
    let graph = record.get("@graph")?.as_array()?;
    let mut ids = RecordIds::default();

    for node in graph {
        let Some(id) = node.get("@id").and_then(Value::as_str) else {
            continue;
        };
        if ids.issn.is_none() {
            if let Some(rest) = id.strip_prefix(ISSN_ID_PREFIX) {
                ids.issn = non_empty(rest);
                continue;
            }
        }
        if ids.issnl.is_none() {
            if let Some(rest) = id.strip_prefix(ISSNL_ID_PREFIX) {
                ids.issnl = non_empty(rest);
            }
        }
    }

    Some(ids)
}

fn non_empty(rest: &str) -> Option<String> {
    let value = rest.split('#').next().unwrap_or_default();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
