use crate::config::ISSN_PLACEHOLDER;
use crate::identifier::IdentifierSet;

/// Renders the metadata URL for one identifier
pub fn resource_link(template: &str, issn: &str) -> String {
    template.replace(ISSN_PLACEHOLDER, issn)
}

/// Turns the identifier list into metadata links, leaving out ignored identifiers
///
/// The input order is kept.
pub fn build_links(
    identifiers: &[String],
    ignore: Option<&IdentifierSet>,
    template: &str,
) -> Vec<String> {
    let links: Vec<String> = identifiers
        .iter()
        .filter(|issn| !ignore.is_some_and(|set| set.contains(issn)))
        .map(|issn| resource_link(template, issn))
        .collect();

    if let Some(set) = ignore {
        tracing::info!(
            "Started with {} ISSN, {} to ignore, {} left",
            identifiers.len(),
            set.size(),
            links.len()
        );
    }
    links
}
