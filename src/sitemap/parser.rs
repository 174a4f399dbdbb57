//! Strict decoding of sitemap documents
//!
//! Two document kinds are read: the `<sitemapindex>` listing shard locations,
//! and the `<urlset>` shards listing one record URL per serial. The root
//! element is checked before decoding, so a shard is never mistaken for an
//! index or the other way round.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while decoding a sitemap document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document has no root element")]
    Empty,

    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("XML decode error: {0}")]
    Decode(#[from] quick_xml::de::DeError),
}

/// One `<sitemap>` entry of the index
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShardRef {
    pub loc: String,
    #[serde(default)]
    pub lastmod: Option<String>,
}

/// Decoded sitemap index, shards in document order
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SitemapIndex {
    #[serde(rename = "sitemap", default)]
    pub shards: Vec<ShardRef>,
}

impl SitemapIndex {
    /// Shard locations in document order
    pub fn locations(&self) -> Vec<&str> {
        self.shards.iter().map(|s| s.loc.trim()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    loc: String,
}

/// Decodes a `<sitemapindex>` document
pub fn parse_index(xml: &str) -> Result<SitemapIndex, ParseError> {
    expect_root(xml, "sitemapindex")?;
    Ok(quick_xml::de::from_str(xml)?)
}

/// Decodes a `<urlset>` document into its record URLs
pub fn parse_urlset(xml: &str) -> Result<Vec<String>, ParseError> {
    expect_root(xml, "urlset")?;
    let set: UrlSet = quick_xml::de::from_str(xml)?;
    Ok(set.urls.into_iter().map(|u| u.loc.trim().to_string()).collect())
}

/// Extracts the identifier of every record in a shard
///
/// The identifier is the trailing path segment of the record URL, e.g.
/// `https://portal.issn.org/resource/ISSN/0000-0019` yields `0000-0019`.
pub fn extract_identifiers(xml: &str) -> Result<Vec<String>, ParseError> {
    Ok(parse_urlset(xml)?
        .iter()
        .filter_map(|loc| identifier_from_loc(loc))
        .map(str::to_string)
        .collect())
}

/// Trailing path segment of a record URL
pub fn identifier_from_loc(loc: &str) -> Option<&str> {
    let segment = loc.trim().trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment)
    }
}

fn expect_root(xml: &str, expected: &'static str) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let found = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if found == expected {
                    return Ok(());
                }
                return Err(ParseError::UnexpectedRoot { expected, found });
            }
            Event::Eof => return Err(ParseError::Empty),
            _ => continue,
        }
    }
}
