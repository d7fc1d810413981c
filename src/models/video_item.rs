use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

/// One clip record from the harvested listing document.
///
/// Records are immutable once parsed; the ordered list is the feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub primary_src: String,
    #[serde(default)]
    pub manifest_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl VideoItem {
    /// The URL handed to the media backend, or `None` when the record
    /// carries nothing playable. The adaptive-stream manifest wins over the
    /// direct file URL; libmpv resolves either.
    pub fn playable_source(&self) -> Option<&str> {
        if let Some(manifest) = self.manifest_url.as_deref() {
            if !manifest.is_empty() {
                return Some(manifest);
            }
        }
        if self.primary_src.is_empty() {
            None
        } else {
            Some(&self.primary_src)
        }
    }
}

/// Listing documents come either as a bare array or wrapped in an
/// `{"items": [...]}` envelope depending on the harvester version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingDocument {
    Envelope { items: Vec<VideoItem> },
    Flat(Vec<VideoItem>),
}

/// Parse a listing document, dropping records with duplicate ids.
pub fn parse_listing(json: &str) -> Result<Vec<VideoItem>> {
    let document: ListingDocument =
        serde_json::from_str(json).context("Failed to parse listing document")?;

    let records = match document {
        ListingDocument::Envelope { items } => items,
        ListingDocument::Flat(items) => items,
    };

    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut items = Vec::with_capacity(records.len());
    for record in records {
        if record.id.is_empty() {
            warn!("Dropping listing record with empty id");
            continue;
        }
        if !seen.insert(record.id.clone()) {
            warn!(id = %record.id, "Dropping listing record with duplicate id");
            continue;
        }
        items.push(record);
    }

    Ok(items)
}

/// Read and parse a listing document from disk.
pub fn load_listing(path: &Path) -> Result<Vec<VideoItem>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read listing document: {}", path.display()))?;
    parse_listing(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_listing() {
        let json = r#"[
            {"id": "a", "title": "First", "primarySrc": "https://cdn.example/a.mp4"},
            {"id": "b", "title": "Second", "primarySrc": "https://cdn.example/b.mp4",
             "manifestUrl": "https://cdn.example/b.m3u8",
             "thumbnailUrl": "https://cdn.example/b.jpg",
             "sourceUrl": "https://social.example/post/b",
             "category": "pets"}
        ]"#;

        let items = parse_listing(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
        assert!(items[0].manifest_url.is_none());
        assert_eq!(items[1].category.as_deref(), Some("pets"));
        assert_eq!(
            items[1].thumbnail_url.as_deref(),
            Some("https://cdn.example/b.jpg")
        );
    }

    #[test]
    fn test_parse_envelope_listing() {
        let json = r#"{"items": [{"id": "x", "title": "", "primarySrc": "https://cdn.example/x.mp4"}]}"#;
        let items = parse_listing(json).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "x");
    }

    #[test]
    fn test_duplicate_and_empty_ids_dropped() {
        let json = r#"[
            {"id": "a", "title": "one", "primarySrc": "u1"},
            {"id": "a", "title": "dupe", "primarySrc": "u2"},
            {"id": "", "title": "anon", "primarySrc": "u3"},
            {"id": "b", "title": "two", "primarySrc": "u4"}
        ]"#;
        let items = parse_listing(json).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(items[0].title, "one");
    }

    #[test]
    fn test_playable_source_prefers_manifest() {
        let mut item = VideoItem {
            id: "a".into(),
            title: String::new(),
            primary_src: "https://cdn.example/a.mp4".into(),
            manifest_url: Some("https://cdn.example/a.m3u8".into()),
            thumbnail_url: None,
            source_url: None,
            category: None,
        };
        assert_eq!(item.playable_source(), Some("https://cdn.example/a.m3u8"));

        item.manifest_url = Some(String::new());
        assert_eq!(item.playable_source(), Some("https://cdn.example/a.mp4"));

        item.manifest_url = None;
        item.primary_src = String::new();
        assert_eq!(item.playable_source(), None);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(parse_listing("{not json").is_err());
        assert!(parse_listing(r#"{"unexpected": 1}"#).is_err());
    }
}
