pub mod types;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::naming::is_valid_tag;

pub use types::{Header, HeaderSplit, NoteMetadata};

/// Header delimiter line
pub const DELIMITER: &str = "---";

static FAVOURITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^favourites?:\s*["']?true["']?$"#).unwrap());
static INLINE_TAGS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^tags:\s*\[(.*)\]$").unwrap());
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-\s*(.+)$").unwrap());

fn is_delimiter(line: &str) -> bool {
    line.strip_suffix('\r').unwrap_or(line) == DELIMITER
}

/// Locate the header block. The opening delimiter must be the very first line.
pub fn split_header(content: &str) -> HeaderSplit {
    let mut lines = content.split('\n');
    match lines.next() {
        Some(first) if is_delimiter(first) => {}
        _ => return HeaderSplit::Missing,
    }

    let mut raw_lines = Vec::new();
    for (offset, line) in lines.enumerate() {
        if is_delimiter(line) {
            return HeaderSplit::Found(Header {
                raw: raw_lines.join("\n"),
                closing_line: offset + 1,
            });
        }
        raw_lines.push(line);
    }
    HeaderSplit::Unterminated
}

/// Where `- item` lines are currently being attributed
#[derive(Clone, Copy, PartialEq, Eq)]
enum ListContext {
    Tags,
    Other,
}

pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract tags and the favourite flag. Missing or unterminated headers
    /// yield empty metadata.
    pub fn extract(content: &str) -> NoteMetadata {
        match split_header(content) {
            HeaderSplit::Found(header) => Self::parse_header(&header.raw),
            HeaderSplit::Missing | HeaderSplit::Unterminated => NoteMetadata::default(),
        }
    }

    /// Parse the text between the delimiters
    pub fn parse_header(raw: &str) -> NoteMetadata {
        let mut tags = Vec::new();
        let mut favourite = false;
        let mut context = ListContext::Other;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if FAVOURITE_RE.is_match(trimmed) {
                favourite = true;
                context = ListContext::Other;
                continue;
            }

            if let Some(caps) = INLINE_TAGS_RE.captures(trimmed) {
                tags.extend(caps[1].split(',').map(clean_tag));
                context = ListContext::Other;
                continue;
            }

            if trimmed == "tags:" {
                context = ListContext::Tags;
                continue;
            }

            if let Some(caps) = LIST_ITEM_RE.captures(trimmed) {
                if context == ListContext::Tags {
                    tags.push(clean_tag(&caps[1]));
                }
                continue;
            }

            // any other key closes a block list
            context = ListContext::Other;
        }

        NoteMetadata {
            tags: dedupe(tags),
            favourite,
        }
    }
}

fn clean_tag(entry: &str) -> String {
    entry
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|t| is_valid_tag(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_tags() {
        let content = "---\ntitle: x\ntags: [proj, proj/web, \"quoted\", 'single']\n---\n# Body";
        let meta = MetadataExtractor::extract(content);
        assert_eq!(meta.tags, vec!["proj", "proj/web", "quoted", "single"]);
        assert!(!meta.favourite);
    }

    #[test]
    fn test_tags_with_empty_segments_dropped() {
        let content = "---\ntags: [\"/\", a//b, /lead, trail/, ok/fine]\n---\n";
        let meta = MetadataExtractor::extract(content);
        assert_eq!(meta.tags, vec!["ok/fine"]);

        let block = "---\ntags:\n  - /\n  - a//b\n---\n";
        assert!(MetadataExtractor::extract(block).tags.is_empty());
    }

    #[test]
    fn test_block_list_tags() {
        let content = "---\ntags:\n  - alpha\n  - \"beta/gamma\"\ncreated: today\n---\n";
        let meta = MetadataExtractor::extract(content);
        assert_eq!(meta.tags, vec!["alpha", "beta/gamma"]);
    }

    #[test]
    fn test_list_items_under_other_keys_ignored() {
        let content = "---\naliases:\n  - not-a-tag\ntags:\n  - real\nauthors:\n  - someone\n---\n";
        let meta = MetadataExtractor::extract(content);
        assert_eq!(meta.tags, vec!["real"]);
    }

    #[test]
    fn test_favourite_variants() {
        for line in ["favourite: true", "Favourites: \"true\"", "FAVOURITE: 'TRUE'"] {
            let content = format!("---\n{}\n---\nbody", line);
            assert!(MetadataExtractor::extract(&content).favourite, "{}", line);
        }
        let content = "---\nfavourite: false\n---\n";
        assert!(!MetadataExtractor::extract(content).favourite);
    }

    #[test]
    fn test_favourite_without_tags() {
        let content = "---\nfavourite: true\n---\n# Note";
        let meta = MetadataExtractor::extract(content);
        assert_eq!(meta, NoteMetadata { tags: vec![], favourite: true });
    }

    #[test]
    fn test_duplicates_and_empty_entries_dropped() {
        let content = "---\ntags: [a, , a, \"\", b]\ntags:\n - a\n---\n";
        let meta = MetadataExtractor::extract(content);
        assert_eq!(meta.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_and_unterminated_headers() {
        assert_eq!(MetadataExtractor::extract("# no header"), NoteMetadata::default());
        assert_eq!(MetadataExtractor::extract("---\nfoo"), NoteMetadata::default());
        assert_eq!(MetadataExtractor::extract(" ---\ntags: [a]\n---\n"), NoteMetadata::default());
        assert_eq!(MetadataExtractor::extract(""), NoteMetadata::default());
    }

    #[test]
    fn test_split_header_positions() {
        let content = "---\ntags: [a]\nfavourite: true\n---\nbody";
        match split_header(content) {
            HeaderSplit::Found(header) => {
                assert_eq!(header.raw, "tags: [a]\nfavourite: true");
                assert_eq!(header.closing_line, 3);
                assert_eq!(header.body_line(), 4);
            }
            other => panic!("expected header, got {:?}", other),
        }
        assert_eq!(split_header("---\nfoo"), HeaderSplit::Unterminated);
        assert_eq!(split_header("text\n---\n"), HeaderSplit::Missing);
    }

    #[test]
    fn test_delimiter_must_be_whole_line() {
        // "----" is not a delimiter, so the header stays open
        assert_eq!(split_header("---\ntags: [a]\n----\n"), HeaderSplit::Unterminated);
    }

    #[test]
    fn test_crlf_header() {
        let content = "---\r\ntags: [a, b]\r\n---\r\nbody";
        let meta = MetadataExtractor::extract(content);
        assert_eq!(meta.tags, vec!["a", "b"]);
    }
}
