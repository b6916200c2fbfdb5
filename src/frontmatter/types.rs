use serde::Serialize;

/// Metadata pulled from a note's header block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteMetadata {
    /// Tag paths in first-seen order, deduplicated, never empty strings
    pub tags: Vec<String>,
    pub favourite: bool,
}

/// Location of a well-formed header inside a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Text between the delimiters, without the delimiter lines
    pub raw: String,
    /// Line index of the closing `---`
    pub closing_line: usize,
}

impl Header {
    /// First line after the closing delimiter
    pub fn body_line(&self) -> usize {
        self.closing_line + 1
    }
}

/// Outcome of looking for a header at the top of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderSplit {
    /// Document does not start with `---`
    Missing,
    /// Opening delimiter present, closing one never found
    Unterminated,
    Found(Header),
}
