//! Tag path to index document naming.
//!
//! Index generation and backlink reconciliation both derive names from here,
//! so link text and link targets cannot drift apart.
//!
//! The scheme replaces `/` with `-`, which makes `a/b` and a literal `a-b`
//! collide on the same index file. That ambiguity is kept as-is.

use crate::config::VaultConfig;

/// Glyph that opens every backlink line
pub const BACKLINK_GLYPH: char = '←';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNaming {
    prefix: String,
    index_dir: String,
    home_index: String,
    link_extension: bool,
}

impl IndexNaming {
    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            prefix: config.index_prefix.clone(),
            index_dir: config.index_dir.trim_matches('/').to_string(),
            home_index: config.home_index.clone(),
            link_extension: config.link_extension,
        }
    }

    /// `projects/web` -> `index-projects-web.md`
    pub fn index_file_name(&self, tag: &str) -> String {
        format!("{}-{}.md", self.prefix, tag.replace('/', "-"))
    }

    /// Store-relative path of a tag's index document
    pub fn index_path(&self, tag: &str) -> String {
        self.in_index_dir(&self.index_file_name(tag))
    }

    /// Link target used inside `[[...]]` for a tag's index
    pub fn index_link(&self, tag: &str) -> String {
        self.link_target(&self.index_path(tag))
    }

    pub fn home_path(&self) -> &str {
        &self.home_index
    }

    pub fn home_link(&self) -> String {
        self.link_target(&self.home_index)
    }

    /// Link target for a note living at the vault root
    pub fn note_link(&self, file_name: &str) -> String {
        self.link_target(file_name)
    }

    /// Rendered backlink line for one tag
    pub fn backlink_line(&self, tag: &str) -> String {
        format!(
            "{} [[{}|Back to {}]]",
            BACKLINK_GLYPH,
            self.index_link(tag),
            display_name(tag)
        )
    }

    /// Home and tag index documents are outputs, never scanned as notes.
    pub fn is_index_document(&self, file_name: &str) -> bool {
        file_name == self.home_index || file_name.starts_with(&format!("{}-", self.prefix))
    }

    fn in_index_dir(&self, file_name: &str) -> String {
        if self.index_dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.index_dir, file_name)
        }
    }

    fn link_target(&self, path: &str) -> String {
        if self.link_extension {
            path.to_string()
        } else {
            path.strip_suffix(".md").unwrap_or(path).to_string()
        }
    }
}

/// A tag names a tree path only when every `/` segment is non-empty
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.split('/').all(|segment| !segment.is_empty())
}

/// Final segment of a tag path
pub fn display_name(tag: &str) -> &str {
    tag.rsplit('/').next().unwrap_or(tag)
}

/// Parent tag path, `None` for root tags
pub fn parent_tag(tag: &str) -> Option<&str> {
    tag.rfind('/').map(|idx| &tag[..idx])
}

/// First letter uppercased, used for index titles
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Note filename without its `.md` extension
pub fn note_stem(file_name: &str) -> &str {
    file_name.strip_suffix(".md").unwrap_or(file_name)
}
