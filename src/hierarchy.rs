//! Tag hierarchy built from flat, slash-delimited tag paths.
//!
//! Nodes are owned by a single map keyed by full tag path. Children are
//! recorded as segment names, never as references, so the tree needs no
//! back-pointers.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::frontmatter::NoteMetadata;
use crate::naming::is_valid_tag;

/// A scanned note: its filename and extracted header metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub name: String,
    pub metadata: NoteMetadata,
}

impl NoteRecord {
    pub fn new(name: impl Into<String>, metadata: NoteMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagNode {
    /// Notes tagged with exactly this path
    pub files: BTreeSet<String>,
    /// Next segment names of child tags
    pub children: BTreeSet<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TagTree {
    nodes: BTreeMap<String, TagNode>,
    /// note -> every tag path it carries
    note_tags: BTreeMap<String, BTreeSet<String>>,
    untagged: BTreeSet<String>,
    favourites: BTreeSet<String>,
}

impl TagTree {
    pub fn build(notes: &[NoteRecord]) -> Self {
        let mut tree = TagTree::default();
        for note in notes {
            tree.add_note(note);
        }
        log::debug!(
            "[hierarchy] Built {} nodes from {} notes ({} untagged)",
            tree.nodes.len(),
            notes.len(),
            tree.untagged.len()
        );
        tree
    }

    fn add_note(&mut self, note: &NoteRecord) {
        if note.metadata.favourite {
            self.favourites.insert(note.name.clone());
        }

        let tags: BTreeSet<&str> = note
            .metadata
            .tags
            .iter()
            .map(|t| t.as_str())
            .filter(|t| is_valid_tag(t))
            .collect();

        if tags.is_empty() {
            self.untagged.insert(note.name.clone());
            return;
        }

        for tag in tags {
            self.add_tag(tag, &note.name);
        }
    }

    fn add_tag(&mut self, tag: &str, note: &str) {
        let segments: Vec<&str> = tag.split('/').collect();

        for i in 0..segments.len() {
            let path = segments[..=i].join("/");
            let parent = (i > 0).then(|| segments[..i].join("/"));

            let node = self.nodes.entry(path.clone()).or_insert_with(|| TagNode {
                parent: parent.clone(),
                ..TagNode::default()
            });
            if i + 1 == segments.len() {
                node.files.insert(note.to_string());
            }

            if let Some(parent) = parent {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.insert(segments[i].to_string());
                }
            }
        }

        self.note_tags
            .entry(note.to_string())
            .or_default()
            .insert(tag.to_string());
    }

    pub fn node(&self, tag: &str) -> Option<&TagNode> {
        self.nodes.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.nodes.contains_key(tag)
    }

    /// All nodes in path order
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &TagNode)> {
        self.nodes.iter().map(|(path, node)| (path.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tag paths without a parent, sorted
    pub fn root_tags(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// Full child tag paths of `tag`, sorted by segment
    pub fn child_paths(&self, tag: &str) -> Vec<String> {
        self.node(tag)
            .map(|node| {
                node.children
                    .iter()
                    .map(|child| format!("{}/{}", tag, child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Notes listed on `tag`'s index: tagged exactly `tag`, minus those that
    /// also carry a more specific tag below it.
    pub fn files_for_tag(&self, tag: &str) -> Vec<&str> {
        let Some(node) = self.node(tag) else {
            return Vec::new();
        };
        let nested_prefix = format!("{}/", tag);

        node.files
            .iter()
            .filter(|file| {
                !self
                    .note_tags
                    .get(file.as_str())
                    .map(|tags| tags.iter().any(|t| t.starts_with(&nested_prefix)))
                    .unwrap_or(false)
            })
            .map(|file| file.as_str())
            .collect()
    }

    pub fn untagged(&self) -> &BTreeSet<String> {
        &self.untagged
    }

    pub fn favourites(&self) -> &BTreeSet<String> {
        &self.favourites
    }
}
