//! Index document generation
//!
//! One index per tag node plus a home document. Every list is rendered from
//! sorted collections so identical input always yields identical bytes.

use std::collections::BTreeMap;

use crate::config::VaultConfig;
use crate::hierarchy::TagTree;
use crate::naming::{capitalize, display_name, note_stem, parent_tag, IndexNaming};
use crate::report::{DocumentIssue, IndexReport};
use crate::store::DocumentStore;

pub struct IndexGenerator {
    naming: IndexNaming,
    featured_roots: Vec<String>,
    archive_root: Option<String>,
    recent_block: String,
}

impl IndexGenerator {
    pub fn new(config: &VaultConfig) -> Self {
        Self {
            naming: config.naming(),
            featured_roots: config.featured_roots.clone(),
            archive_root: config.archive_root.clone(),
            recent_block: config.recent_block.clone(),
        }
    }

    pub fn naming(&self) -> &IndexNaming {
        &self.naming
    }

    /// Render every index document, keyed by store path
    pub fn render_all(&self, tree: &TagTree) -> BTreeMap<String, String> {
        let mut docs = BTreeMap::new();

        for (tag, _) in tree.nodes() {
            let path = self.naming.index_path(tag);
            if docs.contains_key(&path) {
                log::warn!(
                    "[index] Tag '{}' maps to {} which another tag already uses; overwriting",
                    tag,
                    path
                );
            }
            if let Some(content) = self.render_tag_index(tree, tag) {
                docs.insert(path, content);
            }
        }
        docs.insert(self.naming.home_path().to_string(), self.render_home(tree));
        docs
    }

    /// Write all index documents, skipping those whose content is unchanged
    pub fn generate(&self, store: &dyn DocumentStore, tree: &TagTree) -> IndexReport {
        let mut report = IndexReport {
            nodes: tree.len(),
            ..IndexReport::default()
        };

        for (path, content) in self.render_all(tree) {
            if matches!(store.read(&path), Ok(existing) if existing == content) {
                report.unchanged += 1;
                continue;
            }
            match store.write(&path, &content) {
                Ok(()) => {
                    log::debug!("[index] Wrote {}", path);
                    report.written += 1;
                }
                Err(e) => {
                    log::error!("[index] {}", e);
                    report.errors.push(DocumentIssue::from_error(&path, &e));
                }
            }
        }

        log::info!(
            "[index] {} indexes written, {} unchanged",
            report.written,
            report.unchanged
        );
        report
    }

    /// Index document for a single tag node
    pub fn render_tag_index(&self, tree: &TagTree, tag: &str) -> Option<String> {
        let node = tree.node(tag)?;
        let mut content = format!("# {}\n\n", capitalize(display_name(tag)));

        content.push_str(&format!("← [[{}|Home]]\n\n", self.naming.home_link()));
        if let Some(parent) = parent_tag(tag) {
            content.push_str(&format!(
                "← [[{}|{}]]\n\n",
                self.naming.index_link(parent),
                display_name(parent)
            ));
        }

        if !node.children.is_empty() {
            content.push_str("## Directories\n\n");
            for child in tree.child_paths(tag) {
                content.push_str(&self.tag_link_item(&child));
            }
            content.push('\n');
        }

        let files = tree.files_for_tag(tag);
        if !files.is_empty() {
            content.push_str("## Files\n\n");
            for file in files {
                content.push_str(&self.note_link_item(file));
            }
        }

        Some(content)
    }

    /// Home document aggregating featured roots, favourites, other roots,
    /// untagged notes and the pass-through recent block
    pub fn render_home(&self, tree: &TagTree) -> String {
        let mut content = String::from("# Main Index\n\n");

        for root in &self.featured_roots {
            if !tree.contains(root) {
                continue;
            }
            content.push_str(&format!(
                "## [[{}|{}]]\n\n",
                self.naming.index_link(root),
                capitalize(root)
            ));
            content.push_str(&self.render_featured_section(tree, root));
        }

        content.push_str("\n---\n");

        if !tree.favourites().is_empty() {
            content.push_str("## ⭐ Favourites\n\n");
            for file in tree.favourites() {
                content.push_str(&self.note_link_item(file));
            }
            content.push_str("\n---\n");
        }

        let other_roots: Vec<&str> = tree
            .root_tags()
            .into_iter()
            .filter(|tag| !self.featured_roots.iter().any(|f| f == tag))
            .filter(|tag| self.archive_root.as_deref() != Some(*tag))
            .collect();
        if !other_roots.is_empty() {
            content.push_str("## 🏷️ Other Categories\n\n");
            for tag in other_roots {
                content.push_str(&self.tag_link_item(tag));
            }
            content.push_str("\n---\n");
        }

        if !tree.untagged().is_empty() {
            content.push_str("## 🧦 Uncategorized\n\n");
            for file in tree.untagged() {
                content.push_str(&self.note_link_item(file));
            }
            content.push_str("\n---\n");
        }

        content.push_str("## 🕐 Recently Edited\n\n");
        content.push_str(&self.recent_block);
        content.push_str("\n\n");

        if let Some(archive) = self.archive_root.as_deref().filter(|a| tree.contains(a)) {
            content.push_str("---\n");
            content.push_str(&format!(
                "## [[{}|{}]]\n\n",
                self.naming.index_link(archive),
                capitalize(archive)
            ));
        }

        content
    }

    fn render_featured_section(&self, tree: &TagTree, root: &str) -> String {
        let mut section = String::new();

        for child in tree.child_paths(root) {
            section.push_str(&self.tag_link_item(&child));
        }

        // files tagged with the root itself are bare links, not list items
        let files = tree.files_for_tag(root);
        if !files.is_empty() {
            section.push('\n');
            for file in files {
                section.push_str(&format!("[[{}]]\n", self.naming.note_link(file)));
            }
        }
        section.push('\n');
        section
    }

    fn tag_link_item(&self, tag: &str) -> String {
        format!("- [[{}|{}]]\n", self.naming.index_link(tag), display_name(tag))
    }

    fn note_link_item(&self, file: &str) -> String {
        format!("- [[{}|{}]]\n", self.naming.note_link(file), note_stem(file))
    }
}
