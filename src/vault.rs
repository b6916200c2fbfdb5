//! Run orchestration over a whole vault.
//!
//! A run has a read phase (every note scanned, tag tree built) followed by a
//! write phase (index documents, then backlink reconciliation). Nothing is
//! written before the read phase completes.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::backlinks::Reconciler;
use crate::config::VaultConfig;
use crate::error::Result;
use crate::frontmatter::MetadataExtractor;
use crate::hierarchy::{NoteRecord, TagTree};
use crate::index::IndexGenerator;
use crate::report::{DocumentIssue, IndexReport, SyncReport};
use crate::store::{DocumentStore, FsStore};

/// Notes read during the scan phase
#[derive(Debug, Default)]
pub struct Scan {
    pub notes: Vec<NoteRecord>,
    pub errors: Vec<DocumentIssue>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub index: IndexReport,
    pub backlinks: SyncReport,
    pub finished_at: DateTime<Utc>,
}

pub struct Vault {
    config: VaultConfig,
    store: Box<dyn DocumentStore>,
}

impl Vault {
    /// Vault backed by the directory at `config.root`
    pub fn open(config: VaultConfig) -> Self {
        let store = FsStore::new(config.root.clone());
        Self::with_store(config, Box::new(store))
    }

    pub fn with_store(config: VaultConfig, store: Box<dyn DocumentStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Read every note and extract its metadata. Fails only when the store
    /// itself cannot be listed.
    pub fn scan(&self) -> Result<Scan> {
        let naming = self.config.naming();
        let names: Vec<String> = self
            .store
            .list()?
            .into_iter()
            .filter(|name| !naming.is_index_document(name))
            .collect();

        let store = self.store.as_ref();
        let results: Vec<(String, Result<String>)> = names
            .into_par_iter()
            .map(|name| {
                let content = store.read(&name);
                (name, content)
            })
            .collect();

        let mut scan = Scan::default();
        for (name, content) in results {
            match content {
                Ok(content) => {
                    let metadata = MetadataExtractor::extract(&content);
                    scan.notes.push(NoteRecord::new(name, metadata));
                }
                Err(e) => {
                    log::error!("[scan] {}", e);
                    scan.errors.push(DocumentIssue::from_error(&name, &e));
                }
            }
        }

        log::info!(
            "[scan] {} notes read, {} unreadable",
            scan.notes.len(),
            scan.errors.len()
        );
        Ok(scan)
    }

    pub fn tree(&self) -> Result<TagTree> {
        let scan = self.scan()?;
        Ok(TagTree::build(&scan.notes))
    }

    /// Rebuild the tag tree and write every index document
    pub fn build_indexes(&self) -> Result<IndexReport> {
        let scan = self.scan()?;
        let tree = TagTree::build(&scan.notes);

        let generator = IndexGenerator::new(&self.config);
        let mut report = generator.generate(self.store(), &tree);
        report.errors.extend(scan.errors);
        Ok(report)
    }

    pub fn check_backlinks(&self) -> Result<SyncReport> {
        self.reconciler().check(self.store())
    }

    pub fn sync_backlinks(&self) -> Result<SyncReport> {
        self.reconciler().sync(self.store())
    }

    /// Indexes first, then backlinks
    pub fn run_all(&self) -> Result<RunReport> {
        let index = self.build_indexes()?;
        let backlinks = self.sync_backlinks()?;
        Ok(RunReport {
            index,
            backlinks,
            finished_at: Utc::now(),
        })
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.config.naming())
    }
}
