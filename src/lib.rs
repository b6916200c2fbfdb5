pub mod backlinks;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod hierarchy;
pub mod index;
pub mod naming;
pub mod report;
pub mod store;
pub mod vault;



pub use backlinks::{Plan, Reconciler, SkipReason};
pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use frontmatter::{MetadataExtractor, NoteMetadata};
pub use hierarchy::{NoteRecord, TagNode, TagTree};
pub use index::IndexGenerator;
pub use naming::IndexNaming;
pub use report::{DocumentIssue, IndexReport, SyncReport};
pub use store::{DocumentStore, FsStore, MemoryStore};
pub use vault::{RunReport, Vault};
