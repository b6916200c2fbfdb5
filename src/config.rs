//! Vault configuration
//!
//! Every component receives a [`VaultConfig`] explicitly. Nothing reads the
//! process working directory. An optional JSON file under `.tagvault/`
//! overrides the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VaultError};
use crate::naming::IndexNaming;

/// Directory (relative to the vault root) holding tool state
pub const STATE_DIR: &str = ".tagvault";

const CONFIG_FILE: &str = "config.json";

const DEFAULT_RECENT_BLOCK: &str = "```dataviewjs
dv.list(
    dv.pages()
      .where(p => !p.file.name.startsWith('index'))
      .sort(p => p.file.mtime, 'desc')
      .limit(5)
      .map(p => p.file.link)
);
```";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Document store root. Always overridden by the caller.
    #[serde(skip)]
    pub root: PathBuf,
    /// Subdirectory that receives tag index documents
    pub index_dir: String,
    /// Home document written at the vault root
    pub home_index: String,
    /// Marker prepended to every tag index filename
    pub index_prefix: String,
    /// Whether generated links keep the `.md` extension
    pub link_extension: bool,
    /// Root tags expanded inline on the home document
    pub featured_roots: Vec<String>,
    /// Root tag given its own trailing section on the home document
    pub archive_root: Option<String>,
    /// Opaque "recently edited" block copied verbatim into the home document
    pub recent_block: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            index_dir: "indexes".to_string(),
            home_index: "index.md".to_string(),
            index_prefix: "index".to_string(),
            link_extension: true,
            featured_roots: vec!["projects".to_string(), "resources".to_string()],
            archive_root: Some("archive".to_string()),
            recent_block: DEFAULT_RECENT_BLOCK.to_string(),
        }
    }
}

impl VaultConfig {
    /// Defaults rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration for the vault at `root`.
    ///
    /// `explicit` must exist when given. Otherwise `<root>/.tagvault/config.json`
    /// is used if present, falling back to defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = root.join(STATE_DIR).join(CONFIG_FILE);
                if !candidate.exists() {
                    log::debug!("[config] No config file, using defaults");
                    return Ok(Self::new(root));
                }
                candidate
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| VaultError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let mut config: VaultConfig =
            serde_json::from_str(&content).map_err(|e| VaultError::Config {
                path: path.clone(),
                message: e.to_string(),
            })?;
        config.root = root.to_path_buf();
        config.validate(&path)?;

        log::info!("[config] Loaded {:?}", path);
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: &str| VaultError::Config {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        if self.index_prefix.is_empty() {
            return Err(invalid("index_prefix must not be empty"));
        }
        if self.home_index.is_empty() || self.home_index.contains('/') {
            return Err(invalid("home_index must be a plain filename"));
        }
        if self.index_dir.starts_with('/') || self.index_dir.split('/').any(|s| s == "..") {
            return Err(invalid("index_dir must stay inside the vault"));
        }
        Ok(())
    }

    pub fn naming(&self) -> IndexNaming {
        IndexNaming::from_config(self)
    }
}
