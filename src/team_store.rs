//! Shared, optionally file-backed org chart for the HTTP handlers.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::encode::EncodeError;
use crate::record::{Record, RecordId};
use crate::tree::{NestedNode, OrgChartTree};

/// In-memory org chart.
///
/// Cloning shares the same chart. When a data file is set, every
/// replacement is written back to it as a flat JSON array.
#[derive(Debug, Clone, Default)]
pub struct TeamStore {
    inner: Arc<RwLock<OrgChartTree>>,
    data_file: Option<PathBuf>,
}

impl TeamStore {
    pub fn new(teams: Vec<Record>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(OrgChartTree::new(teams))),
            data_file: None,
        }
    }

    /// Load the flat team list from `path`. A missing file starts an empty chart
    /// that is created on the first save.
    pub fn load(path: &Path) -> Result<Self> {
        let teams: Vec<Record> = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read team list: {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse team list: {:?}", path))?
        } else {
            info!("Team list {:?} does not exist yet, starting empty", path);
            Vec::new()
        };

        info!("Loaded {} teams from {:?}", teams.len(), path);
        Ok(Self::new(teams).with_data_file(path))
    }

    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    pub fn len(&self) -> usize {
        self.read().teams().len()
    }

    /// Copy of the flat team list.
    pub fn teams(&self) -> Vec<Record> {
        self.read().teams().to_vec()
    }

    /// The whole chart, or the subtree under `root` when given.
    pub fn nested(&self, root: Option<&RecordId>) -> Option<NestedNode> {
        let tree = self.read();
        match root {
            Some(id) => tree.subtree(id),
            None => tree.nested_tree(),
        }
    }

    /// Legacy script encoding of [`TeamStore::nested`].
    pub fn nested_js(&self, root: Option<&RecordId>) -> Result<String, EncodeError> {
        match root {
            Some(id) => crate::encode::encode_tree(self.read().subtree(id).as_ref()),
            None => self.read().nested_tree_js(),
        }
    }

    /// Replace the chart from a JSON nested tree and persist it.
    /// Returns the number of teams now stored.
    ///
    /// Blocks on file I/O; async callers should run it off the runtime.
    pub fn replace_from_json(&self, json: &str) -> Result<usize> {
        // The write lock is held until the file is written, so saves land in update order.
        let mut tree = self.write();
        tree.update_from_json(json);
        self.persist(tree.teams())?;
        Ok(tree.teams().len())
    }

    /// Write the flat team list to the data file, if there is one.
    pub fn save(&self) -> Result<()> {
        self.persist(self.read().teams())
    }

    /// Write `teams` to a temporary file next to the data file, then rename it
    /// over the data file. A crash mid-write leaves the previous file intact.
    fn persist(&self, teams: &[Record]) -> Result<()> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };

        let body = serde_json::to_string_pretty(teams).context("Failed to serialize team list")?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
        file.write_all(body.as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .with_context(|| format!("Failed to write team list: {:?}", file.path()))?;
        file.persist(path)
            .with_context(|| format!("Failed to replace team list: {:?}", path))?;

        debug!("Saved {} teams to {:?}", teams.len(), path);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, OrgChartTree> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, OrgChartTree> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
