//! Registry of compiled layouts and their parameter lists.
//!
//! A child template can only finish its delegating call once it knows the
//! parameter shape of its layout, so layouts are compiled on first use and
//! their parameters are kept here. One registry is shared by every compile
//! of a build, possibly from several threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::directive::Param;

/// Layout path → declared parameters, behind a reader/writer lock.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    entries: RwLock<FxHashMap<PathBuf, Arc<[Param]>>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters of the layout at `path`; empty when the layout is unknown.
    pub fn lookup(&self, path: &Path) -> Vec<Param> {
        self.get(path).map(|params| params.to_vec()).unwrap_or_default()
    }

    /// Parameters of the layout at `path`, or `None` if it was never registered.
    pub fn get(&self, path: &Path) -> Option<Arc<[Param]>> {
        self.entries.read().get(path).cloned()
    }

    /// Records the parameters of the layout at `path`, replacing any earlier entry.
    pub fn set(&self, path: impl Into<PathBuf>, params: Vec<Param>) -> Arc<[Param]> {
        let params: Arc<[Param]> = params.into();
        self.entries.write().insert(path.into(), Arc::clone(&params));
        params
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.read().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
