//! The host server seen from the registry.

use multiworld_common::LevelHandle;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Level management operations the registry needs from the host server.
///
/// The host owns level data and load state; the registry only asks.
pub trait LevelHost {
    fn is_level_loaded(&self, name: &str) -> bool;

    /// Whether level data for `name` exists on the host's storage.
    fn is_level_generated(&self, name: &str) -> bool;

    /// Request that the host load `name`. Best-effort.
    fn load_level(&mut self, name: &str) -> bool;

    fn level_by_name(&self, name: &str) -> Option<LevelHandle>;

    fn unload_level(&mut self, level: LevelHandle) -> bool;

    /// Directory holding one subdirectory per level.
    fn levels_root(&self) -> &Path;

    fn level_dir(&self, name: &str) -> PathBuf {
        self.levels_root().join(name)
    }
}

/// A host whose levels are directories under `levels_root`.
///
/// Load state lives in memory for the lifetime of the value.
#[derive(Debug)]
pub struct LocalHost {
    levels_root: PathBuf,
    loaded: BTreeSet<String>,
    load_requests: Vec<String>,
}

impl LocalHost {
    pub fn new(levels_root: impl Into<PathBuf>) -> Self {
        Self {
            levels_root: levels_root.into(),
            loaded: BTreeSet::new(),
            load_requests: Vec::new(),
        }
    }

    /// Create the level directory for `name` if it does not exist.
    pub fn generate_level(&self, name: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(self.level_dir(name))
    }

    /// Every name passed to `load_level`, in call order.
    pub fn load_requests(&self) -> &[String] {
        &self.load_requests
    }
}

impl LevelHost for LocalHost {
    fn is_level_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    fn is_level_generated(&self, name: &str) -> bool {
        self.level_dir(name).is_dir()
    }

    fn load_level(&mut self, name: &str) -> bool {
        self.load_requests.push(name.to_string());
        if self.loaded.contains(name) {
            return true;
        }
        if !self.is_level_generated(name) {
            tracing::warn!(world = name, "no level data to load");
            return false;
        }
        tracing::debug!(world = name, "level loaded");
        self.loaded.insert(name.to_string())
    }

    fn level_by_name(&self, name: &str) -> Option<LevelHandle> {
        self.loaded.get(name).map(|n| LevelHandle::new(n.as_str()))
    }

    fn unload_level(&mut self, level: LevelHandle) -> bool {
        let removed = self.loaded.remove(level.name());
        if removed {
            tracing::debug!(world = level.name(), "level unloaded");
        }
        removed
    }

    fn levels_root(&self) -> &Path {
        &self.levels_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_generated_levels_load() {
        let tmp = tempfile::tempdir().unwrap();
        let mut host = LocalHost::new(tmp.path());
        assert!(!host.load_level("void"));
        assert!(!host.is_level_loaded("void"));

        host.generate_level("world").unwrap();
        assert!(host.is_level_generated("world"));
        assert!(host.load_level("world"));
        assert!(host.is_level_loaded("world"));
        assert_eq!(host.load_requests(), ["void", "world"]);
    }

    #[test]
    fn unload_releases_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let mut host = LocalHost::new(tmp.path());
        host.generate_level("arena").unwrap();
        host.load_level("arena");

        let handle = host.level_by_name("arena").unwrap();
        assert_eq!(handle.name(), "arena");
        assert!(host.unload_level(handle));
        assert!(host.level_by_name("arena").is_none());
        assert!(host.is_level_generated("arena"));
    }

    #[test]
    fn level_dir_is_under_root() {
        let host = LocalHost::new("/srv/server/worlds");
        assert_eq!(
            host.level_dir("nether"),
            PathBuf::from("/srv/server/worlds/nether")
        );
    }
}
