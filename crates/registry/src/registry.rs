//! The world registry.
//!
//! Layout inside the data folder:
//! ```text
//! worlds/
//!   <name>.yml    - one metadata document per world
//! ```
//!
//! Level data itself lives under the host's `levels_root()` and is only
//! touched when a world is deleted.

use crate::host::LevelHost;
use crate::metadata::{MetadataDoc, MetadataError, NAME_KEY};
use multiworld_common::{NameError, WorldName};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Subdirectory of the data folder holding metadata documents.
pub const WORLDS_DIR: &str = "worlds";

/// Extension of metadata documents.
pub const METADATA_EXTENSION: &str = "yml";

/// Template copied into place by `create_world`.
const WORLD_TEMPLATE: &str = include_str!("../resources/world.yml");

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("invalid world name: {0}")]
    InvalidName(#[from] NameError),
    #[error("failed to save metadata for: {}", .failed.join(", "))]
    PartialSave { failed: Vec<String> },
}

/// One known world.
#[derive(Debug, Clone)]
pub struct WorldRecord {
    name: WorldName,
    metadata_path: PathBuf,
    config: MetadataDoc,
}

impl WorldRecord {
    pub fn name(&self) -> &WorldName {
        &self.name
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn config(&self) -> &MetadataDoc {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MetadataDoc {
        &mut self.config
    }
}

/// What a `load_worlds` pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records in the registry after the scan.
    pub indexed: usize,
    /// Load requests the host accepted.
    pub loaded: usize,
    /// Load requests the host refused.
    pub failed: usize,
    pub already_loaded: usize,
    /// Records whose level data is missing on the host.
    pub missing: usize,
    /// Records without a `name` entry.
    pub malformed: usize,
    /// Records whose `name` entry disagrees with the filename.
    pub mismatched: usize,
    /// Records dropped because their metadata file disappeared.
    pub vanished: usize,
}

/// Index of known worlds, kept in step with metadata files and the host.
///
/// Keys are the metadata filename stems.
pub struct WorldRegistry<H: LevelHost> {
    data_folder: PathBuf,
    worlds: BTreeMap<WorldName, WorldRecord>,
    host: H,
}

impl<H: LevelHost> WorldRegistry<H> {
    /// An empty registry. Nothing is read until `load_worlds`.
    pub fn new(data_folder: impl Into<PathBuf>, host: H) -> Self {
        Self {
            data_folder: data_folder.into(),
            worlds: BTreeMap::new(),
            host,
        }
    }

    /// Create a registry and run the startup scan.
    pub fn init(data_folder: impl Into<PathBuf>, host: H) -> Self {
        let mut registry = Self::new(data_folder, host);
        registry.load_worlds();
        registry
    }

    /// Flush all metadata and hand the host back.
    pub fn shutdown(self) -> H {
        if let Err(e) = self.save_to_disk() {
            error!(error = %e, "world metadata was not fully saved on shutdown");
        }
        self.host
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn worlds_dir(&self) -> PathBuf {
        self.data_folder.join(WORLDS_DIR)
    }

    pub fn metadata_path(&self, name: &WorldName) -> PathBuf {
        self.worlds_dir().join(format!("{name}.{METADATA_EXTENSION}"))
    }

    /// Scan the metadata folder and ask the host to load every world it
    /// has data for but has not loaded yet.
    ///
    /// Safe to call repeatedly: loaded levels are never touched again and
    /// indexed files are re-read.
    pub fn load_worlds(&mut self) -> LoadSummary {
        let dir = self.worlds_dir();
        if !dir.is_dir() {
            match std::fs::create_dir_all(&dir) {
                Ok(()) => info!(path = %dir.display(), "created worlds folder"),
                Err(e) => error!(
                    path = %dir.display(),
                    error = %e,
                    "failed to create worlds folder, world management will not function correctly"
                ),
            }
        }

        let vanished = self.drop_vanished();
        if let Err(e) = self.scan(&dir) {
            error!(path = %dir.display(), error = %e, "failed to read worlds folder");
        }

        let mut summary = LoadSummary {
            indexed: self.worlds.len(),
            vanished,
            ..LoadSummary::default()
        };

        for (key, record) in &self.worlds {
            let Some(name) = record.config.name() else {
                summary.malformed += 1;
                continue;
            };
            if name != key.as_str() {
                warn!(
                    file = %record.metadata_path.display(),
                    name,
                    "metadata name does not match its filename, not loading"
                );
                summary.mismatched += 1;
                continue;
            }
            // Usually the server's default level.
            if self.host.is_level_loaded(name) {
                summary.already_loaded += 1;
                continue;
            }
            if !self.host.is_level_generated(name) {
                warn!(
                    world = name,
                    path = %self.host.level_dir(name).display(),
                    "skipping world, level folder does not exist"
                );
                summary.missing += 1;
                continue;
            }
            if self.host.load_level(name) {
                info!(world = name, "loaded world");
                summary.loaded += 1;
            } else {
                warn!(world = name, "host refused to load world");
                summary.failed += 1;
            }
        }

        info!(
            indexed = summary.indexed,
            loaded = summary.loaded,
            failed = summary.failed,
            already_loaded = summary.already_loaded,
            missing = summary.missing,
            malformed = summary.malformed,
            mismatched = summary.mismatched,
            vanished = summary.vanished,
            "world scan complete"
        );
        summary
    }

    /// Forget records whose metadata file is gone, so a later save does not
    /// bring it back.
    fn drop_vanished(&mut self) -> usize {
        let before = self.worlds.len();
        self.worlds.retain(|name, record| {
            let present = record.metadata_path.is_file();
            if !present {
                warn!(
                    world = %name,
                    file = %record.metadata_path.display(),
                    "metadata file disappeared, dropping world"
                );
            }
            present
        });
        before - self.worlds.len()
    }

    fn scan(&mut self, dir: &Path) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_metadata = path.extension().and_then(OsStr::to_str) == Some(METADATA_EXTENSION);
            if !is_metadata || !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
                warn!(file = %path.display(), "skipping metadata file with a non UTF-8 name");
                continue;
            };
            let name = match WorldName::new(stem) {
                Ok(name) => name,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping metadata file");
                    continue;
                }
            };
            match MetadataDoc::open(&path) {
                Ok(config) => {
                    debug!(world = %name, "indexed world metadata");
                    self.worlds.insert(
                        name.clone(),
                        WorldRecord {
                            name,
                            metadata_path: path,
                            config,
                        },
                    );
                }
                Err(e) => error!(error = %e, "failed to load a world file"),
            }
        }
        Ok(())
    }

    /// Register a new world by writing its metadata file.
    ///
    /// Creating a world that is already registered does nothing. The level
    /// itself is neither generated nor loaded here.
    pub fn create_world(&mut self, name: &str) -> Result<(), RegistryError> {
        let name = WorldName::new(name)?;
        if self.worlds.contains_key(&name) {
            debug!(world = %name, "world already registered");
            return Ok(());
        }

        std::fs::create_dir_all(self.worlds_dir())?;
        let path = self.metadata_path(&name);
        if !path.exists() {
            std::fs::write(&path, WORLD_TEMPLATE)?;
        }

        let mut config = MetadataDoc::open(&path)?;
        config.set(NAME_KEY, name.as_str());
        config.save()?;

        info!(world = %name, "created world");
        self.worlds.insert(
            name.clone(),
            WorldRecord {
                name,
                metadata_path: path,
                config,
            },
        );
        Ok(())
    }

    /// Unload a world and delete its metadata file and level directory.
    ///
    /// Only worlds the host currently has loaded can be deleted. Returns
    /// `false` when nothing was deleted or when a file could not be removed;
    /// in the latter case earlier deletions are not rolled back.
    pub fn delete_world(&mut self, name: &str) -> bool {
        if !self.worlds.contains_key(name) {
            debug!(world = name, "not a registered world");
            return false;
        }
        let Some(level) = self.host.level_by_name(name) else {
            warn!(world = name, "world is not loaded, refusing to delete it");
            return false;
        };
        let Some(record) = self.worlds.remove(name) else {
            return false;
        };

        if !self.host.unload_level(level) {
            warn!(world = name, "host did not report the level as unloaded");
        }

        let level_dir = self.host.level_dir(name);
        match delete_world_files(&record.metadata_path, &level_dir) {
            Ok(()) => {
                info!(world = name, "deleted world");
                true
            }
            Err(e) => {
                error!(world = name, error = %e, "failed to delete world files");
                false
            }
        }
    }

    /// Names of all registered worlds.
    pub fn get_worlds(&self) -> BTreeSet<WorldName> {
        self.worlds.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.worlds.contains_key(name)
    }

    pub fn record(&self, name: &str) -> Option<&WorldRecord> {
        self.worlds.get(name)
    }

    pub fn record_mut(&mut self, name: &str) -> Option<&mut WorldRecord> {
        self.worlds.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    /// Write every record's metadata back to disk.
    ///
    /// Every record is attempted; returns the number saved, or the names
    /// that failed.
    pub fn save_to_disk(&self) -> Result<usize, RegistryError> {
        let mut saved = 0;
        let mut failed = Vec::new();
        for (name, record) in &self.worlds {
            match record.config.save() {
                Ok(()) => saved += 1,
                Err(e) => {
                    error!(world = %name, error = %e, "failed to save world metadata");
                    failed.push(name.to_string());
                }
            }
        }
        if failed.is_empty() {
            debug!(saved, "saved world metadata");
            Ok(saved)
        } else {
            Err(RegistryError::PartialSave { failed })
        }
    }
}

fn delete_world_files(metadata_path: &Path, level_dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(metadata_path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    remove_tree(level_dir)
}

/// Depth-first removal: files before the directories containing them.
/// Symlinks, including `dir` itself, are removed, not followed.
fn remove_tree(dir: &Path) -> std::io::Result<()> {
    if std::fs::symlink_metadata(dir)?.file_type().is_symlink() {
        return std::fs::remove_file(dir);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            remove_tree(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    std::fs::remove_dir(dir)
}
