use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file looked up in the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "multiworld.yml";

/// Where the plugin keeps its data and where the server keeps its levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Plugin data folder; metadata lives in `<data_folder>/worlds`.
    pub data_folder: PathBuf,
    /// Server root; levels live in `<server_root>/worlds`.
    pub server_root: PathBuf,
    /// Level the server loads on its own before the registry starts.
    pub default_level: String,
    /// Generate the default level's folder if it is missing.
    pub create_default_level: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("plugins/MultiWorld"),
            server_root: PathBuf::from("."),
            default_level: "world".into(),
            create_default_level: true,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(Self::default()),
            Ok(text) => serde_yaml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("invalid settings in {}: {e}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn levels_root(&self) -> PathBuf {
        self.server_root.join("worlds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::load(tmp.path().join(DEFAULT_SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.levels_root(), PathBuf::from("./worlds"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_SETTINGS_FILE);
        std::fs::write(&path, "server_root: /srv/nukkit\ndefault_level: hub\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.server_root, PathBuf::from("/srv/nukkit"));
        assert_eq!(settings.default_level, "hub");
        assert_eq!(settings.data_folder, PathBuf::from("plugins/MultiWorld"));
        assert!(settings.create_default_level);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_SETTINGS_FILE);
        std::fs::write(&path, "create_default_level: maybe\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
