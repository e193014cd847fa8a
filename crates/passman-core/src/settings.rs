use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional `settings.json` in the data directory. Unset paths fall back to
/// the defaults in [`crate::paths`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSettings {
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            socket_path: None,
            database_path: None,
            log_filter: default_log_filter(),
        }
    }
}

impl DaemonSettings {
    /// Reads `settings.json` from `data_dir`; a missing file yields defaults.
    pub fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let path = paths::settings_path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&data)
            .map_err(|e| anyhow::anyhow!("invalid settings file {}: {e}", path.display()))?;
        Ok(settings)
    }

    pub fn socket_path(&self, data_dir: &Path) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| paths::socket_path(data_dir))
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| paths::database_path(data_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DaemonSettings::load(dir.path()).unwrap();
        assert_eq!(settings, DaemonSettings::default());
        assert_eq!(settings.database_path(dir.path()), dir.path().join("passman.db"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"database_path": "/var/lib/passman/vault.db"}"#,
        )
        .unwrap();
        let settings = DaemonSettings::load(dir.path()).unwrap();
        assert_eq!(settings.log_filter, "info");
        assert_eq!(
            settings.database_path(dir.path()),
            PathBuf::from("/var/lib/passman/vault.db")
        );
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{").unwrap();
        assert!(DaemonSettings::load(dir.path()).is_err());
    }
}
