use crate::persistence::mapped::MappedRegionFile;
use crate::persistence::positions::SECTOR_SIZE;
use crate::persistence::region::RegionError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_SECTORS: usize = 16;

/// Where the position index lives and how it is provisioned at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionIndexConfig {
    pub path: PathBuf,
    #[serde(default = "default_sectors")]
    pub sectors: usize,
    /// Delete and re-create the file on every start instead of mapping what is there.
    #[serde(default = "default_recreate_on_start")]
    pub recreate_on_start: bool,
}

fn default_sectors() -> usize {
    DEFAULT_SECTORS
}

fn default_recreate_on_start() -> bool {
    true
}

impl PositionIndexConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sectors: DEFAULT_SECTORS,
            recreate_on_start: true,
        }
    }

    /// Loads a JSON config file. A relative `path` is resolved against the directory
    /// holding the config file.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref();
        let bytes = fs::read(config_path)?;
        let mut config: Self = serde_json::from_slice(&bytes)?;
        let base = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.path = resolve_relative(&base, &config.path);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sectors == 0 {
            return Err(ConfigError::Invalid("sectors must be at least 1".into()));
        }
        if self.sectors.checked_mul(SECTOR_SIZE).is_none() {
            return Err(ConfigError::Invalid(format!(
                "sectors {} overflows the region length",
                self.sectors
            )));
        }
        Ok(())
    }

    pub fn region_length(&self) -> usize {
        self.sectors * SECTOR_SIZE
    }

    /// Maps the index file, re-creating it first when `recreate_on_start` is set.
    pub fn provision(&self) -> Result<MappedRegionFile, ConfigError> {
        self.validate()?;
        let region = if self.recreate_on_start {
            MappedRegionFile::create_new(&self.path, self.region_length())?
        } else {
            MappedRegionFile::open_existing(&self.path)?
        };
        Ok(region)
    }
}

/// If `path` is relative, joins it to `base`; otherwise returns it unchanged.
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Region(#[from] RegionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolve_relative_keeps_absolute_paths() {
        let base = Path::new("/etc/fixgate");
        assert_eq!(
            resolve_relative(base, Path::new("state/positions.idx")),
            PathBuf::from("/etc/fixgate/state/positions.idx")
        );
        assert_eq!(
            resolve_relative(base, Path::new("/var/positions.idx")),
            PathBuf::from("/var/positions.idx")
        );
    }

    #[test]
    fn load_applies_defaults_and_resolves_path() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("positions.json");
        fs::write(&config_path, br#"{ "path": "state/positions.idx" }"#).unwrap();
        let config = PositionIndexConfig::load(&config_path).unwrap();
        assert_eq!(config.path, temp.path().join("state/positions.idx"));
        assert_eq!(config.sectors, DEFAULT_SECTORS);
        assert!(config.recreate_on_start);
        assert_eq!(config.region_length(), DEFAULT_SECTORS * SECTOR_SIZE);
    }

    #[test]
    fn load_rejects_zero_sectors_and_unknown_fields() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("positions.json");
        fs::write(&config_path, br#"{ "path": "p.idx", "sectors": 0 }"#).unwrap();
        assert!(matches!(
            PositionIndexConfig::load(&config_path),
            Err(ConfigError::Invalid(_))
        ));
        fs::write(&config_path, br#"{ "path": "p.idx", "sector_size": 512 }"#).unwrap();
        assert!(matches!(
            PositionIndexConfig::load(&config_path),
            Err(ConfigError::Json(_))
        ));
    }
}
