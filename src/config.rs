use crate::error::{LaunchpadError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DATABASE_FILE: &str = "database/launchpad.bin.gz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Workbook,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    /// Unsalted SHA-256 hex, matching hashes already in the registry
    Sha256,
    Argon2,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: BackendKind::Workbook,
            path: PathBuf::from(DATABASE_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a worksheet snapshot stays fresh; 0 turns the cache off
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { ttl_secs: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Node count assumed for a mission that has no manifest rows
    pub default_total_nodes: u32,
}

impl Default for MissionConfig {
    fn default() -> Self {
        MissionConfig {
            default_total_nodes: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub password_scheme: PasswordScheme,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            password_scheme: PasswordScheme::Sha256,
        }
    }
}

/// Launchpad settings, read from a TOML file
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LaunchpadConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub missions: MissionConfig,
    pub auth: AuthConfig,
}

impl LaunchpadConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LaunchpadConfig = toml::from_str(content)
            .map_err(|e| LaunchpadError::validation("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings; a file that does not exist means all defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(LaunchpadConfig::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            LaunchpadError::validation("config", format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.cache.ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.missions.default_total_nodes == 0 {
            return Err(LaunchpadError::validation(
                "missions.default_total_nodes",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = LaunchpadConfig::from_toml_str("").unwrap();
        assert_eq!(config, LaunchpadConfig::default());
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.missions.default_total_nodes, 5);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = LaunchpadConfig::from_toml_str(
            r#"
            [store]
            backend = "memory"

            [cache]
            ttl_secs = 0

            [auth]
            password_scheme = "argon2"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.backend, BackendKind::Memory);
        assert_eq!(config.store.path, PathBuf::from(DATABASE_FILE));
        assert_eq!(config.cache_ttl(), None);
        assert_eq!(config.auth.password_scheme, PasswordScheme::Argon2);
    }

    #[test]
    fn zero_default_nodes_is_rejected() {
        let err = LaunchpadConfig::from_toml_str("[missions]\ndefault_total_nodes = 0\n");
        assert!(err.is_err());
    }
}
