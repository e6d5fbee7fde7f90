//! CLI configuration file
//!
//! `config.toml` has three sections: `[storage]`, `[embedding]` and
//! `[response]`. A missing file means defaults. Keys are addressed with
//! dots, e.g. `response.max_tokens` or `response.reservations.structure`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use trellis_response::ResponseConfig;
use trellis_store::EmbeddingConfig;

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trellis")
        .join("config.toml")
}

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trellis")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Database file stem under the data directory
    pub collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            collection: "trellis".to_string(),
        }
    }
}

/// Configuration for the CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub response: ResponseConfig,
}

const KEYS: &[&str] = &[
    "storage.data_dir",
    "storage.collection",
    "embedding.dimensions",
    "embedding.model",
    "response.max_tokens",
    "response.safety_margin",
    "response.chars_per_token",
    "response.overhead_discount",
    "response.array_allotment",
    "response.shrink_factor",
    "response.long_string_threshold",
    "response.truncation_marker",
    "response.default_limit",
    "response.reservations.structure",
    "response.reservations.api_surface",
    "response.reservations.dependencies",
    "response.reservations.relations",
    "response.max_key_modules",
    "response.max_dependencies",
    "response.max_key_usages",
    "response.docstring_preview_chars",
];

impl Config {
    /// Load from `path`, or defaults if it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}; using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        KEYS
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.collection.trim().is_empty() {
            bail!("storage.collection must not be empty");
        }
        if self.embedding.dimensions == 0 {
            bail!("embedding.dimensions must be positive");
        }
        self.response.validate()?;
        Ok(())
    }

    /// Data directory: explicit override, then config, then platform default
    pub fn data_dir(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.storage.data_dir.clone())
            .unwrap_or_else(default_data_dir)
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.redb", self.storage.collection))
    }

    /// Value of `key`; `None` when the key is known but unset
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        check_key(key)?;
        let root = toml::Value::try_from(self)?;
        Ok(lookup(&root, key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// Set `key` from its string form, typed after the current value. An
    /// empty value unsets `storage.data_dir`.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        check_key(key)?;
        let mut root = toml::Value::try_from(&*self)?;

        let (parent_path, leaf) = key.rsplit_once('.').unwrap_or(("", key));
        let mut table = &mut root;
        for part in parent_path.split('.').filter(|p| !p.is_empty()) {
            table = table
                .get_mut(part)
                .with_context(|| format!("Unknown config key: {}", key))?;
        }
        let table = table
            .as_table_mut()
            .with_context(|| format!("Unknown config key: {}", key))?;

        if value.is_empty() && key == "storage.data_dir" {
            table.remove(leaf);
        } else {
            let typed = parse_like(table.get(leaf), value)
                .with_context(|| format!("Invalid value for {}: {}", key, value))?;
            table.insert(leaf.to_string(), typed);
        }

        let updated: Config = root.try_into()?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn check_key(key: &str) -> anyhow::Result<()> {
    if !KEYS.contains(&key) {
        bail!(
            "Unknown config key: {}. Available keys: {}",
            key,
            KEYS.join(", ")
        );
    }
    Ok(())
}

fn lookup<'a>(root: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.').try_fold(root, |value, part| value.get(part))
}

fn parse_like(current: Option<&toml::Value>, raw: &str) -> anyhow::Result<toml::Value> {
    Ok(match current {
        Some(toml::Value::Integer(_)) => toml::Value::Integer(raw.trim().parse()?),
        Some(toml::Value::Float(_)) => toml::Value::Float(raw.trim().parse()?),
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(raw.trim().parse()?),
        _ => toml::Value::String(raw.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(
            config.database_path(Path::new("/data")),
            PathBuf::from("/data/trellis.redb")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("response.max_tokens", "8000").unwrap();
        config.set("response.safety_margin", "0.9").unwrap();
        config.set("storage.data_dir", "/tmp/graphs").unwrap();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.response.max_tokens, 8000);
        assert_eq!(loaded.response.safety_margin, 0.9);
        assert_eq!(loaded.storage.data_dir, Some(PathBuf::from("/tmp/graphs")));
    }

    #[test]
    fn test_get() {
        let config = Config::default();
        assert_eq!(config.get("response.max_tokens").unwrap().as_deref(), Some("25000"));
        assert_eq!(config.get("embedding.model").unwrap().as_deref(), Some("hashing-fnv1a"));
        assert_eq!(
            config.get("response.reservations.structure").unwrap().as_deref(),
            Some("1000")
        );
        assert_eq!(config.get("storage.data_dir").unwrap(), None);
        assert!(config.get("storage.nope").is_err());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("response.max_tokens", "lots").is_err());
        assert!(config.set("response.safety_margin", "1.5").is_err());
        assert!(config.set("response.max_tokens", "16").is_err());
        assert!(config.set("embedding.dimensions", "0").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unset_data_dir() {
        let mut config = Config::default();
        config.set("storage.data_dir", "/srv/trellis").unwrap();
        config.set("storage.data_dir", "").unwrap();
        assert_eq!(config.storage.data_dir, None);
        assert_eq!(
            config.data_dir(Some(Path::new("/override"))),
            PathBuf::from("/override")
        );
    }
}
