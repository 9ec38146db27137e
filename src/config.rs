use crate::dict::Normalization;
use crate::hocr::selector::UNCHECKED_WORDS_QUERY;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = ".hocrspell.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Word list, one word per line
    #[serde(default)]
    pub dictionary: Option<PathBuf>,

    /// Deletion-pairs table; generated from the dictionary when absent
    #[serde(default)]
    pub deletions: Option<PathBuf>,

    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: usize,

    #[serde(default = "default_unchecked_query")]
    pub unchecked_query: String,

    #[serde(default)]
    pub normalization: Normalization,

    #[serde(default)]
    pub bbox_queries: Vec<String>,
}

fn default_max_edit_distance() -> usize {
    1
}

fn default_unchecked_query() -> String {
    UNCHECKED_WORDS_QUERY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dictionary: None,
            deletions: None,
            max_edit_distance: default_max_edit_distance(),
            unchecked_query: default_unchecked_query(),
            normalization: Normalization::default(),
            bbox_queries: Vec::new(),
        }
    }
}

/// Values given on the command line; `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub dictionary: Option<PathBuf>,
    pub deletions: Option<PathBuf>,
    pub max_edit_distance: Option<usize>,
    pub unchecked_query: Option<String>,
    pub normalization: Option<Normalization>,
    pub bbox_queries: Vec<String>,
}

impl Config {
    /// Load configuration with priority: CLI args > local config > global config > defaults
    pub fn load(overrides: Overrides) -> Result<Self> {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global_config = Self::from_file(&global_path)?;
                config = config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            let local_config = Self::from_file(&local_path)?;
            config = config.merge(local_config);
        }

        Ok(config.apply(overrides))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // relative resource paths are relative to the config file
        if let Some(base) = path.parent() {
            config.dictionary = config.dictionary.map(|p| base.join(p));
            config.deletions = config.deletions.map(|p| base.join(p));
        }
        Ok(config)
    }

    fn merge(mut self, other: Self) -> Self {
        // Merge logic: other's values override self's if they differ from defaults
        if other.dictionary.is_some() {
            self.dictionary = other.dictionary;
        }
        if other.deletions.is_some() {
            self.deletions = other.deletions;
        }
        if other.max_edit_distance != default_max_edit_distance() {
            self.max_edit_distance = other.max_edit_distance;
        }
        if other.unchecked_query != default_unchecked_query() {
            self.unchecked_query = other.unchecked_query;
        }
        if other.normalization != Normalization::default() {
            self.normalization = other.normalization;
        }
        if !other.bbox_queries.is_empty() {
            self.bbox_queries = other.bbox_queries;
        }
        self
    }

    fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(dictionary) = overrides.dictionary {
            self.dictionary = Some(dictionary);
        }
        if let Some(deletions) = overrides.deletions {
            self.deletions = Some(deletions);
        }
        if let Some(distance) = overrides.max_edit_distance {
            self.max_edit_distance = distance;
        }
        if let Some(query) = overrides.unchecked_query {
            self.unchecked_query = query;
        }
        if let Some(normalization) = overrides.normalization {
            self.normalization = normalization;
        }
        if !overrides.bbox_queries.is_empty() {
            self.bbox_queries = overrides.bbox_queries;
        }
        self
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "hocrspell").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_edit_distance, 1);
        assert_eq!(config.unchecked_query, UNCHECKED_WORDS_QUERY);
        assert_eq!(config.normalization, Normalization::Nfd);
        assert!(config.dictionary.is_none());
    }

    #[test]
    fn test_merge_configs() {
        let base = Config {
            dictionary: Some(PathBuf::from("global.txt")),
            ..Default::default()
        };
        let override_config = Config {
            max_edit_distance: 2,
            normalization: Normalization::Nfc,
            ..Default::default()
        };

        let merged = base.merge(override_config);
        assert_eq!(merged.dictionary, Some(PathBuf::from("global.txt")));
        assert_eq!(merged.max_edit_distance, 2);
        assert_eq!(merged.normalization, Normalization::Nfc);
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::default().apply(Overrides {
            max_edit_distance: Some(3),
            unchecked_query: Some("//span".to_string()),
            ..Default::default()
        });
        assert_eq!(config.max_edit_distance, 3);
        assert_eq!(config.unchecked_query, "//span");
        assert_eq!(config.normalization, Normalization::Nfd);
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "dictionary = \"words.txt\"\nmax_edit_distance = 2\nnormalization = \"nfc\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.dictionary, Some(dir.path().join("words.txt")));
        assert_eq!(config.deletions, None);
        assert_eq!(config.max_edit_distance, 2);
        assert_eq!(config.normalization, Normalization::Nfc);
        assert_eq!(config.unchecked_query, UNCHECKED_WORDS_QUERY);
    }
}
