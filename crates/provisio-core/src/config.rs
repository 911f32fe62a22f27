//! Persisted config (document source, chunking, embedding, index location) in the
//! app data directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_data;
use crate::chunks::{ChunkConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::error::{ConfigurationError, EmbeddingError};
use crate::ollama::{OllamaClient, DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_EMBED_MODEL};
use crate::query::DEFAULT_K;
use crate::source::DocumentSource;

const CONFIG_FILENAME: &str = "config.toml";
const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub ollama_url: String,
    pub embed_model: String,
    pub embed_batch_size: usize,
    pub embed_timeout_secs: u64,
    /// Where the index is persisted. Defaults to `<app data>/index`.
    pub index_dir: Option<String>,
    /// Which corpus to index. Kept last: TOML tables follow plain keys.
    pub source: DocumentSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_OVERLAP,
            top_k: DEFAULT_K,
            ollama_url: DEFAULT_BASE_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            embed_batch_size: DEFAULT_BATCH_SIZE,
            embed_timeout_secs: DEFAULT_EMBED_TIMEOUT_SECS,
            index_dir: None,
            source: DocumentSource::Mock,
        }
    }
}

impl Config {
    /// Chunking parameters. Invalid values are reported, not clamped.
    pub fn chunking(&self) -> Result<ChunkConfig, ConfigurationError> {
        ChunkConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    /// Configured index directory, or the default one in the app data directory.
    pub fn index_dir(&self) -> Option<PathBuf> {
        self.index_dir
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .or_else(app_data::default_index_dir)
    }

    /// The Ollama embedding provider described by this config.
    pub fn embedder(&self) -> Result<OllamaClient, EmbeddingError> {
        let url = Url::parse(&self.ollama_url)
            .map_err(|e| EmbeddingError::Endpoint(format!("{}: {e}", self.ollama_url)))?;
        Ok(OllamaClient::from_url(url.as_str())?
            .with_embed_model(&self.embed_model)
            .with_batch_size(self.embed_batch_size))
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    load_config_from(&data_dir.join(CONFIG_FILENAME))
}

/// Load config from `path`. Returns default config if missing or invalid.
pub fn load_config_from(path: &Path) -> Config {
    let Ok(s) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    match toml::from_str(&s) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
            Config::default()
        }
    }
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigFileError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigFileError::NoDataDir)?;
    save_config_to(&data_dir.join(CONFIG_FILENAME), config)
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<(), ConfigFileError> {
    let s = toml::to_string_pretty(config).map_err(ConfigFileError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigFileError::Write)
}

/// Resolve paths in `source` and check they point at the right kind of entry.
pub fn resolve_source(source: DocumentSource) -> Result<DocumentSource, ConfigFileError> {
    match source {
        DocumentSource::Mock => Ok(DocumentSource::Mock),
        DocumentSource::TextCorpus { dir } => {
            let dir = dir.canonicalize().map_err(ConfigFileError::Canonicalize)?;
            if !dir.is_dir() {
                return Err(ConfigFileError::NotADirectory(dir));
            }
            Ok(DocumentSource::TextCorpus { dir })
        }
        DocumentSource::Pdf { path } => {
            let path = path.canonicalize().map_err(ConfigFileError::Canonicalize)?;
            if !path.is_file() {
                return Err(ConfigFileError::NotAFile(path));
            }
            Ok(DocumentSource::Pdf { path })
        }
    }
}

/// Set and persist the document source.
pub fn set_source(source: DocumentSource) -> Result<(), ConfigFileError> {
    let mut config = load_config();
    config.source = resolve_source(source)?;
    save_config(&config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            chunk_size: 800,
            top_k: 5,
            index_dir: Some("/tmp/provisio-index".to_string()),
            source: DocumentSource::TextCorpus {
                dir: PathBuf::from("/data/nbcc"),
            },
            ..Config::default()
        };
        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "top_k = 2\n\n[source]\nkind = \"pdf\"\npath = \"code.pdf\"\n").unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.top_k, 2);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(
            config.source,
            DocumentSource::Pdf {
                path: PathBuf::from("code.pdf")
            }
        );
    }

    #[test]
    fn missing_or_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(load_config_from(&path), Config::default());
        std::fs::write(&path, "top_k = \"three\"").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }

    #[test]
    fn invalid_chunking_is_reported() {
        let config = Config {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Config::default()
        };
        assert!(matches!(
            config.chunking(),
            Err(ConfigurationError::OverlapTooLarge { .. })
        ));
        assert!(Config::default().chunking().is_ok());
    }

    #[test]
    fn embedder_follows_config() {
        let config = Config {
            embed_model: "all-minilm".to_string(),
            ..Config::default()
        };
        assert_eq!(config.embedder().unwrap().embed_model(), "all-minilm");

        let bad = Config {
            ollama_url: "::nope".to_string(),
            ..Config::default()
        };
        assert!(matches!(bad.embedder(), Err(EmbeddingError::Endpoint(_))));
    }

    #[test]
    fn resolve_source_checks_entry_kind() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("code.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        assert!(matches!(
            resolve_source(DocumentSource::Pdf {
                path: dir.path().to_path_buf()
            }),
            Err(ConfigFileError::NotAFile(_))
        ));
        assert!(matches!(
            resolve_source(DocumentSource::TextCorpus { dir: file.clone() }),
            Err(ConfigFileError::NotADirectory(_))
        ));
        assert!(resolve_source(DocumentSource::Pdf { path: file }).is_ok());
    }
}
