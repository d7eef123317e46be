use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{SerializerError, SerializerResult};

/// Serializer configuration, usually loaded from `meshchunk.toml`.
///
/// ```toml
/// root = "/var/lib/scanner"
/// meshes_dir = "meshes"
/// worker_threads = 2
/// blocking_threads = 8
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerializerConfig {
    /// Application data root. Space directories live below `root/meshes_dir`.
    pub root: PathBuf,
    /// Directory under the root holding one subdirectory per space.
    pub meshes_dir: String,
    /// Runtime worker threads driving file I/O.
    pub worker_threads: usize,
    /// Upper bound on pool threads running encode and decode jobs.
    pub blocking_threads: usize,
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            meshes_dir: "meshes".into(),
            worker_threads: available_parallelism(),
            blocking_threads: available_parallelism(),
        }
    }
}

impl SerializerConfig {
    /// Default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

/// Load a serializer config from a TOML file.
pub fn load_config(path: &Path) -> SerializerResult<SerializerConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SerializerError::Config(format!("failed to read {}: {e}", path.display())))?;
    parse_config(&content)
        .map_err(|e| SerializerError::Config(format!("failed to parse {}: {e}", path.display())))
}

fn parse_config(content: &str) -> Result<SerializerConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Load config, falling back to defaults if the file is missing or invalid.
pub fn load_or_default(path: &Path) -> SerializerConfig {
    match load_config(path) {
        Ok(config) => {
            log::info!(
                "Loaded serializer config from {} (root {:?})",
                path.display(),
                config.root
            );
            config
        }
        Err(e) => {
            log::warn!("{e}; using default serializer config");
            SerializerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config("root = \"/data\"\nblocking_threads = 3\n").unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.meshes_dir, "meshes");
        assert_eq!(config.blocking_threads, 3);
        assert_eq!(config.worker_threads, available_parallelism());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("mesh_dir = \"x\"\n").is_err());
    }

    #[test]
    fn missing_file_falls_back() {
        let path = std::env::temp_dir().join("spatial_mesh_config_test_missing.toml");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(load_config(&path), Err(SerializerError::Config(_))));
        assert_eq!(load_or_default(&path), SerializerConfig::default());
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join("spatial_mesh_config_test_load.toml");
        std::fs::write(&path, "meshes_dir = \"scans\"\nworker_threads = 1\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.meshes_dir, "scans");
        assert_eq!(config.worker_threads, 1);
        let _ = std::fs::remove_file(&path);
    }
}
