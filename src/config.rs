//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione della compressione.
//!
//! ## Responsabilità:
//! - Definisce `Config` con un gruppo di opzioni per ciascun transformer
//! - Supporta caricamento/salvataggio da/verso file JSON
//! - Risolve gli override di directory rispetto alla directory di build
//!   (solo i percorsi assoluti vengono verificati in `validate`)
//!
//! ## Gruppi di opzioni (`image`, `svg`):
//! - `dir`: Directory da scansionare (default: directory di build)
//! - `out`: Directory di output (default: `dir`, sostituzione in place)
//! - `options`: Mappa di opzioni per formato, unita ai default del transformer
//!
//! ## Esempio di file:
//! ```json
//! {
//!   "image": { "out": "compressed", "options": { "png": { "note": "extra" } } },
//!   "svg": { "dir": "icons" }
//! }
//! ```

use crate::error::CompressError;
use crate::transformer::Descriptor;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Options for a single transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Source directory override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Output directory override (None = replace files in place)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<PathBuf>,
    /// Format-specific options mapping
    pub options: Value,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            dir: None,
            out: None,
            options: Value::Object(Map::new()),
        }
    }
}

impl TransformerConfig {
    /// Builds a transformer descriptor rooted at the build output directory.
    pub fn descriptor(&self, build_dir: &Path) -> Descriptor {
        let dir = match self.dir {
            Some(ref dir) => build_dir.join(dir),
            None => build_dir.to_path_buf(),
        };

        Descriptor {
            dir,
            out: self.out.as_ref().map(|out| build_dir.join(out)),
            options: self.options.clone(),
        }
    }

    fn validate(&self, group: &str) -> Result<(), CompressError> {
        if !self.options.is_object() {
            return Err(CompressError::Config(format!("{}.options must be an object", group)));
        }

        // Relative overrides are resolved against the build directory later
        if let Some(ref dir) = self.dir {
            if dir.is_absolute() && dir.exists() && !dir.is_dir() {
                return Err(CompressError::Config(format!(
                    "{}.dir is not a directory: {}",
                    group,
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}

/// Configuration for a compression run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raster image transformer options
    pub image: TransformerConfig,
    /// SVG transformer options
    pub svg: TransformerConfig,
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.image.validate("image")?;
        self.svg.validate("svg")?;
        Ok(())
    }

    /// Per-user configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("astro-compress").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.image.options, json!({}));
        assert!(config.svg.dir.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.svg.options = json!(["preset-default"]);
        assert!(config.validate().is_err());

        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        let mut config = Config::default();
        config.image.dir = Some(file);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_dir_is_not_checked_against_working_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("icons");
        std::fs::write(&file, "x").unwrap();

        // Resolves to <build>/Cargo.toml, not the manifest in the working directory
        let mut config = Config::default();
        config.svg.dir = Some(PathBuf::from("Cargo.toml"));
        assert!(Path::new("Cargo.toml").is_file());
        assert!(config.validate().is_ok());

        config.svg.dir = Some(file);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_descriptor_resolves_relative_paths() {
        let group = TransformerConfig {
            dir: Some(PathBuf::from("assets")),
            out: Some(PathBuf::from("/tmp/out")),
            options: json!({ "png": {} }),
        };

        let descriptor = group.descriptor(Path::new("/site/dist"));
        assert_eq!(descriptor.dir, PathBuf::from("/site/dist/assets"));
        assert_eq!(descriptor.out, Some(PathBuf::from("/tmp/out")));
        assert_eq!(descriptor.options, json!({ "png": {} }));

        let descriptor = TransformerConfig::default().descriptor(Path::new("/site/dist"));
        assert_eq!(descriptor, Descriptor::new("/site/dist"));
    }

    #[test]
    fn test_partial_json() {
        let config: Config = serde_json::from_str(r#"{ "svg": { "out": "min" } }"#).unwrap();
        assert_eq!(config.svg.out, Some(PathBuf::from("min")));
        assert_eq!(config.svg.options, json!({}));
        assert_eq!(config.image, TransformerConfig::default());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            image: TransformerConfig {
                out: Some(PathBuf::from("compressed")),
                options: json!({ "jpeg": { "progressive": true } }),
                ..Default::default()
            },
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config, original_config);
    }

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("missing.json")).await.unwrap();
        assert_eq!(config, Config::default());
    }
}
