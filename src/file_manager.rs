//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery degli asset.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva tramite pattern glob (`globset` su `walkdir`)
//! - Lettura e scrittura dei file, con creazione delle directory parent
//! - Astrazione `FileSystem` iniettabile nella pipeline
//!
//! ## Implementazioni:
//! - `LocalFileSystem`: disco locale (walkdir + tokio::fs)
//! - `MemoryFileSystem`: mappa in memoria, per test ed embedding
//!
//! ## Discovery:
//! - I path restituiti sono relativi alla directory di scansione, con `/`
//! - I file nascosti sono inclusi, i symlink non vengono seguiti
//!
//! ## Esempio:
//! ```rust,no_run
//! use astro_compress::file_manager::{glob_matcher, FileSystem, LocalFileSystem};
//! use std::path::Path;
//!
//! let matcher = glob_matcher("**/*.svg")?;
//! let files = LocalFileSystem.glob(Path::new("dist"), &matcher)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::CompressError;
use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Compiles a glob pattern such as `**/*.{png,jpg}`.
pub fn glob_matcher(pattern: &str) -> Result<GlobMatcher, CompressError> {
    Ok(Glob::new(pattern)?.compile_matcher())
}

/// Joins the components of a relative path with `/`.
fn to_slash(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Filesystem capability used by the transformers.
#[allow(async_fn_in_trait)]
pub trait FileSystem {
    /// Lists files under `dir` whose relative path matches `matcher`.
    fn glob(&self, dir: &Path, matcher: &GlobMatcher) -> Result<Vec<String>>;

    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Writes `contents`, creating missing parent directories.
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
}

/// The local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn glob(&self, dir: &Path, matcher: &GlobMatcher) -> Result<Vec<String>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir) {
            let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = to_slash(entry.path().strip_prefix(dir)?);
            if matcher.is_match(&relative) {
                files.push(relative);
            }
        }

        files.sort();
        debug!("Matched {} files under {}", files.len(), dir.display());
        Ok(files)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create parent directories for {}", path.display()))?;
        }

        fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// An in-memory filesystem keyed by absolute path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    writes: Mutex<Vec<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file without counting it as a write.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), contents.into());
        }
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    /// Paths written through `FileSystem::write`, in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.lock().map(|writes| writes.clone()).unwrap_or_default()
    }
}

impl FileSystem for MemoryFileSystem {
    fn glob(&self, dir: &Path, matcher: &GlobMatcher) -> Result<Vec<String>> {
        let files = self
            .files
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory filesystem lock poisoned"))?;

        Ok(files
            .keys()
            .filter_map(|path| path.strip_prefix(dir).ok())
            .map(to_slash)
            .filter(|relative| matcher.is_match(relative))
            .collect())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.get(path)
            .ok_or_else(|| anyhow::anyhow!("Failed to read {}: no such file", path.display()))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.insert(path, contents);
        self.writes
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory filesystem lock poisoned"))?
            .push(path.to_path_buf());
        Ok(())
    }
}
