//! # Transformer Module
//!
//! Un transformer scopre i file candidati con un pattern glob fisso e
//! prova a comprimerli uno alla volta:
//! - `image`: immagini raster (codec `image`)
//! - `svg`: grafica vettoriale (minifier conservativo `crate::minifier`)
//!
//! Le opzioni utente vengono unite ai default del transformer con
//! `merge_options` all'inizio di ogni `transform`.

pub mod image;
pub mod svg;

pub use self::image::ImageTransformer;
pub use self::svg::SvgTransformer;

use crate::file_manager::{glob_matcher, FileSystem};
use crate::logger::Logger;
use crate::outcome::Outcome;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Where a transformer reads from and writes to, plus its user options.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Directory scanned for candidate files
    pub dir: PathBuf,
    /// Output directory (None = rewrite files in place)
    pub out: Option<PathBuf>,
    /// User format options, merged over the built-in defaults
    pub options: Value,
}

impl Descriptor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            out: None,
            options: Value::Object(Default::default()),
        }
    }

    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = Some(out.into());
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn source_path(&self, relative: &str) -> PathBuf {
        self.dir.join(relative)
    }

    pub fn output_path(&self, relative: &str) -> PathBuf {
        self.out.as_deref().unwrap_or(&self.dir).join(relative)
    }
}

/// A file-type specific compression step.
#[allow(async_fn_in_trait)]
pub trait Transformer {
    fn descriptor(&self) -> &Descriptor;

    /// Glob pattern matched against paths relative to the scan directory.
    fn pattern(&self) -> &'static str;

    /// Built-in format options.
    fn default_options(&self) -> Value;

    fn dir(&self) -> &Path {
        &self.descriptor().dir
    }

    /// Returns the candidate paths, relative to the scan directory.
    fn collect(&self, fs: &impl FileSystem) -> Result<Vec<String>> {
        let matcher = glob_matcher(self.pattern())?;
        fs.glob(self.dir(), &matcher)
    }

    /// User options merged over `default_options`.
    fn merged_options(&self) -> Value {
        crate::utils::merge_options(&self.descriptor().options, &self.default_options())
    }

    /// Compresses every collected file and logs one line per outcome.
    async fn transform<F: FileSystem>(&self, fs: &F, logger: &dyn Logger) -> Result<Vec<Outcome>>;
}
