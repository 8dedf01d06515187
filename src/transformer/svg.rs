//! # SVG Transformer Module
//!
//! Minimizza i file SVG con il minifier conservativo di `crate::minifier`:
//! testo, animazioni, link e CSS restano intatti, viene rimosso solo ciò
//! che non ha effetto sul rendering.
//!
//! ## Opzioni default:
//! - `multipass`: ripete la minificazione finché l'output si riduce (max 10 passate)
//! - `precision`: cifre decimali per coordinate (3) e trasformazioni (5)
//! - `plugins`: passi di pulizia, tutti attivi
//! - `output`: nessuna indentazione, virgolette doppie
//!
//! A differenza del transformer raster, anche qui gli errori
//! dell'ottimizzatore (SVG non valido, contenuto non UTF-8) diventano
//! `Failure` per il singolo file.

use super::{Descriptor, Transformer};
use crate::error::CompressError;
use crate::file_manager::FileSystem;
use crate::logger::Logger;
use crate::minifier::{minify, MinifyOptions};
use crate::outcome::Outcome;
use crate::report::message;
use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

pub const PATTERN: &str = "**/*.svg";

pub const OPTIMIZE_FAILED: &str = "Failed to optimize the SVG";

const MAX_PASSES: usize = 10;

pub fn default_options() -> Value {
    json!({
        "multipass": true,
        "precision": { "coordinates": 3, "transforms": 5 },
        "plugins": {
            "remove_comments": true,
            "remove_metadata": true,
            "remove_xml_declaration": true,
            "remove_doctype": true,
            "remove_editor_data": true,
            "remove_unused_namespaces": true,
            "collapse_groups": true,
            "collapse_whitespace": true,
            "minify_colors": true,
            "minify_numbers": true,
            "minify_paths": true
        },
        "output": { "indent": 0, "pretty": false, "single_quote": false }
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct SvgOptions {
    pub multipass: bool,
    pub precision: Precision,
    pub plugins: Plugins,
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Precision {
    pub coordinates: u8,
    pub transforms: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plugins {
    pub remove_comments: bool,
    pub remove_metadata: bool,
    pub remove_xml_declaration: bool,
    pub remove_doctype: bool,
    pub remove_editor_data: bool,
    pub remove_unused_namespaces: bool,
    pub collapse_groups: bool,
    pub collapse_whitespace: bool,
    pub minify_colors: bool,
    pub minify_numbers: bool,
    pub minify_paths: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputFormat {
    pub indent: u8,
    pub pretty: bool,
    pub single_quote: bool,
}

impl SvgOptions {
    fn minify_options(&self) -> MinifyOptions {
        let plugins = &self.plugins;
        MinifyOptions {
            coordinates_precision: self.precision.coordinates,
            transforms_precision: self.precision.transforms,
            remove_comments: plugins.remove_comments,
            remove_metadata: plugins.remove_metadata,
            remove_xml_declaration: plugins.remove_xml_declaration,
            remove_doctype: plugins.remove_doctype,
            remove_editor_data: plugins.remove_editor_data,
            remove_unused_namespaces: plugins.remove_unused_namespaces,
            collapse_groups: plugins.collapse_groups,
            collapse_whitespace: plugins.collapse_whitespace,
            minify_colors: plugins.minify_colors,
            minify_numbers: plugins.minify_numbers,
            minify_paths: plugins.minify_paths,
            indent: self.output.pretty.then_some(usize::from(self.output.indent)),
            single_quote: self.output.single_quote,
        }
    }
}

/// Optimizes an SVG document, repeating while the output keeps shrinking
/// when `multipass` is set.
pub fn optimize(svg: &str, options: &SvgOptions) -> Result<String, CompressError> {
    let minify_options = options.minify_options();
    let mut current = minify(svg, &minify_options)?;

    if options.multipass {
        for pass in 1..MAX_PASSES {
            let next = minify(&current, &minify_options)?;
            if next.len() >= current.len() {
                debug!("SVG optimization settled after {} passes", pass);
                break;
            }
            current = next;
        }
    }

    Ok(current)
}

/// Minifies SVG files in place or into an output directory.
#[derive(Debug, Clone)]
pub struct SvgTransformer {
    descriptor: Descriptor,
}

impl SvgTransformer {
    pub fn new(descriptor: Descriptor) -> Self {
        Self { descriptor }
    }

    async fn transform_file<F: FileSystem>(&self, fs: &F, options: &Value, path: &str) -> Result<Outcome> {
        let bytes = fs.read(&self.descriptor.source_path(path)).await?;

        let contents = match String::from_utf8(bytes) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("{} is not valid UTF-8: {}", path, e);
                return Ok(Outcome::failure(path, OPTIMIZE_FAILED));
            }
        };

        let options: SvgOptions = match serde_json::from_value(options.clone()) {
            Ok(options) => options,
            Err(e) => {
                debug!("Invalid SVG options for {}: {}", path, e);
                return Ok(Outcome::failure(path, OPTIMIZE_FAILED));
            }
        };

        let original_size = contents.len();
        let optimized = match tokio::task::spawn_blocking(move || optimize(&contents, &options)).await {
            Ok(Ok(optimized)) => optimized,
            Ok(Err(e)) => {
                debug!("Optimizer failed for {}: {}", path, e);
                return Ok(Outcome::failure(path, OPTIMIZE_FAILED));
            }
            Err(e) => {
                debug!("Optimizer task failed for {}: {}", path, e);
                return Ok(Outcome::failure(path, OPTIMIZE_FAILED));
            }
        };

        let outcome = Outcome::compared(path, original_size, optimized.len());
        if outcome.is_success() {
            fs.write(&self.descriptor.output_path(path), optimized.as_bytes()).await?;
        }

        Ok(outcome)
    }
}

impl Transformer for SvgTransformer {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn pattern(&self) -> &'static str {
        PATTERN
    }

    fn default_options(&self) -> Value {
        default_options()
    }

    async fn transform<F: FileSystem>(&self, fs: &F, logger: &dyn Logger) -> Result<Vec<Outcome>> {
        let options = self.merged_options();
        let paths = self.collect(fs)?;
        let mut outcomes = Vec::with_capacity(paths.len());

        for path in paths {
            let outcome = self.transform_file(fs, &options, &path).await?;
            logger.info(&message(&outcome));
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::MemoryFileSystem;
    use crate::logger::RecordingLogger;
    use std::path::{Path, PathBuf};

    const BLOATED: &str = r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!-- Generator: a vector editor that likes to leave long comments behind in every exported file -->
<svg
    xmlns="http://www.w3.org/2000/svg"
    width="100"
    height="100"
    viewBox="0 0 100 100">
    <metadata>
        <description>Exported drawing with editor metadata that has no visual effect at all</description>
    </metadata>
    <g>
        <g>
            <rect x="10.000000000" y="10.000000000" width="80.000000000" height="80.000000000" fill="#ff0000" />
        </g>
    </g>
</svg>
"##;

    fn options() -> SvgOptions {
        serde_json::from_value(default_options()).unwrap()
    }

    async fn run(fs: &MemoryFileSystem, descriptor: Descriptor) -> Vec<Outcome> {
        SvgTransformer::new(descriptor)
            .transform(fs, &RecordingLogger::new())
            .await
            .unwrap()
    }

    #[test]
    fn test_optimize_shrinks_bloated_svg() {
        let optimized = optimize(BLOATED, &options()).unwrap();
        assert!(optimized.len() < BLOATED.len());
        assert!(!optimized.contains("Generator"));
        assert!(!optimized.contains('\n'));
        assert!(optimized.contains(r##"<rect x="10" y="10" width="80" height="80" fill="#f00"/>"##));
    }

    #[test]
    fn test_optimize_rejects_invalid_document() {
        assert!(optimize("this is not xml", &options()).is_err());
    }

    #[tokio::test]
    async fn test_bloated_svg_is_rewritten() {
        let fs = MemoryFileSystem::new();
        fs.insert("/site/icons/logo.svg", BLOATED);

        let outcomes = run(&fs, Descriptor::new("/site")).await;

        let delta = match &outcomes[..] {
            [Outcome::Success { path, delta }] => {
                assert_eq!(path, "icons/logo.svg");
                *delta
            }
            other => panic!("expected one success, got {:?}", other),
        };

        let written = fs.get(Path::new("/site/icons/logo.svg")).unwrap();
        assert_eq!(BLOATED.len() as i64 - delta, written.len() as i64);
        assert_eq!(fs.writes(), vec![PathBuf::from("/site/icons/logo.svg")]);
    }

    const PADDING: &str = "<!-- exported by a vector editor, this comment only adds bytes and is dropped -->";

    async fn rewritten(body: &str) -> String {
        let fs = MemoryFileSystem::new();
        let source = format!(
            "{}\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"100\" height=\"40\">\n    {}\n</svg>\n",
            PADDING, body
        );
        fs.insert("/site/asset.svg", source);

        let outcomes = run(&fs, Descriptor::new("/site")).await;
        assert!(outcomes[0].is_success(), "{:?}", outcomes);

        String::from_utf8(fs.get(Path::new("/site/asset.svg")).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_text_survives_rewrite() {
        let written = rewritten(r#"<text x="0" y="20">Hello World</text>"#).await;
        assert!(written.contains(r#"<text x="0" y="20">Hello World</text>"#), "{}", written);
    }

    #[tokio::test]
    async fn test_animation_survives_rewrite() {
        let written = rewritten(
            r##"<circle cx="50" cy="20" r="10" fill="#ff0000"><animate attributeName="r" from="10" to="20" dur="1s" repeatCount="indefinite"/></circle>"##,
        )
        .await;

        assert!(
            written.contains(
                r##"<circle cx="50" cy="20" r="10" fill="#f00"><animate attributeName="r" from="10" to="20" dur="1s" repeatCount="indefinite"/></circle>"##
            ),
            "{}",
            written
        );
    }

    #[tokio::test]
    async fn test_links_and_css_survive_rewrite() {
        let written = rewritten(
            r##"<style>.hot:hover { fill: #0000ff }</style>
    <a href="https://example.com"><rect class="hot" width="10" height="10" fill="#ff0000"/></a>"##,
        )
        .await;

        assert!(written.contains("<style>.hot:hover { fill: #0000ff }</style>"), "{}", written);
        assert!(
            written.contains(r##"<a href="https://example.com"><rect class="hot" width="10" height="10" fill="#f00"/></a>"##),
            "{}",
            written
        );
    }

    #[tokio::test]
    async fn test_optimized_svg_is_skipped_on_second_run() {
        let fs = MemoryFileSystem::new();
        let optimized = optimize(BLOATED, &options()).unwrap();
        fs.insert("/site/logo.svg", optimized.clone());

        let outcomes = run(&fs, Descriptor::new("/site")).await;

        assert!(matches!(&outcomes[..], [Outcome::Skipped { delta, .. }] if *delta <= 0));
        assert!(fs.writes().is_empty());
        assert_eq!(fs.get(Path::new("/site/logo.svg")).unwrap(), optimized.into_bytes());
    }

    #[tokio::test]
    async fn test_output_directory_leaves_source_untouched() {
        let fs = MemoryFileSystem::new();
        fs.insert("/site/logo.svg", BLOATED);

        let outcomes = run(&fs, Descriptor::new("/site").with_out("/out")).await;

        assert!(outcomes[0].is_success());
        assert_eq!(fs.writes(), vec![PathBuf::from("/out/logo.svg")]);
        assert_eq!(fs.get(Path::new("/site/logo.svg")).unwrap(), BLOATED.as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_files_fail_and_processing_continues() {
        let fs = MemoryFileSystem::new();
        fs.insert("/site/a.svg", "this is not xml");
        fs.insert("/site/b.svg", vec![0xff, 0xfe, 0x00]);
        fs.insert("/site/c.svg", BLOATED);

        let outcomes = run(&fs, Descriptor::new("/site")).await;

        assert_eq!(outcomes[0], Outcome::failure("a.svg", OPTIMIZE_FAILED));
        assert_eq!(outcomes[1], Outcome::failure("b.svg", OPTIMIZE_FAILED));
        assert!(outcomes[2].is_success());
        assert_eq!(fs.writes(), vec![PathBuf::from("/site/c.svg")]);
    }

    #[tokio::test]
    async fn test_only_svg_files_are_collected() {
        let fs = MemoryFileSystem::new();
        fs.insert("/site/a.png", vec![0u8]);
        fs.insert("/site/.well-known/b.svg", BLOATED);

        let paths = SvgTransformer::new(Descriptor::new("/site")).collect(&fs).unwrap();
        assert_eq!(paths, vec![".well-known/b.svg"]);
    }

    #[test]
    fn test_scalar_defaults_override_user_choices() {
        let descriptor = Descriptor::new("/site").with_options(json!({ "multipass": false, "extra": 1 }));
        let merged = SvgTransformer::new(descriptor).merged_options();

        assert_eq!(merged["multipass"], true);
        assert_eq!(merged["extra"], 1);
        assert_eq!(merged["precision"]["coordinates"], 3);
    }
}
