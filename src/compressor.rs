//! # Compressor Orchestrator Module
//!
//! Questo è il modulo che orchestra l'intero passo di compressione
//! post-build.
//!
//! ## Flusso di esecuzione:
//! 1. **Costruzione**: un transformer per variante, con le opzioni utente
//! 2. **SVG**: prima la grafica vettoriale
//! 3. **Immagini**: poi le immagini raster
//! 4. **Report**: righe di riepilogo tramite il logger
//!
//! I transformer girano in sequenza e i file uno alla volta. Un errore che
//! sfugge a entrambi (es. directory non accessibile) viene loggato una
//! sola volta e la build viene comunque considerata completata.
//!
//! ## Esempio:
//! ```rust,no_run
//! use astro_compress::{Compressor, Config, LocalFileSystem, TracingLogger};
//! use std::path::Path;
//!
//! # async fn example() {
//! let logger = TracingLogger;
//! let compressor = Compressor::new(Path::new("dist"), &Config::default(), &logger, LocalFileSystem);
//! let outcomes = compressor.run().await;
//! # }
//! ```

use crate::config::Config;
use crate::file_manager::{FileSystem, LocalFileSystem};
use crate::logger::Logger;
use crate::outcome::Outcome;
use crate::report::report;
use crate::transformer::{ImageTransformer, SvgTransformer, Transformer};
use anyhow::Result;
use console::style;
use std::path::Path;
use tracing::info;

/// Runs both transformers over a build output directory.
pub struct Compressor<'a, F: FileSystem> {
    svg: SvgTransformer,
    image: ImageTransformer,
    logger: &'a dyn Logger,
    fs: F,
}

impl<'a, F: FileSystem> Compressor<'a, F> {
    pub fn new(build_dir: &Path, config: &Config, logger: &'a dyn Logger, fs: F) -> Self {
        Self {
            svg: SvgTransformer::new(config.svg.descriptor(build_dir)),
            image: ImageTransformer::new(config.image.descriptor(build_dir)),
            logger,
            fs,
        }
    }

    /// Runs the vector then the raster transformer, concatenating outcomes.
    pub async fn compress(&self) -> Result<Vec<Outcome>> {
        info!("Compressing SVG files in {}", self.svg.dir().display());
        let mut outcomes = self.svg.transform(&self.fs, self.logger).await?;

        info!("Compressing images in {}", self.image.dir().display());
        outcomes.extend(self.image.transform(&self.fs, self.logger).await?);

        Ok(outcomes)
    }

    /// Compresses and logs the report. Never fails: a pipeline error is
    /// logged once and yields no outcomes.
    pub async fn run(&self) -> Vec<Outcome> {
        self.logger
            .info(&style(" compressing images ").black().on_green().to_string());

        match self.compress().await {
            Ok(outcomes) => {
                self.logger.info("");
                for line in report(&outcomes) {
                    self.logger.info(&line);
                }
                outcomes
            }
            Err(e) => {
                self.logger.error(&format!("Couldn't compress files: {:#}", e));
                Vec::new()
            }
        }
    }
}

/// Post-build hook: compresses `dir` on the local filesystem.
pub async fn on_build_done(dir: &Path, config: &Config, logger: &dyn Logger) -> Vec<Outcome> {
    Compressor::new(dir, config, logger, LocalFileSystem).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformerConfig;
    use crate::file_manager::MemoryFileSystem;
    use crate::logger::RecordingLogger;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SVG: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported by a drawing tool, this comment only adds bytes to the file and is dropped by the optimizer -->
<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20" viewBox="0 0 20 20">
    <metadata>drawing tool metadata that has no visual effect</metadata>
    <g>
        <rect x="5.000000" y="5.000000" width="10.000000" height="10.000000" fill="#0000ff" />
    </g>
</svg>
"##;

    fn png() -> Vec<u8> {
        let image = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 0]));
        let mut output = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_with_encoder(PngEncoder::new_with_quality(&mut output, CompressionType::Fast, FilterType::NoFilter))
            .unwrap();
        output
    }

    #[tokio::test]
    async fn test_svg_runs_before_images() {
        let fs = MemoryFileSystem::new();
        fs.insert("/dist/a.png", png());
        fs.insert("/dist/z.svg", SVG);
        let logger = RecordingLogger::new();

        let outcomes = Compressor::new(Path::new("/dist"), &Config::default(), &logger, fs).run().await;

        let paths: Vec<&str> = outcomes.iter().map(Outcome::path).collect();
        assert_eq!(paths, vec!["z.svg", "a.png"]);
        assert!(outcomes.iter().all(Outcome::is_success));
    }

    #[tokio::test]
    async fn test_run_logs_messages_and_report() {
        let fs = MemoryFileSystem::new();
        fs.insert("/dist/logo.svg", SVG);
        fs.insert("/dist/broken.png", b"not a png".to_vec());
        let logger = RecordingLogger::new();

        Compressor::new(Path::new("/dist"), &Config::default(), &logger, fs).run().await;

        let lines: Vec<String> = logger.lines().into_iter().map(|(_, line)| line).collect();
        assert_eq!(lines[0], " compressing images ");
        assert!(lines[1].starts_with("✓ Compressed: logo.svg (-"));
        assert_eq!(lines[2], "⨯ Error: broken.png (Unsupported or invalid format: unknown)");
        assert_eq!(lines[3], "");
        assert_eq!(&lines[4..7], ["Compressed: 1 file.", "Skipped: 0 files.", "Errors: 1 file."]);
        assert!(lines[8].starts_with("Total savings: "));
        assert_eq!(lines.len(), 10);
        assert!(logger.errors().is_empty());
    }

    #[tokio::test]
    async fn test_empty_build_reports_zero() {
        let fs = MemoryFileSystem::new();
        let logger = RecordingLogger::new();

        let outcomes = Compressor::new(Path::new("/dist"), &Config::default(), &logger, fs).run().await;

        assert!(outcomes.is_empty());
        let lines: Vec<String> = logger.lines().into_iter().map(|(_, line)| line).collect();
        assert_eq!(
            &lines[2..],
            [
                "Compressed: 0 files.",
                "Skipped: 0 files.",
                "Errors: 0 files.",
                "",
                "Total savings: 0 Bytes.",
                "",
            ]
        );
    }

    #[tokio::test]
    async fn test_output_directories_per_group() {
        let fs = MemoryFileSystem::new();
        fs.insert("/dist/a.png", png());
        fs.insert("/dist/icons/b.svg", SVG);
        let logger = RecordingLogger::new();

        let config = Config {
            image: TransformerConfig {
                out: Some(PathBuf::from("/compressed")),
                ..Default::default()
            },
            svg: TransformerConfig {
                dir: Some(PathBuf::from("icons")),
                ..Default::default()
            },
        };

        let compressor = Compressor::new(Path::new("/dist"), &config, &logger, fs);
        let outcomes = compressor.compress().await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].path(), "b.svg");
        assert_eq!(
            compressor.fs.writes(),
            vec![PathBuf::from("/dist/icons/b.svg"), PathBuf::from("/compressed/a.png")]
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_logged_not_raised() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("never-built");
        let logger = RecordingLogger::new();

        let outcomes = on_build_done(&missing, &Config::default(), &logger).await;

        assert!(outcomes.is_empty());
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Couldn't compress files: "));
        assert!(logger.lines().iter().all(|(_, line)| !line.starts_with("Compressed:")));
    }

    #[tokio::test]
    async fn test_on_build_done_local_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        let dist = temp_dir.path();
        std::fs::create_dir_all(dist.join("img")).unwrap();
        std::fs::write(dist.join("img/a.png"), png()).unwrap();
        std::fs::write(dist.join("logo.svg"), SVG).unwrap();
        let logger = RecordingLogger::new();

        let outcomes = on_build_done(dist, &Config::default(), &logger).await;

        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            let Outcome::Success { path, .. } = outcome else {
                panic!("expected success, got {:?}", outcome);
            };
            assert!(std::fs::metadata(dist.join(path)).is_ok());
        }
        assert!(std::fs::metadata(dist.join("img/a.png")).unwrap().len() < png().len() as u64);
    }
}
