//! # Image Transformer Module
//!
//! Ricomprime le immagini raster con il crate `image`, interamente in
//! memoria e senza tool esterni.
//!
//! ## Pipeline per file:
//! 1. **Probe formato**: magic bytes (`image::guess_format`), nessun decode
//! 2. **Formato non configurato**: `Failure` con il nome del formato rilevato
//! 3. **Decode + encode**: stesso formato, opzioni unite ai default,
//!    nessun limite sul numero di pixel, animazioni GIF preservate
//! 4. **Confronto dimensioni**: scrive solo se il risultato è più piccolo
//!
//! ## Formati codificabili
//!
//! | Formato | Opzioni default                              | Encoder |
//! |---------|----------------------------------------------|---------|
//! | JPEG    | `quality: 80`                                | `JpegEncoder` |
//! | PNG     | `compression: best`, `filter: adaptive`      | `PngEncoder` |
//! | GIF     | `speed: 1` (tutti i frame, repeat infinito)  | `GifEncoder` |
//! | WebP    | nessuna (lossless, solo immagini statiche)   | `WebPEncoder` |
//!
//! AVIF e HEIF vengono raccolti dal glob ma non hanno un codec (il decoder
//! AVIF richiede `dav1d`): risultano `Failure` per formato non supportato.
//! Una WebP lossy ricodificata lossless è quasi sempre più grande, quindi
//! in pratica viene saltata.
//!
//! Gli errori del codec diventano `Failure` per il singolo file; gli
//! errori di I/O interrompono il transformer.

use super::{Descriptor, Transformer};
use crate::error::CompressError;
use crate::file_manager::FileSystem;
use crate::logger::Logger;
use crate::outcome::Outcome;
use crate::report::message;
use anyhow::Result;
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{AnimationDecoder, DynamicImage, ImageDecoder, ImageFormat, ImageReader, Limits};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Cursor;
use tracing::debug;

/// Raster extensions collected by the transformer.
pub const PATTERN: &str = "**/*.{avif,gif,heif,jpg,jpeg,png,webp}";

/// Reason attached to files the codec could not re-encode.
pub const COMPRESS_FAILED: &str = "Failed to compress the image";

/// Built-in per-format encoder options.
pub fn default_options() -> Value {
    json!({
        "jpeg": { "quality": 80 },
        "png": { "compression": "best", "filter": "adaptive" },
        "gif": { "speed": 1 },
        "webp": {}
    })
}

#[derive(Debug, Deserialize)]
struct JpegOptions {
    quality: u8,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PngCompression {
    Fast,
    Default,
    Best,
}

impl From<PngCompression> for CompressionType {
    fn from(compression: PngCompression) -> Self {
        match compression {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PngFilter {
    None,
    Sub,
    Up,
    Avg,
    Paeth,
    Adaptive,
}

impl From<PngFilter> for FilterType {
    fn from(filter: PngFilter) -> Self {
        match filter {
            PngFilter::None => FilterType::NoFilter,
            PngFilter::Sub => FilterType::Sub,
            PngFilter::Up => FilterType::Up,
            PngFilter::Avg => FilterType::Avg,
            PngFilter::Paeth => FilterType::Paeth,
            PngFilter::Adaptive => FilterType::Adaptive,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PngOptions {
    compression: PngCompression,
    filter: PngFilter,
}

#[derive(Debug, Deserialize)]
struct GifOptions {
    /// NeuQuant speed, 1 (best) to 30 (fastest)
    speed: i32,
}

#[derive(Debug, Deserialize)]
struct WebpOptions {}

/// Name used as the options key for a detected format.
pub fn format_name(format: ImageFormat) -> String {
    let name = match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Avif => "avif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Ico => "ico",
        other => return format!("{:?}", other).to_lowercase(),
    };
    name.to_string()
}

fn parse_options<T: DeserializeOwned>(options: Value) -> Result<T, CompressError> {
    serde_json::from_value(options).map_err(|e| CompressError::Config(e.to_string()))
}

fn decode(buffer: &[u8], format: ImageFormat) -> Result<DynamicImage, CompressError> {
    let mut reader = ImageReader::with_format(Cursor::new(buffer), format);
    reader.no_limits();
    Ok(reader.decode()?)
}

/// Re-encodes `buffer` in its own `format` using the merged format options.
pub fn encode(buffer: &[u8], format: ImageFormat, options: Value) -> Result<Vec<u8>, CompressError> {
    let mut output = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            let options: JpegOptions = parse_options(options)?;
            let image = match decode(buffer, format)? {
                image @ (DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)) => image,
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            };
            image.write_with_encoder(JpegEncoder::new_with_quality(&mut output, options.quality.clamp(1, 100)))?;
        }
        ImageFormat::Png => {
            let options: PngOptions = parse_options(options)?;
            let image = decode(buffer, format)?;
            image.write_with_encoder(PngEncoder::new_with_quality(
                &mut output,
                options.compression.into(),
                options.filter.into(),
            ))?;
        }
        ImageFormat::Gif => {
            let options: GifOptions = parse_options(options)?;
            encode_gif(buffer, options, &mut output)?;
        }
        // Lossless only: lossy sources usually grow and end up skipped
        ImageFormat::WebP => {
            let _: WebpOptions = parse_options(options)?;
            if is_animated_webp(buffer) {
                return Err(CompressError::UnsupportedFormat("animated webp".to_string()));
            }

            let image = decode(buffer, format)?;
            let image = if image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            };
            image.write_with_encoder(WebPEncoder::new_lossless(&mut output))?;
        }
        other => return Err(CompressError::UnsupportedFormat(format_name(other))),
    }

    Ok(output)
}

/// Checks the animation flag of an extended (`VP8X`) WebP header.
fn is_animated_webp(buffer: &[u8]) -> bool {
    buffer.len() > 20 && &buffer[12..16] == b"VP8X" && buffer[20] & 0x02 != 0
}

/// Re-encodes every frame, keeping per-frame delays.
fn encode_gif(buffer: &[u8], options: GifOptions, output: &mut Vec<u8>) -> Result<(), CompressError> {
    let mut decoder = GifDecoder::new(Cursor::new(buffer))?;
    decoder.set_limits(Limits::no_limits())?;
    let frames = decoder.into_frames().collect_frames()?;

    let mut encoder = GifEncoder::new_with_speed(output, options.speed.clamp(1, 30));
    encoder.set_repeat(Repeat::Infinite)?;
    encoder.encode_frames(frames)?;
    Ok(())
}

/// Recompresses raster images in place or into an output directory.
#[derive(Debug, Clone)]
pub struct ImageTransformer {
    descriptor: Descriptor,
}

impl ImageTransformer {
    pub fn new(descriptor: Descriptor) -> Self {
        Self { descriptor }
    }

    async fn transform_file<F: FileSystem>(&self, fs: &F, options: &Value, path: &str) -> Result<Outcome> {
        let buffer = fs.read(&self.descriptor.source_path(path)).await?;

        let detected = image::guess_format(&buffer).ok();
        let name = detected.map(format_name).unwrap_or_else(|| "unknown".to_string());

        let (Some(format), Some(format_options)) = (detected, options.get(&name)) else {
            return Ok(Outcome::failure(path, format!("Unsupported or invalid format: {}", name)));
        };

        debug!("Re-encoding {} as {}", path, name);
        let original_size = buffer.len();
        let format_options = format_options.clone();
        let encoded = tokio::task::spawn_blocking(move || encode(&buffer, format, format_options)).await;

        let encoded = match encoded {
            Ok(Ok(encoded)) => encoded,
            Ok(Err(e)) => {
                debug!("Codec failed for {}: {}", path, e);
                return Ok(Outcome::failure(path, COMPRESS_FAILED));
            }
            Err(e) => {
                debug!("Codec task failed for {}: {}", path, e);
                return Ok(Outcome::failure(path, COMPRESS_FAILED));
            }
        };

        let outcome = Outcome::compared(path, original_size, encoded.len());
        if outcome.is_success() {
            fs.write(&self.descriptor.output_path(path), &encoded).await?;
        }

        Ok(outcome)
    }
}

impl Transformer for ImageTransformer {
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
