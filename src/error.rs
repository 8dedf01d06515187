//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore custom della libreria.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (directory non leggibili, permessi, etc.)
//! - `Image`: Errori del codec raster (decode/encode)
//! - `Svg`: Errori dell'ottimizzatore SVG
//! - `UnsupportedFormat`: Formato immagine non configurato o non codificabile
//! - `Pattern`: Pattern glob non valido
//! - `Config`: Errori di validazione della configurazione
//!
//! Gli errori dei codec vengono convertiti in `Outcome::Failure` per singolo
//! file; solo gli errori di I/O risalgono fino all'orchestratore.

/// Custom error types for asset compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("SVG optimization error: {0}")]
    Svg(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<xmlparser::Error> for CompressError {
    fn from(err: xmlparser::Error) -> Self {
        Self::Svg(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CompressError::UnsupportedFormat("bmp".to_string());
        assert_eq!(err.to_string(), "Unsupported file format: bmp");

        let err = CompressError::Config("options must be an object".to_string());
        assert_eq!(err.to_string(), "Configuration error: options must be an object");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CompressError = io.into();
        assert!(matches!(err, CompressError::Io(_)));
    }
}
