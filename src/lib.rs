//! # Astro Compress Library
//!
//! Passo di compressione post-build per siti statici: scansiona la
//! directory di output, ricomprime immagini raster e SVG e riporta i byte
//! risparmiati.
//!
//! ## Architettura dei moduli:
//! - `utils`: Merge ricorsivo delle opzioni e inflessione
//! - `outcome`: Esito per singolo file (successo / saltato / errore)
//! - `report`: Formattazione byte, riepilogo e messaggi per file
//! - `logger`: Collaboratore di logging iniettabile
//! - `file_manager`: Collaboratore filesystem e discovery glob
//! - `minifier`: Minifier SVG conservativo (tokenizer XML + `svgtypes`)
//! - `transformer`: Transformer SVG e immagini raster
//! - `compressor`: Orchestratore e hook post-build
//! - `config`: Configurazione e caricamento da JSON
//! - `json_output`: Output JSON per la CLI
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use astro_compress::{on_build_done, Config, TracingLogger};
//! use std::path::Path;
//!
//! # async fn example() {
//! let outcomes = on_build_done(Path::new("dist"), &Config::default(), &TracingLogger).await;
//! # }
//! ```

pub mod compressor;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod logger;
pub mod minifier;
pub mod outcome;
pub mod report;
pub mod transformer;
pub mod utils;

pub use compressor::{on_build_done, Compressor};
pub use config::{Config, TransformerConfig};
pub use error::CompressError;
pub use file_manager::{FileSystem, LocalFileSystem, MemoryFileSystem};
pub use logger::{Logger, RecordingLogger, TracingLogger};
pub use outcome::Outcome;
pub use report::{format_bytes, report, Summary};
pub use transformer::{Descriptor, ImageTransformer, SvgTransformer, Transformer};
pub use utils::merge_options;
