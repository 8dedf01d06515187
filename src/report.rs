//! # Report Module
//!
//! Questo modulo aggrega gli esiti della compressione e produce le righe
//! di report mostrate a fine build.
//!
//! ## Responsabilità:
//! - `format_bytes()`: Converte bytes in formato leggibile (base 1024)
//! - `Summary`: Conteggi per variante e byte risparmiati (solo successi)
//! - `report()`: Righe di riepilogo in ordine fisso
//! - `message()`: Riga per singolo file (✓ / ⨯ / -)
//!
//! ## Esempio:
//! ```text
//! Compressed: 3 files.
//! Skipped: 1 file.
//! Errors: 0 files.
//!
//! Total savings: 12.4 KB.
//! ```

use crate::outcome::Outcome;
use crate::utils::inflect;
use console::style;
use serde::{Deserialize, Serialize};

const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Formats a byte count using base-1024 units and up to two decimals.
///
/// `format_bytes(0)` is `"0 Bytes"`, `format_bytes(1536)` is `"1.5 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut index = 0;
    let mut unit = 1u64;
    while index < UNITS.len() - 1 && bytes / unit >= 1024 {
        unit *= 1024;
        index += 1;
    }

    let value = ((bytes as f64 / unit as f64) * 100.0).round() / 100.0;
    format!("{} {}", value, UNITS[index])
}

/// Aggregated counts over a run's outcomes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub compressed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Sum of deltas over successful outcomes only
    pub bytes_saved: u64,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            match outcome {
                Outcome::Success { delta, .. } => {
                    summary.compressed += 1;
                    summary.bytes_saved += (*delta).max(0) as u64;
                }
                Outcome::Skipped { .. } => summary.skipped += 1,
                Outcome::Failure { .. } => summary.errors += 1,
            }
            summary
        })
    }
}

/// Renders the end-of-run summary lines.
pub fn report(outcomes: &[Outcome]) -> Vec<String> {
    let summary = Summary::from_outcomes(outcomes);
    let files = ("file", "files");

    vec![
        format!("Compressed: {} {}.", summary.compressed, inflect(files, summary.compressed)),
        format!("Skipped: {} {}.", summary.skipped, inflect(files, summary.skipped)),
        format!("Errors: {} {}.", summary.errors, inflect(files, summary.errors)),
        String::new(),
        format!("Total savings: {}.", style(format_bytes(summary.bytes_saved)).green()),
        String::new(),
    ]
}

/// Renders the log line for a single outcome.
pub fn message(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success { path, delta } => {
            let saved = style(format!("-{}", format_bytes(delta.unsigned_abs()))).green();
            format!("{}: {} ({})", style("✓ Compressed").green(), path, saved)
        }
        Outcome::Failure { path, reason } => {
            format!("{}: {} ({})", style("⨯ Error").red(), path, reason)
        }
        Outcome::Skipped { path, reason, .. } => {
            format!("{}: {} ({})", style("- Skipped").dim(), path, reason)
        }
    }
}
