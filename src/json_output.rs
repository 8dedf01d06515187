//! # JSON Output Module
//!
//! Output strutturato in JSON per l'uso programmatico della CLI (`--json`).
//!
//! ## Tipi di messaggi:
//! - `complete`: esiti per file + riepilogo (conteggi, byte risparmiati)
//! - `error`: errore della pipeline, nessun esito disponibile

use crate::outcome::Outcome;
use crate::report::Summary;
use serde::{Deserialize, Serialize};

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Run completata
    #[serde(rename = "complete")]
    Complete {
        outcomes: Vec<Outcome>,
        summary: Summary,
    },

    /// Errore della pipeline
    #[serde(rename = "error")]
    Error { message: String },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn complete(outcomes: Vec<Outcome>) -> Self {
        let summary = Summary::from_outcomes(&outcomes);
        Self::Complete { outcomes, summary }
    }

    pub fn error(message: String) -> Self {
        Self::Error { message }
    }
}
