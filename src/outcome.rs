//! # Outcome Module
//!
//! Risultato della compressione di un singolo file.
//!
//! ## Varianti:
//! - `Success`: file riscritto, `delta` byte risparmiati (sempre > 0)
//! - `Skipped`: nessuna riduzione, file non toccato (`delta` <= 0)
//! - `Failure`: compressione non completata, solo il motivo
//!
//! La serializzazione JSON usa il campo `kind` (`ok`, `skip`, `err`).

use serde::{Deserialize, Serialize};

/// Reason attached to files whose re-encoded output is not smaller.
pub const NO_OPTIMIZATION: &str = "No optimizations were applied";

/// The result of compressing a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Outcome {
    /// The file was rewritten with a smaller encoding.
    #[serde(rename = "ok")]
    Success {
        /// Path relative to the scan directory
        path: String,
        /// Original size minus compressed size, always positive
        delta: i64,
    },

    /// The re-encoded output was not smaller; nothing was written.
    #[serde(rename = "skip")]
    Skipped {
        path: String,
        /// Original size minus compressed size, zero or negative
        delta: i64,
        reason: String,
    },

    /// Compression could not be completed.
    #[serde(rename = "err")]
    Failure { path: String, reason: String },
}

impl Outcome {
    /// Classifies a finished compression by comparing byte sizes.
    pub fn compared(path: impl Into<String>, original_size: usize, compressed_size: usize) -> Self {
        let delta = original_size as i64 - compressed_size as i64;
        let path = path.into();

        if delta > 0 {
            Self::Success { path, delta }
        } else {
            Self::Skipped {
                path,
                delta,
                reason: NO_OPTIMIZATION.to_string(),
            }
        }
    }

    pub fn failure(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Success { path, .. } | Self::Skipped { path, .. } | Self::Failure { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compared_smaller_is_success() {
        let outcome = Outcome::compared("a.png", 1000, 900);
        assert_eq!(
            outcome,
            Outcome::Success {
                path: "a.png".to_string(),
                delta: 100
            }
        );
        assert!(outcome.is_success());
    }

    #[test]
    fn test_compared_equal_or_larger_is_skip() {
        for compressed in [1000, 1200] {
            match Outcome::compared("a.png", 1000, compressed) {
                Outcome::Skipped { delta, reason, .. } => {
                    assert!(delta <= 0);
                    assert_eq!(reason, NO_OPTIMIZATION);
                }
                other => panic!("expected skip, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_serialized_kind_tags() {
        let ok = serde_json::to_value(Outcome::compared("a.svg", 10, 5)).unwrap();
        assert_eq!(ok["kind"], "ok");
        assert_eq!(ok["delta"], 5);

        let err = serde_json::to_value(Outcome::failure("b.jpg", "boom")).unwrap();
        assert_eq!(err["kind"], "err");
        assert_eq!(err["path"], "b.jpg");
        assert!(err.get("delta").is_none());
    }
}
