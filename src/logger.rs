//! # Logger Module
//!
//! Il logger è un collaboratore iniettato: la pipeline scrive solo tramite
//! il trait `Logger`, mai su stdout direttamente.
//!
//! - `TracingLogger`: inoltra a `tracing` (usato dal binario e dall'hook)
//! - `RecordingLogger`: conserva le righe in memoria (test, embedding)

use std::sync::Mutex;
use tracing::{error, info};

/// Line-oriented logging capability handed to the pipeline.
pub trait Logger {
    fn info(&self, line: &str);
    fn error(&self, line: &str);
}

/// Forwards every line to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, line: &str) {
        info!("{}", line);
    }

    fn error(&self, line: &str) {
        error!("{}", line);
    }
}

/// Level of a recorded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// Keeps logged lines in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines with ANSI styling removed.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| {
                lines
                    .iter()
                    .map(|(level, line)| (*level, console::strip_ansi_codes(line).into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(level, _)| *level == Level::Error)
            .map(|(_, line)| line)
            .collect()
    }

    fn push(&self, level: Level, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, line.to_string()));
        }
    }
}

impl Logger for RecordingLogger {
    fn info(&self, line: &str) {
        self.push(Level::Info, line);
    }

    fn error(&self, line: &str) {
        self.push(Level::Error, line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger_keeps_order() {
        let logger = RecordingLogger::new();
        logger.info("first");
        logger.error("second");
        logger.info(&console::style("third").green().force_styling(true).to_string());

        assert_eq!(
            logger.lines(),
            vec![
                (Level::Info, "first".to_string()),
                (Level::Error, "second".to_string()),
                (Level::Info, "third".to_string()),
            ]
        );
        assert_eq!(logger.errors(), vec!["second".to_string()]);
    }
}
