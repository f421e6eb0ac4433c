//! Append-only activity log: one delimited line per cycle.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;

/// Writes `timestamp;score;mode;response` lines, one per cycle.
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Appends one line, creating the file on first use. The response field
    /// is left empty for cycles without an upload; the line is still written.
    pub fn append(&self, timestamp: &str, score: f64, mode: u8, response: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{timestamp};{score:.2};{mode};{response}")?;
        Ok(())
    }
}
