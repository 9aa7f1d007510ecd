//! Input line sources
//!
//! Every worker scans the whole input from the top and keeps only the lines
//! it owns, so a source must be restartable: each call to
//! [`LineSource::lines`] yields a fresh iterator from the first line.
//! Line terminators (`\n`, `\r\n`) are stripped before lines reach a worker.
//!
//! Input bytes are taken as they come. A line that is not valid UTF-8 is
//! decoded lossily; it never fails the read for workers that merely skip it.

use crate::error::{PulseError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

/// Iterator over input lines
pub type Lines<'a> = Box<dyn Iterator<Item = io::Result<String>> + 'a>;

/// A restartable, finite sequence of URL lines
pub trait LineSource {
    /// Human-readable name for logs and errors
    fn describe(&self) -> String;

    /// Fail fast if the source cannot be read
    ///
    /// Called once by the coordinator before any worker is spawned.
    fn check(&self) -> Result<()>;

    /// Open a fresh iterator positioned at the first line
    fn lines(&self) -> Result<Lines<'_>>;
}

/// Lines read from a file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<File> {
        File::open(&self.path)
            .map_err(|e| PulseError::Input(format!("{}: {}", self.path.display(), e)))
    }
}

impl LineSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn check(&self) -> Result<()> {
        let file = self.open()?;
        let meta = file
            .metadata()
            .map_err(|e| PulseError::Input(format!("{}: {}", self.path.display(), e)))?;
        if meta.is_dir() {
            return Err(PulseError::Input(format!(
                "{}: is a directory",
                self.path.display()
            )));
        }
        Ok(())
    }

    fn lines(&self) -> Result<Lines<'_>> {
        let reader = BufReader::new(self.open()?);
        Ok(Box::new(reader.split(b'\n').map(|line| {
            line.map(|bytes| strip_cr(String::from_utf8_lossy(&bytes).into_owned()))
        })))
    }
}

/// Lines held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    lines: Vec<String>,
}

impl MemorySource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(|s| strip_cr(s.into())).collect(),
        }
    }
}

impl LineSource for MemorySource {
    fn describe(&self) -> String {
        format!("<memory: {} lines>", self.lines.len())
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn lines(&self) -> Result<Lines<'_>> {
        Ok(Box::new(self.lines.iter().cloned().map(Ok)))
    }
}

/// Drop a trailing carriage return left over from `\r\n` input
fn strip_cr(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
    }
    if line.ends_with('\r') {
        line.pop();
    }
    line
}
