//! Byte sinks fed by the exec and log pumps.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use kubewright_core::Result;
use tracing::{debug, error, info, trace, warn, Level};

pub trait WriteSink: Send {
    fn write(&mut self, data: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory collector: each write drops trailing newlines and splits the rest into lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCollector {
    lines: Vec<String>,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl WriteSink for LineCollector {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data);
        self.lines.extend(text.trim_end_matches('\n').split('\n').map(str::to_string));
        Ok(())
    }
}

/// Forwards every write to `tracing` at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct LogSink {
    level: Level,
}

impl LogSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    pub fn error() -> Self {
        Self::new(Level::ERROR)
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl WriteSink for LogSink {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data);
        let line = text.trim_end_matches('\n');
        match self.level {
            Level::ERROR => error!("{line}"),
            Level::WARN => warn!("{line}"),
            Level::INFO => info!("{line}"),
            Level::DEBUG => debug!("{line}"),
            _ => trace!("{line}"),
        }
        Ok(())
    }
}

/// File-backed sink. Buffered data is flushed when the sink is closed or dropped.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    out: Option<BufWriter<File>>,
}

impl FileSink {
    /// Creates (or truncates) `path`, making missing parent directories first.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { path: path.to_path_buf(), out: Some(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and release the handle, reporting any flush error.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

impl WriteSink for FileSink {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Some(out) = self.out.as_mut() {
            out.write_all(data)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(out) = self.out.as_mut() {
            out.flush()?;
        }
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Some(mut out) = self.out.take() {
            if let Err(e) = out.flush() {
                warn!(path = %self.path.display(), error = %e, "file sink flush failed on drop");
            }
        }
    }
}
