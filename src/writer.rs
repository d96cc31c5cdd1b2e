use crate::types::WriteInfo;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Destination for the writes a conversion run produces
pub trait WriteSink {
    fn write_all(&mut self, writes: Vec<WriteInfo>) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Writes each document to its output path under a root directory
pub struct DirectoryWriter {
    root: PathBuf,
    written: usize,
}

impl DirectoryWriter {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create output directory: {}", root.display()))?;

        Ok(DirectoryWriter { root, written: 0 })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl WriteSink for DirectoryWriter {
    fn write_all(&mut self, writes: Vec<WriteInfo>) -> Result<()> {
        for write in writes {
            let path = self.root.join(&write.output);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
            std::fs::write(&path, write.content.as_bytes())
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            debug!(path = %path.display(), origin = %write.origin, "wrote file");
            self.written += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct StreamRecord<'a> {
    output: &'a Path,
    content: &'a str,
}

/// Writes every document as one JSON line `{"output", "content"}` to a
/// single stream
pub struct StreamWriter<W: Write> {
    writer: W,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(writer: W) -> Self {
        StreamWriter { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> WriteSink for StreamWriter<W> {
    fn write_all(&mut self, writes: Vec<WriteInfo>) -> Result<()> {
        for write in writes {
            let record = StreamRecord {
                output: &write.output,
                content: &write.content,
            };
            let json = serde_json::to_string(&record).context("Failed to serialize write")?;
            writeln!(self.writer, "{}", json).context("Failed to write record")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
