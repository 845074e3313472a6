use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ComposeError, ComposeResult};

/// Destination for named frame payloads.
pub trait FrameSink {
    fn add_frame(&mut self, name: &str, bytes: &[u8]) -> ComposeResult<()>;
}

/// Collects frames into a zip archive.
pub struct ZipSink<W: Write + Seek> {
    writer: ZipWriter<W>,
    entries: usize,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            entries: 0,
        }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Writes the central directory and hands back the underlying writer.
    pub fn finish(mut self) -> ComposeResult<W> {
        self.writer
            .finish()
            .map_err(|err| ComposeError::archive(format!("failed to finish zip: {}", err)))
    }
}

impl<W: Write + Seek> FrameSink for ZipSink<W> {
    fn add_frame(&mut self, name: &str, bytes: &[u8]) -> ComposeResult<()> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(name, options)
            .map_err(|err| ComposeError::archive(format!("failed to write zip entry {}: {}", name, err)))?;
        self.writer
            .write_all(bytes)
            .map_err(|err| ComposeError::archive(format!("failed to write zip content {}: {}", name, err)))?;
        self.entries += 1;
        Ok(())
    }
}

/// Writes each frame as its own file in a directory.
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn create(dir: &Path) -> ComposeResult<Self> {
        fs::create_dir_all(dir).map_err(|err| {
            ComposeError::archive(format!("failed to create {}: {}", dir.display(), err))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FrameSink for DirectorySink {
    fn add_frame(&mut self, name: &str, bytes: &[u8]) -> ComposeResult<()> {
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|err| {
            ComposeError::archive(format!("failed to write {}: {}", path.display(), err))
        })?;
        self.written.push(path);
        Ok(())
    }
}
