//! Package sinks: where EPUB entries are written. Both sinks take the same relative paths.

use super::EpubError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Destination for package entries. `path` is always `/`-separated and relative.
pub trait PackageSink {
    fn add_entry(&mut self, path: &str, contents: &[u8], compress: bool)
        -> Result<(), EpubError>;
}

/// Writes entries as members of a single zip file.
pub struct ZipSink {
    zip: ZipWriter<File>,
    stored: SimpleFileOptions,
    deflated: SimpleFileOptions,
}

impl ZipSink {
    /// Create (or truncate) the archive at `path`.
    pub fn create(path: &Path) -> Result<Self, EpubError> {
        let file = File::create(path).map_err(|e| EpubError::CreateFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            zip: ZipWriter::new(file),
            stored: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored)
                .unix_permissions(0o644),
            deflated: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .unix_permissions(0o644),
        })
    }

    /// Write the central directory.
    pub fn finish(self) -> Result<(), EpubError> {
        self.zip.finish()?;
        Ok(())
    }
}

impl PackageSink for ZipSink {
    fn add_entry(
        &mut self,
        path: &str,
        contents: &[u8],
        compress: bool,
    ) -> Result<(), EpubError> {
        let options = if compress { self.deflated } else { self.stored };
        tracing::debug!(entry = path, bytes = contents.len(), "zip entry");
        self.zip.start_file(path, options)?;
        self.zip.write_all(contents).map_err(zip::result::ZipError::Io)?;
        Ok(())
    }
}

/// Writes entries as files under a root directory that must not exist yet.
pub struct DirSink {
    root: PathBuf,
}

impl DirSink {
    /// Create the root directory. Fails with [EpubError::OutputExists] if anything is already there.
    pub fn create(root: &Path) -> Result<Self, EpubError> {
        if root.exists() {
            return Err(EpubError::OutputExists {
                path: root.to_path_buf(),
            });
        }
        std::fs::create_dir(root).map_err(|e| EpubError::CreateFile {
            path: root.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn finish(self) -> Result<(), EpubError> {
        Ok(())
    }
}

impl PackageSink for DirSink {
    fn add_entry(
        &mut self,
        path: &str,
        contents: &[u8],
        _compress: bool,
    ) -> Result<(), EpubError> {
        let target = path
            .split('/')
            .fold(self.root.clone(), |acc, part| acc.join(part));
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EpubError::CreateFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        tracing::debug!(file = %target.display(), bytes = contents.len(), "write file");
        std::fs::write(&target, contents).map_err(|e| EpubError::Io {
            path: target,
            source: e,
        })
    }
}
