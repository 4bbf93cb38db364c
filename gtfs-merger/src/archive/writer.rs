//! Output archive writer.

use std::io::{self, Write};
use std::path::PathBuf;

use gtfs_config::shared::OutputCompression;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{MergerError, MergerResult};

/// Write-once output archive.
///
/// Members are appended to a temporary file created next to the final path. [`finish`] writes
/// the central directory and moves the file into place; dropping the writer without calling
/// it deletes the temporary file, so a failed run never leaves an archive at the output path.
///
/// [`finish`]: OutputArchive::finish
pub struct OutputArchive {
    path: PathBuf,
    zip: ZipWriter<NamedTempFile>,
    compression: CompressionMethod,
}

impl OutputArchive {
    /// Creates the temporary file backing the archive that will end up at `path`.
    pub fn create(path: impl Into<PathBuf>, compression: OutputCompression) -> MergerResult<Self> {
        let path = path.into();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix(".gtfs-merge-").suffix(".zip.partial");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o644));
        }

        let file = builder
            .tempfile_in(&directory)
            .map_err(|source| MergerError::OutputUnwritable {
                path: path.clone(),
                source,
            })?;

        debug!(output = %path.display(), partial = %file.path().display(), "created partial output archive");

        Ok(Self {
            path,
            zip: ZipWriter::new(file),
            compression: match compression {
                OutputCompression::Stored => CompressionMethod::Stored,
                OutputCompression::Deflated => CompressionMethod::Deflated,
            },
        })
    }

    /// Starts a new file member; subsequent writes go to it.
    pub fn start_member(&mut self, name: &str) -> MergerResult<()> {
        self.zip
            .start_file(name, self.file_options())
            .map_err(|source| MergerError::MemberWrite {
                member: name.to_string(),
                source,
            })
    }

    /// Adds a directory entry.
    pub fn add_directory(&mut self, name: &str) -> MergerResult<()> {
        self.zip
            .add_directory(name, self.file_options())
            .map_err(|source| MergerError::MemberWrite {
                member: name.to_string(),
                source,
            })
    }

    /// Finalizes the archive and moves it to its final path.
    pub fn finish(self) -> MergerResult<PathBuf> {
        let Self { path, zip, .. } = self;

        let file = zip
            .finish()
            .map_err(|source| MergerError::OutputUnwritable {
                path: path.clone(),
                source: io::Error::other(source),
            })?;

        file.persist(&path)
            .map_err(|err| MergerError::OutputUnwritable {
                path: path.clone(),
                source: err.error,
            })?;

        Ok(path)
    }

    fn file_options(&self) -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(self.compression)
    }
}

impl Write for OutputArchive {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.zip.flush()
    }
}
