//! Input archive access.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::warn;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::archive::MemberLines;
use crate::error::{MergerError, MergerResult};

/// One entry of an archive's member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    /// Member name, e.g. `stops.txt`.
    pub name: String,
    /// Whether the entry is a directory rather than a file.
    pub is_dir: bool,
}

/// A read-only input archive.
///
/// Holds only the path: every access reopens the file and releases it before returning, so no
/// handle outlives the member it was opened for.
#[derive(Debug, Clone)]
pub struct InputArchive {
    path: PathBuf,
}

impl InputArchive {
    /// Opens the archive at `path` once to check that its central directory can be read.
    pub fn open(path: impl Into<PathBuf>) -> MergerResult<Self> {
        let archive = Self { path: path.into() };
        archive.open_zip()?;

        Ok(archive)
    }

    /// Returns the path of the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the members of the archive in central-directory order.
    ///
    /// A name repeated in the directory is listed once, at its first position.
    pub fn members(&self) -> MergerResult<Vec<MemberEntry>> {
        let mut zip = self.open_zip()?;
        let mut members = Vec::with_capacity(zip.len());
        let mut names = HashSet::with_capacity(zip.len());

        for index in 0..zip.len() {
            let file = zip.by_index_raw(index).map_err(|source| self.unreadable(source))?;
            let name = file.name().to_string();

            if !names.insert(name.clone()) {
                warn!(archive = %self.path.display(), member = %name, "ignoring repeated member name");
                continue;
            }

            members.push(MemberEntry {
                name,
                is_dir: file.is_dir(),
            });
        }

        Ok(members)
    }

    /// Opens the member `name` and hands its lines to `read`.
    ///
    /// Returns `Ok(None)` when the archive has no such member. The archive and the member are
    /// closed when this returns, whether `read` succeeded or not.
    pub fn read_member<T, F>(&self, name: &str, read: F) -> MergerResult<Option<T>>
    where
        F: FnOnce(&mut MemberLines<'_>) -> MergerResult<T>,
    {
        let mut zip = self.open_zip()?;

        let file = match zip.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(source) => return Err(self.unreadable(source)),
        };

        let mut lines = MemberLines::new(BufReader::new(file));
        read(&mut lines).map(Some)
    }

    fn open_zip(&self) -> MergerResult<ZipArchive<BufReader<File>>> {
        let file = File::open(&self.path).map_err(|err| self.unreadable(ZipError::Io(err)))?;

        ZipArchive::new(BufReader::new(file)).map_err(|source| self.unreadable(source))
    }

    fn unreadable(&self, source: ZipError) -> MergerError {
        MergerError::ArchiveUnreadable {
            path: self.path.clone(),
            source,
        }
    }
}
