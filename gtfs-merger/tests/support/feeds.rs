//! GTFS archive fixtures written to a temporary directory.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Temporary directory holding the archives of one test.
pub struct Feeds {
    dir: TempDir,
}

impl Feeds {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temporary directory"),
        }
    }

    /// Returns the path of `name` inside the directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes an archive whose members are given as text. Names ending in `/` become
    /// directory entries.
    pub fn archive(&self, name: &str, members: &[(&str, &str)]) -> PathBuf {
        let members: Vec<(&str, &[u8])> = members
            .iter()
            .map(|(member, contents)| (*member, contents.as_bytes()))
            .collect();
        self.archive_bytes(name, &members)
    }

    /// Writes an archive whose members are given as raw bytes.
    pub fn archive_bytes(&self, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
        let path = self.path(name);
        let file = File::create(&path).expect("failed to create archive");
        let mut zip = ZipWriter::new(file);

        for (member, contents) in members {
            if member.ends_with('/') {
                zip.add_directory(*member, SimpleFileOptions::default())
                    .expect("failed to add directory");
                continue;
            }

            zip.start_file(*member, SimpleFileOptions::default())
                .expect("failed to start member");
            zip.write_all(contents).expect("failed to write member");
        }

        zip.finish().expect("failed to finish archive");
        path
    }

    /// Writes a file that is not an archive.
    pub fn garbage(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, b"PK\x03\x04 definitely not a zip archive").expect("failed to write file");
        path
    }

    /// Returns the names of the files in the directory, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir.path())
            .expect("failed to list directory")
            .map(|entry| {
                entry
                    .expect("failed to read entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

/// Returns the member names of an archive in central-directory order.
pub fn member_names(path: &Path) -> Vec<String> {
    let mut zip = open(path);
    (0..zip.len())
        .map(|index| {
            zip.by_index(index)
                .expect("failed to read entry")
                .name()
                .to_string()
        })
        .collect()
}

/// Returns the raw bytes of a member.
pub fn member_bytes(path: &Path, name: &str) -> Vec<u8> {
    let mut zip = open(path);
    let mut member = zip.by_name(name).expect("member not found");
    let mut contents = Vec::new();
    member
        .read_to_end(&mut contents)
        .expect("failed to read member");
    contents
}

/// Returns a member as text.
pub fn member_text(path: &Path, name: &str) -> String {
    String::from_utf8(member_bytes(path, name)).expect("member is not UTF-8")
}

/// Returns the compression method of a member.
pub fn member_compression(path: &Path, name: &str) -> CompressionMethod {
    let mut zip = open(path);
    let member = zip.by_name(name).expect("member not found");
    member.compression()
}

fn open(path: &Path) -> ZipArchive<File> {
    let file = File::open(path).expect("failed to open archive");
    ZipArchive::new(file).expect("failed to read archive")
}
