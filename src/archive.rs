//! Zip packaging of plaintext payloads
//!
//! Every payload is a zip archive, even a single file with compression
//! disabled. Decryption therefore always unpacks an archive and never has to
//! guess whether it is looking at raw bytes.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::read::ZipFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ErrorCategory, ErrorKind, FilecryptError, Result};
use crate::file_ops;

/// Member buffer pre-allocation cap. This is a performance setting only.
const INITIAL_BUFFER_CAP: u64 = 50 * 1024 * 1024;

/// Collect every non-directory path below `root`, sorted by file name.
///
/// Directories are not listed; they are implied by the file paths and
/// recreated from them on extraction. Symlinks and walk errors abort the
/// whole traversal.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    log::debug!("collecting files under {}", root.display());

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            FilecryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Traversal,
                format!("failed to walk {}", root.display()),
                e,
            )
        })?;

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            return Err(FilecryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::Traversal,
                format!("symlinks are not supported: {}", entry.path().display()),
            ));
        }
        if !file_type.is_dir() {
            files.push(entry.into_path());
        }
    }

    log::debug!("collected {} files", files.len());
    Ok(files)
}

/// Name an archive member by its path relative to `root`, using `/`
/// separators regardless of platform.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArchiveWrite,
            format!("{} is not under {}", path.display(), root.display()),
            e,
        )
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(|| {
                FilecryptError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::ArchiveWrite,
                    format!("path is not valid UTF-8: {}", path.display()),
                )
            })?),
            Component::CurDir => {}
            _ => {
                return Err(FilecryptError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::ArchiveWrite,
                    format!("cannot archive {} relative to {}", path.display(), root.display()),
                ));
            }
        }
    }

    if parts.is_empty() {
        return Err(FilecryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArchiveWrite,
            format!("{} has an empty name relative to {}", path.display(), root.display()),
        ));
    }
    Ok(parts.join("/"))
}

fn write_error(
    path: &Path,
    msg: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> FilecryptError {
    FilecryptError::with_kind_and_source(
        ErrorCategory::Internal,
        ErrorKind::ArchiveWrite,
        format!("{} {}", msg, path.display()),
        source,
    )
}

/// Pack `files` into an in-memory zip archive.
///
/// Each member is named by its path relative to `root`. `compress` selects
/// deflate instead of store, uniformly for all members.
pub fn build_archive(root: &Path, files: &[PathBuf], compress: bool) -> Result<Vec<u8>> {
    let method = if compress {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };
    let options = FileOptions::default().compression_method(method);

    let mut seen = HashSet::new();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for path in files {
        let name = entry_name(root, path)?;
        if !seen.insert(name.clone()) {
            return Err(FilecryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::ArchiveWrite,
                format!("duplicate archive entry {}", name),
            ));
        }

        let mut file = File::open(path).map_err(|e| write_error(path, "failed to open", e))?;
        log::debug!("adding {} as {}", path.display(), name);

        writer
            .start_file(name, options)
            .map_err(|e| write_error(path, "failed to create archive header for", e))?;
        io::copy(&mut file, &mut writer).map_err(|e| write_error(path, "failed to archive", e))?;
    }

    let cursor = writer.finish().map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::ArchiveWrite,
            "failed to finalize archive",
            e,
        )
    })?;

    Ok(cursor.into_inner())
}

fn read_error(msg: impl Into<String>, source: zip::result::ZipError) -> FilecryptError {
    FilecryptError::with_kind_and_source(ErrorCategory::User, ErrorKind::ArchiveRead, msg, source)
}

fn open_archive(archive: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(archive)).map_err(|e| read_error("malformed archive", e))
}

/// Resolve an archive member name to a path below `output_dir`, rejecting
/// names that would escape it.
fn output_path(output_dir: &Path, name: &str, enclosed: Option<&Path>) -> Result<PathBuf> {
    enclosed.map(|rel| output_dir.join(rel)).ok_or_else(|| {
        FilecryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArchiveRead,
            format!("refusing to extract unsafe entry name {:?}", name),
        )
    })
}

/// Unpack `archive` below `output_dir`, in archive order.
///
/// Parent directories of every file member are created from the member's
/// own path. Existing files are truncated. The first failing member aborts
/// extraction; members already written stay on disk.
pub fn extract_archive(archive: &[u8], output_dir: &Path) -> Result<()> {
    let mut reader = open_archive(archive)?;

    fs::create_dir_all(output_dir).map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to create directory {}", output_dir.display()),
            e,
        )
    })?;

    for i in 0..reader.len() {
        let mut member = reader
            .by_index(i)
            .map_err(|e| read_error(format!("failed to read archive entry {}", i), e))?;
        let target = output_path(output_dir, member.name(), member.enclosed_name())?;

        if member.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                FilecryptError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to create directory {}", target.display()),
                    e,
                )
            })?;
            continue;
        }

        log::debug!("extracting {}", target.display());
        // A member that fails to decode leaves no file behind.
        let content = read_member(&mut member)?;
        let mut out = file_ops::create_file_truncate(&target)?;
        out.write_all(&content).map_err(|e| {
            FilecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write {}", target.display()),
                e,
            )
        })?;
    }

    Ok(())
}

/// Decompress one member and verify its checksum.
fn read_member(member: &mut ZipFile<'_>) -> Result<Vec<u8>> {
    let mut content = Vec::with_capacity(member.size().min(INITIAL_BUFFER_CAP) as usize);
    member.read_to_end(&mut content).map_err(|e| {
        FilecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArchiveRead,
            format!("failed to uncompress {}", member.name()),
            e,
        )
    })?;
    Ok(content)
}
