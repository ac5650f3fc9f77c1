use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

/// Write `content` to `path` so that readers see either the old file or the
/// complete new one.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    // Fsync parent directory so the rename survives power loss.
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
    Ok(())
}

/// Copy the tree under `src` into `dest`, merging with what is already
/// there. Symlinks are recreated, not followed. Returns the number of
/// non-directory entries copied.
///
/// `dest` may lie inside `src`; it is never copied into itself.
pub fn relocate_tree(src: &Path, dest: &Path) -> io::Result<usize> {
    relocate_tree_excluding(src, dest, &[])
}

/// [`relocate_tree`] that also leaves out every directory in `exclude`.
/// Excluded paths that do not exist are ignored.
pub fn relocate_tree_excluding(src: &Path, dest: &Path, exclude: &[&Path]) -> io::Result<usize> {
    fs::create_dir_all(dest)?;
    let root = fs::canonicalize(src)?;
    let mut skip = vec![fs::canonicalize(dest)?];
    skip.extend(exclude.iter().filter_map(|p| fs::canonicalize(p).ok()));

    let mut copied = 0;
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && skip.iter().any(|s| e.path() == s.as_path())));
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(&root)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
        copied += 1;
    }
    debug!(
        "relocated {copied} entries from {} to {}",
        src.display(),
        dest.display()
    );
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    if target.symlink_metadata().is_ok() {
        fs::remove_file(target)?;
    }
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    fs::copy(src, target).map(|_| ())
}

/// All non-directory entries under `dir`, relative to it and sorted.
pub fn enumerate_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(dir) {
            files.push(rel.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}
