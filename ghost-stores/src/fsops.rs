/*!
Destructive filesystem primitives. Every call checks the preservation rules
first, so no caller can remove or rewrite a preserved path by mistake.
*/

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::preserve::PreservationRules;

/// Result of a removal that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Nothing was there. Re-runs after a partial purge land here.
    AlreadyAbsent,
}

fn guard(rules: &PreservationRules, path: &Path) -> StoreResult<()> {
    if rules.is_preserved(path) {
        debug!("Refusing to touch preserved path {}", path.display());
        return Err(StoreError::Preserved(path.to_path_buf()));
    }
    Ok(())
}

/// First preserved entry beneath the directory `dir`, if any. Symlinks are
/// judged by their own path and never followed.
pub fn preserved_beneath(rules: &PreservationRules, dir: &Path) -> StoreResult<Option<PathBuf>> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if rules.is_preserved(&path) {
                return Ok(Some(path));
            }
            let file_type = entry.file_type().map_err(|e| StoreError::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            }
        }
    }
    Ok(None)
}

/// Remove a directory tree, or a single file if `path` is not a directory.
/// Symlinks are removed themselves, never followed. A tree holding any
/// preserved entry is left whole.
pub fn remove_tree(rules: &PreservationRules, path: &Path) -> StoreResult<Removal> {
    guard(rules, path)?;

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Removal::AlreadyAbsent),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if metadata.is_dir() {
        if let Some(inner) = preserved_beneath(rules, path)? {
            debug!("Refusing to remove {}, it holds {}", path.display(), inner.display());
            return Err(StoreError::Preserved(inner));
        }
    }

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => {
            info!("Removed {}", path.display());
            Ok(Removal::Removed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Removal::AlreadyAbsent),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Remove a single file.
pub fn remove_file(rules: &PreservationRules, path: &Path) -> StoreResult<Removal> {
    guard(rules, path)?;

    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed {}", path.display());
            Ok(Removal::Removed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Removal::AlreadyAbsent),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Replace the contents of `path` atomically: the new bytes are written to a
/// sibling temporary file which is then renamed over the original, keeping
/// its permissions.
pub fn rewrite_file(rules: &PreservationRules, path: &Path, contents: &[u8]) -> StoreResult<()> {
    guard(rules, path)?;

    let parent = path.parent().ok_or_else(|| StoreError::Malformed {
        what: "path",
        detail: format!("{} has no parent directory", path.display()),
    })?;
    let permissions = fs::metadata(path)
        .map_err(|e| StoreError::io(path, e))?
        .permissions();

    let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    staged
        .write_all(contents)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| StoreError::io(staged.path(), e))?;
    fs::set_permissions(staged.path(), permissions).map_err(|e| StoreError::io(staged.path(), e))?;
    staged
        .persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;

    info!("Rewrote {}", path.display());
    Ok(())
}
