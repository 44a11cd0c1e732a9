use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use relay_core::Error;

/// Remove a file or directory tree. Missing paths are fine.
pub(super) fn remove_path(path: &Path) -> Result<(), Error> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::filesystem(path, e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::filesystem(path, e)),
    }
}

/// Remove everything under `dir` except the branch leading to `keep`.
///
/// `keep` itself and its contents are left untouched; siblings of every
/// ancestor of `keep` below `dir` are removed.
pub(super) fn remove_except(dir: &Path, keep: &Path) -> Result<(), Error> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::filesystem(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| Error::filesystem(dir, e))?;
        let path = entry.path();

        if path == keep {
            continue;
        }

        let is_real_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_real_dir && keep.starts_with(&path) {
            remove_except(&path, keep)?;
        } else {
            remove_path(&path)?;
        }
    }

    Ok(())
}
