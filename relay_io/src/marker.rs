//! The installed-version marker, `<install>/.relay-version`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use relay_core::{Error, VERSION_MARKER};

pub fn marker_path(install_dir: &Path) -> PathBuf {
    install_dir.join(VERSION_MARKER)
}

/// Installed version, or `None` when there is no (or an empty) marker.
pub fn read_marker(install_dir: &Path) -> Result<Option<String>, Error> {
    let path = marker_path(install_dir);
    match fs::read_to_string(&path) {
        Ok(contents) => {
            let version = contents.lines().next().unwrap_or("").trim();
            Ok((!version.is_empty()).then(|| version.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::filesystem(&path, e)),
    }
}

pub fn write_marker(install_dir: &Path, version: &str) -> Result<(), Error> {
    let path = marker_path(install_dir);
    fs::write(&path, format!("{}\n", version.trim())).map_err(|e| Error::filesystem(&path, e))
}
