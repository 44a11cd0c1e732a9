//! Archive extraction for runtime downloads.
//!
//! Every entry name is checked before anything is written: absolute names,
//! names that clean to `..`, and symlinks pointing outside the destination
//! are rejected. Entries are also never written through a symlink an earlier
//! entry created, so links cannot be chained out of the destination. There
//! is no rollback, so callers extract into a staging directory they can
//! throw away.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;

use relay_core::Error;
use relay_core::paths::clean;

const DIR_MODE: u32 = 0o755;
const DEFAULT_FILE_MODE: u32 = 0o644;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Unpack `src` into `dest`, choosing the format from the file name.
pub fn extract_archive(src: &Path, dest: &Path) -> Result<(), Error> {
    let format = ArchiveFormat::detect(src).ok_or_else(|| Error::Extraction {
        entry: None,
        message: format!("unsupported archive format: {}", src.display()),
    })?;

    let dest = clean(dest);
    fs::create_dir_all(&dest).map_err(|e| Error::filesystem(&dest, e))?;

    let file = File::open(src).map_err(|e| Error::Extraction {
        entry: None,
        message: format!("cannot open {}: {e}", src.display()),
    })?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(file, &dest),
        ArchiveFormat::Zip => extract_zip(file, &dest),
    }
}

fn extract_tar_gz(file: File, dest: &Path) -> Result<(), Error> {
    let mut archive = Archive::new(GzDecoder::new(file));
    let entries = archive.entries().map_err(|e| Error::Extraction {
        entry: None,
        message: format!("failed to read tar entries: {e}"),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| Error::Extraction {
            entry: None,
            message: format!("failed to read tar entry: {e}"),
        })?;

        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let (relative, target) = safe_join(dest, &name)?;
        let entry_type = entry.header().entry_type();
        reject_symlinked_parents(dest, &relative, &name)?;

        match entry_type {
            EntryType::Directory => create_dir(&target, &name)?,
            EntryType::Regular | EntryType::Continuous => {
                let mode = entry.header().mode().unwrap_or(DEFAULT_FILE_MODE);
                write_file(&mut entry, &target, normalize_mode(mode), &name)?;
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name_bytes()
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .ok_or_else(|| Error::extraction(&name, "symlink without a target"))?;
                create_symlink(&relative, &target, &link, &name)?;
            }
            other => {
                debug!(entry = %name, kind = ?other, "skipping unsupported tar entry");
            }
        }
    }

    Ok(())
}

fn extract_zip(file: File, dest: &Path) -> Result<(), Error> {
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Extraction {
        entry: None,
        message: format!("failed to read zip archive: {e}"),
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| Error::Extraction {
            entry: None,
            message: format!("failed to read zip entry {i}: {e}"),
        })?;

        let name = entry.name().to_string();
        let (relative, target) = safe_join(dest, &name)?;
        reject_symlinked_parents(dest, &relative, &name)?;

        if entry.is_dir() {
            create_dir(&target, &name)?;
        } else {
            let mode = entry.unix_mode().unwrap_or(DEFAULT_FILE_MODE);
            write_file(&mut entry, &target, normalize_mode(mode), &name)?;
        }
    }

    Ok(())
}

/// Resolve an entry name under `dest`, returning the cleaned relative path
/// and the joined target.
fn safe_join(dest: &Path, name: &str) -> Result<(PathBuf, PathBuf), Error> {
    let normalized = name.replace('\\', "/");
    let raw = Path::new(&normalized);

    if normalized.starts_with('/')
        || raw.is_absolute()
        || raw
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
    {
        return Err(Error::extraction(name, "absolute path in archive"));
    }

    let relative = clean(raw);
    if relative.starts_with("..") {
        return Err(Error::extraction(name, "path escapes destination"));
    }

    let target = if relative == Path::new(".") {
        dest.to_path_buf()
    } else {
        dest.join(&relative)
    };
    if !target.starts_with(dest) {
        return Err(Error::extraction(name, "path escapes destination"));
    }

    Ok((relative, target))
}

/// Fail if any existing directory between `dest` and the entry is a
/// symlink. Checking stops at the first component that does not exist yet.
fn reject_symlinked_parents(dest: &Path, relative: &Path, name: &str) -> Result<(), Error> {
    let mut current = dest.to_path_buf();
    for component in relative.parent().into_iter().flat_map(Path::components) {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(Error::extraction(name, "path passes through a symlink"));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// Drop a symlink sitting where an entry is about to be written, so the
/// write replaces the link instead of following it.
fn replace_symlink(target: &Path, name: &str) -> Result<(), Error> {
    if let Ok(meta) = fs::symlink_metadata(target)
        && meta.file_type().is_symlink()
    {
        fs::remove_file(target).map_err(|e| Error::extraction(name, e.to_string()))?;
    }
    Ok(())
}

/// Keep permission bits only; unreadable files become 0644 and anything
/// executable becomes at least 0755.
pub fn normalize_mode(mode: u32) -> u32 {
    let mode = mode & 0o777;
    if mode == 0 {
        DEFAULT_FILE_MODE
    } else if mode & 0o111 != 0 {
        mode | DIR_MODE
    } else {
        mode
    }
}

fn create_dir(target: &Path, name: &str) -> Result<(), Error> {
    replace_symlink(target, name)?;
    fs::create_dir_all(target).map_err(|e| Error::extraction(name, e.to_string()))?;
    set_mode(target, DIR_MODE, name)
}

fn write_file(
    reader: &mut impl io::Read,
    target: &Path,
    mode: u32,
    name: &str,
) -> Result<(), Error> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::extraction(name, e.to_string()))?;
    }
    replace_symlink(target, name)?;

    let mut out = File::create(target).map_err(|e| Error::extraction(name, e.to_string()))?;
    io::copy(reader, &mut out).map_err(|e| Error::extraction(name, e.to_string()))?;
    drop(out);

    set_mode(target, mode, name)
}

fn create_symlink(relative: &Path, target: &Path, link: &str, name: &str) -> Result<(), Error> {
    let link_path = Path::new(link);
    if link.starts_with('/') || link_path.is_absolute() {
        return Err(Error::extraction(name, "absolute symlink target"));
    }

    let base = relative.parent().unwrap_or_else(|| Path::new(""));
    let resolved = clean(&base.join(link_path));
    if resolved.starts_with("..") {
        return Err(Error::extraction(name, "symlink escapes destination"));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::extraction(name, e.to_string()))?;
    }
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target).map_err(|e| Error::extraction(name, e.to_string()))?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(link_path, target)
            .map_err(|e| Error::extraction(name, e.to_string()))?;
    }
    #[cfg(not(unix))]
    {
        debug!(entry = %name, "skipping symlink on this platform");
    }

    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32, name: &str) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::extraction(name, e.to_string()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32, _name: &str) -> Result<(), Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FixtureEntry, tar_gz, zip_archive};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn write_archive(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn dir_is_empty(path: &Path) -> bool {
        !path.exists() || fs::read_dir(path).unwrap().next().is_none()
    }

    #[test]
    fn extracts_tar_gz_with_nested_dirs() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[
            FixtureEntry::Dir("jdk/"),
            FixtureEntry::File("jdk/bin/java", b"#!/bin/sh\n", 0o755),
            FixtureEntry::File("jdk/release", b"JAVA_VERSION=\"21\"", 0o644),
        ]);
        let src = write_archive(&tmp, "jre.tar.gz", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();

        assert_eq!(fs::read(dest.join("jdk/bin/java")).unwrap(), b"#!/bin/sh\n");
        assert!(dest.join("jdk/release").is_file());
    }

    #[test]
    fn tgz_suffix_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[FixtureEntry::File("a.txt", b"a", 0o644)]);
        let src = write_archive(&tmp, "bundle.TGZ", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();
        assert!(dest.join("a.txt").is_file());
    }

    #[test]
    fn extracts_zip() {
        let tmp = TempDir::new().unwrap();
        let archive = zip_archive(&[
            FixtureEntry::Dir("jdk/"),
            FixtureEntry::File("jdk/bin/java.exe", b"MZ", 0o644),
        ]);
        let src = write_archive(&tmp, "jre.zip", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();
        assert_eq!(fs::read(dest.join("jdk/bin/java.exe")).unwrap(), b"MZ");
    }

    #[test]
    fn unknown_suffix_fails_before_reading() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");

        let err = extract_archive(&tmp.path().join("jre.rar"), &dest).unwrap_err();
        assert!(err.to_string().contains("unsupported archive format"));
        assert!(!dest.exists());
    }

    #[test]
    fn parent_traversal_in_tar_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[FixtureEntry::File("../evil.sh", b"boom", 0o755)]);
        let src = write_archive(&tmp, "evil.tar.gz", &archive);
        let dest = tmp.path().join("out");

        let err = extract_archive(&src, &dest).unwrap_err();
        assert!(matches!(err, Error::Extraction { entry: Some(ref e), .. } if e == "../evil.sh"));
        assert!(!tmp.path().join("evil.sh").exists());
        assert!(dir_is_empty(&dest));
    }

    #[test]
    fn nested_traversal_in_tar_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[FixtureEntry::File("jdk/../../evil.sh", b"boom", 0o644)]);
        let src = write_archive(&tmp, "evil.tar.gz", &archive);
        let dest = tmp.path().join("out");

        assert!(extract_archive(&src, &dest).is_err());
        assert!(!tmp.path().join("evil.sh").exists());
    }

    #[test]
    fn absolute_name_in_tar_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[FixtureEntry::File("/tmp/evil.sh", b"boom", 0o644)]);
        let src = write_archive(&tmp, "evil.tar.gz", &archive);
        let dest = tmp.path().join("out");

        let err = extract_archive(&src, &dest).unwrap_err();
        assert!(err.to_string().contains("absolute path"));
        assert!(dir_is_empty(&dest));
    }

    #[test]
    fn traversal_in_zip_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = zip_archive(&[FixtureEntry::File("../evil.txt", b"boom", 0o644)]);
        let src = write_archive(&tmp, "evil.zip", &archive);
        let dest = tmp.path().join("out");

        assert!(extract_archive(&src, &dest).is_err());
        assert!(!tmp.path().join("evil.txt").exists());
        assert!(dir_is_empty(&dest));
    }

    #[test]
    fn absolute_symlink_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[FixtureEntry::Symlink("jdk/passwd", "/etc/passwd")]);
        let src = write_archive(&tmp, "evil.tar.gz", &archive);

        let err = extract_archive(&src, &tmp.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("absolute symlink"));
    }

    #[test]
    fn escaping_symlink_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[FixtureEntry::Symlink("jdk/up", "../../outside")]);
        let src = write_archive(&tmp, "evil.tar.gz", &archive);

        let err = extract_archive(&src, &tmp.path().join("out")).unwrap_err();
        assert!(err.to_string().contains("symlink escapes"));
    }

    #[cfg(unix)]
    #[test]
    fn relative_symlink_inside_dest_is_created() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[
            FixtureEntry::File("jdk/lib/libjvm.so", b"elf", 0o644),
            FixtureEntry::Symlink("jdk/bin/libjvm.so", "../lib/libjvm.so"),
        ]);
        let src = write_archive(&tmp, "jre.tar.gz", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();

        let link = dest.join("jdk/bin/libjvm.so");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&link).unwrap(), b"elf");
    }

    #[cfg(unix)]
    #[test]
    fn chained_symlinks_cannot_carry_a_file_out() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[
            FixtureEntry::Symlink("a", "."),
            FixtureEntry::Symlink("a/b", ".."),
            FixtureEntry::File("a/b/evil.sh", b"boom", 0o755),
        ]);
        let src = write_archive(&tmp, "evil.tar.gz", &archive);
        let dest = tmp.path().join("out");

        let err = extract_archive(&src, &dest).unwrap_err();

        assert!(err.to_string().contains("through a symlink"));
        assert!(!tmp.path().join("evil.sh").exists());
        assert!(!tmp.path().join("b").exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_entry_replaces_a_symlink_instead_of_following_it() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[
            FixtureEntry::Symlink("a", "."),
            FixtureEntry::Symlink("c", "a/../evil.sh"),
            FixtureEntry::File("c", b"plain", 0o644),
        ]);
        let src = write_archive(&tmp, "jre.tar.gz", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();

        assert!(!tmp.path().join("evil.sh").exists());
        let written = dest.join("c");
        assert!(fs::symlink_metadata(&written).unwrap().is_file());
        assert_eq!(fs::read(&written).unwrap(), b"plain");
    }

    #[test]
    fn special_entries_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[
            FixtureEntry::Fifo("jdk/pipe"),
            FixtureEntry::File("jdk/release", b"x", 0o644),
        ]);
        let src = write_archive(&tmp, "jre.tar.gz", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();
        assert!(!dest.join("jdk/pipe").exists());
        assert!(dest.join("jdk/release").exists());
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_widens_to_0755() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let archive = tar_gz(&[
            FixtureEntry::File("bin/java", b"x", 0o700),
            FixtureEntry::File("bin/suid", b"x", 0o4711),
            FixtureEntry::File("lib/data", b"x", 0o600),
            FixtureEntry::File("lib/zero", b"x", 0),
        ]);
        let src = write_archive(&tmp, "jre.tar.gz", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();

        let mode = |p: &str| fs::metadata(dest.join(p)).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode("bin/java"), 0o755);
        assert_eq!(mode("bin/suid"), 0o755);
        assert_eq!(mode("lib/data"), 0o600);
        assert_eq!(mode("lib/zero"), 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn zip_unix_mode_is_honoured() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let archive = zip_archive(&[FixtureEntry::File("bin/java", b"x", 0o744)]);
        let src = write_archive(&tmp, "jre.zip", &archive);
        let dest = tmp.path().join("out");

        extract_archive(&src, &dest).unwrap();

        let mode = fs::metadata(dest.join("bin/java")).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn mode_normalization() {
        assert_eq!(normalize_mode(0), 0o644);
        assert_eq!(normalize_mode(0o100), 0o755);
        assert_eq!(normalize_mode(0o777), 0o777);
        assert_eq!(normalize_mode(0o640), 0o640);
        assert_eq!(normalize_mode(0o104755), 0o755);
    }

    #[test]
    fn dot_entries_map_to_dest() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        let (relative, target) = safe_join(&dest, "./").unwrap();
        assert_eq!(relative, PathBuf::from("."));
        assert_eq!(target, dest);
    }

    proptest! {
        #[test]
        fn safe_join_never_leaves_dest(
            parts in prop::collection::vec("[a-z]{1,3}|\\.|\\.\\.", 0..8),
            rooted in any::<bool>(),
            backslashes in any::<bool>(),
        ) {
            let sep = if backslashes { "\\" } else { "/" };
            let mut name = parts.join(sep);
            if rooted {
                name.insert(0, '/');
            }
            let dest = Path::new("/staging/out");

            if let Ok((relative, target)) = safe_join(dest, &name) {
                prop_assert!(!relative.starts_with(".."));
                prop_assert!(target.starts_with(dest));
                prop_assert!(!rooted);
            }
        }
    }
}
