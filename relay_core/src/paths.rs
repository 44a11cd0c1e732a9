//! Filesystem layout resolution
//!
//! Turns a layout mode, an OS and optional hints into the five directories
//! relay works with, and decides which of them a removal may delete.
//!
//! - `System` follows per-OS user conventions; nothing needs elevated rights
//!   because the launcher directory sits inside the install root.
//! - `Portable` roots everything under one caller-supplied directory.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::platform::Os;

/// Directory name used under every per-user base directory.
pub const APP_DIR_NAME: &str = "relay";

/// Sentinel hint value meaning "pick the default location".
pub const AUTO: &str = "auto";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    System,
    Portable,
}

/// Optional user overrides, as written in the config file (`auto` or empty
/// means no override).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathHints {
    pub install: String,
    pub data: String,
    pub bin: String,
}

/// Host facts path resolution needs, captured once per invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostEnv {
    pub home: Option<PathBuf>,
    /// `%APPDATA%` on Windows.
    pub app_data: Option<PathBuf>,
}

impl HostEnv {
    pub fn capture() -> Self {
        let app_data = std::env::var_os("APPDATA")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            home: dirs::home_dir(),
            app_data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedPaths {
    pub layout: Layout,
    pub install_dir: PathBuf,
    pub data_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl ResolvedPaths {
    /// Whether the bin directory belongs to this installation alone.
    pub fn bin_is_private(&self) -> bool {
        self.layout == Layout::Portable || self.bin_dir.starts_with(&self.install_dir)
    }

    /// Directories a removal may delete, in deletion order.
    ///
    /// The config directory is never included; the comparison is by exact
    /// path, so a config dir nested inside an owned dir must be protected by
    /// the caller while deleting.
    pub fn owned(&self) -> Vec<PathBuf> {
        let mut candidates = vec![
            self.install_dir.clone(),
            self.data_dir.clone(),
            self.cache_dir.clone(),
        ];
        if self.bin_is_private() {
            candidates.push(self.bin_dir.clone());
        }

        let mut owned: Vec<PathBuf> = Vec::with_capacity(candidates.len());
        for dir in candidates {
            if dir != self.config_dir && !owned.contains(&dir) {
                owned.push(dir);
            }
        }
        owned
    }

    /// Directories install creates. Config is left to the user.
    pub fn managed_dirs(&self) -> [&Path; 4] {
        [
            &self.install_dir,
            &self.data_dir,
            &self.bin_dir,
            &self.cache_dir,
        ]
    }
}

/// Resolve concrete directories for a layout on the given OS.
pub fn resolve(
    layout: Layout,
    os: &Os,
    hints: &PathHints,
    env: &HostEnv,
) -> Result<ResolvedPaths, Error> {
    match layout {
        Layout::System => resolve_system(os, hints, env),
        Layout::Portable => resolve_portable(hints),
    }
}

fn resolve_system(os: &Os, hints: &PathHints, env: &HostEnv) -> Result<ResolvedPaths, Error> {
    let home = env.home.as_deref().ok_or_else(|| Error::PathResolution {
        message: "cannot determine the home directory".to_string(),
    })?;

    let (default_install, config_dir, cache_dir) = match os {
        Os::Linux => (
            home.join(".local").join("share").join(APP_DIR_NAME),
            home.join(".config").join(APP_DIR_NAME),
            home.join(".cache").join(APP_DIR_NAME),
        ),
        Os::Darwin => {
            let support = home
                .join("Library")
                .join("Application Support")
                .join(APP_DIR_NAME);
            (
                support.clone(),
                support.join("config"),
                home.join("Library").join("Caches").join(APP_DIR_NAME),
            )
        }
        Os::Windows => {
            let app_data = env.app_data.as_deref().ok_or_else(|| Error::PathResolution {
                message: "APPDATA is not set".to_string(),
            })?;
            let roaming = app_data.join(APP_DIR_NAME);
            (
                home.join("AppData").join("Local").join(APP_DIR_NAME),
                roaming.clone(),
                roaming.join("cache"),
            )
        }
        Os::Other(name) => {
            return Err(Error::PathResolution {
                message: format!("unsupported OS: {name}"),
            });
        }
    };

    let install_dir = explicit_hint("paths.install", &hints.install)?.unwrap_or(default_install);
    let data_dir =
        explicit_hint("paths.data", &hints.data)?.unwrap_or_else(|| install_dir.join("data"));
    let bin_dir =
        explicit_hint("paths.bin", &hints.bin)?.unwrap_or_else(|| install_dir.join("bin"));

    Ok(ResolvedPaths {
        layout: Layout::System,
        install_dir: clean(&install_dir),
        data_dir: clean(&data_dir),
        bin_dir: clean(&bin_dir),
        config_dir: clean(&config_dir),
        cache_dir: clean(&cache_dir),
    })
}

fn resolve_portable(hints: &PathHints) -> Result<ResolvedPaths, Error> {
    let root = explicit_hint("paths.install", &hints.install)?.ok_or_else(|| {
        Error::PathResolution {
            message: "portable layout requires an explicit install path".to_string(),
        }
    })?;

    Ok(ResolvedPaths {
        layout: Layout::Portable,
        data_dir: root.join("data"),
        bin_dir: root.join("bin"),
        config_dir: root.join("config"),
        cache_dir: root.join("cache"),
        install_dir: root,
    })
}

/// Interpret a config hint: `None` for empty/`auto`, a cleaned absolute path
/// otherwise.
fn explicit_hint(key: &str, hint: &str) -> Result<Option<PathBuf>, Error> {
    let hint = hint.trim();
    if hint.is_empty() || hint == AUTO {
        return Ok(None);
    }

    let path = Path::new(hint);
    if !path.is_absolute() {
        return Err(Error::PathResolution {
            message: format!("{key} must be an absolute path, got '{hint}'"),
        });
    }

    Ok(Some(clean(path)))
}

/// Lexically clean a path: drop `.` components, fold `name/..` pairs and
/// never climb above the root. A relative path keeps any leading `..`.
///
/// Returns `.` for a path that cleans to nothing.
pub fn clean(path: &Path) -> PathBuf {
    let mut root = PathBuf::new();
    let mut rooted = false;
    let mut leading_parents = 0usize;
    let mut names: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => root.push(prefix.as_os_str()),
            Component::RootDir => {
                root.push(component.as_os_str());
                rooted = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if names.pop().is_none() && !rooted {
                    leading_parents += 1;
                }
            }
            Component::Normal(name) => names.push(name.to_os_string()),
        }
    }

    let mut cleaned = root;
    for _ in 0..leading_parents {
        cleaned.push("..");
    }
    for name in names {
        cleaned.push(name);
    }

    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}
