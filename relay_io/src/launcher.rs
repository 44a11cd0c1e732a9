//! Launcher script generation.
//!
//! A launcher is a small script in the bin directory that runs the product
//! JAR with the resolved Java and the configured JVM arguments. It is
//! rewritten on every launch so it always points at the current runtime.

use std::fs;
use std::path::{Path, PathBuf};

use relay_core::{Error, Os};

/// Everything a launcher script needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchSpec {
    pub java: PathBuf,
    pub jvm_args: Vec<String>,
    pub jar: PathBuf,
}

pub trait LauncherGenerator: Send + Sync {
    /// Where the launcher is written.
    fn path(&self) -> PathBuf;

    /// Script contents for `spec`.
    fn render(&self, spec: &LaunchSpec) -> String;

    /// Write the launcher and return its path.
    fn generate(&self, spec: &LaunchSpec) -> Result<PathBuf, Error> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }
        fs::write(&path, self.render(spec)).map_err(|e| Error::filesystem(&path, e))?;
        make_executable(&path)?;
        Ok(path)
    }
}

/// POSIX shell launcher for Linux and macOS.
pub struct ShellLauncher {
    bin_dir: PathBuf,
    name: String,
}

impl ShellLauncher {
    pub fn new(bin_dir: &Path, name: &str) -> Self {
        Self {
            bin_dir: bin_dir.to_path_buf(),
            name: name.to_string(),
        }
    }
}

impl LauncherGenerator for ShellLauncher {
    fn path(&self) -> PathBuf {
        self.bin_dir.join(&self.name)
    }

    fn render(&self, spec: &LaunchSpec) -> String {
        let mut line = format!("exec {}", sh_quote(&spec.java.to_string_lossy()));
        for arg in &spec.jvm_args {
            line.push(' ');
            line.push_str(&sh_quote(arg));
        }
        line.push_str(" -jar ");
        line.push_str(&sh_quote(&spec.jar.to_string_lossy()));
        line.push_str(" \"$@\"");

        format!("#!/bin/sh\n{line}\n")
    }
}

/// PowerShell launcher for Windows.
pub struct PowerShellLauncher {
    bin_dir: PathBuf,
    name: String,
}

impl PowerShellLauncher {
    pub fn new(bin_dir: &Path, name: &str) -> Self {
        Self {
            bin_dir: bin_dir.to_path_buf(),
            name: name.to_string(),
        }
    }
}

impl LauncherGenerator for PowerShellLauncher {
    fn path(&self) -> PathBuf {
        self.bin_dir.join(format!("{}.ps1", self.name))
    }

    fn render(&self, spec: &LaunchSpec) -> String {
        let mut line = format!("& {}", ps_quote(&spec.java.to_string_lossy()));
        for arg in &spec.jvm_args {
            line.push(' ');
            line.push_str(&ps_quote(arg));
        }
        line.push_str(" -jar ");
        line.push_str(&ps_quote(&spec.jar.to_string_lossy()));
        line.push_str(" @args");

        format!("{line}\r\n")
    }
}

/// Pick the launcher flavour for `os`.
pub fn for_platform(
    os: &Os,
    bin_dir: &Path,
    name: &str,
) -> Result<Box<dyn LauncherGenerator>, Error> {
    match os {
        Os::Linux | Os::Darwin => Ok(Box::new(ShellLauncher::new(bin_dir, name))),
        Os::Windows => Ok(Box::new(PowerShellLauncher::new(bin_dir, name))),
        Os::Other(other) => Err(Error::Launch {
            message: format!("no launcher flavour for OS '{other}'"),
        }),
    }
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::filesystem(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), Error> {
    Ok(())
}
