use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    PathResolution {
        message: String,
    },
    Config {
        message: String,
    },
    Download {
        url: String,
        message: String,
    },
    ChecksumMismatch {
        expected: String,
        actual: String,
        file_name: Option<String>,
    },
    Extraction {
        entry: Option<String>,
        message: String,
    },
    RuntimeResolution {
        message: String,
    },
    JavaVersionParse {
        output: String,
    },
    UnsupportedPlatform {
        os: String,
        arch: String,
    },
    PlanResolution {
        message: String,
    },
    NoInstallation {
        install_dir: PathBuf,
    },
    NotInstalled {
        product: String,
        path: PathBuf,
    },
    Filesystem {
        path: PathBuf,
        message: String,
    },
    Launch {
        message: String,
    },
    Cancelled,
    /// A lower-level failure tagged with the plan step it happened in.
    Step {
        step: String,
        source: Box<Error>,
    },
}

impl Error {
    pub fn filesystem(path: &Path, err: io::Error) -> Self {
        Error::Filesystem {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn extraction(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Extraction {
            entry: Some(entry.into()),
            message: message.into(),
        }
    }

    /// Wrap this error with the name of the step that produced it.
    pub fn in_step(self, step: impl Into<String>) -> Self {
        Error::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all step wrappers removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PathResolution { message } => {
                write!(
                    f,
                    "cannot resolve paths: {}\n  hint: check layout.mode and paths.* in your config",
                    message
                )
            }
            Error::Config { message } => {
                write!(f, "invalid configuration: {}", message)
            }
            Error::Download { url, message } => {
                write!(
                    f,
                    "download of '{}' failed: {}\n  hint: check your internet connection and try again",
                    url, message
                )
            }
            Error::ChecksumMismatch {
                expected,
                actual,
                file_name,
            } => {
                write!(f, "checksum verification failed")?;
                if let Some(name) = file_name {
                    write!(f, " for '{}'", name)?;
                }
                write!(f, "\n  expected: {}\n  got:      {}", expected, actual)
            }
            Error::Extraction { entry, message } => {
                write!(f, "archive extraction failed")?;
                if let Some(entry) = entry {
                    write!(f, " at entry '{}'", entry)?;
                }
                write!(f, ": {}", message)
            }
            Error::RuntimeResolution { message } => {
                write!(
                    f,
                    "no usable Java runtime: {}\n  hint: install Java or run 'relay install' to fetch a bundled runtime",
                    message
                )
            }
            Error::JavaVersionParse { output } => {
                let first_line = output.lines().next().unwrap_or("").trim();
                if first_line.is_empty() {
                    write!(f, "unable to parse java version (empty output)")
                } else {
                    write!(f, "unable to parse java version from '{}'", first_line)
                }
            }
            Error::UnsupportedPlatform { os, arch } => {
                write!(
                    f,
                    "no managed Java runtime is available for {}/{}\n  hint: install Java manually and set runtime.java.strategy to 'system'",
                    os, arch
                )
            }
            Error::PlanResolution { message } => {
                write!(f, "cannot plan operation: {}", message)
            }
            Error::NoInstallation { install_dir } => {
                write!(
                    f,
                    "no installation found in '{}'\n  hint: run 'relay install' first",
                    install_dir.to_string_lossy()
                )
            }
            Error::NotInstalled { product, path } => {
                write!(
                    f,
                    "{} is not installed ('{}' is missing)\n  hint: run 'relay install' first",
                    product,
                    path.to_string_lossy()
                )
            }
            Error::Filesystem { path, message } => {
                write!(f, "'{}': {}", path.to_string_lossy(), message)
            }
            Error::Launch { message } => {
                write!(f, "launch failed: {}", message)
            }
            Error::Cancelled => write!(f, "operation cancelled"),
            Error::Step { step, source } => write!(f, "{}: {}", step, source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Step { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
