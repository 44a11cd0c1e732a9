pub mod config_file;
pub mod download;
pub mod executor;
pub mod extract;
pub mod java;
pub mod launcher;
pub mod marker;
pub mod process;
pub mod progress;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use download::Downloader;
pub use executor::{Action, ExecutionReport, Executor};
pub use extract::{ArchiveFormat, extract_archive};
pub use java::{CommandJavaProbe, JavaProbe, RuntimeResolver, SystemJava};
pub use launcher::{LaunchSpec, LauncherGenerator, PowerShellLauncher, ShellLauncher};
pub use marker::{read_marker, write_marker};
pub use process::{DetachedSpawner, ProcessSpawner};
pub use progress::{ProgressCallback, ProgressEvent};
