//! Starting the generated launcher without waiting for it.

use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use relay_core::Error;

#[cfg_attr(test, automock)]
pub trait ProcessSpawner: Send + Sync {
    /// Start `launcher` and return its pid. Must not wait for it to exit.
    fn spawn(&self, launcher: &Path) -> Result<u32, Error>;
}

/// Spawns the launcher with inherited stdio and drops the child handle.
///
/// On Unix the child gets its own process group so a Ctrl-C aimed at relay
/// does not reach the application.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedSpawner;

impl DetachedSpawner {
    fn command(launcher: &Path) -> Command {
        let is_powershell = launcher
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ps1"));

        if is_powershell {
            let mut cmd = Command::new("powershell");
            cmd.args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"])
                .arg(launcher);
            cmd
        } else {
            Command::new(launcher)
        }
    }
}

impl ProcessSpawner for DetachedSpawner {
    fn spawn(&self, launcher: &Path) -> Result<u32, Error> {
        let mut cmd = Self::command(launcher);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|e| Error::Launch {
            message: format!("failed to start '{}': {e}", launcher.display()),
        })?;
        let pid = child.id();
        debug!(pid, launcher = %launcher.display(), "launcher started");

        Ok(pid)
    }
}
