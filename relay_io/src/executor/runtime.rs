//! Managed runtime installation
//!
//! The archive is unpacked into a staging directory first. Only when it holds
//! exactly one top-level directory is the old runtime moved aside and the new
//! one renamed into place; if that rename fails the old runtime is put back.
//! Staging and the downloaded archive are removed whether or not the swap
//! succeeds.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relay_core::{Error, RuntimeArtifact};

use super::{Action, ExecutionReport, Executor, RUNTIME_PREVIOUS_DIR, RUNTIME_STAGING_DIR};
use crate::extract::extract_archive;
use crate::progress::ProgressEvent;

impl Executor {
    pub(super) async fn install_runtime(
        &self,
        runtime: &RuntimeArtifact,
        install_dir: &Path,
        cancel: &CancellationToken,
        report: &mut ExecutionReport,
    ) -> Result<(), Error> {
        self.download(&runtime.artifact, cancel, report).await?;

        report.record(Action::ExtractRuntime {
            archive: runtime.artifact.target.clone(),
            dest: runtime.extract_to.clone(),
        });
        if self.dry_run {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(cb) = &self.progress {
            cb(ProgressEvent::UnpackStarted {
                name: runtime.artifact.name.clone(),
            });
        }

        let staging = install_dir.join(RUNTIME_STAGING_DIR);
        let result = stage_and_swap(
            runtime.artifact.target.clone(),
            staging.clone(),
            runtime.extract_to.clone(),
            install_dir.join(RUNTIME_PREVIOUS_DIR),
        )
        .await;

        discard(&staging);
        discard(&runtime.artifact.target);

        if result.is_ok()
            && let Some(cb) = &self.progress
        {
            cb(ProgressEvent::UnpackCompleted {
                name: runtime.artifact.name.clone(),
            });
        }
        result
    }
}

async fn stage_and_swap(
    archive: PathBuf,
    staging: PathBuf,
    dest: PathBuf,
    aside: PathBuf,
) -> Result<(), Error> {
    tokio::task::spawn_blocking(move || {
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| Error::filesystem(&staging, e))?;
        }
        extract_archive(&archive, &staging)?;

        let top = single_top_level_dir(&staging)?;
        debug!(from = %top.display(), to = %dest.display(), "swapping in runtime");
        swap_in(&top, &dest, &aside)
    })
    .await
    .map_err(|e| Error::Extraction {
        entry: None,
        message: format!("extraction task failed: {e}"),
    })?
}

/// Rename `new` to `dest`. An existing `dest` is parked at `aside` and
/// restored if the rename fails, then discarded once it succeeds.
fn swap_in(new: &Path, dest: &Path, aside: &Path) -> Result<(), Error> {
    discard(aside);

    let had_previous = fs::symlink_metadata(dest).is_ok();
    if had_previous {
        fs::rename(dest, aside).map_err(|e| Error::filesystem(dest, e))?;
    } else if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }

    if let Err(e) = fs::rename(new, dest) {
        if had_previous && let Err(restore) = fs::rename(aside, dest) {
            warn!(
                path = %dest.display(),
                error = %restore,
                "failed to restore previous runtime"
            );
        }
        return Err(Error::filesystem(dest, e));
    }

    discard(aside);
    Ok(())
}

/// The only entry of `staging`, which must be a directory.
fn single_top_level_dir(staging: &Path) -> Result<PathBuf, Error> {
    let entries = fs::read_dir(staging)
        .map_err(|e| Error::filesystem(staging, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::filesystem(staging, e))?;

    match entries.as_slice() {
        [only] if only.path().is_dir() => Ok(only.path()),
        _ => Err(Error::Extraction {
            entry: None,
            message: format!(
                "runtime archive must contain exactly one top-level directory, found {} entries",
                entries.len()
            ),
        }),
    }
}

fn discard(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(e) = result
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "failed to clean up");
    }
}
