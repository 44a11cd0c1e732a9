//! Plan execution
//!
//! This module handles:
//! - Creating the install layout and fetching artifacts
//! - Staging and swapping in a managed runtime
//! - Writing and starting the launcher
//! - Removing owned directories while keeping user config
//!
//! Every step is recorded as an [`Action`]. In dry-run mode the actions are
//! recorded but not performed; resolution (which Java to use) still runs so
//! a dry run surfaces the same errors a real one would.

mod remove;
mod runtime;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use relay_core::{
    Artifact, Error, InstallPlan, LaunchPlan, Os, Plan, PlanKind, RemovePlan, UpdatePlan,
};

use crate::download::Downloader;
use crate::java::{JavaProbe, RuntimeResolver};
use crate::launcher::{self, LaunchSpec};
use crate::marker::{marker_path, write_marker};
use crate::process::ProcessSpawner;
use crate::progress::{ProgressCallback, ProgressEvent};

/// Scratch directory under the install root used while unpacking a runtime.
pub const RUNTIME_STAGING_DIR: &str = ".runtime-staging";

/// Where the previous runtime waits while a new one is renamed into place.
pub const RUNTIME_PREVIOUS_DIR: &str = ".runtime-previous";

/// One step of a plan, performed or (in dry-run) only described.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateDir { path: PathBuf },
    Download { name: String, url: String, target: PathBuf },
    ExtractRuntime { archive: PathBuf, dest: PathBuf },
    WriteMarker { path: PathBuf, version: String },
    ResolveJava { path: PathBuf },
    GenerateLauncher { path: PathBuf },
    Spawn { launcher: PathBuf, pid: Option<u32> },
    Remove { path: PathBuf },
    RemoveExcept { dir: PathBuf, keep: PathBuf },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateDir { path } => write!(f, "create directory {}", path.display()),
            Action::Download { name, url, target } => {
                write!(f, "download {name} from {url} to {}", target.display())
            }
            Action::ExtractRuntime { archive, dest } => {
                write!(f, "extract {} into {}", archive.display(), dest.display())
            }
            Action::WriteMarker { path, version } => {
                write!(f, "record version {version} in {}", path.display())
            }
            Action::ResolveJava { path } => write!(f, "use java at {}", path.display()),
            Action::GenerateLauncher { path } => write!(f, "write launcher {}", path.display()),
            Action::Spawn { launcher, pid } => match pid {
                Some(pid) => write!(f, "started {} (pid {pid})", launcher.display()),
                None => write!(f, "start {}", launcher.display()),
            },
            Action::Remove { path } => write!(f, "remove {}", path.display()),
            Action::RemoveExcept { dir, keep } => write!(
                f,
                "remove contents of {} except {}",
                dir.display(),
                keep.display()
            ),
        }
    }
}

/// What an execution did, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub kind: PlanKind,
    pub dry_run: bool,
    pub actions: Vec<Action>,
}

impl ExecutionReport {
    fn new(kind: PlanKind, dry_run: bool) -> Self {
        Self {
            kind,
            dry_run,
            actions: Vec::new(),
        }
    }

    fn record(&mut self, action: Action) {
        info!(dry_run = self.dry_run, "{action}");
        self.actions.push(action);
    }
}

pub struct Executor {
    downloader: Downloader,
    probe: Arc<dyn JavaProbe>,
    spawner: Arc<dyn ProcessSpawner>,
    os: Os,
    dry_run: bool,
    progress: Option<Arc<ProgressCallback>>,
}

impl Executor {
    pub fn new(
        downloader: Downloader,
        probe: Arc<dyn JavaProbe>,
        spawner: Arc<dyn ProcessSpawner>,
        os: Os,
    ) -> Self {
        Self {
            downloader,
            probe,
            spawner,
            os,
            dry_run: false,
            progress: None,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub async fn execute(
        &self,
        plan: &Plan,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, Error> {
        let mut report = ExecutionReport::new(plan.kind(), self.dry_run);

        match plan {
            Plan::Install(p) => self.install(p, cancel, &mut report).await?,
            Plan::Launch(p) => self.launch(p, &mut report)?,
            Plan::Update(p) => self.update(p, cancel, &mut report).await?,
            Plan::Remove(p) => self.remove(p, &mut report)?,
        }

        Ok(report)
    }

    async fn install(
        &self,
        plan: &InstallPlan,
        cancel: &CancellationToken,
        report: &mut ExecutionReport,
    ) -> Result<(), Error> {
        for dir in plan.paths.managed_dirs() {
            report.record(Action::CreateDir {
                path: dir.to_path_buf(),
            });
            if !self.dry_run {
                fs::create_dir_all(dir)
                    .map_err(|e| Error::filesystem(dir, e).in_step("create directories"))?;
            }
        }

        if let Some(runtime) = &plan.runtime_artifact {
            self.install_runtime(runtime, &plan.paths.install_dir, cancel, report)
                .await
                .map_err(|e| e.in_step("install runtime"))?;
        }

        self.download(&plan.artifact, cancel, report)
            .await
            .map_err(|e| e.in_step(format!("download {}", plan.artifact.name)))?;

        self.record_version(&plan.paths.install_dir, &plan.version, report)
            .map_err(|e| e.in_step("write version marker"))
    }

    fn launch(&self, plan: &LaunchPlan, report: &mut ExecutionReport) -> Result<(), Error> {
        if !self.dry_run && !plan.jar.is_file() {
            return Err(Error::NotInstalled {
                product: plan.product.display_name().to_string(),
                path: plan.jar.clone(),
            }
            .in_step("check installation"));
        }

        let resolver = RuntimeResolver::new(self.os.clone(), self.probe.clone())
            .with_minimum_version(plan.runtime.min_version);
        let java = resolver
            .resolve_java_path(&plan.paths.install_dir, plan.runtime.strategy)
            .map_err(|e| e.in_step("resolve java"))?;
        report.record(Action::ResolveJava { path: java.clone() });

        let generator =
            launcher::for_platform(&self.os, &plan.paths.bin_dir, plan.product.launcher_name())
                .map_err(|e| e.in_step("generate launcher"))?;
        let launcher_path = generator.path();
        report.record(Action::GenerateLauncher {
            path: launcher_path.clone(),
        });

        if self.dry_run {
            report.record(Action::Spawn {
                launcher: launcher_path,
                pid: None,
            });
            return Ok(());
        }

        let spec = LaunchSpec {
            java,
            jvm_args: plan.runtime.jvm_args.clone(),
            jar: plan.jar.clone(),
        };
        generator
            .generate(&spec)
            .map_err(|e| e.in_step("generate launcher"))?;

        let pid = self
            .spawner
            .spawn(&launcher_path)
            .map_err(|e| e.in_step(format!("start {}", launcher_path.display())))?;
        report.record(Action::Spawn {
            launcher: launcher_path,
            pid: Some(pid),
        });

        Ok(())
    }

    async fn update(
        &self,
        plan: &UpdatePlan,
        cancel: &CancellationToken,
        report: &mut ExecutionReport,
    ) -> Result<(), Error> {
        self.download(&plan.artifact, cancel, report)
            .await
            .map_err(|e| e.in_step(format!("download {}", plan.artifact.name)))?;

        self.record_version(&plan.paths.install_dir, &plan.target_version, report)
            .map_err(|e| e.in_step("write version marker"))
    }

    fn remove(&self, plan: &RemovePlan, report: &mut ExecutionReport) -> Result<(), Error> {
        let paths = &plan.paths;

        if !paths.bin_is_private()
            && let Ok(generator) =
                launcher::for_platform(&self.os, &paths.bin_dir, plan.product.launcher_name())
        {
            let launcher_path = generator.path();
            if launcher_path.exists() {
                report.record(Action::Remove {
                    path: launcher_path.clone(),
                });
                if !self.dry_run {
                    remove::remove_path(&launcher_path)
                        .map_err(|e| e.in_step(format!("remove {}", launcher_path.display())))?;
                }
            }
        }

        for dir in paths.owned() {
            let step = format!("remove {}", dir.display());
            if paths.config_dir.starts_with(&dir) {
                report.record(Action::RemoveExcept {
                    dir: dir.clone(),
                    keep: paths.config_dir.clone(),
                });
                if !self.dry_run {
                    remove::remove_except(&dir, &paths.config_dir)
                        .map_err(|e| e.in_step(step))?;
                }
            } else {
                report.record(Action::Remove { path: dir.clone() });
                if !self.dry_run {
                    remove::remove_path(&dir).map_err(|e| e.in_step(step))?;
                }
            }
        }

        Ok(())
    }

    async fn download(
        &self,
        artifact: &Artifact,
        cancel: &CancellationToken,
        report: &mut ExecutionReport,
    ) -> Result<(), Error> {
        report.record(Action::Download {
            name: artifact.name.clone(),
            url: artifact.url.clone(),
            target: artifact.target.clone(),
        });
        if self.dry_run {
            return Ok(());
        }

        let emit = |event: ProgressEvent| {
            if let Some(cb) = &self.progress {
                cb(event);
            }
        };

        emit(ProgressEvent::DownloadStarted {
            name: artifact.name.clone(),
            total_bytes: None,
        });
        let on_progress = |downloaded: u64, total_bytes: Option<u64>| {
            emit(ProgressEvent::DownloadProgress {
                name: artifact.name.clone(),
                downloaded,
                total_bytes,
            });
        };
        let bytes = self
            .downloader
            .fetch_with_progress(artifact, cancel, &on_progress)
            .await?;
        emit(ProgressEvent::DownloadCompleted {
            name: artifact.name.clone(),
            total_bytes: bytes,
        });

        Ok(())
    }

    fn record_version(
        &self,
        install_dir: &Path,
        version: &str,
        report: &mut ExecutionReport,
    ) -> Result<(), Error> {
        report.record(Action::WriteMarker {
            path: marker_path(install_dir),
            version: version.trim().to_string(),
        });
        if self.dry_run {
            return Ok(());
        }
        write_marker(install_dir, version)
    }
}
