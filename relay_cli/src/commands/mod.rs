//! Command implementations for the relay CLI.
//!
//! Each submodule turns one subcommand into a plan and hands it to the
//! executor through [`Context::execute`].

pub mod install;
pub mod launch;
pub mod remove;
pub mod update;

use console::style;
use indicatif::MultiProgress;
use std::fmt::Display;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use relay_core::{Config, Error, Plan, Platform, ResolvedPaths};
use relay_io::{
    CommandJavaProbe, DetachedSpawner, Downloader, ExecutionReport, Executor, RuntimeResolver,
};

use crate::display::{
    ProgressStyles, create_progress_callback, finish_progress_bars, print_report,
};

/// Everything a command needs, resolved once in `main`.
pub struct Context {
    pub config: Config,
    pub paths: ResolvedPaths,
    pub platform: Platform,
    pub dry_run: bool,
    pub json: bool,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn runtime_resolver(&self) -> RuntimeResolver {
        RuntimeResolver::new(self.platform.os.clone(), Arc::new(CommandJavaProbe::new()))
            .with_minimum_version(self.config.runtime.java.min_version)
    }

    fn executor(&self) -> Executor {
        Executor::new(
            Downloader::from_config(&self.config.network),
            Arc::new(CommandJavaProbe::new()),
            Arc::new(DetachedSpawner),
            self.platform.os.clone(),
        )
        .with_dry_run(self.dry_run)
    }

    /// Print a `==>` status line. Suppressed in JSON mode so stdout stays
    /// machine-readable.
    pub fn status(&self, message: impl Display) {
        if !self.json {
            println!("{} {}", style("==>").cyan().bold(), message);
        }
    }

    /// Print `plan` as JSON when `--json` was given.
    pub fn print_plan(&self, plan: &Plan) -> Result<(), Error> {
        if self.json {
            println!("{}", plan_json(plan)?);
        }
        Ok(())
    }

    /// Run `plan`, with progress bars for downloads on a real run.
    pub async fn execute(&self, plan: &Plan) -> Result<ExecutionReport, Error> {
        self.print_plan(plan)?;

        let mut executor = self.executor();
        let bars = if self.json || self.dry_run {
            None
        } else {
            let (callback, bars) =
                create_progress_callback(MultiProgress::new(), ProgressStyles::default());
            executor = executor.with_progress(callback);
            Some(bars)
        };

        let result = executor.execute(plan, &self.cancel).await;
        if let Some(bars) = &bars {
            finish_progress_bars(bars);
        }

        let report = result?;
        if !self.json {
            print_report(&report);
        }
        Ok(report)
    }
}

pub(crate) fn plan_json(plan: &Plan) -> Result<String, Error> {
    serde_json::to_string_pretty(plan).map_err(|e| Error::PlanResolution {
        message: format!("failed to serialize plan: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::paths::{HostEnv, Layout, PathHints, resolve};
    use relay_core::{Os, resolve_remove};

    #[test]
    fn test_plan_json_is_tagged_by_kind() {
        let hints = PathHints {
            install: "/opt/app".to_string(),
            ..Default::default()
        };
        let paths = resolve(Layout::Portable, &Os::Linux, &hints, &HostEnv::default()).unwrap();
        let plan = resolve_remove(&Config::default(), &paths).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&plan_json(&Plan::Remove(plan)).unwrap()).unwrap();
        assert_eq!(json["kind"], "remove");
        assert_eq!(json["paths"]["config_dir"], "/opt/app/config");
    }
}
