//! Install command implementation.

use console::style;
use std::time::Instant;

use relay_core::{
    Error, InstallPlan, Plan, RuntimePin, build_managed_runtime_artifact, resolve_install,
};

use super::Context;
use crate::display::confirm;

/// Run the install command.
pub async fn run(ctx: &Context, yes: bool) -> Result<(), Error> {
    let start = Instant::now();
    let java = &ctx.config.runtime.java;

    let needs_runtime = ctx
        .runtime_resolver()
        .needs_runtime_fetch(&ctx.paths.install_dir, java.strategy);

    let runtime = if needs_runtime {
        if should_prompt(yes, ctx.dry_run)
            && !confirm(&format_runtime_prompt(java.min_version))
        {
            print_manual_java_help(java.min_version);
            return Ok(());
        }
        Some(build_managed_runtime_artifact(
            &ctx.platform,
            &RuntimePin::default(),
            &ctx.paths,
        )?)
    } else {
        None
    };

    let plan = resolve_install(&ctx.config, &ctx.paths, runtime)?;
    ctx.status(format_installing_message(&plan));

    ctx.execute(&Plan::Install(plan)).await?;

    if !ctx.dry_run {
        ctx.status(format_install_complete_message(
            start.elapsed().as_secs_f64(),
        ));
    }
    Ok(())
}

fn print_manual_java_help(min_version: u32) {
    println!();
    println!(
        "Java {}+ is required to run Burp Suite.",
        style(min_version).yellow().bold()
    );
    println!(
        "Install Java manually, then run {} again.",
        style("relay install").cyan()
    );
    println!();
    println!("Installation options:");
    for line in manual_java_options() {
        println!("    • {line}");
    }
}

/// The prompt is skipped with `--yes` and in dry runs.
pub(crate) fn should_prompt(yes: bool, dry_run: bool) -> bool {
    !yes && !dry_run
}

pub(crate) fn format_runtime_prompt(min_version: u32) -> String {
    format!("No Java {min_version}+ runtime found. Download a bundled JRE (~50MB)?")
}

pub(crate) fn manual_java_options() -> [&'static str; 3] {
    [
        "macOS:   brew install openjdk@21",
        "Ubuntu:  apt install openjdk-21-jre",
        "Windows: download from https://adoptium.net",
    ]
}

pub(crate) fn format_installing_message(plan: &InstallPlan) -> String {
    let mut message = format!(
        "Installing {} {} ({})",
        plan.product.display_name(),
        plan.version,
        plan.edition
    );
    if let Some(runtime) = &plan.runtime_artifact {
        message.push_str(&format!(" with bundled runtime {}", runtime.artifact.name));
    }
    message.push_str("...");
    message
}

pub(crate) fn format_install_complete_message(elapsed_secs: f64) -> String {
    format!("Installation complete in {:.2}s", elapsed_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::paths::{HostEnv, Layout, PathHints, resolve};
    use relay_core::{Arch, Config, Os, Platform};

    fn plan(with_runtime: bool) -> InstallPlan {
        let hints = PathHints {
            install: "/opt/app".to_string(),
            ..Default::default()
        };
        let paths = resolve(Layout::Portable, &Os::Linux, &hints, &HostEnv::default()).unwrap();
        let runtime = with_runtime.then(|| {
            build_managed_runtime_artifact(
                &Platform::new(Os::Linux, Arch::X64),
                &RuntimePin::default(),
                &paths,
            )
            .unwrap()
        });
        resolve_install(&Config::default(), &paths, runtime).unwrap()
    }

    #[test]
    fn test_should_prompt() {
        assert!(should_prompt(false, false));
        assert!(!should_prompt(true, false));
        assert!(!should_prompt(false, true));
    }

    #[test]
    fn test_installing_message_without_runtime() {
        assert_eq!(
            format_installing_message(&plan(false)),
            "Installing Burp Suite latest (professional)..."
        );
    }

    #[test]
    fn test_installing_message_mentions_runtime() {
        let message = format_installing_message(&plan(true));
        assert!(message.contains("with bundled runtime"));
        assert!(message.ends_with("..."));
    }

    #[test]
    fn test_runtime_prompt_names_minimum() {
        assert!(format_runtime_prompt(17).contains("Java 17+"));
    }

    #[test]
    fn test_install_complete_message() {
        assert_eq!(
            format_install_complete_message(1.234),
            "Installation complete in 1.23s"
        );
    }
}
