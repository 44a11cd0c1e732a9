//! Update command implementation.

use console::style;

use relay_core::{Error, Plan, UpdatePlan, resolve_update};
use relay_io::read_marker;

use super::Context;

pub async fn run(ctx: &Context, force: bool) -> Result<(), Error> {
    let installed = read_marker(&ctx.paths.install_dir)?;
    let plan = resolve_update(&ctx.config, &ctx.paths, installed.as_deref())?;

    if !should_update(&plan, force) {
        ctx.print_plan(&Plan::Update(plan.clone()))?;
        ctx.status(format_up_to_date_message(&plan.current_version));
        return Ok(());
    }

    ctx.status(format_updating_message(&plan));
    ctx.execute(&Plan::Update(plan)).await?;

    if !ctx.dry_run && !ctx.json {
        println!("    {} Update complete", style("✓").green());
    }
    Ok(())
}

/// `--force` downloads even when the installed version is current.
pub(crate) fn should_update(plan: &UpdatePlan, force: bool) -> bool {
    force || plan.is_required()
}

pub(crate) fn format_up_to_date_message(current: &str) -> String {
    format!("Already at the configured version: {current}")
}

pub(crate) fn format_updating_message(plan: &UpdatePlan) -> String {
    format!(
        "Updating {} from {} to {}...",
        plan.product.display_name(),
        plan.current_version,
        plan.target_version
    )
}
