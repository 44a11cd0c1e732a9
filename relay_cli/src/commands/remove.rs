//! Remove command implementation.

use console::style;
use std::path::Path;

use relay_core::{Error, Plan, RemovePlan, resolve_remove};

use super::Context;

pub async fn run(ctx: &Context) -> Result<(), Error> {
    let plan = resolve_remove(&ctx.config, &ctx.paths)?;
    ctx.status(format_removing_message(&plan));

    let config_dir = plan.paths.config_dir.clone();
    ctx.execute(&Plan::Remove(plan)).await?;

    if !ctx.dry_run && !ctx.json {
        println!(
            "    {} {}",
            style("→").dim(),
            format_config_kept_message(&config_dir)
        );
    }
    Ok(())
}

pub(crate) fn format_removing_message(plan: &RemovePlan) -> String {
    format!("Removing {}...", plan.product.display_name())
}

pub(crate) fn format_config_kept_message(config_dir: &Path) -> String {
    format!("Configuration kept in {}", config_dir.display())
}
