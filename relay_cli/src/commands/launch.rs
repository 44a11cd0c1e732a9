//! Launch command implementation.

use relay_core::{Error, LaunchPlan, Plan, resolve_launch};

use super::Context;

pub async fn run(ctx: &Context) -> Result<(), Error> {
    let plan = resolve_launch(&ctx.config, &ctx.paths)?;
    ctx.status(format_launching_message(&plan));

    ctx.execute(&Plan::Launch(plan)).await?;
    Ok(())
}

pub(crate) fn format_launching_message(plan: &LaunchPlan) -> String {
    format!(
        "Launching {} ({} java, {}+)...",
        plan.product.display_name(),
        plan.runtime.strategy,
        plan.runtime.min_version
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::paths::{HostEnv, Layout, PathHints, resolve};
    use relay_core::{Config, JavaStrategy, Os};

    #[test]
    fn test_launching_message_names_strategy() {
        let hints = PathHints {
            install: "/opt/app".to_string(),
            ..Default::default()
        };
        let paths = resolve(Layout::Portable, &Os::Linux, &hints, &HostEnv::default()).unwrap();
        let mut config = Config::default();
        config.runtime.java.strategy = JavaStrategy::Bundled;

        let plan = resolve_launch(&config, &paths).unwrap();
        assert_eq!(
            format_launching_message(&plan),
            "Launching Burp Suite (bundled java, 17+)..."
        );
    }
}
