//! Plan builder
//!
//! Pure functions from configuration and resolved paths to plans. Anything
//! that needs the filesystem (the installed version, whether a runtime must be
//! fetched) is decided by the caller and passed in.

use crate::config::Config;
use crate::errors::Error;
use crate::paths::ResolvedPaths;
use crate::plan::{
    Artifact, InstallPlan, LaunchPlan, RemovePlan, RuntimeArtifact, RuntimeRequirements,
    UpdatePlan,
};
use crate::product::Product;

fn runtime_requirements(cfg: &Config) -> RuntimeRequirements {
    RuntimeRequirements {
        min_version: cfg.runtime.java.min_version,
        jvm_args: cfg.runtime.java.jvm_args.clone(),
        strategy: cfg.runtime.java.strategy,
    }
}

fn product_artifact(product: Product, cfg: &Config, paths: &ResolvedPaths) -> Artifact {
    Artifact {
        name: product.jar_name().to_string(),
        url: product.download_url(&cfg.product.edition, &cfg.product.version),
        target: product.jar_path(&paths.install_dir),
        checksum: None,
    }
}

pub fn resolve_install(
    cfg: &Config,
    paths: &ResolvedPaths,
    runtime: Option<RuntimeArtifact>,
) -> Result<InstallPlan, Error> {
    let product = Product::from_name(&cfg.product.name)?;

    Ok(InstallPlan {
        product,
        edition: cfg.product.edition.clone(),
        version: cfg.product.version.clone(),
        paths: paths.clone(),
        runtime: runtime_requirements(cfg),
        artifact: product_artifact(product, cfg, paths),
        runtime_artifact: runtime,
    })
}

pub fn resolve_launch(cfg: &Config, paths: &ResolvedPaths) -> Result<LaunchPlan, Error> {
    let product = Product::from_name(&cfg.product.name)?;

    Ok(LaunchPlan {
        product,
        version: cfg.product.version.clone(),
        paths: paths.clone(),
        runtime: runtime_requirements(cfg),
        jar: product.jar_path(&paths.install_dir),
    })
}

/// Plan an update from `installed` (the version marker contents) to the
/// configured version.
pub fn resolve_update(
    cfg: &Config,
    paths: &ResolvedPaths,
    installed: Option<&str>,
) -> Result<UpdatePlan, Error> {
    let product = Product::from_name(&cfg.product.name)?;
    let current = installed.ok_or_else(|| Error::NoInstallation {
        install_dir: paths.install_dir.clone(),
    })?;

    Ok(UpdatePlan {
        product,
        edition: cfg.product.edition.clone(),
        current_version: current.trim().to_string(),
        target_version: cfg.product.version.trim().to_string(),
        paths: paths.clone(),
        runtime: runtime_requirements(cfg),
        artifact: product_artifact(product, cfg, paths),
    })
}

pub fn resolve_remove(cfg: &Config, paths: &ResolvedPaths) -> Result<RemovePlan, Error> {
    let product = Product::from_name(&cfg.product.name)?;

    Ok(RemovePlan {
        product,
        paths: paths.clone(),
        runtime: runtime_requirements(cfg),
    })
}
