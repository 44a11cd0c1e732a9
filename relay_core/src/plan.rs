//! Immutable execution plans.
//!
//! A plan holds everything the executor needs; nothing is looked up again at
//! execution time except what can only be known then (which Java is on PATH,
//! whether the JAR is present).

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::paths::ResolvedPaths;
use crate::product::Product;
use crate::runtime::JavaStrategy;
use crate::version::needs_update;

/// A file to download to a final location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub url: String,
    pub target: PathBuf,
    /// Expected lowercase hex SHA-256 of the body.
    pub checksum: Option<String>,
}

/// A runtime archive plus the directory it is installed into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuntimeArtifact {
    pub artifact: Artifact,
    pub extract_to: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuntimeRequirements {
    pub min_version: u32,
    pub jvm_args: Vec<String>,
    pub strategy: JavaStrategy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InstallPlan {
    pub product: Product,
    pub edition: String,
    pub version: String,
    pub paths: ResolvedPaths,
    pub runtime: RuntimeRequirements,
    pub artifact: Artifact,
    pub runtime_artifact: Option<RuntimeArtifact>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    pub product: Product,
    pub version: String,
    pub paths: ResolvedPaths,
    pub runtime: RuntimeRequirements,
    /// The application JAR the launcher runs.
    pub jar: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdatePlan {
    pub product: Product,
    pub edition: String,
    pub current_version: String,
    pub target_version: String,
    pub paths: ResolvedPaths,
    pub runtime: RuntimeRequirements,
    pub artifact: Artifact,
}

impl UpdatePlan {
    pub fn is_required(&self) -> bool {
        needs_update(&self.current_version, &self.target_version)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemovePlan {
    pub product: Product,
    pub paths: ResolvedPaths,
    pub runtime: RuntimeRequirements,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Plan {
    Install(InstallPlan),
    Launch(LaunchPlan),
    Update(UpdatePlan),
    Remove(RemovePlan),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Install,
    Launch,
    Update,
    Remove,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanKind::Install => "install",
            PlanKind::Launch => "launch",
            PlanKind::Update => "update",
            PlanKind::Remove => "remove",
        })
    }
}

impl Plan {
    pub fn kind(&self) -> PlanKind {
        match self {
            Plan::Install(_) => PlanKind::Install,
            Plan::Launch(_) => PlanKind::Launch,
            Plan::Update(_) => PlanKind::Update,
            Plan::Remove(_) => PlanKind::Remove,
        }
    }

    pub fn product(&self) -> Product {
        match self {
            Plan::Install(p) => p.product,
            Plan::Launch(p) => p.product,
            Plan::Update(p) => p.product,
            Plan::Remove(p) => p.product,
        }
    }

    pub fn paths(&self) -> &ResolvedPaths {
        match self {
            Plan::Install(p) => &p.paths,
            Plan::Launch(p) => &p.paths,
            Plan::Update(p) => &p.paths,
            Plan::Remove(p) => &p.paths,
        }
    }
}
