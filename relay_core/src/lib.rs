pub mod config;
pub mod errors;
pub mod paths;
pub mod plan;
pub mod planner;
pub mod platform;
pub mod product;
pub mod runtime;
pub mod version;

pub use config::{Config, LogLevel};
pub use errors::Error;
pub use paths::{HostEnv, Layout, PathHints, ResolvedPaths};
pub use plan::{
    Artifact, InstallPlan, LaunchPlan, Plan, PlanKind, RemovePlan, RuntimeArtifact,
    RuntimeRequirements, UpdatePlan,
};
pub use planner::{resolve_install, resolve_launch, resolve_remove, resolve_update};
pub use platform::{Arch, Os, Platform};
pub use product::{Product, VERSION_MARKER};
pub use runtime::{
    JavaStrategy, RuntimePin, build_managed_runtime_artifact, managed_java_candidates,
    parse_java_major_version,
};
pub use version::{LATEST, compare_versions, needs_update};
