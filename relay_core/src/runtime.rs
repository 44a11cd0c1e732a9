//! Java runtime facts that need no I/O: strategy, banner parsing, where a
//! managed runtime lives, and which archive to fetch for it.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::paths::ResolvedPaths;
use crate::plan::{Artifact, RuntimeArtifact};
use crate::platform::{Arch, Os, Platform};

/// Directory under the install root holding the managed runtime.
pub const RUNTIME_DIR: &str = "runtime";

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("quoted version pattern is valid"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JavaStrategy {
    /// Only a Java found on PATH.
    System,
    /// Only the managed runtime under the install dir.
    Bundled,
    /// Managed runtime first, then PATH.
    #[default]
    Auto,
}

impl std::fmt::Display for JavaStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            JavaStrategy::System => "system",
            JavaStrategy::Bundled => "bundled",
            JavaStrategy::Auto => "auto",
        })
    }
}

/// Extract the major version from `java -version` output.
///
/// Legacy banners (`"1.8.0_392"`) report the major in the second component.
pub fn parse_java_major_version(banner: &str) -> Result<u32, Error> {
    let parse_err = || Error::JavaVersionParse {
        output: banner.to_string(),
    };

    let version = QUOTED
        .captures(banner)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(parse_err)?;

    let mut parts = version.split(['.', '_', '-', '+']);
    let first = parts.next().unwrap_or("");
    let major = if first == "1" {
        parts.next().unwrap_or("")
    } else {
        first
    };

    major.parse::<u32>().map_err(|_| parse_err())
}

/// Possible java executables of a managed runtime, most specific first.
pub fn managed_java_candidates(os: &Os, install_dir: &Path) -> Vec<PathBuf> {
    let runtime = install_dir.join(RUNTIME_DIR);
    match os {
        Os::Darwin => vec![
            runtime.join("Contents").join("Home").join("bin").join("java"),
            runtime.join("bin").join("java"),
        ],
        Os::Windows => vec![runtime.join("bin").join("java.exe")],
        _ => vec![runtime.join("bin").join("java")],
    }
}

/// The runtime release relay installs when it has to fetch one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimePin {
    pub version: String,
    pub build: String,
    pub major: u32,
    pub base_url: String,
}

impl Default for RuntimePin {
    fn default() -> Self {
        Self {
            version: "21.0.5".to_string(),
            build: "11".to_string(),
            major: 21,
            base_url: "https://github.com/adoptium/temurin21-binaries/releases/download"
                .to_string(),
        }
    }
}

impl RuntimePin {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub fn build_managed_runtime_artifact(
    platform: &Platform,
    pin: &RuntimePin,
    paths: &ResolvedPaths,
) -> Result<RuntimeArtifact, Error> {
    let unsupported = || Error::UnsupportedPlatform {
        os: platform.os.to_string(),
        arch: platform.arch.to_string(),
    };

    let (os_name, ext) = match platform.os {
        Os::Linux => ("linux", ".tar.gz"),
        Os::Darwin => ("mac", ".tar.gz"),
        Os::Windows => ("windows", ".zip"),
        Os::Other(_) => return Err(unsupported()),
    };
    let arch_name = match platform.arch {
        Arch::X64 => "x64",
        Arch::Aarch64 => "aarch64",
        Arch::Other(_) => return Err(unsupported()),
    };

    let file_name = format!(
        "OpenJDK{major}U-jre_{arch_name}_{os_name}_hotspot_{version}_{build}{ext}",
        major = pin.major,
        version = pin.version,
        build = pin.build,
    );
    let url = format!(
        "{}/jdk-{}+{}/{}",
        pin.base_url.trim_end_matches('/'),
        pin.version,
        pin.build,
        file_name
    );

    Ok(RuntimeArtifact {
        artifact: Artifact {
            name: format!("Eclipse Temurin JRE {}", pin.version),
            url,
            target: paths.cache_dir.join(format!("jre-{}{}", pin.version, ext)),
            checksum: None,
        },
        extract_to: paths.install_dir.join(RUNTIME_DIR),
    })
}
