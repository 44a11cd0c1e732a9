//! Java runtime discovery.
//!
//! `RuntimeResolver` decides which `java` a launch uses and whether install
//! has to fetch a managed runtime first:
//!
//! | strategy | java used                     | fetch needed                 |
//! |----------|-------------------------------|------------------------------|
//! | system   | PATH only                     | never                        |
//! | bundled  | managed runtime only          | when managed is missing      |
//! | auto     | managed, then PATH            | when neither is present      |

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use relay_core::runtime::{JavaStrategy, managed_java_candidates, parse_java_major_version};
use relay_core::{Error, Os};

/// A Java found on PATH.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemJava {
    pub path: PathBuf,
    pub major: u32,
    pub banner: String,
}

/// Finds a Java on the host outside relay's control.
#[cfg_attr(test, automock)]
pub trait JavaProbe: Send + Sync {
    fn probe(&self) -> Result<SystemJava, Error>;
}

/// Searches `PATH` and runs `java -version`.
pub struct CommandJavaProbe {
    search_path: Option<OsString>,
    exe_name: &'static str,
}

impl CommandJavaProbe {
    pub fn new() -> Self {
        Self {
            search_path: std::env::var_os("PATH"),
            exe_name: if cfg!(windows) { "java.exe" } else { "java" },
        }
    }

    /// Probe a fixed search path instead of the process `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            ..Self::new()
        }
    }

    fn locate(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        std::env::split_paths(search_path)
            .map(|dir| dir.join(self.exe_name))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for CommandJavaProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaProbe for CommandJavaProbe {
    fn probe(&self) -> Result<SystemJava, Error> {
        let path = self.locate().ok_or_else(|| Error::RuntimeResolution {
            message: "java was not found on PATH".to_string(),
        })?;

        let output = Command::new(&path)
            .arg("-version")
            .output()
            .map_err(|e| Error::RuntimeResolution {
                message: format!("failed to run '{} -version': {e}", path.display()),
            })?;

        // The JVM prints its banner on stderr.
        let mut banner = String::from_utf8_lossy(&output.stderr).into_owned();
        if banner.trim().is_empty() {
            banner = String::from_utf8_lossy(&output.stdout).into_owned();
        }

        let major = parse_java_major_version(&banner)?;
        debug!(path = %path.display(), major, "found system java");

        Ok(SystemJava {
            path,
            major,
            banner,
        })
    }
}

pub struct RuntimeResolver {
    os: Os,
    probe: Arc<dyn JavaProbe>,
    minimum: u32,
}

impl RuntimeResolver {
    pub fn new(os: Os, probe: Arc<dyn JavaProbe>) -> Self {
        Self {
            os,
            probe,
            minimum: 0,
        }
    }

    /// System Java older than `major` is treated as absent.
    pub fn with_minimum_version(mut self, major: u32) -> Self {
        self.minimum = major;
        self
    }

    pub fn managed_java(&self, install_dir: &Path) -> Option<PathBuf> {
        managed_java_candidates(&self.os, install_dir)
            .into_iter()
            .find(|candidate| candidate.is_file())
    }

    pub fn system_java(&self) -> Result<SystemJava, Error> {
        let java = self.probe.probe()?;
        if java.major < self.minimum {
            return Err(Error::RuntimeResolution {
                message: format!(
                    "system java at '{}' is version {}, but {} or newer is required",
                    java.path.display(),
                    java.major,
                    self.minimum
                ),
            });
        }
        Ok(java)
    }

    /// Pick the `java` for `strategy`. Unresolvable strategies fail with
    /// `RuntimeResolution`; a banner that cannot be parsed stays a
    /// `JavaVersionParse` error.
    pub fn resolve_java_path(
        &self,
        install_dir: &Path,
        strategy: JavaStrategy,
    ) -> Result<PathBuf, Error> {
        match strategy {
            JavaStrategy::System => self.system_java().map(|java| java.path).map_err(|e| {
                with_context(e, |message| {
                    format!("strategy 'system' requires java on PATH: {message}")
                })
            }),
            JavaStrategy::Bundled => {
                self.managed_java(install_dir)
                    .ok_or_else(|| Error::RuntimeResolution {
                        message: format!(
                            "strategy 'bundled' requires a managed runtime in '{}'",
                            install_dir.display()
                        ),
                    })
            }
            JavaStrategy::Auto => {
                if let Some(managed) = self.managed_java(install_dir) {
                    return Ok(managed);
                }
                self.system_java().map(|java| java.path).map_err(|e| {
                    with_context(e, |message| {
                        format!(
                            "no managed runtime in '{}' and no usable system java ({message})",
                            install_dir.display()
                        )
                    })
                })
            }
        }
    }

    pub fn needs_runtime_fetch(&self, install_dir: &Path, strategy: JavaStrategy) -> bool {
        match strategy {
            JavaStrategy::System => false,
            JavaStrategy::Bundled => self.managed_java(install_dir).is_none(),
            JavaStrategy::Auto => {
                self.managed_java(install_dir).is_none() && self.system_java().is_err()
            }
        }
    }
}

/// Prefix a resolution failure with what was being resolved. Other errors
/// pass through untouched.
fn with_context(err: Error, context: impl FnOnce(&str) -> String) -> Error {
    match err {
        Error::RuntimeResolution { message } => Error::RuntimeResolution {
            message: context(&message),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_fake_java;
    use tempfile::TempDir;

    fn java_at(path: &str, major: u32) -> SystemJava {
        SystemJava {
            path: PathBuf::from(path),
            major,
            banner: format!("openjdk version \"{major}.0.1\""),
        }
    }

    fn probe_returning(result: Result<SystemJava, Error>) -> Arc<dyn JavaProbe> {
        let mut probe = MockJavaProbe::new();
        probe.expect_probe().returning(move || result.clone());
        Arc::new(probe)
    }

    fn no_system_java() -> Arc<dyn JavaProbe> {
        probe_returning(Err(Error::RuntimeResolution {
            message: "java was not found on PATH".to_string(),
        }))
    }

    fn path_java_resolver(major: u32) -> RuntimeResolver {
        RuntimeResolver::new(Os::Linux, probe_returning(Ok(java_at("/usr/bin/java", major))))
    }

    fn install_managed(tmp: &TempDir) -> PathBuf {
        let java = tmp.path().join("runtime/bin/java");
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, b"").unwrap();
        java
    }

    #[test]
    fn system_strategy_uses_path_java() {
        let tmp = TempDir::new().unwrap();
        install_managed(&tmp);
        let resolver = path_java_resolver(21);

        let path = resolver
            .resolve_java_path(tmp.path(), JavaStrategy::System)
            .unwrap();
        assert_eq!(path, PathBuf::from("/usr/bin/java"));
        assert!(!resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::System));
    }

    #[test]
    fn system_strategy_fails_without_path_java() {
        let tmp = TempDir::new().unwrap();
        let resolver = RuntimeResolver::new(Os::Linux, no_system_java());

        let err = resolver
            .resolve_java_path(tmp.path(), JavaStrategy::System)
            .unwrap_err();
        assert!(err.to_string().contains("strategy 'system'"));
        assert!(!resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::System));
    }

    #[test]
    fn bundled_strategy_ignores_path_java() {
        let tmp = TempDir::new().unwrap();
        let resolver = path_java_resolver(21);

        assert!(resolver.resolve_java_path(tmp.path(), JavaStrategy::Bundled).is_err());
        assert!(resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::Bundled));

        let managed = install_managed(&tmp);
        assert_eq!(
            resolver
                .resolve_java_path(tmp.path(), JavaStrategy::Bundled)
                .unwrap(),
            managed
        );
        assert!(!resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::Bundled));
    }

    #[test]
    fn auto_prefers_managed_runtime() {
        let tmp = TempDir::new().unwrap();
        let managed = install_managed(&tmp);
        let resolver = path_java_resolver(21);

        assert_eq!(
            resolver.resolve_java_path(tmp.path(), JavaStrategy::Auto).unwrap(),
            managed
        );
        assert!(!resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::Auto));
    }

    #[test]
    fn auto_falls_back_to_system_java() {
        let tmp = TempDir::new().unwrap();
        let resolver = path_java_resolver(17);

        assert_eq!(
            resolver.resolve_java_path(tmp.path(), JavaStrategy::Auto).unwrap(),
            PathBuf::from("/usr/bin/java")
        );
        assert!(!resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::Auto));
    }

    #[test]
    fn auto_with_nothing_available_needs_fetch() {
        let tmp = TempDir::new().unwrap();
        let resolver = RuntimeResolver::new(Os::Linux, no_system_java());

        let err = resolver
            .resolve_java_path(tmp.path(), JavaStrategy::Auto)
            .unwrap_err();
        assert!(matches!(err, Error::RuntimeResolution { .. }));
        assert!(resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::Auto));
    }

    #[test]
    fn old_system_java_counts_as_absent() {
        let tmp = TempDir::new().unwrap();
        let resolver = path_java_resolver(11).with_minimum_version(17);

        let err = resolver
            .resolve_java_path(tmp.path(), JavaStrategy::System)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("version 11"));
        assert!(msg.contains("17 or newer"));
        assert!(resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::Auto));
    }

    #[cfg(unix)]
    #[test]
    fn unparseable_banner_keeps_its_error_type() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        write_fake_java(&bin.join("java"), "garbage banner").unwrap();
        let probe = CommandJavaProbe::with_search_path(bin.as_os_str().to_os_string());
        let resolver = RuntimeResolver::new(Os::Linux, Arc::new(probe));

        for strategy in [JavaStrategy::System, JavaStrategy::Auto] {
            let err = resolver
                .resolve_java_path(tmp.path(), strategy)
                .unwrap_err();
            let parse_error = matches!(
                err.root(),
                Error::JavaVersionParse { output } if output.contains("garbage")
            );
            assert!(parse_error, "{strategy:?}: {err:?}");
        }
        assert!(resolver.needs_runtime_fetch(tmp.path(), JavaStrategy::Auto));
    }

    #[test]
    fn darwin_finds_bundle_layout() {
        let tmp = TempDir::new().unwrap();
        let java = tmp.path().join("runtime/Contents/Home/bin/java");
        std::fs::create_dir_all(java.parent().unwrap()).unwrap();
        std::fs::write(&java, b"").unwrap();

        let resolver = RuntimeResolver::new(Os::Darwin, no_system_java());
        assert_eq!(resolver.managed_java(tmp.path()), Some(java));

        let linux = RuntimeResolver::new(Os::Linux, no_system_java());
        assert_eq!(linux.managed_java(tmp.path()), None);
    }

    #[cfg(unix)]
    #[test]
    fn command_probe_reads_stderr_banner() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        write_fake_java(
            &bin.join("java"),
            "openjdk version \"17.0.8\" 2023-07-18\nOpenJDK Runtime Environment",
        )
        .unwrap();

        let probe = CommandJavaProbe::with_search_path(std::env::join_paths([&bin]).unwrap());
        let java = probe.probe().unwrap();

        assert_eq!(java.path, bin.join("java"));
        assert_eq!(java.major, 17);
        assert!(java.banner.contains("OpenJDK"));
    }

    #[cfg(unix)]
    #[test]
    fn command_probe_reports_unparseable_banner() {
        let tmp = TempDir::new().unwrap();
        write_fake_java(&tmp.path().join("java"), "not a jvm").unwrap();

        let probe = CommandJavaProbe::with_search_path(tmp.path().as_os_str().to_os_string());
        assert!(matches!(probe.probe(), Err(Error::JavaVersionParse { .. })));
    }

    #[test]
    fn command_probe_without_java_on_path() {
        let tmp = TempDir::new().unwrap();
        let probe = CommandJavaProbe::with_search_path(tmp.path().as_os_str().to_os_string());

        let err = probe.probe().unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
    }
}
