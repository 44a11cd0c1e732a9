//! Test utilities for relay
//!
//! - `TestContext` - Wraps TempDir and MockServer with a portable layout
//! - Archive fixtures - tar.gz and zip builders that can write hostile names
//! - Network failure helpers - 500 and 404 responses, flaky endpoints
//! - Fake runtimes - shell scripts that answer `-version` like a real JVM
//!
//! # Example
//!
//! ```ignore
//! use relay_io::test_utils::TestContext;
//!
//! #[tokio::test]
//! async fn test_download() {
//!     let ctx = TestContext::new().await;
//!     ctx.mount_bytes("/burpsuite.jar", b"jar").await;
//!
//!     let artifact = ctx.artifact("burpsuite.jar", "/burpsuite.jar");
//!     // hand the artifact to a Downloader ...
//! }
//! ```

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, EntryType, Header};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relay_core::paths::{HostEnv, Layout, PathHints, resolve};
use relay_core::{Artifact, Config, Os, ResolvedPaths};

// ============================================================================
// Archive fixtures
// ============================================================================

/// One entry of a fixture archive. Names are written verbatim, so `..` and
/// absolute names survive into the archive.
#[derive(Clone, Copy, Debug)]
pub enum FixtureEntry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8], u32),
    Symlink(&'a str, &'a str),
    Fifo(&'a str),
}

fn raw_header(name: &str, entry_type: EntryType, size: u64, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    {
        let old = header.as_old_mut();
        let bytes = name.as_bytes();
        let len = bytes.len().min(old.name.len());
        old.name[..len].copy_from_slice(&bytes[..len]);
    }
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(mode);
    header
}

/// Build a gzipped tarball.
pub fn tar_gz(entries: &[FixtureEntry<'_>]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in entries {
        match *entry {
            FixtureEntry::Dir(name) => {
                let mut header = raw_header(name, EntryType::Directory, 0, 0o755);
                header.set_cksum();
                builder.append(&header, std::io::empty()).unwrap();
            }
            FixtureEntry::File(name, content, mode) => {
                let mut header = raw_header(name, EntryType::Regular, content.len() as u64, mode);
                header.set_cksum();
                builder.append(&header, content).unwrap();
            }
            FixtureEntry::Symlink(name, target) => {
                let mut header = raw_header(name, EntryType::Symlink, 0, 0o777);
                {
                    let old = header.as_old_mut();
                    let bytes = target.as_bytes();
                    let len = bytes.len().min(old.linkname.len());
                    old.linkname[..len].copy_from_slice(&bytes[..len]);
                }
                header.set_cksum();
                builder.append(&header, std::io::empty()).unwrap();
            }
            FixtureEntry::Fifo(name) => {
                let mut header = raw_header(name, EntryType::Fifo, 0, 0o644);
                header.set_cksum();
                builder.append(&header, std::io::empty()).unwrap();
            }
        }
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Build a zip archive. Symlinks and fifos are not representable.
pub fn zip_archive(entries: &[FixtureEntry<'_>]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for entry in entries {
        match *entry {
            FixtureEntry::Dir(name) => {
                let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
                writer.add_directory(name, options).unwrap();
            }
            FixtureEntry::File(name, content, mode) => {
                let options = zip::write::SimpleFileOptions::default().unix_permissions(mode);
                writer.start_file(name, options).unwrap();
                writer.write_all(content).unwrap();
            }
            other => panic!("zip fixtures cannot hold {other:?}"),
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Shell script that prints a JVM banner on stderr like `java -version`.
pub fn fake_java_script(banner: &str) -> String {
    format!("#!/bin/sh\ncat >&2 <<'EOF'\n{banner}\nEOF\n")
}

/// A runtime archive shaped like a vendor JRE: one top-level directory
/// holding `bin/java`.
pub fn mock_runtime_tarball(top_dir: &str, banner: &str) -> Vec<u8> {
    let dir = format!("{top_dir}/");
    let java = format!("{top_dir}/bin/java");
    let release = format!("{top_dir}/release");
    let script = fake_java_script(banner);

    tar_gz(&[
        FixtureEntry::Dir(&dir),
        FixtureEntry::File(&java, script.as_bytes(), 0o755),
        FixtureEntry::File(&release, b"JAVA_VERSION=\"21.0.5\"\n", 0o644),
    ])
}

/// Write an executable fake `java` at `path`.
pub fn write_fake_java(path: &Path, banner: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, fake_java_script(banner))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

/// Compute SHA256 hex digest of data.
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Network failure helpers
// ============================================================================

/// Create a mock 500 Internal Server Error response.
pub fn mock_500_error(message: Option<&str>) -> ResponseTemplate {
    let mut response = ResponseTemplate::new(500);
    if let Some(msg) = message {
        response = response.set_body_string(msg);
    }
    response
}

/// Create a mock 404 Not Found response.
pub fn mock_404_error() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_string("Not Found")
}

// ============================================================================
// TestContext - Main test infrastructure
// ============================================================================

/// Test context with a scratch directory and a mock HTTP server.
///
/// Paths follow the portable layout rooted at `<tmp>/app`, so nothing
/// outside the temp dir is touched.
pub struct TestContext {
    pub tmp: TempDir,
    pub mock_server: MockServer,
}

impl TestContext {
    pub async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let tmp = TempDir::new().expect("failed to create temp dir");

        Self { tmp, mock_server }
    }

    /// Portable install root.
    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("app")
    }

    pub fn hints(&self) -> PathHints {
        PathHints {
            install: self.root().to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    pub fn paths(&self) -> ResolvedPaths {
        resolve(Layout::Portable, &Os::current(), &self.hints(), &HostEnv::default())
            .expect("portable layout under a temp dir must resolve")
    }

    /// Default config pointed at this context's portable root.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.layout.mode = Layout::Portable;
        config.paths.install = self.root().to_string_lossy().into_owned();
        config.network.retries = 2;
        config.network.timeout_secs = 5;
        config
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.mock_server.uri(), route)
    }

    /// An artifact served from `route`, landing in the install dir as `name`.
    pub fn artifact(&self, name: &str, route: &str) -> Artifact {
        Artifact {
            name: name.to_string(),
            url: self.url(route),
            target: self.root().join(name),
            checksum: None,
        }
    }

    pub async fn mount_bytes(&self, route: &str, body: &[u8]) {
        self.mount_response(route, ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .await;
    }

    pub async fn mount_response(&self, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&self.mock_server)
            .await;
    }

    /// Fail the first `failures` requests to `route` with a 500, then serve
    /// `body`.
    pub async fn mount_flaky(&self, route: &str, failures: u64, body: &[u8]) {
        if failures > 0 {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(mock_500_error(Some("transient")))
                .up_to_n_times(failures)
                .with_priority(1)
                .mount(&self.mock_server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .with_priority(2)
            .mount(&self.mock_server)
            .await;
    }
}
