//! Operating system and CPU architecture facts.
//!
//! Everything downstream takes a `Platform` value instead of reading
//! `std::env::consts` directly, so tests can ask what would happen on
//! another host.

use std::fmt;

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Darwin,
    Windows,
    Other(String),
}

impl Os {
    pub fn parse(s: &str) -> Self {
        match s {
            "linux" => Os::Linux,
            "macos" | "darwin" => Os::Darwin,
            "windows" => Os::Windows,
            other => Os::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        Os::parse(std::env::consts::OS)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
            Os::Other(name) => name,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Aarch64,
    Other(String),
}

impl Arch {
    pub fn parse(s: &str) -> Self {
        match s {
            "x86_64" | "amd64" | "x64" => Arch::X64,
            "aarch64" | "arm64" => Arch::Aarch64,
            other => Arch::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        Arch::parse(std::env::consts::ARCH)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Arch::X64 => "x64",
            Arch::Aarch64 => "aarch64",
            Arch::Other(name) => name,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    pub fn current() -> Self {
        Self::new(Os::current(), Arch::current())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
