//! Product catalog. relay manages exactly one product today.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::Error;
use crate::version::LATEST;

/// One-line file in the install dir recording the installed version.
pub const VERSION_MARKER: &str = ".relay-version";

const BURP_DOWNLOAD_BASE: &str = "https://portswigger-cdn.net/burp/releases/download";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    BurpSuite,
}

impl Product {
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name.trim() {
            "burpsuite" => Ok(Product::BurpSuite),
            other => Err(Error::PlanResolution {
                message: format!("unknown product '{other}' (supported: burpsuite)"),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Product::BurpSuite => "burpsuite",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Product::BurpSuite => "Burp Suite",
        }
    }

    pub fn jar_name(self) -> &'static str {
        match self {
            Product::BurpSuite => "burpsuite.jar",
        }
    }

    /// Launcher file stem; the generator adds a platform extension.
    pub fn launcher_name(self) -> &'static str {
        self.name()
    }

    pub fn jar_path(self, install_dir: &Path) -> PathBuf {
        install_dir.join(self.jar_name())
    }

    pub fn download_url(self, edition: &str, version: &str) -> String {
        match self {
            Product::BurpSuite => {
                let product = match edition.trim() {
                    "community" => "community",
                    _ => "pro",
                };
                let mut url = format!("{BURP_DOWNLOAD_BASE}?product={product}&type=Jar");
                let version = version.trim();
                if !version.is_empty() && version != LATEST {
                    url.push_str("&version=");
                    url.push_str(version);
                }
                url
            }
        }
    }
}
