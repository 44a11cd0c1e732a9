//! User configuration model.
//!
//! Every section carries its own defaults, so a partial YAML file (or no file
//! at all) yields a complete `Config`.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::paths::{AUTO, Layout, PathHints};
use crate::runtime::JavaStrategy;

/// Oldest Java major version relay will accept as a minimum.
pub const MIN_SUPPORTED_JAVA: u32 = 8;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub product: ProductConfig,
    pub layout: LayoutConfig,
    pub paths: PathsConfig,
    pub runtime: RuntimeConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConfig {
    pub name: String,
    pub edition: String,
    pub version: String,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: "burpsuite".to_string(),
            edition: "professional".to_string(),
            version: "latest".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub mode: Layout,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub install: String,
    pub data: String,
    pub bin: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            install: AUTO.to_string(),
            data: AUTO.to_string(),
            bin: AUTO.to_string(),
        }
    }
}

impl PathsConfig {
    pub fn hints(&self) -> PathHints {
        PathHints {
            install: self.install.clone(),
            data: self.data.clone(),
            bin: self.bin.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub java: JavaConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    pub strategy: JavaStrategy,
    pub min_version: u32,
    pub jvm_args: Vec<String>,
}

impl Default for JavaConfig {
    fn default() -> Self {
        Self {
            strategy: JavaStrategy::Auto,
            min_version: 17,
            jvm_args: vec![
                "--add-opens=java.desktop/javax.swing=ALL-UNNAMED".to_string(),
                "--add-opens=java.base/java.lang=ALL-UNNAMED".to_string(),
                "-noverify".to_string(),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl Config {
    /// Parse YAML and validate the result. An empty document yields defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        let config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str::<Config>(yaml).map_err(|e| Error::Config {
                message: e.to_string(),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.product.name.trim().is_empty() {
            return Err(invalid("product.name is required"));
        }
        if self.product.version.trim().is_empty() {
            return Err(invalid("product.version is required"));
        }
        if self.runtime.java.min_version < MIN_SUPPORTED_JAVA {
            return Err(invalid(format!(
                "runtime.java.min_version must be >= {MIN_SUPPORTED_JAVA}, got {}",
                self.runtime.java.min_version
            )));
        }
        if self.network.timeout_secs == 0 {
            return Err(invalid("network.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.product.name, "burpsuite");
        assert_eq!(config.runtime.java.min_version, 17);
        assert_eq!(config.network.retries, 3);
    }

    #[test]
    fn partial_sections_keep_their_defaults() {
        let yaml = r#"
product:
  edition: community
network:
  retries: 5
"#;
        let config = Config::from_yaml_str(yaml).unwrap();

        assert_eq!(config.product.name, "burpsuite");
        assert_eq!(config.product.edition, "community");
        assert_eq!(config.product.version, "latest");
        assert_eq!(config.network.retries, 5);
        assert_eq!(config.network.timeout_secs, 30);
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
product: { name: burpsuite, edition: professional, version: "2024.1.1" }
layout: { mode: portable }
paths: { install: /opt/app, data: auto, bin: auto }
runtime:
  java:
    strategy: bundled
    min_version: 21
    jvm_args: ["-Xmx4g"]
network: { timeout_secs: 10, retries: 0 }
logging: { level: debug }
"#;
        let config = Config::from_yaml_str(yaml).unwrap();

        assert_eq!(config.layout.mode, Layout::Portable);
        assert_eq!(config.paths.hints().install, "/opt/app");
        assert_eq!(config.runtime.java.strategy, JavaStrategy::Bundled);
        assert_eq!(config.runtime.java.jvm_args, vec!["-Xmx4g".to_string()]);
        assert_eq!(config.network.retries, 0);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        let err = Config::from_yaml_str("layout: { mode: sideways }").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = Config::from_yaml_str("runtime: { java: { strategy: magic } }").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn validation_rejects_old_java_minimum() {
        let err = Config::from_yaml_str("runtime: { java: { min_version: 7 } }").unwrap_err();
        assert!(err.to_string().contains("min_version"));
    }

    #[test]
    fn validation_rejects_empty_version() {
        let mut config = Config::default();
        config.product.version = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let err = Config::from_yaml_str("network: { timeout_secs: 0 }").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }
}
