//! Loading the YAML config from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use relay_core::{Config, Error};

/// Read and validate `path`. A missing file yields the defaults.
pub fn load(path: &Path) -> Result<Config, Error> {
    match fs::read_to_string(path) {
        Ok(contents) => Config::from_yaml_str(&contents).map_err(|e| match e {
            Error::Config { message } => Error::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(Error::filesystem(path, e)),
    }
}
