//! Runtime settings loading from disk.

use std::fs;
use std::path::Path;

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::settings::RuntimeSettings;
use crate::config::validation::validate_settings;

/// Load and validate runtime settings from a TOML file.
pub fn load_settings(path: &Path) -> ConfigResult<RuntimeSettings> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: RuntimeSettings = toml::from_str(&content)?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

/// Load settings when a path is given, otherwise fall back to defaults.
///
/// An explicitly given path that does not exist is an error; silently
/// ignoring it would hide a typo on the command line.
pub fn load_settings_or_default(path: Option<&Path>) -> ConfigResult<RuntimeSettings> {
    match path {
        Some(path) => load_settings(path),
        None => Ok(RuntimeSettings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[simulator]\nbind_address = \"127.0.0.1:0\"").unwrap();
        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.simulator.bind_address, "127.0.0.1:0");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\nmax_attempts = 0").unwrap();
        let err = load_settings(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let err = load_settings_or_default(Some(Path::new("/nonexistent/f5.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
