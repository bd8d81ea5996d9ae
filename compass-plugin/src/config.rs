//! Options file and command-line overrides.
//!
//! Options path: `<config dir>/options.json`, e.g.
//! `~/.config/compass-plugin/options.json` on Linux. The file uses the same
//! camelCase schema as the API; command-line flags override its values.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use compass_core::{CompassError, CompassOptions, FusionOptions, LocationOptions};
use directories::ProjectDirs;
use thiserror::Error;

use crate::Cli;

pub const OPTIONS_FILE: &str = "options.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read options file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse options file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid option {0}")]
    Invalid(#[from] CompassError),
}

pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "compass", "compass-plugin")
}

/// Default options file location, if the platform has a config directory.
pub fn default_options_path() -> Option<PathBuf> {
    get_project_dirs().map(|dirs| dirs.config_dir().join(OPTIONS_FILE))
}

/// Load options from a JSON file.
pub fn load_options(path: &Path) -> Result<CompassOptions, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    let options = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        ConfigError::Parse {
            path: path.to_owned(),
            source,
        }
    })?;
    log::debug!("Loaded options from {}", path.display());
    Ok(options)
}

/// Load the default options file, or defaults when there is none.
pub fn load_default_options() -> Result<CompassOptions, ConfigError> {
    match default_options_path() {
        Some(path) if path.exists() => load_options(&path),
        Some(path) => {
            log::debug!("No options file at {}, using defaults", path.display());
            Ok(CompassOptions::default())
        }
        None => Ok(CompassOptions::default()),
    }
}

impl Cli {
    /// Options from the file (explicit or default) with flag overrides
    /// applied, validated.
    pub fn compass_options(&self) -> Result<CompassOptions, ConfigError> {
        let mut options = match &self.options {
            Some(path) => load_options(path)?,
            None => load_default_options()?,
        };

        if self.min_change_threshold.is_some() {
            options.min_change_threshold = self.min_change_threshold;
        }
        if self.update_throttle.is_some() {
            options.update_throttle = self.update_throttle;
        }
        if self.filter.is_some() {
            options.filter = self.filter;
        }
        if self.true_heading {
            options
                .location
                .get_or_insert_with(LocationOptions::default)
                .uses_true_heading = Some(true);
        }
        if self.no_fusion {
            options
                .fusion
                .get_or_insert_with(FusionOptions::default)
                .use_sensor_fusion = Some(false);
        }
        if self.sensor_delay.is_some() {
            options
                .fusion
                .get_or_insert_with(FusionOptions::default)
                .sensor_delay = self.sensor_delay;
        }

        options.resolve()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use compass_core::SensorDelay;
    use std::io::Write;

    fn write_options(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_options_file() {
        let file = write_options(r#"{"minChangeThreshold": 5, "ios": {"usesTrueHeading": true}}"#);
        let options = load_options(file.path()).unwrap();
        assert_eq!(options.min_change_threshold, Some(5.0));
        let resolved = options.resolve().unwrap();
        assert!(resolved.uses_true_heading);
    }

    #[test]
    fn test_missing_and_broken_files() {
        let err = load_options(Path::new("/nonexistent/compass/options.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let file = write_options(r#"{"minChangeThreshold": "#);
        let err = load_options(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let file = write_options(r#"{"bogus": 1}"#);
        assert!(matches!(
            load_options(file.path()).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_flags_override_file() {
        let file = write_options(r#"{"minChangeThreshold": 5, "updateThrottle": 100}"#);
        let path = file.path().to_str().unwrap();
        let cli = Cli::parse_from([
            "compass-demo",
            "--options",
            path,
            "--min-change-threshold",
            "2",
            "--no-fusion",
            "--sensor-delay",
            "game",
        ]);
        let options = cli.compass_options().unwrap();
        let resolved = options.resolve().unwrap();
        assert_eq!(resolved.min_change_threshold, 2.0);
        assert_eq!(resolved.update_throttle_ms, 100);
        assert!(!resolved.use_sensor_fusion);
        assert_eq!(resolved.sensor_delay, SensorDelay::Game);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let file = write_options("{}");
        let path = file.path().to_str().unwrap();
        let cli = Cli::parse_from(["compass-demo", "--options", path, "--filter", "1.5"]);
        match cli.compass_options() {
            Err(ConfigError::Invalid(e)) => assert_eq!(e.field(), Some("filter")),
            other => panic!("expected invalid filter, got {:?}", other),
        }
    }
}
