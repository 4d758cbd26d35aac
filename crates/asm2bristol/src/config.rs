//! Conversion and logging configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration of a conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bit width of every input, in the order of their `Input i` markers.
    pub inputs: Vec<usize>,
    /// Bit width of every output, in the order of their `Output i` markers.
    pub outputs: Vec<usize>,
    /// Write NOT gates as `INV`, which some consumers require.
    pub not_is_inv: bool,
    /// Where to write the circuit. Defaults to the source path with a `.txt`
    /// suffix appended.
    pub output_path: Option<PathBuf>,
    /// Setting for logging
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Returns the path the circuit of `source` is written to.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        self.output_path.clone().unwrap_or_else(|| {
            let mut path = source.as_os_str().to_owned();
            path.push(".txt");
            path.into()
        })
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log verbosity level of the default filtering logic, which is
    /// `asm2bristol=<level>`.
    pub level: String,
    /// Custom filtering logic, refer to the syntax here
    /// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#example-syntax
    /// This will override the default filtering logic above.
    pub filter: Option<String>,
    /// Log format. Available options are "COMPACT" and "JSON".
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            filter: None,
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogFormat {
    /// Human readable, one line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// An error raised while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The configuration file is not valid.
    #[error("invalid config file: {0}")]
    Invalid(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
            inputs = [128, 128]
            outputs = [128]
            not_is_inv = true

            [logging]
            level = "DEBUG"
            format = "JSON"
            "#,
        )
        .unwrap();

        assert_eq!(config.inputs, vec![128, 128]);
        assert_eq!(config.outputs, vec![128]);
        assert!(config.not_is_inv);
        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, None);
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_output_path() {
        let mut config = Config::default();
        assert_eq!(
            config.output_path_for(Path::new("dir/aes.asm")),
            PathBuf::from("dir/aes.asm.txt")
        );

        config.output_path = Some(PathBuf::from("out.txt"));
        assert_eq!(
            config.output_path_for(Path::new("dir/aes.asm")),
            PathBuf::from("out.txt")
        );
    }

    #[test]
    fn test_unknown_format() {
        let err = toml::from_str::<Config>("[logging]\nformat = \"XML\"").unwrap_err();

        assert!(err.to_string().contains("XML"));
    }
}
