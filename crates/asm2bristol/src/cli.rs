//! Command line interface of the `a2bristol` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::{Config, LogFormat};

const ABOUT: &str = "\
Transpiles the Boolean circuit assembly of a secure-computation compiler into \
a Bristol Fashion circuit.

Inputs and outputs are marked in the source program with break points named \
`Input i` and `Output i`, each followed by a reveal of the region's bits. The \
bit width of every region is given in order with --input and --output, eg. \
`--input 2 --input 4` for two regions revealing 2 and 4 bits. The circuit is \
written to <PATH>.txt unless --out is given.";

/// Command line arguments.
#[derive(Debug, Clone, Parser)]
#[command(version, name = "a2bristol", about = ABOUT, long_about = None)]
pub struct Cli {
    /// Assembly file to transpile.
    pub path: PathBuf,
    /// Write every NOT gate as INV in the output circuit.
    #[arg(long = "not-is-inv")]
    pub not_is_inv: bool,
    /// Bit width of the next input, can be repeated.
    #[arg(long = "input", value_name = "WIDTH")]
    pub inputs: Vec<usize>,
    /// Bit width of the next output, can be repeated.
    #[arg(long = "output", value_name = "WIDTH")]
    pub outputs: Vec<usize>,
    /// Configuration file. Command line arguments take precedence over it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Output path, defaults to the assembly path with `.txt` appended.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Log verbosity level.
    #[arg(long)]
    pub log_level: Option<String>,
    /// Log format.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Builds the configuration, loading the configuration file first if one
    /// is given and then applying the command line arguments on top.
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if !self.inputs.is_empty() {
            config.inputs = self.inputs.clone();
        }
        if !self.outputs.is_empty() {
            config.outputs = self.outputs.clone();
        }
        if self.not_is_inv {
            config.not_is_inv = true;
        }
        if let Some(out) = &self.out {
            config.output_path = Some(out.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "a2bristol",
            "--input",
            "2",
            "--output",
            "1",
            "--input",
            "4",
            "--not-is-inv",
            "prog.asm",
        ])
        .unwrap();

        assert_eq!(cli.path, PathBuf::from("prog.asm"));
        assert_eq!(cli.inputs, vec![2, 4]);
        assert_eq!(cli.outputs, vec![1]);

        let config = cli.config().unwrap();
        assert_eq!(config.inputs, vec![2, 4]);
        assert_eq!(config.outputs, vec![1]);
        assert!(config.not_is_inv);
        assert_eq!(config.output_path, None);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["a2bristol", "prog.asm"]).unwrap();
        let config = cli.config().unwrap();

        assert!(!config.not_is_inv);
        assert!(config.inputs.is_empty());
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_width() {
        assert!(Cli::try_parse_from(["a2bristol", "--input", "two", "prog.asm"]).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["a2bristol", "-c", "/nonexistent/a2bristol.toml", "p"])
            .unwrap();

        assert!(cli.config().is_err());
    }
}
