//! Tracing setup.

use std::str::FromStr;

use anyhow::Result;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::{LogFormat, LoggingConfig};

fn format_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let f = fmt::layer().with_writer(std::io::stderr).with_target(false);
    match format {
        LogFormat::Compact => f.compact().boxed(),
        LogFormat::Json => f.json().boxed(),
    }
}

/// Returns the filter directives for the given configuration.
pub fn directives(config: &LoggingConfig) -> Result<String> {
    match &config.filter {
        // Use custom filter that is provided by user
        Some(filter) => Ok(filter.clone()),
        // Use the default filter when only verbosity level is provided
        None => {
            let level = Level::from_str(&config.level)?;
            Ok(format!("asm2bristol={level}"))
        }
    }
}

/// Installs the global tracing subscriber.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter_layer = EnvFilter::builder().parse(directives(config)?)?;

    Registry::default()
        .with(filter_layer)
        .with(format_layer(config.format))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            ..Default::default()
        };

        assert_eq!(directives(&config).unwrap(), "asm2bristol=DEBUG");
    }

    #[test]
    fn test_custom_filter_overrides_level() {
        let config = LoggingConfig {
            level: "not a level".to_string(),
            filter: Some("asm2bristol::relabel=trace".to_string()),
            ..Default::default()
        };

        assert_eq!(directives(&config).unwrap(), "asm2bristol::relabel=trace");
    }

    #[test]
    fn test_invalid_level() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };

        assert!(directives(&config).is_err());
    }
}
