use crate::error::InvalidArgument;
use crate::state::{validate_frequency, DEFAULT_FREQUENCY};
use serde::Deserialize;

/// `[driver]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_frequency")]
    pub default_frequency: u16,
    /// Re-schedule a failed frequency push for the next pass instead of dropping it.
    #[serde(default = "default_retry")]
    pub retry_frequency_push: bool,
}

fn default_frequency() -> u16 {
    DEFAULT_FREQUENCY
}

fn default_retry() -> bool {
    true
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            default_frequency: default_frequency(),
            retry_frequency_push: default_retry(),
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        validate_frequency(i32::from(self.default_frequency)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_attach_time_state() {
        let config = DriverConfig::default();
        assert_eq!(config.default_frequency, 50);
        assert!(config.retry_frequency_push);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_section() {
        let config: DriverConfig = toml::from_str("default_frequency = 400\n").unwrap();
        assert_eq!(config.default_frequency, 400);
        assert!(config.retry_frequency_push);

        let config: DriverConfig = toml::from_str("retry_frequency_push = false").unwrap();
        assert_eq!(config.default_frequency, 50);
        assert!(!config.retry_frequency_push);
    }

    #[test]
    fn rejects_out_of_range_default() {
        let config = DriverConfig {
            default_frequency: 1200,
            ..DriverConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(InvalidArgument::FrequencyOutOfRange(1200))
        );
    }
}
