//! Wires a register port backend, the PWM driver, and the sync loop from a
//! TOML config file.
//!
//! Supported modes:
//! - `sim`: in-memory SimPort (CI, dry runs)
//! - `modbus_tcp`: ModbusPort over TCP
//! - `modbus_rtu`: ModbusPort over a serial line

use rcio_hal::{IoError, RegisterPort, SimPort};
use rcio_modbus::ModbusPort;
use rcio_pwm::{AttachError, DriverConfig, InvalidArgument, LocalHost, RcioPwm};
use rcio_runtime::{RuntimeConfig, SyncLoop};
use serde::Deserialize;
use std::time::Duration;

/// Top-level config, deserialized from TOML.
#[derive(Debug, Deserialize)]
pub struct OrchestratorConfig {
    pub mode: ModeConfig,
    #[serde(default)]
    pub modbus: Option<ModbusSection>,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Deserialize)]
pub struct ModeConfig {
    #[serde(rename = "type")]
    pub mode_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ModbusSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub serial_port: Option<String>,
    #[serde(default)]
    pub baud_rate: Option<u32>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    502
}
fn default_slave_id() -> u8 {
    1
}
fn default_timeout() -> u64 {
    1000
}

/// Parsed mode selection.
#[derive(Debug, Clone, PartialEq)]
pub enum PortMode {
    Sim,
    ModbusTcp {
        host: String,
        port: u16,
        slave_id: u8,
        timeout_ms: u64,
    },
    ModbusRtu {
        serial_port: String,
        baud_rate: u32,
        slave_id: u8,
        timeout_ms: u64,
    },
}

impl OrchestratorConfig {
    /// Parse from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Parse and validate a TOML file.
    pub fn from_file(path: &str) -> Result<Self, OrchestratorError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrchestratorError::ConfigError(format!("{path}: {e}")))?;
        let config =
            Self::from_toml(&content).map_err(|e| OrchestratorError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OrchestratorError> {
        self.driver.validate()?;
        self.port_mode()?;
        Ok(())
    }

    /// Resolve the mode from config.
    pub fn port_mode(&self) -> Result<PortMode, OrchestratorError> {
        match self.mode.mode_type.as_str() {
            "sim" => Ok(PortMode::Sim),
            "modbus_tcp" => {
                let m = self.modbus_section()?;
                Ok(PortMode::ModbusTcp {
                    host: m.host.clone(),
                    port: m.port,
                    slave_id: m.slave_id,
                    timeout_ms: m.timeout_ms,
                })
            }
            "modbus_rtu" => {
                let m = self.modbus_section()?;
                let serial_port = m.serial_port.clone().ok_or_else(|| {
                    OrchestratorError::ConfigError("modbus.serial_port required for RTU".into())
                })?;
                Ok(PortMode::ModbusRtu {
                    serial_port,
                    baud_rate: m.baud_rate.unwrap_or(115_200),
                    slave_id: m.slave_id,
                    timeout_ms: m.timeout_ms,
                })
            }
            other => Err(OrchestratorError::ConfigError(format!(
                "unknown mode type: {other}"
            ))),
        }
    }

    fn modbus_section(&self) -> Result<&ModbusSection, OrchestratorError> {
        self.modbus.as_ref().ok_or_else(|| {
            OrchestratorError::ConfigError(format!(
                "[modbus] section required for {}",
                self.mode.mode_type
            ))
        })
    }
}

/// Create a register port from config.
pub fn create_port(config: &OrchestratorConfig) -> Result<Box<dyn RegisterPort>, OrchestratorError> {
    match config.port_mode()? {
        PortMode::Sim => Ok(Box::new(SimPort::new())),
        PortMode::ModbusTcp {
            host,
            port,
            slave_id,
            timeout_ms,
        } => {
            let addr = format!("{host}:{port}")
                .parse()
                .map_err(|e| OrchestratorError::ConfigError(format!("invalid address: {e}")))?;
            let port = ModbusPort::connect(addr, slave_id)?
                .with_timeout(Duration::from_millis(timeout_ms));
            Ok(Box::new(port))
        }
        PortMode::ModbusRtu {
            serial_port,
            baud_rate,
            slave_id,
            timeout_ms,
        } => {
            let port = ModbusPort::connect_rtu(&serial_port, baud_rate, slave_id)?
                .with_timeout(Duration::from_millis(timeout_ms));
            Ok(Box::new(port))
        }
    }
}

/// Create the port, attach the driver to `host`, and wrap it in a sync loop.
pub fn start(
    config: &OrchestratorConfig,
    host: &mut LocalHost,
) -> Result<SyncLoop<Box<dyn RegisterPort>>, OrchestratorError> {
    config.validate()?;
    let port = create_port(config)?;
    let mut driver = RcioPwm::new(port, config.driver.clone());
    let report = driver.attach(host)?;
    for warning in &report.warnings {
        log::warn!("attach: {warning}");
    }
    Ok(SyncLoop::new(driver, config.runtime.clone()))
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("config error: {0}")]
    ConfigError(String),
    #[error("invalid driver setting: {0}")]
    InvalidSetting(#[from] InvalidArgument),
    #[error("register port error: {0}")]
    PortError(#[from] IoError),
    #[error("attach failed: {0}")]
    AttachError(#[from] AttachError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sim_config() {
        let toml = r#"
[mode]
type = "sim"

[runtime]
cycle_time_ms = 50
max_cycles = 0
"#;
        let config = OrchestratorConfig::from_toml(toml).unwrap();
        assert_eq!(config.port_mode().unwrap(), PortMode::Sim);
        assert_eq!(config.runtime.cycle_time_ms, 50);
        assert_eq!(config.runtime.max_consecutive_failures, 10);
        assert_eq!(config.driver, DriverConfig::default());
    }

    #[test]
    fn parses_modbus_tcp_config() {
        let toml = r#"
[mode]
type = "modbus_tcp"

[modbus]
host = "192.168.100.20"
port = 502
slave_id = 3
timeout_ms = 250

[driver]
default_frequency = 400
retry_frequency_push = false
"#;
        let config = OrchestratorConfig::from_toml(toml).unwrap();
        assert_eq!(
            config.port_mode().unwrap(),
            PortMode::ModbusTcp {
                host: "192.168.100.20".into(),
                port: 502,
                slave_id: 3,
                timeout_ms: 250,
            }
        );
        assert_eq!(config.driver.default_frequency, 400);
        assert!(!config.driver.retry_frequency_push);
    }

    #[test]
    fn parses_modbus_rtu_config() {
        let toml = r#"
[mode]
type = "modbus_rtu"

[modbus]
serial_port = "/dev/ttyUSB0"
slave_id = 1
"#;
        let config = OrchestratorConfig::from_toml(toml).unwrap();
        assert_eq!(
            config.port_mode().unwrap(),
            PortMode::ModbusRtu {
                serial_port: "/dev/ttyUSB0".into(),
                baud_rate: 115_200,
                slave_id: 1,
                timeout_ms: 1000,
            }
        );
    }

    #[test]
    fn rejects_missing_modbus_section() {
        let config = OrchestratorConfig::from_toml("[mode]\ntype = \"modbus_tcp\"\n").unwrap();
        assert!(matches!(
            config.port_mode(),
            Err(OrchestratorError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_unknown_mode() {
        let toml = r#"
[mode]
type = "quantum"
"#;
        let config = OrchestratorConfig::from_toml(toml).unwrap();
        assert!(config.port_mode().is_err());
    }

    #[test]
    fn rejects_out_of_range_default_frequency() {
        let toml = r#"
[mode]
type = "sim"

[driver]
default_frequency = 2000
"#;
        let config = OrchestratorConfig::from_toml(toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(OrchestratorError::InvalidSetting(_))
        ));
    }

    #[test]
    fn start_attaches_sim_driver() {
        let config = OrchestratorConfig::from_toml("[mode]\ntype = \"sim\"\n").unwrap();
        let mut host = LocalHost::new();
        let mut sync = start(&config, &mut host).unwrap();
        assert!(sync.driver.is_attached());
        assert_eq!(host.published().len(), 10);
        sync.run_cycles(3).unwrap();
        assert_eq!(sync.cycle_count, 3);
    }

    #[test]
    fn start_surfaces_attach_refusal() {
        let config = OrchestratorConfig::from_toml("[mode]\ntype = \"sim\"\n").unwrap();
        let mut host = LocalHost::new().refusing_attributes();
        assert!(matches!(
            start(&config, &mut host),
            Err(OrchestratorError::AttachError(_))
        ));
    }

    #[test]
    fn parses_shipped_sim_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/rcio_sim.toml");
        let config = OrchestratorConfig::from_file(path).unwrap();
        assert_eq!(config.port_mode().unwrap(), PortMode::Sim);
    }
}
