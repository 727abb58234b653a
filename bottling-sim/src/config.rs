//! YAML configuration, deserialized with every field defaulted so a partial
//! or absent file still produces a complete configuration — the Rust
//! equivalent of the reference implementation's default-dict-plus-deep-merge.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub instance_id: String,
    pub speed_factor: f64,
    pub tick_hz: f64,
    pub schedule_xlsx: Option<String>,
    /// Not part of the recognized-options list in `SPEC_FULL.md` §6, but
    /// needed to honor §9's "seed it from configuration for reproducible
    /// tests" note.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            instance_id: "sim-1".to_string(),
            speed_factor: 60.0,
            tick_hz: 10.0,
            schedule_xlsx: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 502,
            unit_id: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnterpriseConfig {
    pub name: String,
    pub site: String,
    pub area: String,
    pub line: String,
}

impl Default for EnterpriseConfig {
    fn default() -> Self {
        Self {
            name: "ACME".to_string(),
            site: "Cork".to_string(),
            area: "Bottling".to_string(),
            line: "L1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    pub microstop_mean_interval_s: f64,
    pub base_reject_probability: f64,
    pub label_stock_initial_pct: f64,
    pub label_stock_depletion_per_1000: f64,
    pub cap_stock_initial_pct: f64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            microstop_mean_interval_s: 180.0,
            base_reject_probability: 0.003,
            label_stock_initial_pct: 100.0,
            label_stock_depletion_per_1000: 1.0,
            cap_stock_initial_pct: 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub transactions_file: String,
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            transactions_file: "logs/transactions.jsonl".to_string(),
            console: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulator: SimulatorConfig,
    pub modbus: ModbusConfig,
    pub enterprise: EnterpriseConfig,
    pub production: ProductionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load `path`, merged over defaults. A missing file is not an error:
    /// the all-defaults configuration is returned instead, matching the
    /// reference implementation's tolerance of an absent config file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/config.yaml")).unwrap();
        assert_eq!(config.modbus.port, 502);
        assert_eq!(config.simulator.speed_factor, 60.0);
    }

    #[test]
    fn partial_yaml_is_merged_over_defaults() {
        let yaml = "modbus:\n  port: 1502\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.modbus.port, 1502);
        assert_eq!(config.modbus.host, "0.0.0.0");
        assert_eq!(config.enterprise.name, "ACME");
    }
}
