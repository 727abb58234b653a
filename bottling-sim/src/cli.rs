//! Command-line surface: `--config`, `--speed`, `--port`, `--loglevel`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "ISA-95 bottling-line simulator")]
pub struct Cli {
    /// YAML configuration file. Missing is tolerated; defaults apply.
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Override `simulator.speed_factor`.
    #[arg(long)]
    pub speed: Option<f64>,

    /// Override `modbus.port`.
    #[arg(long)]
    pub port: Option<u16>,

    /// Override `logging.level`.
    #[arg(long, value_enum)]
    pub loglevel: Option<LogLevel>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
        }
    }
}
