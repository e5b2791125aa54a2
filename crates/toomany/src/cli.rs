//! Command line and environment configuration

use clap::Parser;
use std::num::NonZeroUsize;
use std::time::Duration;
use toomany_core::server::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SHUTDOWN_TIMEOUT};
use toomany_core::ServerConfig;

use crate::logging::LoggingConfig;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// HTTP stub that answers every POST with 429 Too Many Requests
#[derive(Debug, Parser)]
#[command(name = "toomany", version, about, long_about = None)]
pub struct Cli {
    /// IP address to listen on
    #[arg(long, env = "TOOMANY_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TOOMANY_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Runtime worker threads [default: number of CPUs]
    #[arg(long, env = "TOOMANY_WORKERS")]
    pub workers: Option<NonZeroUsize>,

    /// How long to wait for open connections on shutdown
    #[arg(
        long,
        env = "TOOMANY_SHUTDOWN_TIMEOUT_MS",
        default_value_t = DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64
    )]
    pub shutdown_timeout_ms: u64,

    /// Log level, overridden by a TOOMANY_LOG filter directive
    #[arg(
        long,
        env = "TOOMANY_LOG_LEVEL",
        default_value = "info",
        value_parser = LOG_LEVELS
    )]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "TOOMANY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            workers: self.workers.map_or(defaults.workers, NonZeroUsize::get),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json_format: self.json_logs,
        }
    }
}
