//! Configuration module for the path server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::graph::{
    GraphLimits, DEFAULT_MAX_EDGES, DEFAULT_MAX_VERTICES, DEFAULT_MIN_EDGES, DEFAULT_MIN_VERTICES,
};
use crate::wire::{MAX_PAYLOAD, RESPONSE_HEADER_LEN};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Transport the server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Length-prefixed frames over TCP, one thread per connection
    #[default]
    Tcp,
    /// One request per datagram over UDP, served sequentially
    Udp,
}

/// Command-line arguments for the path server
#[derive(Parser, Debug)]
#[command(name = "graph-path-server")]
#[command(version)]
#[command(about = "Answers shortest-path queries over client-supplied graphs", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:8080)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Transport protocol
    #[arg(short = 't', long, value_enum)]
    pub transport: Option<Transport>,

    /// Maximum concurrent TCP connections (0 = unlimited)
    #[arg(short = 'm', long)]
    pub max_connections: Option<usize>,

    /// Read/write timeout for TCP connections in seconds (0 = none)
    #[arg(long)]
    pub io_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub transport: Transport,
    /// Maximum concurrent TCP connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connection read/write timeout in seconds
    #[serde(default = "default_io_timeout")]
    pub io_timeout: u64,
    /// Largest accepted frame payload or datagram
    #[serde(default = "default_max_payload")]
    pub max_payload: usize,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            transport: Transport::default(),
            max_connections: default_max_connections(),
            io_timeout: default_io_timeout(),
            max_payload: default_max_payload(),
            backlog: default_backlog(),
        }
    }
}

/// Graph size bounds
#[derive(Debug, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_min_vertices")]
    pub min_vertices: usize,
    #[serde(default = "default_max_vertices")]
    pub max_vertices: usize,
    #[serde(default = "default_min_edges")]
    pub min_edges: usize,
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_vertices: default_min_vertices(),
            max_vertices: default_max_vertices(),
            min_edges: default_min_edges(),
            max_edges: default_max_edges(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_io_timeout() -> u64 {
    30
}

fn default_max_payload() -> usize {
    MAX_PAYLOAD
}

fn default_backlog() -> i32 {
    128
}

fn default_min_vertices() -> usize {
    DEFAULT_MIN_VERTICES
}

fn default_max_vertices() -> usize {
    DEFAULT_MAX_VERTICES
}

fn default_min_edges() -> usize {
    DEFAULT_MIN_EDGES
}

fn default_max_edges() -> usize {
    DEFAULT_MAX_EDGES
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub transport: Transport,
    pub max_connections: usize,
    pub io_timeout: u64,
    pub max_payload: usize,
    pub backlog: i32,
    pub limits: GraphLimits,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            transport: Transport::default(),
            max_connections: default_max_connections(),
            io_timeout: default_io_timeout(),
            max_payload: default_max_payload(),
            backlog: default_backlog(),
            limits: GraphLimits::default(),
            log_level: default_log_level(),
        }
    }
}

impl CliArgs {
    #[cfg(test)]
    fn default_args() -> Self {
        CliArgs {
            config: None,
            listen: None,
            transport: None,
            max_connections: None,
            io_timeout: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve already-parsed CLI args, reading the TOML file they name.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::resolve(cli, toml_config)
    }

    /// Merge CLI args with TOML config and validate the result.
    pub fn resolve(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let listen_str = cli.listen.unwrap_or(toml_config.server.listen);
        let listen = listen_str
            .parse()
            .map_err(|e| ConfigError::InvalidListen(listen_str.clone(), e))?;

        let graph = toml_config.graph;
        let limits = GraphLimits {
            min_vertices: graph.min_vertices,
            max_vertices: graph.max_vertices,
            min_edges: graph.min_edges,
            max_edges: graph.max_edges,
        };
        if limits.min_vertices > limits.max_vertices || limits.min_edges > limits.max_edges {
            return Err(ConfigError::InvalidLimits(limits));
        }

        let max_payload = toml_config.server.max_payload;
        if max_payload < RESPONSE_HEADER_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "max_payload must be at least {RESPONSE_HEADER_LEN} bytes, got {max_payload}"
            )));
        }

        // A path visits each vertex at most once, so the longest success
        // response must still fit one frame or datagram.
        let longest_response = limits
            .max_vertices
            .checked_mul(4)
            .and_then(|n| n.checked_add(RESPONSE_HEADER_LEN));
        if longest_response.map_or(true, |len| len > max_payload) {
            return Err(ConfigError::InvalidValue(format!(
                "max_vertices {} needs responses larger than max_payload {max_payload}",
                limits.max_vertices
            )));
        }

        Ok(Config {
            listen,
            transport: cli.transport.unwrap_or(toml_config.server.transport),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            io_timeout: cli.io_timeout.unwrap_or(toml_config.server.io_timeout),
            max_payload,
            backlog: toml_config.server.backlog,
            limits,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }

    /// Socket read/write timeout, `None` when disabled.
    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout > 0).then(|| Duration::from_secs(self.io_timeout))
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {1}", path = .0.display())]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{path}': {1}", path = .0.display())]
    TomlParse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid listen address '{0}': {1}")]
    InvalidListen(String, #[source] AddrParseError),

    #[error("Invalid graph limits: {0:?}")]
    InvalidLimits(GraphLimits),

    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.server.transport, Transport::Tcp);
        assert_eq!(config.server.max_payload, 4096);
        assert_eq!(config.graph.min_vertices, 2);
        assert_eq!(config.graph.max_edges, 500);
    }

    #[test]
    fn test_resolved_default() {
        let config = Config::default();
        assert_eq!(config.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.limits, GraphLimits::default());
        assert_eq!(config.io_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:9000"
            transport = "udp"
            max_connections = 8
            io_timeout = 0

            [graph]
            min_vertices = 6
            max_vertices = 20

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.server.transport, Transport::Udp);
        assert_eq!(config.server.max_connections, 8);
        assert_eq!(config.graph.min_vertices, 6);
        assert_eq!(config.graph.max_vertices, 20);
        assert_eq!(config.graph.min_edges, 1);
        assert_eq!(config.logging.level, "debug");

        let resolved = Config::resolve(CliArgs::default_args(), config).unwrap();
        assert_eq!(resolved.io_timeout(), None);
        assert_eq!(resolved.log_level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nlisten = \"127.0.0.1:7000\"\ntransport = \"udp\"\nmax_connections = 4"
        )
        .unwrap();

        let cli = CliArgs::try_parse_from([
            "graph-path-server",
            "--config",
            file.path().to_str().unwrap(),
            "--listen",
            "127.0.0.1:7001",
            "--transport",
            "tcp",
        ])
        .unwrap();
        let config = Config::from_args(cli).unwrap();
        assert_eq!(config.listen.port(), 7001);
        assert_eq!(config.transport, Transport::Tcp);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_invalid_listen() {
        let cli = CliArgs::try_parse_from(["graph-path-server", "-l", "not-an-address"]).unwrap();
        assert!(matches!(
            Config::from_args(cli),
            Err(ConfigError::InvalidListen(..))
        ));
    }

    #[test]
    fn test_inverted_limits() {
        let toml_config: TomlConfig =
            toml::from_str("[graph]\nmin_edges = 10\nmax_edges = 5").unwrap();
        assert!(matches!(
            Config::resolve(CliArgs::default_args(), toml_config),
            Err(ConfigError::InvalidLimits(_))
        ));
    }

    #[test]
    fn test_vertex_limit_must_fit_payload() {
        let toml_config: TomlConfig =
            toml::from_str("[graph]\nmax_vertices = 2000").unwrap();
        assert!(matches!(
            Config::resolve(CliArgs::default_args(), toml_config),
            Err(ConfigError::InvalidValue(_))
        ));

        // 12 + 4 * 1021 = 4096 still fits.
        let toml_config: TomlConfig =
            toml::from_str("[graph]\nmax_vertices = 1021").unwrap();
        let config = Config::resolve(CliArgs::default_args(), toml_config).unwrap();
        assert_eq!(config.limits.max_vertices, 1021);

        let toml_config: TomlConfig =
            toml::from_str("[server]\nmax_payload = 1024\n[graph]\nmax_vertices = 1000").unwrap();
        assert!(Config::resolve(CliArgs::default_args(), toml_config).is_err());
    }

    #[test]
    fn test_missing_file() {
        let cli = CliArgs::try_parse_from([
            "graph-path-server",
            "--config",
            "/nonexistent/graph-path-server.toml",
        ])
        .unwrap();
        assert!(matches!(
            Config::from_args(cli),
            Err(ConfigError::FileRead(..))
        ));
    }
}
