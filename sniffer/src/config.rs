use capture::promiscuous::PromiscuousMode;
use capture::sniffer::{DEFAULT_QUEUE_CAPACITY, DEFAULT_RECEIVE_BUFFER_SIZE};
use dpi::filter::{Filters, Operator, Predicate};
use dpi::protocols::ip::protocol::IpProtocol;
use log::LevelFilter;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_OUTPUT: &str = "capture.pcapng";
const DEFAULT_STATISTICS_INTERVAL_MS: u64 = 1000;

// Smallest IPv4 header.
const MIN_RECEIVE_BUFFER_SIZE: usize = 20;

#[derive(Debug)]
pub struct Config {
    pub log_level: LevelFilter,
    pub log_format: String,
    pub log_to_file: bool,

    /// Identifier, display name or IPv4 address. `None` lists the interfaces.
    pub interface: Option<String>,
    pub output: PathBuf,

    pub queue_capacity: usize,
    pub receive_buffer_size: usize,
    pub promiscuous: PromiscuousMode,
    pub statistics_interval: Duration,
    pub log_packets: bool,

    pub filter: FilterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            log_format: common::logging::DEFAULT_FORMAT.to_string(),
            log_to_file: false,
            interface: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            promiscuous: PromiscuousMode::default(),
            statistics_interval: Duration::from_millis(DEFAULT_STATISTICS_INTERVAL_MS),
            log_packets: false,
            filter: FilterConfig::default(),
        }
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Config", 11)?;
        state.serialize_field("log_level", &self.log_level.to_string())?;
        state.serialize_field("log_format", &self.log_format)?;
        state.serialize_field("log_to_file", &self.log_to_file)?;
        state.serialize_field("interface", &self.interface)?;
        state.serialize_field("output", &self.output.display().to_string())?;
        state.serialize_field("queue_capacity", &self.queue_capacity)?;
        state.serialize_field("receive_buffer_size", &self.receive_buffer_size)?;
        state.serialize_field("promiscuous", &self.promiscuous)?;
        let interval = u64::try_from(self.statistics_interval.as_millis()).unwrap_or(u64::MAX);
        state.serialize_field("statistics_interval_ms", &interval)?;
        state.serialize_field("log_packets", &self.log_packets)?;
        // Tables go last in TOML.
        state.serialize_field("filter", &self.filter)?;
        state.end()
    }
}

impl Config {
    /// Reads `config.toml` from the working directory. A missing file is created with defaults.
    pub fn from_file() -> Result<Self, ConfigError> {
        let data = match std::fs::read_to_string(CONFIG_FILENAME) {
            Ok(value) => value,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                config.save_to_file()?;
                return Ok(config);
            },
            Err(err) => return Err(ConfigError::IOError(err)),
        };

        Self::from_toml(&data)
    }

    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let dto: ConfigDto =
            toml::from_str(data).map_err(ConfigError::TomlDeserializationError)?;
        dto.into_config()
    }

    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let data = toml::to_string(&self).map_err(ConfigError::TomlSerializationError)?;

        std::fs::write(CONFIG_FILENAME, data).map_err(ConfigError::IOError)?;

        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct ConfigDto {
    log_level: String,
    log_format: String,
    log_to_file: bool,
    interface: Option<String>,
    output: String,
    queue_capacity: usize,
    receive_buffer_size: usize,
    promiscuous: PromiscuousMode,
    statistics_interval_ms: u64,
    log_packets: bool,
    filter: FilterConfig,
}

impl Default for ConfigDto {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info.to_string(),
            log_format: common::logging::DEFAULT_FORMAT.to_string(),
            log_to_file: false,
            interface: None,
            output: DEFAULT_OUTPUT.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            promiscuous: PromiscuousMode::default(),
            statistics_interval_ms: DEFAULT_STATISTICS_INTERVAL_MS,
            log_packets: false,
            filter: FilterConfig::default(),
        }
    }
}

impl ConfigDto {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::WrongQueueCapacity);
        }
        if self.receive_buffer_size < MIN_RECEIVE_BUFFER_SIZE {
            return Err(ConfigError::WrongReceiveBufferSize(self.receive_buffer_size));
        }
        if self.statistics_interval_ms == 0 {
            return Err(ConfigError::WrongStatisticsInterval);
        }

        let interface = self
            .interface
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Config {
            log_level: LevelFilter::from_str(&self.log_level)
                .map_err(|_| ConfigError::UnknownLogLevel)?,
            log_format: self.log_format,
            log_to_file: self.log_to_file,
            interface,
            output: PathBuf::from(self.output),
            queue_capacity: self.queue_capacity,
            receive_buffer_size: self.receive_buffer_size,
            promiscuous: self.promiscuous,
            statistics_interval: Duration::from_millis(self.statistics_interval_ms),
            log_packets: self.log_packets,
            filter: self.filter,
        })
    }
}

/// `[filter]` table. Every present field becomes one predicate.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub operator: Operator,
    pub protocol: Option<u8>,
    pub source_address: Option<IpAddr>,
    pub destination_address: Option<IpAddr>,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
}

impl FilterConfig {
    pub fn to_filters(&self) -> Filters {
        let mut filters = Filters::new(self.operator);

        if let Some(value) = self.protocol {
            filters.push(Predicate::Protocol(IpProtocol::from(value)));
        }
        if let Some(value) = self.source_address {
            filters.push(Predicate::SourceAddress(value));
        }
        if let Some(value) = self.destination_address {
            filters.push(Predicate::DestinationAddress(value));
        }
        if let Some(value) = self.source_port {
            filters.push(Predicate::SourcePort(value));
        }
        if let Some(value) = self.destination_port {
            filters.push(Predicate::DestinationPort(value));
        }

        filters
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("TOML Serialization Error.")]
    TomlSerializationError(#[from] toml::ser::Error),

    #[error("TOML Deserialization Error.")]
    TomlDeserializationError(#[from] toml::de::Error),

    #[error("Unknown log level.")]
    UnknownLogLevel,

    #[error("Queue capacity must be at least 1.")]
    WrongQueueCapacity,

    #[error("Receive buffer of {0} bytes cannot hold an IPv4 header.")]
    WrongReceiveBufferSize(usize),

    #[error("Statistics interval must be at least 1 ms.")]
    WrongStatisticsInterval,
}

impl ConfigError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            ConfigError::IOError(err) => Some(err.to_string()),
            ConfigError::TomlSerializationError(err) => Some(err.to_string()),
            ConfigError::TomlDeserializationError(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let data = toml::to_string(&Config::default()).unwrap();
        let config = Config::from_toml(&data).unwrap();

        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.output, PathBuf::from("capture.pcapng"));
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.receive_buffer_size, 65_536);
        assert_eq!(config.promiscuous, PromiscuousMode::BestEffort);
        assert_eq!(config.statistics_interval, Duration::from_millis(1000));
        assert!(config.interface.is_none());
        assert!(config.filter.to_filters().is_empty());
    }

    #[test]
    fn test_partial_file() {
        let data = r#"
            log_level = "debug"
            interface = "eth0"
            promiscuous = "required"

            [filter]
            operator = "or"
            protocol = 6
            destination_address = "10.0.0.2"
            destination_port = 80
        "#;
        let config = Config::from_toml(data).unwrap();

        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.interface.as_deref(), Some("eth0"));
        assert_eq!(config.promiscuous, PromiscuousMode::Required);
        assert_eq!(config.queue_capacity, 10_000);

        let filters = config.filter.to_filters();
        assert_eq!(filters.operator(), Operator::Or);
        assert_eq!(
            filters.predicates(),
            &[
                Predicate::Protocol(IpProtocol::Tcp),
                Predicate::DestinationAddress(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))),
                Predicate::DestinationPort(80),
            ]
        );
    }

    #[test]
    fn test_blank_interface_is_none() {
        let config = Config::from_toml("interface = \"  \"").unwrap();
        assert!(config.interface.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_toml("log_level = \"loud\""),
            Err(ConfigError::UnknownLogLevel)
        ));
        assert!(matches!(
            Config::from_toml("queue_capacity = 0"),
            Err(ConfigError::WrongQueueCapacity)
        ));
        assert!(matches!(
            Config::from_toml("receive_buffer_size = 8"),
            Err(ConfigError::WrongReceiveBufferSize(8))
        ));
        assert!(matches!(
            Config::from_toml("promiscuous = \"sometimes\""),
            Err(ConfigError::TomlDeserializationError(_))
        ));
    }
}
