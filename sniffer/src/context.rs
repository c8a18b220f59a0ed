use crate::config::Config;
use capture::Settings;
use capture::interface::{self, InterfaceDescriptor, InterfaceError};
use capture::output::pcapng::CaptureMetadata;
use capture::sniffer::DEFAULT_READ_TIMEOUT;
use thiserror::Error;

/// Configuration resolved against the machine.
pub struct Context {
    pub config: Config,
    pub interface: InterfaceDescriptor,
}

impl Context {
    pub fn new(config: Config) -> Result<Self, ContextError> {
        let query = match &config.interface {
            Some(value) => value,
            None => {
                let available = interface::list();
                return Err(ContextError::InterfaceNotSet(available));
            },
        };

        let interface = interface::find(query).map_err(ContextError::InterfaceError)?;

        Ok(Self { config, interface })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            queue_capacity: self.config.queue_capacity,
            receive_buffer_size: self.config.receive_buffer_size,
            read_timeout: DEFAULT_READ_TIMEOUT,
            promiscuous: self.config.promiscuous,
        }
    }

    pub fn metadata(&self) -> CaptureMetadata {
        CaptureMetadata {
            os: std::env::consts::OS.to_string(),
            application: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            interface_name: self.interface.identifier.clone(),
            interface_description: format!("{} ({})", self.interface.name, self.interface.address),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Interface error.")]
    InterfaceError(InterfaceError),

    #[error("Interface is not set in the config.")]
    InterfaceNotSet(Vec<InterfaceDescriptor>),
}

impl ContextError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            ContextError::InterfaceError(err) => Some(err.to_string()),
            ContextError::InterfaceNotSet(available) if available.is_empty() => {
                Some("No interfaces with IPv4 addresses found.".to_string())
            },
            ContextError::InterfaceNotSet(available) => {
                let list: Vec<String> = available.iter().map(|value| value.to_string()).collect();
                Some(format!("Available interfaces:\n{}", list.join("\n")))
            },
        }
    }
}
