use pnet_datalink::NetworkInterface;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// One IPv4 address of a capture-capable device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterfaceDescriptor {
    pub index: usize,
    /// System name, as accepted by the capture channel.
    pub identifier: String,
    /// Human-readable name. Same as the identifier where the OS gives nothing better.
    pub name: String,
    pub address: Ipv4Addr,
    /// OS interface index the capture channel is bound to.
    pub device_index: u32,
}

impl InterfaceDescriptor {
    /// Identifier, display name or the address in dotted form.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();

        self.identifier == query
            || self.name == query
            || query.parse::<Ipv4Addr>().is_ok_and(|address| address == self.address)
    }

    pub fn is_device(&self, name: &str, device_index: u32) -> bool {
        self.identifier == name && self.device_index == device_index
    }
}

impl Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.identifier == self.name {
            write!(f, "[{}] {} ({})", self.index, self.name, self.address)
        } else {
            write!(
                f,
                "[{}] {} ({}, {})",
                self.index, self.name, self.identifier, self.address
            )
        }
    }
}

/// Devices with at least one IPv4 address, one descriptor per address.
pub fn list() -> Vec<InterfaceDescriptor> {
    pnet_datalink::interfaces()
        .iter()
        .flat_map(|device| {
            let name = display_name(device);
            device
                .ips
                .iter()
                .filter_map(|network| match network.ip() {
                    IpAddr::V4(value) => Some((device, name.clone(), value)),
                    IpAddr::V6(_) => None,
                })
                .collect::<Vec<_>>()
        })
        .enumerate()
        .map(|(index, (device, name, address))| InterfaceDescriptor {
            index,
            identifier: device.name.clone(),
            name,
            address,
            device_index: device.index,
        })
        .collect()
}

pub fn find(query: &str) -> Result<InterfaceDescriptor, InterfaceError> {
    list()
        .into_iter()
        .find(|descriptor| descriptor.matches(query))
        .ok_or_else(|| InterfaceError::UnknownInterface(query.to_string()))
}

fn display_name(device: &NetworkInterface) -> String {
    #[cfg(target_os = "windows")]
    let name = if device.description.is_empty() {
        device.name.clone()
    } else {
        device.description.clone()
    };

    #[cfg(not(target_os = "windows"))]
    let name = device.name.clone();

    name
}

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("There are no IPv4 interfaces matching \"{0}\".")]
    UnknownInterface(String),
}
