use crate::interface::InterfaceDescriptor;
use crate::promiscuous::PromiscuousMode;
use dpi::protocols::ethernet;
use pnet_datalink::{Channel, ChannelType, Config, DataLinkReceiver, NetworkInterface};
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;

// Ethernet header with two VLAN tags.
const LINK_HEADER_ROOM: usize = 22;

/// Anything that yields raw IP datagrams, one per call.
pub trait PacketSource: Send + 'static {
    /// Blocks until a datagram arrives or the read timeout elapses.
    /// `Ok(0)` means the source saw something that is not an IPv4 datagram.
    fn receive(&mut self, buffer: &mut [u8]) -> std::io::Result<usize>;
}

/// Timeouts only give the receiving loop a chance to look at the shutdown flag.
pub fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

/// Link-layer channel bound to one device, delivering the IPv4 datagrams it carries.
pub struct DatalinkSocket {
    receiver: Box<dyn DataLinkReceiver>,
}

impl DatalinkSocket {
    pub fn open(
        interface: &InterfaceDescriptor, receive_buffer_size: usize, read_timeout: Duration,
        promiscuous: PromiscuousMode,
    ) -> Result<Self, SocketError> {
        let device = Self::device(interface)?;

        let receiver = promiscuous.open(|enabled| {
            Self::channel(&device, enabled, receive_buffer_size, read_timeout)
        })?;

        log::info!(
            "Capture channel opened on {} ({}), promiscuous mode: {}.",
            interface.name,
            interface.address,
            promiscuous
        );

        Ok(Self { receiver })
    }

    // Same name and OS index: the device was not replaced since it was listed.
    fn device(interface: &InterfaceDescriptor) -> Result<NetworkInterface, SocketError> {
        pnet_datalink::interfaces()
            .into_iter()
            .find(|device| interface.is_device(&device.name, device.index))
            .ok_or_else(|| SocketError::DeviceNotFound(interface.identifier.clone()))
    }

    fn channel(
        device: &NetworkInterface, promiscuous: bool, receive_buffer_size: usize,
        read_timeout: Duration,
    ) -> Result<Box<dyn DataLinkReceiver>, SocketError> {
        let config = Config {
            read_buffer_size: receive_buffer_size + LINK_HEADER_ROOM,
            read_timeout: Some(read_timeout),
            channel_type: ChannelType::Layer2,
            promiscuous,
            ..Config::default()
        };

        match pnet_datalink::channel(device, config) {
            Ok(Channel::Ethernet(_, receiver)) => Ok(receiver),
            Ok(_) => Err(SocketError::UnsupportedChannel),
            Err(err) => Err(SocketError::ChannelError(err)),
        }
    }
}

impl PacketSource for DatalinkSocket {
    fn receive(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        let frame = self.receiver.next()?;

        Ok(copy_ipv4_datagram(frame, buffer))
    }
}

/// Copies the IPv4 datagram of an Ethernet frame into `buffer`, cut to its length.
/// Returns 0 for frames without one.
pub fn copy_ipv4_datagram(frame: &[u8], buffer: &mut [u8]) -> usize {
    let datagram = match ethernet::parse(frame).ok().and_then(|value| value.ipv4()) {
        Some(value) => value,
        None => return 0,
    };

    let length = datagram.len().min(buffer.len());
    buffer[..length].copy_from_slice(&datagram[..length]);
    length
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Device \"{0}\" is no longer available.")]
    DeviceNotFound(String),

    #[error("Failed to open capture channel. Elevated privileges may be required. {0}")]
    ChannelError(std::io::Error),

    #[error("Device does not provide an Ethernet channel.")]
    UnsupportedChannel,

    #[error("Failed to receive from capture channel.")]
    ReceiveError(std::io::Error),
}

impl SocketError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            SocketError::ReceiveError(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(hex_actual: &str) -> Vec<u8> {
        hex::decode(hex_actual.replace(" ", "")).unwrap()
    }

    const MACS: &str = "00 1A 2B 3C 4D 5E 00 5E 4D 3C 2B 1A";
    const IPV4: &str = "45 00 00 1C 00 01 00 00 40 11 00 00 0A 00 00 01 0A 00 00 02 00 35 D4 31 00 08 00 00";

    #[test]
    fn test_timeouts_are_not_errors() {
        assert!(is_timeout(&std::io::Error::from(ErrorKind::WouldBlock)));
        assert!(is_timeout(&std::io::Error::from(ErrorKind::TimedOut)));
        assert!(!is_timeout(&std::io::Error::from(ErrorKind::PermissionDenied)));
        assert!(!is_timeout(&std::io::Error::from(ErrorKind::ConnectionReset)));
    }

    #[test]
    fn test_ipv4_datagram_is_unwrapped() {
        let frame = bytes(&format!("{MACS} 08 00 {IPV4}"));
        let mut buffer = vec![0u8; 64];

        let length = copy_ipv4_datagram(&frame, &mut buffer);

        assert_eq!(length, 28);
        assert_eq!(&buffer[..length], &bytes(IPV4)[..]);
    }

    #[test]
    fn test_tagged_frame() {
        let frame = bytes(&format!("{MACS} 81 00 00 0A 08 00 {IPV4}"));
        let mut buffer = vec![0u8; 64];

        assert_eq!(copy_ipv4_datagram(&frame, &mut buffer), 28);
        assert_eq!(buffer[0], 0x45);
    }

    #[test]
    fn test_non_ipv4_frames_are_skipped() {
        let mut buffer = vec![0u8; 64];

        let arp = bytes(&format!("{MACS} 08 06 00 01 08 00 06 04 00 01"));
        assert_eq!(copy_ipv4_datagram(&arp, &mut buffer), 0);

        let ipv6 = bytes(&format!("{MACS} 86 DD 60 00 00 00"));
        assert_eq!(copy_ipv4_datagram(&ipv6, &mut buffer), 0);

        assert_eq!(copy_ipv4_datagram(&bytes("00 1A 2B"), &mut buffer), 0);
    }

    #[test]
    fn test_datagram_longer_than_buffer_is_cut() {
        let frame = bytes(&format!("{MACS} 08 00 {IPV4}"));
        let mut buffer = vec![0u8; 20];

        assert_eq!(copy_ipv4_datagram(&frame, &mut buffer), 20);
        assert_eq!(&buffer[..], &bytes(IPV4)[..20]);
    }
}
