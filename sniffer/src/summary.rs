use dpi::{IpPacket, TransportPacket};

/// One-line description of a decoded packet for the trace log.
pub fn summary(packet: &IpPacket) -> String {
    let ip = match packet {
        IpPacket::V4(value) => value,
        IpPacket::Unsupported(value) => {
            return format!("{}, {} bytes, not decoded", value.version, value.raw.len());
        },
    };

    let endpoints = |port_source: u16, port_destination: u16| {
        format!(
            "{}:{} -> {}:{}",
            ip.address_source, port_source, ip.address_destination, port_destination
        )
    };

    match &ip.transport {
        Some(TransportPacket::Tcp(tcp)) => format!(
            "TCP {} [{}] seq={} ack={} len={}",
            endpoints(tcp.port_source, tcp.port_destination),
            tcp.flags,
            tcp.sequence_number,
            tcp.acknowledgement_number,
            tcp.payload.len()
        ),
        Some(TransportPacket::Udp(udp)) => format!(
            "UDP {} len={}",
            endpoints(udp.port_source, udp.port_destination),
            udp.payload.len()
        ),
        Some(TransportPacket::Icmp(icmp)) => format!(
            "ICMP {} -> {} type={} code={}",
            ip.address_source, ip.address_destination, icmp.message_type, icmp.code
        ),
        Some(TransportPacket::Raw(raw)) => format!(
            "{} {} -> {} len={}",
            ip.protocol,
            ip.address_source,
            ip.address_destination,
            raw.payload.len()
        ),
        None => format!(
            "{} {} -> {} ttl={}",
            ip.protocol, ip.address_source, ip.address_destination, ip.time_to_live
        ),
    }
}
