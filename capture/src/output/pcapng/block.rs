use crate::frame::Frame;
use crate::output::pcapng::option::{BlockOption, codes};
use crate::output::pcapng::{EncodeError, padded_length};
use bytes::{BufMut, BytesMut};

pub const SECTION_HEADER_TYPE: u32 = 0x0A0D_0D0A;
pub const INTERFACE_DESCRIPTION_TYPE: u32 = 0x0000_0001;
pub const ENHANCED_PACKET_TYPE: u32 = 0x0000_0006;

pub const BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
pub const MAJOR_VERSION: u16 = 1;
pub const MINOR_VERSION: u16 = 0;
pub const SECTION_LENGTH_UNSPECIFIED: u64 = u64::MAX;

// Raw IPv4/IPv6, no link-layer header.
pub const LINKTYPE_RAW: u16 = 101;
pub const SNAP_LENGTH: u32 = 65535;
// 10^-3 seconds.
pub const TIMESTAMP_RESOLUTION_MILLIS: u8 = 3;

// Block Type + two Block Total Length fields.
pub const FRAMING_LENGTH_BYTES: usize = 12;

#[derive(Clone, Debug, PartialEq)]
pub enum Block<'a> {
    SectionHeader {
        options: Vec<BlockOption>,
    },
    InterfaceDescription {
        link_type: u16,
        snap_length: u32,
        options: Vec<BlockOption>,
    },
    EnhancedPacket {
        interface_id: u32,
        timestamp: u64,
        data: &'a [u8],
    },
}

impl<'a> Block<'a> {
    pub fn section_header(os: &str, application: &str) -> Self {
        Self::SectionHeader {
            options: vec![
                BlockOption::new(codes::SHB_OS, os),
                BlockOption::new(codes::SHB_USER_APPLICATION, application),
            ],
        }
    }

    pub fn interface_description(name: &str, description: &str) -> Self {
        Self::InterfaceDescription {
            link_type: LINKTYPE_RAW,
            snap_length: SNAP_LENGTH,
            options: vec![
                BlockOption::new(codes::IF_NAME, name),
                BlockOption::new(codes::IF_DESCRIPTION, description),
                BlockOption::new(
                    codes::IF_TIMESTAMP_RESOLUTION,
                    vec![TIMESTAMP_RESOLUTION_MILLIS],
                ),
            ],
        }
    }

    /// Packet block on interface 0. Timestamps before the epoch are written as zero.
    pub fn enhanced_packet(frame: &'a Frame) -> Self {
        let timestamp = u64::try_from(frame.captured_at().timestamp_millis()).unwrap_or(0);

        Self::EnhancedPacket {
            interface_id: 0,
            timestamp,
            data: frame.data(),
        }
    }

    pub fn block_type(&self) -> u32 {
        match self {
            Self::SectionHeader { .. } => SECTION_HEADER_TYPE,
            Self::InterfaceDescription { .. } => INTERFACE_DESCRIPTION_TYPE,
            Self::EnhancedPacket { .. } => ENHANCED_PACKET_TYPE,
        }
    }

    fn body_length(&self) -> usize {
        match self {
            // Magic 4, versions 2 + 2, section length 8
            Self::SectionHeader { options } => 16 + options_length(options),
            // Link type 2, reserved 2, snap length 4
            Self::InterfaceDescription { options, .. } => 8 + options_length(options),
            // Interface 4, timestamp 4 + 4, captured length 4, original length 4
            Self::EnhancedPacket { data, .. } => 20 + padded_length(data.len()),
        }
    }

    /// Size of the whole block, known before any byte is written.
    pub fn total_length(&self) -> Result<u32, EncodeError> {
        let length = FRAMING_LENGTH_BYTES + self.body_length();
        u32::try_from(length).map_err(|_| EncodeError::BlockTooLong(length))
    }

    pub fn encode(&self, buffer: &mut BytesMut) -> Result<(), EncodeError> {
        let total_length = self.total_length()?;
        let start = buffer.len();
        buffer.reserve(total_length as usize);

        buffer.put_u32_le(self.block_type());
        buffer.put_u32_le(total_length);

        let result = self.encode_body(buffer);
        if result.is_err() {
            buffer.truncate(start);
            return result;
        }

        buffer.put_u32_le(total_length);

        Ok(())
    }

    fn encode_body(&self, buffer: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            Self::SectionHeader { options } => {
                buffer.put_u32_le(BYTE_ORDER_MAGIC);
                buffer.put_u16_le(MAJOR_VERSION);
                buffer.put_u16_le(MINOR_VERSION);
                buffer.put_u64_le(SECTION_LENGTH_UNSPECIFIED);
                encode_options(options, buffer)
            },
            Self::InterfaceDescription {
                link_type,
                snap_length,
                options,
            } => {
                buffer.put_u16_le(*link_type);
                // Reserved
                buffer.put_u16_le(0);
                buffer.put_u32_le(*snap_length);
                encode_options(options, buffer)
            },
            Self::EnhancedPacket {
                interface_id,
                timestamp,
                data,
            } => {
                let length = u32::try_from(data.len())
                    .map_err(|_| EncodeError::BlockTooLong(data.len()))?;

                buffer.put_u32_le(*interface_id);
                buffer.put_u32_le((timestamp >> 32) as u32);
                buffer.put_u32_le(*timestamp as u32);
                // Captured length, then original length. Frames are never truncated.
                buffer.put_u32_le(length);
                buffer.put_u32_le(length);
                buffer.put_slice(data);
                buffer.put_bytes(0, padded_length(data.len()) - data.len());
                Ok(())
            },
        }
    }
}

fn options_length(options: &[BlockOption]) -> usize {
    options.iter().map(BlockOption::length).sum::<usize>()
        + BlockOption::end_of_options().length()
}

fn encode_options(options: &[BlockOption], buffer: &mut BytesMut) -> Result<(), EncodeError> {
    for option in options {
        option.encode(buffer)?;
    }

    BlockOption::end_of_options().encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn encode(block: &Block) -> BytesMut {
        let mut buffer = BytesMut::new();
        block.encode(&mut buffer).unwrap();
        buffer
    }

    fn assert_framing(block: &Block, buffer: &[u8]) {
        let total_length = block.total_length().unwrap();
        let leading = u32::from_le_bytes(buffer[4..8].try_into().unwrap());
        let trailing = u32::from_le_bytes(buffer[buffer.len() - 4..].try_into().unwrap());

        assert_eq!(buffer.len(), total_length as usize);
        assert_eq!(leading, total_length);
        assert_eq!(trailing, total_length);
        assert_eq!(buffer.len() % 4, 0);
    }

    #[test]
    fn test_section_header() {
        let block = Block::section_header("Linux", "sniffer");
        let buffer = encode(&block);

        let hex_expected = "0A 0D 0D 0A 38 00 00 00 4D 3C 2B 1A 01 00 00 00 FF FF FF FF FF FF FF FF \
                            03 00 05 00 4C 69 6E 75 78 00 00 00 \
                            04 00 07 00 73 6E 69 66 66 65 72 00 \
                            00 00 00 00 \
                            38 00 00 00"
            .replace(" ", "");

        assert_eq!(&buffer[..], hex::decode(hex_expected).unwrap());
        assert_framing(&block, &buffer);
    }

    #[test]
    fn test_interface_description() {
        let block = Block::interface_description("eth0", "Ethernet");
        let buffer = encode(&block);

        let hex_expected = "01 00 00 00 34 00 00 00 65 00 00 00 FF FF 00 00 \
                            02 00 04 00 65 74 68 30 \
                            03 00 08 00 45 74 68 65 72 6E 65 74 \
                            09 00 01 00 03 00 00 00 \
                            00 00 00 00 \
                            34 00 00 00"
            .replace(" ", "");

        assert_eq!(&buffer[..], hex::decode(hex_expected).unwrap());
        assert_framing(&block, &buffer);
    }

    #[test]
    fn test_enhanced_packet_padding() {
        let time = Utc.timestamp_millis_opt(0x0000_0123_4567_89AB).single().unwrap();
        let frame = Frame::new(vec![0x45, 0x00, 0x00, 0x14, 0xAA], time);
        let block = Block::enhanced_packet(&frame);
        let buffer = encode(&block);

        let hex_expected = "06 00 00 00 28 00 00 00 00 00 00 00 \
                            23 01 00 00 AB 89 67 45 05 00 00 00 05 00 00 00 \
                            45 00 00 14 AA 00 00 00 \
                            28 00 00 00"
            .replace(" ", "");

        assert_eq!(&buffer[..], hex::decode(hex_expected).unwrap());
        assert_framing(&block, &buffer);
    }

    #[test]
    fn test_framing_for_every_data_length() {
        for length in 0..9 {
            let frame = Frame::now(vec![0x45; length]);
            let block = Block::enhanced_packet(&frame);
            let buffer = encode(&block);

            assert_framing(&block, &buffer);
        }
    }

    #[test]
    fn test_failed_block_leaves_buffer_untouched() {
        let block = Block::SectionHeader {
            options: vec![BlockOption::new(codes::SHB_OS, vec![0x41; 70000])],
        };
        let mut buffer = BytesMut::from(&[0xFFu8; 4][..]);

        assert!(block.encode(&mut buffer).is_err());
        assert_eq!(&buffer[..], [0xFF; 4]);
    }
}
