use crate::frame::Frame;
use crate::output::pcapng::block::Block;
use crate::output::{Output, OutputError};
use bytes::BytesMut;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// PCAP Next Generation Dump File Format
// https://www.ietf.org/archive/id/draft-ietf-opsawg-pcapng-02.html

pub const ALIGNMENT_BYTES: usize = 4;

/// Values written into the section and interface headers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CaptureMetadata {
    pub os: String,
    pub application: String,
    pub interface_name: String,
    pub interface_description: String,
}

/// Single-section, single-interface PCAPNG writer.
/// Section and interface headers go out on creation, every packet block is flushed.
pub struct PcapNgWriter<W: Write> {
    writer: W,
    scratch: BytesMut,
}

impl PcapNgWriter<BufWriter<File>> {
    pub fn create(
        path: impl AsRef<Path>, scratch: BytesMut, metadata: &CaptureMetadata,
    ) -> Result<Self, OutputError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), scratch, metadata)
    }
}

impl<W: Write> PcapNgWriter<W> {
    pub fn new(
        writer: W, scratch: BytesMut, metadata: &CaptureMetadata,
    ) -> Result<Self, OutputError> {
        let mut pcapng = Self { writer, scratch };

        pcapng.write_block(&Block::section_header(&metadata.os, &metadata.application))?;
        pcapng.write_block(&Block::interface_description(
            &metadata.interface_name,
            &metadata.interface_description,
        ))?;

        Ok(pcapng)
    }

    pub fn write_packet(&mut self, frame: &Frame) -> Result<(), OutputError> {
        self.write_block(&Block::enhanced_packet(frame))
    }

    fn write_block(&mut self, block: &Block) -> Result<(), OutputError> {
        self.scratch.clear();
        block.encode(&mut self.scratch)?;

        self.writer.write_all(&self.scratch)?;
        self.writer.flush()?;

        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Output for PcapNgWriter<W> {
    fn accept(&mut self, frame: &Frame) -> Result<(), OutputError> {
        self.write_packet(frame)
    }
}

/// Length rounded up to the 32-bit boundary.
pub fn padded_length(length: usize) -> usize {
    length.div_ceil(ALIGNMENT_BYTES) * ALIGNMENT_BYTES
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EncodeError {
    #[error("Option {code} value is {length} bytes long, the limit is 65535.")]
    OptionTooLong { code: u16, length: usize },

    #[error("Block of {0} bytes does not fit the 32-bit length field.")]
    BlockTooLong(usize),
}

pub mod block;
pub mod option;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn metadata() -> CaptureMetadata {
        CaptureMetadata {
            os: "Linux".to_string(),
            application: "sniffer".to_string(),
            interface_name: "eth0".to_string(),
            interface_description: "Ethernet".to_string(),
        }
    }

    #[test]
    fn test_padded_length() {
        assert_eq!(padded_length(0), 0);
        assert_eq!(padded_length(1), 4);
        assert_eq!(padded_length(3), 4);
        assert_eq!(padded_length(4), 4);
        assert_eq!(padded_length(5), 8);
    }

    #[test]
    fn test_headers_written_on_creation() {
        let pcapng = PcapNgWriter::new(Vec::new(), BytesMut::new(), &metadata()).unwrap();
        let bytes = pcapng.into_inner();

        // SHB 56 bytes, IDB 52 bytes.
        assert_eq!(bytes.len(), 56 + 52);
        assert_eq!(bytes[..4], [0x0A, 0x0D, 0x0D, 0x0A]);
        assert_eq!(bytes[56..60], [0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_packets_follow_headers() {
        let time = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        let mut pcapng =
            PcapNgWriter::new(Vec::new(), BytesMut::with_capacity(128), &metadata()).unwrap();

        let first = Frame::new(vec![0x45; 20], time);
        let second = Frame::new(vec![0x45; 21], time);
        pcapng.accept(&first).unwrap();
        pcapng.accept(&second).unwrap();

        let bytes = pcapng.into_inner();
        let first_offset = 56 + 52;
        let second_offset = first_offset + 32 + 20;

        assert_eq!(bytes.len(), second_offset + 32 + 24);
        assert_eq!(bytes[first_offset..first_offset + 4], [0x06, 0x00, 0x00, 0x00]);
        assert_eq!(bytes[second_offset..second_offset + 4], [0x06, 0x00, 0x00, 0x00]);

        // Captured length of the second packet.
        assert_eq!(
            bytes[second_offset + 20..second_offset + 24],
            [0x15, 0x00, 0x00, 0x00]
        );
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_io_error_is_reported() {
        let result = PcapNgWriter::new(FailingWriter, BytesMut::new(), &metadata());
        assert!(matches!(result, Err(OutputError::IOError(_))));
    }
}
