use crate::frame::Frame;
use crate::output::Output;
use crate::queue::FrameReceiver;
use crate::statistics::Statistics;
use dpi::filter::Filters;
use dpi::IpPacket;
use std::sync::Arc;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type Handler = Box<dyn FnMut(&IpPacket) -> Result<(), HandlerError> + Send>;

/// What happened to a single frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    Captured,
    Filtered,
    Undecodable,
    OutputFailed,
}

/// Consumer side of the queue: decode, filter, notify subscribers, write.
pub struct FrameProcessor {
    filters: Filters,
    handlers: Vec<Handler>,
    output: Option<Box<dyn Output>>,
    statistics: Arc<Statistics>,
}

impl FrameProcessor {
    pub fn new(filters: Filters, statistics: Arc<Statistics>) -> Self {
        Self {
            filters,
            handlers: Vec::new(),
            output: None,
            statistics,
        }
    }

    /// Subscribers see fully decoded packets, in registration order.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&IpPacket) -> Result<(), HandlerError> + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn set_output(&mut self, output: Box<dyn Output>) {
        self.output = Some(output);
    }

    /// Blocks on the queue until it is closed and drained.
    pub fn run(mut self, receiver: FrameReceiver) {
        log::info!("Processing started. Filter: {}.", self.filters);

        for frame in receiver.iter() {
            self.process(&frame);
        }

        log::info!("Queue closed and drained. Processing stopped.");
    }

    pub fn process(&mut self, frame: &Frame) -> Disposition {
        if self.handlers.is_empty() && self.filters.is_empty() {
            return self.forward(frame);
        }

        let packet = match dpi::decode(frame.data(), frame.captured_at()) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Frame of {} bytes dropped. {}", frame.len(), err);
                return Disposition::Undecodable;
            },
        };

        if !self.filters.is_empty() && !self.filters.is_match(&packet) {
            return Disposition::Filtered;
        }

        for handler in self.handlers.iter_mut() {
            if let Err(err) = handler(&packet) {
                log::warn!("Subscriber failed: {}", err);
            }
        }

        self.forward(frame)
    }

    fn forward(&mut self, frame: &Frame) -> Disposition {
        if let Some(output) = self.output.as_mut()
            && let Err(err) = output.accept(frame)
        {
            let mut message = format!("Failed to write frame. Error: {err}.");
            if let Some(additional_info) = err.additional_info() {
                message.push_str(&format!(" Additional_info: {additional_info}"));
            }
            log::error!("{}", message);
            return Disposition::OutputFailed;
        }

        self.statistics.increment_captured();
        Disposition::Captured
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::output::OutputError;
    use dpi::TransportPacket;
    use dpi::filter::{Operator, Predicate};
    use dpi::protocols::ip::protocol::IpProtocol;
    use std::sync::Mutex;

    /// Keeps copies of accepted frames.
    #[derive(Clone, Default)]
    pub struct MemoryOutput {
        pub frames: Arc<Mutex<Vec<Frame>>>,
    }

    impl Output for MemoryOutput {
        fn accept(&mut self, frame: &Frame) -> Result<(), OutputError> {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    struct BrokenOutput;

    impl Output for BrokenOutput {
        fn accept(&mut self, _: &Frame) -> Result<(), OutputError> {
            Err(OutputError::IOError(std::io::Error::other("disk full")))
        }
    }

    pub fn tcp_frame(port_destination: u16) -> Frame {
        let hex_actual = "45 00 00 28 00 00 40 00 40 06 00 00 0A 00 00 01 0A 00 00 02 C3 50 00 00 00 00 00 01 00 00 00 00 50 02 FF FF 00 00 00 00".replace(" ", "");
        let mut data = hex::decode(hex_actual).unwrap();
        data[22..24].copy_from_slice(&port_destination.to_be_bytes());
        Frame::now(data)
    }

    fn port_80() -> Filters {
        Filters::with_predicates(
            Operator::And,
            vec![
                Predicate::Protocol(IpProtocol::Tcp),
                Predicate::DestinationPort(80),
            ],
        )
    }

    #[test]
    fn test_no_filter_no_subscribers_skips_decoding() {
        let statistics = Arc::new(Statistics::default());
        let output = MemoryOutput::default();
        let mut processor = FrameProcessor::new(Filters::default(), Arc::clone(&statistics));
        processor.set_output(Box::new(output.clone()));

        // Not an IP datagram at all, still written.
        let garbage = Frame::now(vec![0xFF, 0x00, 0x01]);
        assert_eq!(processor.process(&garbage), Disposition::Captured);

        assert_eq!(output.frames.lock().unwrap().len(), 1);
        assert_eq!(statistics.snapshot().captured, 1);
    }

    #[test]
    fn test_filtering() {
        let statistics = Arc::new(Statistics::default());
        let output = MemoryOutput::default();
        let mut processor = FrameProcessor::new(port_80(), Arc::clone(&statistics));
        processor.set_output(Box::new(output.clone()));

        assert_eq!(processor.process(&tcp_frame(80)), Disposition::Captured);
        assert_eq!(processor.process(&tcp_frame(81)), Disposition::Filtered);
        assert_eq!(
            processor.process(&Frame::now(vec![0x55; 20])),
            Disposition::Undecodable
        );

        assert_eq!(output.frames.lock().unwrap().len(), 1);
        assert_eq!(statistics.snapshot().captured, 1);
    }

    #[test]
    fn test_truncated_transport_is_undecodable() {
        let statistics = Arc::new(Statistics::default());
        let output = MemoryOutput::default();
        let calls = Arc::new(Mutex::new(0));
        // Protocol alone would match: the frame must still be rejected.
        let filters = Filters::with_predicates(
            Operator::Or,
            vec![
                Predicate::Protocol(IpProtocol::Tcp),
                Predicate::DestinationPort(80),
            ],
        );
        let mut processor = FrameProcessor::new(filters, Arc::clone(&statistics));
        processor.set_output(Box::new(output.clone()));
        let calls_clone = Arc::clone(&calls);
        processor.subscribe(move |_| {
            *calls_clone.lock().unwrap() += 1;
            Ok(())
        });

        // IPv4/TCP with only four bytes of TCP header.
        let hex_actual = "45 00 00 18 00 00 00 00 40 06 00 00 0A 00 00 01 0A 00 00 02 00 50 00 51";
        let frame = Frame::now(hex::decode(hex_actual.replace(" ", "")).unwrap());

        assert_eq!(processor.process(&frame), Disposition::Undecodable);
        assert!(output.frames.lock().unwrap().is_empty());
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(statistics.snapshot().captured, 0);
    }

    #[test]
    fn test_protocol_filter_validates_transport() {
        let statistics = Arc::new(Statistics::default());
        let output = MemoryOutput::default();
        let filters = Filters::with_predicates(
            Operator::And,
            vec![Predicate::Protocol(IpProtocol::Udp)],
        );
        let mut processor = FrameProcessor::new(filters, Arc::clone(&statistics));
        processor.set_output(Box::new(output.clone()));

        // IPv4/UDP with a 4-byte UDP header.
        let hex_actual = "45 00 00 18 00 00 00 00 40 11 00 00 0A 00 00 01 0A 00 00 02 00 35 D4 31";
        let frame = Frame::now(hex::decode(hex_actual.replace(" ", "")).unwrap());

        assert_eq!(processor.process(&frame), Disposition::Undecodable);
        assert!(output.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subscribers_in_order_and_failures_ignored() {
        let statistics = Arc::new(Statistics::default());
        let calls: Arc<Mutex<Vec<&str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut processor = FrameProcessor::new(Filters::default(), Arc::clone(&statistics));

        let first_calls = Arc::clone(&calls);
        processor.subscribe(move |_| {
            first_calls.lock().unwrap().push("first");
            Err("subscriber error".into())
        });

        let second_calls = Arc::clone(&calls);
        processor.subscribe(move |packet| {
            match packet.transport() {
                Some(TransportPacket::Tcp(_)) => second_calls.lock().unwrap().push("second"),
                _ => second_calls.lock().unwrap().push("unexpected"),
            }
            Ok(())
        });

        assert_eq!(processor.process(&tcp_frame(443)), Disposition::Captured);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(statistics.snapshot().captured, 1);
    }

    #[test]
    fn test_output_failure_is_not_captured() {
        let statistics = Arc::new(Statistics::default());
        let mut processor = FrameProcessor::new(Filters::default(), Arc::clone(&statistics));
        processor.set_output(Box::new(BrokenOutput));

        assert_eq!(processor.process(&tcp_frame(80)), Disposition::OutputFailed);
        assert_eq!(statistics.snapshot().captured, 0);
    }

    #[test]
    fn test_run_drains_queue() {
        let statistics = Arc::new(Statistics::default());
        let (sender, receiver) = crate::queue::bounded(8, Arc::clone(&statistics));
        let output = MemoryOutput::default();
        let mut processor = FrameProcessor::new(Filters::default(), Arc::clone(&statistics));
        processor.set_output(Box::new(output.clone()));

        for port in 0..5 {
            sender.offer(tcp_frame(port));
        }
        drop(sender);

        processor.run(receiver);

        let snapshot = statistics.snapshot();
        assert_eq!(snapshot.observed, 5);
        assert_eq!(snapshot.captured, 5);
        assert_eq!(output.frames.lock().unwrap().len(), 5);
    }
}
