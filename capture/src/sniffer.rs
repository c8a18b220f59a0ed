use crate::frame::Frame;
use crate::interface::InterfaceDescriptor;
use crate::output::Output;
use crate::processor::{FrameProcessor, HandlerError};
use crate::promiscuous::PromiscuousMode;
use crate::queue::{FrameSender, Offer};
use crate::socket::{DatalinkSocket, PacketSource, SocketError, is_timeout};
use crate::statistics::{Statistics, StatisticsSnapshot};
use dpi::IpPacket;
use dpi::filter::Filters;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use strum_macros::Display;
use thiserror::Error;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 65_536;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct Settings {
    pub queue_capacity: usize,
    /// Largest datagram accepted in one read, also used as the socket receive buffer size.
    pub receive_buffer_size: usize,
    pub read_timeout: Duration,
    pub promiscuous: PromiscuousMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            promiscuous: PromiscuousMode::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum State {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Capture session: receiving thread, bounded queue, processing thread.
pub struct Sniffer {
    interface: Option<InterfaceDescriptor>,
    settings: Settings,
    state: State,

    shutdown_flag: Arc<AtomicBool>,
    statistics: Arc<Statistics>,

    processor: Option<FrameProcessor>,

    receiver_handle: Option<JoinHandle<Result<(), SocketError>>>,
    processor_handle: Option<JoinHandle<()>>,
}

impl Sniffer {
    pub fn new(interface: InterfaceDescriptor, settings: Settings, filters: Filters) -> Self {
        Self::create(Some(interface), settings, filters)
    }

    /// Session without an interface, fed through `start_with_source`.
    pub fn detached(settings: Settings, filters: Filters) -> Self {
        Self::create(None, settings, filters)
    }

    fn create(
        interface: Option<InterfaceDescriptor>, settings: Settings, filters: Filters,
    ) -> Self {
        let statistics = Arc::new(Statistics::default());

        Self {
            interface,
            settings,
            state: State::Created,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            processor: Some(FrameProcessor::new(filters, Arc::clone(&statistics))),
            statistics,
            receiver_handle: None,
            processor_handle: None,
        }
    }

    pub fn subscribe<F>(&mut self, handler: F) -> Result<(), CaptureError>
    where
        F: FnMut(&IpPacket) -> Result<(), HandlerError> + Send + 'static,
    {
        self.processor_mut()?.subscribe(handler);
        Ok(())
    }

    pub fn set_output(&mut self, output: Box<dyn Output>) -> Result<(), CaptureError> {
        self.processor_mut()?.set_output(output);
        Ok(())
    }

    fn processor_mut(&mut self) -> Result<&mut FrameProcessor, CaptureError> {
        match (self.state, self.processor.as_mut()) {
            (State::Created, Some(processor)) => Ok(processor),
            (state, _) => Err(CaptureError::InvalidState(state)),
        }
    }

    /// Opens a capture channel on the interface and starts capturing.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != State::Created {
            return Err(CaptureError::InvalidState(self.state));
        }
        let interface = self
            .interface
            .clone()
            .ok_or(CaptureError::NoInterface)?;

        let socket = DatalinkSocket::open(
            &interface,
            self.settings.receive_buffer_size,
            self.settings.read_timeout,
            self.settings.promiscuous,
        )?;

        self.start_with_source(socket)
    }

    pub fn start_with_source<S: PacketSource>(&mut self, source: S) -> Result<(), CaptureError> {
        if self.state != State::Created {
            return Err(CaptureError::InvalidState(self.state));
        }
        let processor = self
            .processor
            .take()
            .ok_or(CaptureError::InvalidState(self.state))?;

        let (sender, receiver) =
            crate::queue::bounded(self.settings.queue_capacity, Arc::clone(&self.statistics));

        let processor_handle = thread::Builder::new()
            .name("processor".to_string())
            .spawn(move || processor.run(receiver));
        match processor_handle {
            Ok(handle) => self.processor_handle = Some(handle),
            Err(err) => {
                self.state = State::Stopped;
                return Err(CaptureError::ThreadSpawnError(err));
            },
        }

        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        let buffer_size = self.settings.receive_buffer_size;
        let receiver_handle = thread::Builder::new()
            .name("receiver".to_string())
            .spawn(move || receive(source, sender, shutdown_flag, buffer_size));
        match receiver_handle {
            Ok(handle) => self.receiver_handle = Some(handle),
            Err(err) => {
                // The processing thread exits on its own: the sender was dropped with the closure.
                self.state = State::Stopping;
                return Err(CaptureError::ThreadSpawnError(err));
            },
        }

        self.state = State::Running;
        log::info!("Capture started.");

        Ok(())
    }

    /// Asks both threads to finish. Frames already queued are still processed.
    pub fn stop(&mut self) {
        match self.state {
            State::Created => self.state = State::Stopped,
            State::Running => {
                self.shutdown_flag.store(true, Ordering::Release);
                self.state = State::Stopping;
                log::info!("Stopping capture.");
            },
            State::Stopping | State::Stopped => {},
        }
    }

    /// Waits for both threads. Returns the error that ended the receiving thread, if any.
    pub fn join(&mut self) -> Result<(), CaptureError> {
        let mut result = Ok(());
        let had_threads = self.receiver_handle.is_some() || self.processor_handle.is_some();

        if let Some(handle) = self.receiver_handle.take() {
            result = match handle.join() {
                Ok(value) => value.map_err(CaptureError::from),
                Err(_) => Err(CaptureError::ThreadPanicked("receiver")),
            };
        }

        if let Some(handle) = self.processor_handle.take()
            && handle.join().is_err()
            && result.is_ok()
        {
            result = Err(CaptureError::ThreadPanicked("processor"));
        }

        if self.state != State::Created {
            self.state = State::Stopped;
        }
        if had_threads {
            log::info!("Capture stopped. {}", self.statistics.snapshot());
        }

        result
    }

    pub fn state(&self) -> State {
        match self.state {
            State::Running | State::Stopping
                if is_finished(&self.receiver_handle) && is_finished(&self.processor_handle) =>
            {
                State::Stopped
            },
            state => state,
        }
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.statistics.snapshot()
    }

    pub fn interface(&self) -> Option<&InterfaceDescriptor> {
        self.interface.as_ref()
    }
}

impl Drop for Sniffer {
    fn drop(&mut self) {
        self.stop();
        if let Err(err) = self.join() {
            log::error!("{}", err);
        }
    }
}

fn is_finished<T>(handle: &Option<JoinHandle<T>>) -> bool {
    handle.as_ref().is_none_or(JoinHandle::is_finished)
}

fn receive<S: PacketSource>(
    mut source: S, sender: FrameSender, shutdown_flag: Arc<AtomicBool>, buffer_size: usize,
) -> Result<(), SocketError> {
    let mut buffer = vec![0u8; buffer_size];

    loop {
        if shutdown_flag.load(Ordering::Acquire) {
            log::info!("Shutting down receiving thread.");
            return Ok(());
        }

        match source.receive(&mut buffer) {
            Ok(0) => continue,
            Ok(length) => {
                let data = buffer[..length.min(buffer.len())].to_vec();
                if sender.offer(Frame::now(data)) == Offer::Disconnected {
                    log::error!("Processing thread is gone. Shutting down receiving thread.");
                    return Ok(());
                }
            },
            Err(err) if is_timeout(&err) => continue,
            Err(_) if shutdown_flag.load(Ordering::Acquire) => {
                log::info!("Shutting down receiving thread.");
                return Ok(());
            },
            Err(err) => {
                log::error!("Receiving failed: {}", err);
                return Err(SocketError::ReceiveError(err));
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Operation is not allowed in state {0}.")]
    InvalidState(State),

    #[error("No interface to capture on.")]
    NoInterface,

    #[error("Socket error. {0}")]
    SocketError(#[from] SocketError),

    #[error("Failed to spawn thread.")]
    ThreadSpawnError(std::io::Error),

    #[error("The {0} thread panicked.")]
    ThreadPanicked(&'static str),
}

impl CaptureError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            CaptureError::SocketError(err) => err.additional_info(),
            CaptureError::ThreadSpawnError(err) => Some(err.to_string()),
            _ => None,
        }
    }
}
