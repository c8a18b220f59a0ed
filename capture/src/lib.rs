// Library lints
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unsafe_code)]

pub use crate::frame::Frame;
pub use crate::sniffer::{CaptureError, Settings, Sniffer, State};
pub use crate::statistics::{Statistics, StatisticsSnapshot};

pub mod frame;
pub mod interface;
pub mod output;
pub mod processor;
pub mod promiscuous;
pub mod queue;
pub mod sniffer;
pub mod socket;
pub mod statistics;
