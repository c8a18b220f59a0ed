use crate::frame::Frame;
use crate::statistics::Statistics;
use crossbeam::channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;

pub type FrameReceiver = Receiver<Frame>;

/// Bounded FIFO between the receiving thread and the processing thread.
/// A capacity of zero is raised to one: a rendezvous channel would drop nearly everything.
pub fn bounded(capacity: usize, statistics: Arc<Statistics>) -> (FrameSender, FrameReceiver) {
    let (sender, receiver) = crossbeam::channel::bounded::<Frame>(capacity.max(1));

    (FrameSender { sender, statistics }, receiver)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Offer {
    Queued,
    Dropped,
    Disconnected,
}

/// Producer side. Never blocks.
pub struct FrameSender {
    sender: Sender<Frame>,
    statistics: Arc<Statistics>,
}

impl FrameSender {
    pub fn offer(&self, frame: Frame) -> Offer {
        self.statistics.increment_observed();

        match self.sender.try_send(frame) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(_)) => {
                self.statistics.increment_dropped();
                Offer::Dropped
            },
            Err(TrySendError::Disconnected(_)) => {
                self.statistics.increment_dropped();
                Offer::Disconnected
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_is_counted_not_blocking() {
        const CAPACITY: usize = 16;
        let statistics = Arc::new(Statistics::default());
        let (sender, receiver) = bounded(CAPACITY, Arc::clone(&statistics));

        let offers: Vec<Offer> = (0..CAPACITY + 5)
            .map(|index| sender.offer(Frame::now(vec![index as u8])))
            .collect();

        assert!(offers[..CAPACITY].iter().all(|offer| *offer == Offer::Queued));
        assert!(offers[CAPACITY..].iter().all(|offer| *offer == Offer::Dropped));

        let snapshot = statistics.snapshot();
        assert_eq!(snapshot.observed, CAPACITY as u64 + 5);
        assert_eq!(snapshot.dropped, 5);
        assert_eq!(snapshot.captured, 0);

        // FIFO, the dropped tail leaves no trace.
        drop(sender);
        let received: Vec<u8> = receiver.iter().map(|frame| frame.data()[0]).collect();
        assert_eq!(received, (0..CAPACITY as u8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_disconnected_consumer() {
        let statistics = Arc::new(Statistics::default());
        let (sender, receiver) = bounded(4, Arc::clone(&statistics));
        drop(receiver);

        assert_eq!(sender.offer(Frame::now(vec![0x45])), Offer::Disconnected);
        assert_eq!(statistics.snapshot().dropped, 1);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let statistics = Arc::new(Statistics::default());
        let (sender, _receiver) = bounded(0, statistics);

        assert_eq!(sender.offer(Frame::now(vec![0x45])), Offer::Queued);
        assert_eq!(sender.offer(Frame::now(vec![0x45])), Offer::Dropped);
    }
}
