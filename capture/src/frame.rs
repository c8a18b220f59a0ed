use chrono::{DateTime, Utc};

/// Received datagram with its capture time. Never changes after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    captured_at: DateTime<Utc>,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(data: Vec<u8>, captured_at: DateTime<Utc>) -> Self {
        Self { captured_at, data }
    }

    /// Stamps the data with the current wall-clock time.
    pub fn now(data: Vec<u8>) -> Self {
        Self::new(data, Utc::now())
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
