/// Byte progress of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub received: u64,
    pub total: u64,
}

impl TransferProgress {
    pub fn new(received: u64, total: u64) -> Self {
        Self { received, total }
    }

    /// Percentage complete, `100.0` for an empty file.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.received as f64 / self.total as f64) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.received >= self.total
    }
}
