//! Per-slot run counters.
//!
//! The registry keeps one `SlotMetrics` per slot index. The reader bumps the
//! input side, the writer the output side; `api::launch` copies the active
//! slots into the final `RunReport`.

/// Counters for one slot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SlotMetrics {
    pub slot: usize,
    /// Batch reads served (including the final, possibly empty, one).
    pub batches: u64,
    pub records_read: u64,
    pub records_written: u64,
    /// Whether the input reached end of stream.
    pub exhausted: bool,
}

impl SlotMetrics {
    pub fn new(slot: usize) -> Self {
        SlotMetrics { slot, ..Default::default() }
    }
}
