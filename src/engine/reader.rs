//! Batch reader.
//!
//! Pulls up to `batch_size` newline-delimited JSON records from one input
//! binding:
//!
//! ```text
//! read_batch(slot, 2)     file: {"a":1} {"a":2} {"a":3} <eof>
//!   call 1 -> [{"a":1}, {"a":2}]  first_seq 1, seq_no becomes 3
//!   call 2 -> [{"a":3}]           first_seq 3, exhausted, binding removed
//!   call 3 -> None                slot stays exhausted
//! ```
//!
//! Exhaustion is terminal. A line that does not decode aborts the run.

use super::registry::SlotRegistry;
use crate::error::{HarnessError, Result};
use crate::is_input_slot;
use serde_json::Value;
use std::io::BufRead;

/// Records delivered by one read.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub slot: usize,
    /// Sequence number of `records[0]`.
    pub first_seq: u64,
    pub records: Vec<Value>,
    /// This read hit end of stream; the slot is gone from the active list.
    pub exhausted: bool,
}

/// Upper bound on the up-front allocation for one batch; larger batches grow on demand.
const PREALLOCATED_RECORDS: usize = 1024;

impl SlotRegistry {
    /// Read the next batch from input `slot`.
    ///
    /// Returns `Ok(None)` when the slot was exhausted by an earlier read.
    /// Reading a slot that was never in use, or an output slot, is an error.
    pub fn read_batch(&mut self, slot: usize, batch_size: usize) -> Result<Option<Batch>> {
        let Some(idx) = self.inputs.iter().position(|b| b.slot == slot) else {
            if !is_input_slot(slot) {
                return Err(HarnessError::Capability(format!("model attempts to read from an output slot {slot}")));
            }
            if self.table.is_active(slot) {
                return Ok(None);
            }
            return Err(HarnessError::Capability(format!("slot {slot} is not in use")));
        };

        let binding = &mut self.inputs[idx];
        let first_seq = binding.seq_no;
        let mut records = Vec::with_capacity(batch_size.min(PREALLOCATED_RECORDS));
        let mut exhausted = false;
        let mut line = String::new();

        while records.len() < batch_size {
            line.clear();
            let n = binding.conn.read_line(&mut line).map_err(|e| HarnessError::io(binding.origin.path(), e))?;
            if n == 0 {
                exhausted = true;
                break;
            }
            binding.lines_read += 1;
            let record = serde_json::from_str(&line)
                .map_err(|source| HarnessError::Decode { slot, line: binding.lines_read, source })?;
            records.push(record);
        }

        let delivered = records.len() as u64;
        if exhausted {
            // Dropping a file connection closes it; the standard stream is only released.
            let done = self.inputs.remove(idx);
            tracing::info!(slot, origin = %done.origin, lines = done.lines_read, "input slot exhausted");
        } else {
            binding.seq_no += delivered;
        }

        let m = &mut self.metrics[slot];
        m.batches += 1;
        m.records_read += delivered;
        m.exhausted |= exhausted;
        tracing::debug!(slot, first_seq, records = delivered, exhausted, "batch read");

        Ok(Some(Batch { slot, first_seq, records, exhausted }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FileBindings;
    use crate::engine::registry::tests::{registry, write_lines};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn reads_in_batches_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_lines(dir.path(), "a.jsonl", &[r#"{"a":1}"#, r#"{"a":2}"#, r#"{"a":3}"#]);
        let (mut reg, _) = registry("", &FileBindings::new().bind(0, &a), "");

        let b1 = reg.read_batch(0, 2).unwrap().unwrap();
        assert_eq!(b1.records, vec![json!({"a":1}), json!({"a":2})]);
        assert_eq!((b1.first_seq, b1.exhausted), (1, false));
        assert_eq!(reg.next_seq(0), Some(3));

        let b2 = reg.read_batch(0, 2).unwrap().unwrap();
        assert_eq!(b2.records, vec![json!({"a":3})]);
        assert_eq!((b2.first_seq, b2.exhausted), (3, true));
        assert!(reg.active_inputs().is_empty());

        assert_eq!(reg.read_batch(0, 2).unwrap(), None);
        let m = &reg.metrics()[0];
        assert_eq!((m.batches, m.records_read, m.exhausted), (2, 3, true));
    }

    #[test]
    fn exact_multiple_ends_with_an_empty_batch() {
        let (mut reg, _) = registry("", &FileBindings::new(), "1\n2\n");
        assert_eq!(reg.read_batch(0, 2).unwrap().unwrap().records.len(), 2);
        let last = reg.read_batch(0, 2).unwrap().unwrap();
        assert!(last.records.is_empty() && last.exhausted);
        assert_eq!(reg.read_batch(0, 2).unwrap(), None);
    }

    #[test]
    fn oversized_batch_reads_to_end_of_stream() {
        let (mut reg, _) = registry("", &FileBindings::new(), "1\n2\n");
        let batch = reg.read_batch(0, usize::MAX).unwrap().unwrap();
        assert_eq!(batch.records, vec![json!(1), json!(2)]);
        assert!(batch.exhausted);
        assert_eq!(reg.read_batch(0, usize::MAX).unwrap(), None);
    }

    #[test]
    fn unused_and_output_slots_cannot_be_read() {
        let (mut reg, _) = registry("", &FileBindings::new(), "");
        assert!(reg.read_batch(4, 1).unwrap_err().to_string().contains("slot 4 is not in use"));
        assert!(reg.read_batch(1, 1).unwrap_err().to_string().contains("output slot 1"));
    }

    #[test]
    fn malformed_line_is_fatal_and_names_the_line() {
        let (mut reg, _) = registry("", &FileBindings::new(), "{\"a\":1}\n{not json\n");
        let err = reg.read_batch(0, 10).unwrap_err();
        assert!(matches!(err, HarnessError::Decode { slot: 0, line: 2, .. }), "unexpected: {err}");
    }

    proptest! {
        #[test]
        fn batches_are_bounded_and_sequences_contiguous(count in 0usize..40, batch_size in 1usize..8) {
            let stdin: String = (0..count).map(|i| format!("{i}\n")).collect();
            let (mut reg, _) = registry("", &FileBindings::new(), &stdin);

            let mut seen = Vec::new();
            let mut expected_seq = 1u64;
            while let Some(batch) = reg.read_batch(0, batch_size).unwrap() {
                let len = batch.records.len();
                prop_assert!(len <= batch_size);
                prop_assert_eq!(batch.first_seq, expected_seq);
                expected_seq += len as u64;
                seen.extend(batch.records.into_iter().map(|v| v.as_u64().unwrap() as usize));
                if batch.exhausted {
                    prop_assert_eq!(reg.read_batch(0, batch_size).unwrap(), None);
                    break;
                }
                prop_assert_eq!(len, batch_size);
            }
            prop_assert_eq!(seen, (0..count).collect::<Vec<_>>());
        }
    }
}
