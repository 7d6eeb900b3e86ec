//! Output writer: one encoded JSON value per line.

use super::registry::SlotRegistry;
use crate::error::{HarnessError, Result};
use crate::is_input_slot;
use serde_json::Value;
use std::io::Write;

impl SlotRegistry {
    /// Serialize `value` as one line on output `slot`.
    ///
    /// Recordset output is not supported and fails before anything is written.
    pub fn write_record(&mut self, slot: usize, value: &Value) -> Result<()> {
        if is_input_slot(slot) {
            return Err(HarnessError::Capability(format!("model emits data to an input slot {slot}")));
        }
        let recordsets = self.table.recordsets(slot);
        let Some(binding) = self.outputs.iter_mut().find(|b| b.slot == slot) else {
            return Err(HarnessError::Capability(format!("model emits data to an unknown slot {slot}")));
        };
        if recordsets {
            return Err(HarnessError::UnsupportedFeature("recordset output mode"));
        }

        serde_json::to_writer(&mut binding.conn, value).map_err(|source| HarnessError::Encode { slot, source })?;
        binding.conn.write_all(b"\n").map_err(|e| HarnessError::io(binding.origin.path(), e))?;
        self.metrics[slot].records_written += 1;
        Ok(())
    }

    /// Flush every output connection.
    pub fn flush(&mut self) -> Result<()> {
        for binding in &mut self.outputs {
            binding.conn.flush().map_err(|e| HarnessError::io(binding.origin.path(), e))?;
        }
        Ok(())
    }
}
