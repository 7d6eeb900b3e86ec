#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod module;
pub mod stock;

pub use api::{FileBindings, Options, RunMode, RunReport, Selection, launch, resolve_slots};
pub use engine::{
    Action, Batch, DEFAULT_BATCH_SIZE, Directive, Dispatcher, Item, OutputRoute, RandomSelection, RoundRobin, Scope,
    SelectionStrategy, SlotConfig, SlotMetrics, SlotRegistry, SlotTable, StdStreams, parse_directives,
};
pub use error::{CallbackProblem, HarnessError, Result};
pub use module::{FunctionResult, ModuleTable, ScoringModule, SlotHandle, SlotIo, Symbol, UserFunction};

// --- Slots ------------------------------------------------------------------

/// Number of numbered I/O channels. Even indices are inputs, odd are outputs.
pub const MAX_SLOT: usize = 8;

/// Whether `slot` is an input slot. The role is derived from parity only.
pub fn is_input_slot(slot: usize) -> bool {
    slot % 2 == 0
}

/// Slots 0 and 1 may run without an attached file (standard streams).
pub(crate) fn is_default_slot(slot: usize) -> bool {
    slot == 0 || slot == 1
}

bitflags::bitflags! {
    /// A set of slot indices, one bit per slot.
    ///
    /// Scopes resolve to a mask; the resolver walks the mask in ascending
    /// slot order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SlotMask: u8 {
        const SLOT_0 = 1 << 0;
        const SLOT_1 = 1 << 1;
        const SLOT_2 = 1 << 2;
        const SLOT_3 = 1 << 3;
        const SLOT_4 = 1 << 4;
        const SLOT_5 = 1 << 5;
        const SLOT_6 = 1 << 6;
        const SLOT_7 = 1 << 7;

        const INPUTS = Self::SLOT_0.bits() | Self::SLOT_2.bits() | Self::SLOT_4.bits() | Self::SLOT_6.bits();
        const OUTPUTS = Self::SLOT_1.bits() | Self::SLOT_3.bits() | Self::SLOT_5.bits() | Self::SLOT_7.bits();
        const DEFAULTS = Self::SLOT_0.bits() | Self::SLOT_1.bits();
    }
}

impl SlotMask {
    /// Mask holding a single slot. Out-of-range indices give an empty mask.
    pub fn single(slot: usize) -> Self {
        if slot < MAX_SLOT { SlotMask::from_bits_truncate(1 << slot) } else { SlotMask::empty() }
    }

    /// Whether `slot` is a member of this mask.
    pub fn has(&self, slot: usize) -> bool {
        !SlotMask::single(slot).is_empty() && self.contains(SlotMask::single(slot))
    }

    /// Member slot indices in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_SLOT).filter(move |&s| self.has(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_roles_follow_parity() {
        let inputs: Vec<usize> = SlotMask::INPUTS.slots().collect();
        let outputs: Vec<usize> = SlotMask::OUTPUTS.slots().collect();
        assert_eq!(inputs, vec![0, 2, 4, 6]);
        assert_eq!(outputs, vec![1, 3, 5, 7]);
        assert!(inputs.iter().all(|&s| is_input_slot(s)));
        assert!(outputs.iter().all(|&s| !is_input_slot(s)));
    }

    #[test]
    fn single_mask_ignores_out_of_range() {
        assert_eq!(SlotMask::single(3), SlotMask::SLOT_3);
        assert!(SlotMask::single(MAX_SLOT).is_empty());
        assert!(!SlotMask::all().has(MAX_SLOT));
    }
}
