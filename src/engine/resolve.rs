//! Slot configuration resolution.
//!
//! The directive scanner (`directive.rs`) produces `(item, scope, value)`
//! triples. This module folds them, in source order, into a `SlotTable`:
//!
//! ```text
//! SlotTable::new()                 defaults: inputs carry action "action",
//!     │                            slots 0 and 1 active
//!     ├─ apply(directive) ...      scope expansion, legacy recordsets,
//!     │                            activation rule
//!     ├─ attach_files(bindings)    --input:N / --output:N paths
//!     └─ validate()                action coverage + file/activity checks
//! ```
//!
//! ## Legacy `recordsets` vocabulary
//!
//! `both|none|input|output` predate per-slot scopes. They are only legal at
//! `$all` scope and only ever touch slots 0 and 1: they neither mutate nor
//! activate any other slot.
//!
//! ## Activation rule
//!
//! Mentioning a slot with any value other than `unused` activates it, except
//! for legacy `recordsets` directives (slots 0/1 only). `slot: unused`
//! deactivates. Resolution is a pure fold: the same directives always give
//! the same table.

use super::directive::{Directive, Item, Scope, parse_directives};
use crate::api::FileBindings;
use crate::error::{HarnessError, Result};
use crate::{MAX_SLOT, SlotMask, is_default_slot, is_input_slot};
use std::path::PathBuf;

/// Value that clears an action or deactivates a slot.
const UNUSED: &str = "unused";

/// Action name every input slot starts with.
const DEFAULT_ACTION: &str = "action";

/// Resolved configuration of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConfig {
    pub index: usize,
    pub active: bool,
    /// Attached data file; `None` means the standard stream (slots 0/1 only).
    pub file: Option<PathBuf>,
    /// Callback name. Always `None` for output slots.
    pub action: Option<String>,
    pub recordsets: bool,
}

impl SlotConfig {
    fn initial(index: usize) -> Self {
        SlotConfig {
            index,
            active: is_default_slot(index),
            file: None,
            action: is_input_slot(index).then(|| DEFAULT_ACTION.to_string()),
            recordsets: false,
        }
    }

    pub fn is_input(&self) -> bool {
        is_input_slot(self.index)
    }
}

/// Old-style `recordsets` values, applied to slots 0 and 1 only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyRecordsets {
    Both,
    None,
    Input,
    Output,
}

impl LegacyRecordsets {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "both" => Some(LegacyRecordsets::Both),
            "none" => Some(LegacyRecordsets::None),
            "input" => Some(LegacyRecordsets::Input),
            "output" => Some(LegacyRecordsets::Output),
            _ => None,
        }
    }

    fn flag_for(self, slot: usize) -> bool {
        match self {
            LegacyRecordsets::Both => true,
            LegacyRecordsets::None => false,
            LegacyRecordsets::Input => slot == 0,
            LegacyRecordsets::Output => slot == 1,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

/// Per-slot configuration for all `MAX_SLOT` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable {
    slots: Vec<SlotConfig>,
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotTable {
    /// Table before any directive is applied.
    pub fn new() -> Self {
        SlotTable { slots: (0..MAX_SLOT).map(SlotConfig::initial).collect() }
    }

    /// Scan a scoring routine's source text and resolve its directives.
    pub fn from_source(source: &str) -> Result<Self> {
        Self::resolve(&parse_directives(source)?)
    }

    /// Fold `directives` (in order) into a fresh table.
    pub fn resolve(directives: &[Directive]) -> Result<Self> {
        let mut table = SlotTable::new();
        for directive in directives {
            table.apply(directive)?;
        }
        Ok(table)
    }

    fn apply(&mut self, d: &Directive) -> Result<()> {
        let line = d.line;
        let mut mask = d.scope.mask();

        match d.item {
            Item::Recordsets => match LegacyRecordsets::parse(&d.value) {
                Some(mode) => {
                    if d.scope != Scope::All {
                        return Err(HarnessError::Configuration(format!(
                            "line {line}: recordsets value '{}' is only valid with scope $all (got {})",
                            d.value, d.scope
                        )));
                    }
                    tracing::debug!(line, value = %d.value, "deprecated recordsets syntax");
                    mask &= SlotMask::DEFAULTS;
                    for s in mask.slots() {
                        self.slots[s].recordsets = mode.flag_for(s);
                    }
                }
                None => {
                    let flag = parse_flag(&d.value).ok_or_else(|| {
                        HarnessError::Configuration(format!(
                            "line {line}: value '{}' not recognized (use 'true', 'false', 'yes', or 'no')",
                            d.value
                        ))
                    })?;
                    for s in mask.slots() {
                        self.slots[s].recordsets = flag;
                    }
                }
            },
            Item::Action => {
                if let Some(s) = (mask & SlotMask::OUTPUTS).slots().next() {
                    return Err(HarnessError::Configuration(format!(
                        "line {line}: an action callback being assigned to an output slot {s}"
                    )));
                }
                let action = (d.value != UNUSED).then(|| d.value.clone());
                for s in mask.slots() {
                    self.slots[s].action = action.clone();
                }
            }
            Item::Slot => {
                if d.value != UNUSED {
                    return Err(HarnessError::Configuration(format!(
                        "line {line}: value '{}' not supported (set to 'unused' to disable the slot)",
                        d.value
                    )));
                }
                for s in mask.slots() {
                    self.slots[s].active = false;
                }
            }
            // Reserved: accepted, no effect beyond activation.
            Item::Schema => {}
        }

        if d.value != UNUSED {
            for s in mask.slots() {
                self.slots[s].active = true;
            }
        }
        Ok(())
    }

    /// Attach data files from the command line.
    ///
    /// Input files must exist; this is checked here, before anything is opened.
    pub fn attach_files(&mut self, bindings: &FileBindings) -> Result<()> {
        for (slot, path) in bindings.iter() {
            if slot >= MAX_SLOT {
                return Err(HarnessError::Validation(format!(
                    "slot {slot} is out of range (0..{})",
                    MAX_SLOT - 1
                )));
            }
            if is_input_slot(slot) && !path.is_file() {
                return Err(HarnessError::Validation(format!("{} not found", path.display())));
            }
            self.slots[slot].file = Some(path.to_path_buf());
        }
        Ok(())
    }

    /// Check the cross-slot invariants of the resolved table.
    pub fn validate(&self) -> Result<()> {
        let inputs = || self.slots.iter().filter(|c| c.is_input());
        let with_action = inputs().filter(|c| c.action.is_some()).count();
        if with_action != 0 && with_action != inputs().count() {
            return Err(HarnessError::Validation(
                "either all input slots must have action callbacks set or none of them should".to_string(),
            ));
        }

        for c in &self.slots {
            if c.active && c.file.is_none() && !is_default_slot(c.index) {
                return Err(HarnessError::Validation(format!(
                    "model uses slot {} but there is no data file attached to it",
                    c.index
                )));
            }
            if let (false, Some(file)) = (c.active, &c.file) {
                return Err(HarnessError::Validation(format!(
                    "model does not use slot {} but the data file {} is attached to it",
                    c.index,
                    file.display()
                )));
            }
        }
        Ok(())
    }

    pub fn slot(&self, index: usize) -> &SlotConfig {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[SlotConfig] {
        &self.slots
    }

    pub(crate) fn is_active(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|c| c.active)
    }

    pub(crate) fn recordsets(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|c| c.recordsets)
    }

    /// Whether any active input slot declares a callback.
    pub fn uses_callbacks(&self) -> bool {
        self.slots.iter().any(|c| c.is_input() && c.active && c.action.is_some())
    }

    pub fn active_mask(&self) -> SlotMask {
        self.slots.iter().filter(|c| c.active).fold(SlotMask::empty(), |m, c| m | SlotMask::single(c.index))
    }
}
