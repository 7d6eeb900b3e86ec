//! Callback adaptation.
//!
//! User callbacks may take one, two or three parameters. The dispatch loop
//! always calls `(record, slot, seq_no)`, so each callback is wrapped once,
//! when bindings are set up:
//!
//! ```text
//! arity 1   f(record)
//! arity 2   f(record, seq_no)        the slot index is dropped
//! arity 3   f(record, slot, seq_no)
//! ```

use super::registry::SlotRegistry;
use crate::error::{CallbackProblem, HarnessError, Result};
use crate::module::{ScoringModule, Symbol, UserFunction};
use serde_json::Value;

/// A callback in canonical `(record, slot, seq_no)` form.
#[derive(Debug, Clone)]
pub enum Action {
    Record(UserFunction),
    RecordSeq(UserFunction),
    RecordSlotSeq(UserFunction),
}

impl Action {
    /// Validate a looked-up symbol and pick the adapter for its arity.
    pub fn adapt(slot: usize, name: &str, symbol: Option<Symbol>) -> Result<Self> {
        let reject = |problem| HarnessError::Callback { slot, name: name.to_string(), problem };
        let function = match symbol {
            None => return Err(reject(CallbackProblem::NotFound)),
            Some(Symbol::Value(_)) => return Err(reject(CallbackProblem::NotCallable)),
            Some(Symbol::Function(f)) => f,
        };
        match function.params() {
            1 => Ok(Action::Record(function)),
            2 => Ok(Action::RecordSeq(function)),
            3 => Ok(Action::RecordSlotSeq(function)),
            n => Err(reject(CallbackProblem::Arity(n))),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Action::Record(_) => 1,
            Action::RecordSeq(_) => 2,
            Action::RecordSlotSeq(_) => 3,
        }
    }

    /// Call the wrapped function for one record.
    pub fn invoke(&self, record: Value, slot: usize, seq: u64) -> Result<Option<Value>> {
        let outcome = match self {
            Action::Record(f) => f.call(vec![record]),
            Action::RecordSeq(f) => f.call(vec![record, Value::from(seq)]),
            Action::RecordSlotSeq(f) => f.call(vec![record, Value::from(slot), Value::from(seq)]),
        };
        outcome.map_err(|message| HarnessError::ActionFailed { slot, seq, message })
    }
}

impl SlotRegistry {
    /// Resolve and adapt the callback of every bound input slot.
    pub fn bind_actions(&mut self, module: &dyn ScoringModule) -> Result<()> {
        for binding in &mut self.inputs {
            let Some(name) = self.table.slot(binding.slot).action.as_deref() else {
                continue;
            };
            let action = Action::adapt(binding.slot, name, module.lookup(name))?;
            tracing::debug!(slot = binding.slot, callback = name, arity = action.arity(), module = module.name(), "callback bound");
            binding.action = Some(action);
        }
        Ok(())
    }
}
