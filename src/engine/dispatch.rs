//! Dispatch loop.
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            │ running: at least one input binding active   │
//!            │   slot  = strategy.select(active inputs)     │
//!            │   batch = read_batch(slot)                   │
//!            │   for record: action(record, slot, seq++)    │
//!            │              -> write_record(route(slot))    │
//!            └──────────────────────┬───────────────────────┘
//!                                   │ last input exhausted
//!                                   v
//!                               drained
//! ```
//!
//! Records of one slot are handled strictly in order. Which slot goes next is
//! up to the `SelectionStrategy`: random by default, seeded or round-robin
//! when a run has to be reproducible.

use super::registry::SlotRegistry;
use crate::error::{HarnessError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Batch size used when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Picks which active input slot is read next.
pub trait SelectionStrategy {
    /// Return an index into `candidates` (never empty).
    fn select(&mut self, candidates: &[usize]) -> usize;
}

/// Uniform random choice over the active inputs.
#[derive(Debug)]
pub struct RandomSelection {
    rng: StdRng,
}

impl RandomSelection {
    pub fn new() -> Self {
        RandomSelection { rng: StdRng::from_entropy() }
    }

    /// Reproducible sequence of choices.
    pub fn seeded(seed: u64) -> Self {
        RandomSelection { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStrategy for RandomSelection {
    fn select(&mut self, candidates: &[usize]) -> usize {
        self.rng.gen_range(0..candidates.len())
    }
}

/// Cycles through the active inputs in slot order.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: usize,
}

impl SelectionStrategy for RoundRobin {
    fn select(&mut self, candidates: &[usize]) -> usize {
        let pick = self.next % candidates.len();
        self.next = pick + 1;
        pick
    }
}

/// Where callback results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputRoute {
    /// Every result goes to output slot 1.
    #[default]
    Default,
    /// Results of input slot `s` go to output slot `s + 1`.
    Paired,
}

impl OutputRoute {
    pub fn target(self, input_slot: usize) -> usize {
        match self {
            OutputRoute::Default => 1,
            OutputRoute::Paired => input_slot + 1,
        }
    }
}

/// Drives callbacks over every active input until all are exhausted.
pub struct Dispatcher<S> {
    strategy: S,
    batch_size: usize,
    route: OutputRoute,
}

impl<S: SelectionStrategy> Dispatcher<S> {
    pub fn new(strategy: S, batch_size: usize, route: OutputRoute) -> Self {
        Dispatcher { strategy, batch_size, route }
    }

    /// Every active input must have a live output to route to.
    fn check_routes(&self, registry: &SlotRegistry) -> Result<()> {
        let outputs = registry.active_outputs();
        for slot in registry.active_inputs() {
            let target = self.route.target(slot);
            if !outputs.contains(&target) {
                return Err(HarnessError::Validation(format!(
                    "results of input slot {slot} route to output slot {target}, which is not in use"
                )));
            }
        }
        Ok(())
    }

    /// Run until no input binding is left. Returns the number of iterations.
    pub fn drain(&mut self, registry: &mut SlotRegistry) -> Result<usize> {
        self.check_routes(registry)?;
        let mut iterations = 0;

        loop {
            let candidates = registry.active_inputs();
            if candidates.is_empty() {
                break;
            }
            let slot = candidates[self.strategy.select(&candidates) % candidates.len()];

            let action = registry
                .action(slot)
                .cloned()
                .ok_or_else(|| HarnessError::Validation(format!("input slot {slot} has no action callback bound")))?;
            if registry.table().recordsets(slot) {
                return Err(HarnessError::UnsupportedFeature("recordset input mode for action callbacks"));
            }

            let Some(batch) = registry.read_batch(slot, self.batch_size)? else {
                continue;
            };
            let target = self.route.target(slot);
            for (offset, record) in batch.records.into_iter().enumerate() {
                let seq = batch.first_seq + offset as u64;
                if let Some(result) = action.invoke(record, slot, seq)? {
                    registry.write_record(target, &result)?;
                }
            }
            registry.flush()?;
            iterations += 1;
        }

        tracing::debug!(iterations, "all input slots drained");
        Ok(iterations)
    }
}
