use crate::engine::{
    DEFAULT_BATCH_SIZE, Dispatcher, OutputRoute, RandomSelection, RoundRobin, SelectionStrategy, SlotMetrics,
    SlotRegistry, SlotTable, StdStreams,
};
use crate::error::{HarnessError, Result};
use crate::module::{ScoringModule, SlotIo};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Data files attached to slots (`--input:N` / `--output:N`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBindings {
    files: BTreeMap<usize, PathBuf>,
}

impl FileBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FileBindings::insert`].
    pub fn bind(mut self, slot: usize, path: impl Into<PathBuf>) -> Self {
        self.insert(slot, path);
        self
    }

    pub fn insert(&mut self, slot: usize, path: impl Into<PathBuf>) {
        self.files.insert(slot, path.into());
    }

    /// `(slot, path)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Path)> + '_ {
        self.files.iter().map(|(&slot, path)| (slot, path.as_path()))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// How the dispatch loop picks the next input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Random,
    Seeded(u64),
    RoundRobin,
}

/// Options that affect a run. Slot configuration itself comes from directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Maximum records per read.
    pub batch_size: usize,
    pub route: OutputRoute,
    pub selection: Selection,
}

impl Default for Options {
    fn default() -> Self {
        Options { batch_size: DEFAULT_BATCH_SIZE, route: OutputRoute::default(), selection: Selection::default() }
    }
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(HarnessError::Configuration("batch size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Who drove the I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Action callbacks, driven by the dispatch loop.
    Dispatch,
    /// No callbacks declared; the module's own `run` did the reading and writing.
    ModuleDriven,
}

/// Result of [`launch`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: RunMode,
    /// Dispatch iterations (zero for module-driven runs).
    pub iterations: usize,
    /// Counters for the slots that were active.
    pub slots: Vec<SlotMetrics>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn records_read(&self) -> u64 {
        self.slots.iter().map(|m| m.records_read).sum()
    }

    pub fn records_written(&self) -> u64 {
        self.slots.iter().map(|m| m.records_written).sum()
    }
}

/// Resolve and validate the slot table for `source` with `files` attached.
///
/// Nothing is opened; use this to inspect a configuration before a run.
pub fn resolve_slots(source: &str, files: &FileBindings) -> Result<SlotTable> {
    let mut table = SlotTable::from_source(source)?;
    table.attach_files(files)?;
    table.validate()?;
    Ok(table)
}

/// Run `module` over the slots configured by the directives in `source`.
///
/// When the active input slots declare action callbacks, the dispatch loop
/// drains them; otherwise the module's `run` is called with the slot
/// capability. Any failure aborts the run.
pub fn launch(
    source: &str,
    files: &FileBindings,
    module: &mut dyn ScoringModule,
    streams: StdStreams,
    options: &Options,
) -> Result<RunReport> {
    let started = Instant::now();
    options.validate()?;
    let table = resolve_slots(source, files)?;
    let mut registry = SlotRegistry::open(table, streams)?;

    let (mode, iterations) = if registry.table().uses_callbacks() {
        registry.bind_actions(&*module)?;
        let iterations = match options.selection {
            Selection::Random => drain(RandomSelection::new(), &mut registry, options)?,
            Selection::Seeded(seed) => drain(RandomSelection::seeded(seed), &mut registry, options)?,
            Selection::RoundRobin => drain(RoundRobin::default(), &mut registry, options)?,
        };
        (RunMode::Dispatch, iterations)
    } else {
        tracing::debug!(module = module.name(), "no action callbacks declared, handing slots to the module");
        module.run(&mut SlotIo::new(&mut registry, options.batch_size))?;
        (RunMode::ModuleDriven, 0)
    };
    registry.flush()?;

    let active = registry.table().active_mask();
    let slots = registry.metrics().iter().filter(|m| active.has(m.slot)).cloned().collect();
    let report = RunReport { mode, iterations, slots, elapsed: started.elapsed() };
    tracing::info!(
        mode = ?report.mode,
        iterations = report.iterations,
        read = report.records_read(),
        written = report.records_written(),
        elapsed = ?report.elapsed,
        "run complete"
    );
    Ok(report)
}

fn drain<S: SelectionStrategy>(strategy: S, registry: &mut SlotRegistry, options: &Options) -> Result<usize> {
    Dispatcher::new(strategy, options.batch_size, options.route).drain(registry)
}
