//! The scoring module seen from the harness.
//!
//! The harness never looks inside a scoring module. It asks for symbols by
//! name (the callbacks named by `action` directives) and, when no callbacks
//! are declared, hands the module a slot capability and lets it drive its own
//! I/O through `ScoringModule::run`.

use crate::engine::SlotRegistry;
use crate::error::{HarnessError, Result};
use crate::is_input_slot;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a user function returns: a value to emit, nothing, or a failure message.
pub type FunctionResult = std::result::Result<Option<Value>, String>;

type Body = dyn Fn(Vec<Value>) -> FunctionResult + Send + Sync;

/// A callable exported by a scoring module, with its declared parameter count.
///
/// The harness always calls it with exactly `params` arguments.
#[derive(Clone)]
pub struct UserFunction {
    params: usize,
    body: Arc<Body>,
}

impl UserFunction {
    /// A function declaring `params` positional parameters.
    pub fn new(params: usize, body: impl Fn(Vec<Value>) -> FunctionResult + Send + Sync + 'static) -> Self {
        UserFunction { params, body: Arc::new(body) }
    }

    /// `f(record)`
    pub fn unary(f: impl Fn(Value) -> FunctionResult + Send + Sync + 'static) -> Self {
        Self::new(1, move |args| {
            let [record] = take_args(args)?;
            f(record)
        })
    }

    /// `f(record, seq_no)`
    pub fn binary(f: impl Fn(Value, Value) -> FunctionResult + Send + Sync + 'static) -> Self {
        Self::new(2, move |args| {
            let [record, seq] = take_args(args)?;
            f(record, seq)
        })
    }

    /// `f(record, slot, seq_no)`
    pub fn ternary(f: impl Fn(Value, Value, Value) -> FunctionResult + Send + Sync + 'static) -> Self {
        Self::new(3, move |args| {
            let [record, slot, seq] = take_args(args)?;
            f(record, slot, seq)
        })
    }

    pub fn params(&self) -> usize {
        self.params
    }

    pub fn call(&self, args: Vec<Value>) -> FunctionResult {
        (self.body)(args)
    }
}

fn take_args<const N: usize>(args: Vec<Value>) -> std::result::Result<[Value; N], String> {
    let got = args.len();
    <[Value; N]>::try_from(args).map_err(|_| format!("expected {N} arguments, got {got}"))
}

impl fmt::Debug for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserFunction").field("params", &self.params).field("body", &"<function>").finish()
    }
}

/// A named entry of a scoring module.
#[derive(Debug, Clone)]
pub enum Symbol {
    Function(UserFunction),
    /// Anything that is not callable.
    Value(Value),
}

/// A loaded scoring module.
pub trait ScoringModule {
    fn name(&self) -> &str;

    /// Look up an exported symbol.
    fn lookup(&self, symbol: &str) -> Option<Symbol>;

    /// Module-driven mode: called once when no input slot declares an action.
    fn run(&mut self, _io: &mut SlotIo<'_>) -> Result<()> {
        Ok(())
    }
}

type Main = Box<dyn FnMut(&mut SlotIo<'_>) -> Result<()>>;

/// A scoring module assembled from named symbols.
pub struct ModuleTable {
    name: String,
    symbols: HashMap<String, Symbol>,
    main: Option<Main>,
}

impl ModuleTable {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleTable { name: name.into(), symbols: HashMap::new(), main: None }
    }

    pub fn function(mut self, name: impl Into<String>, function: UserFunction) -> Self {
        self.symbols.insert(name.into(), Symbol::Function(function));
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.symbols.insert(name.into(), Symbol::Value(value));
        self
    }

    /// Entry point for module-driven runs.
    pub fn main(mut self, main: impl FnMut(&mut SlotIo<'_>) -> Result<()> + 'static) -> Self {
        self.main = Some(Box::new(main));
        self
    }
}

impl ScoringModule for ModuleTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<Symbol> {
        self.symbols.get(symbol).cloned()
    }

    fn run(&mut self, io: &mut SlotIo<'_>) -> Result<()> {
        match self.main.as_mut() {
            Some(main) => main(io),
            None => Ok(()),
        }
    }
}

/// Slot capability handed to a module-driven run.
pub struct SlotIo<'a> {
    registry: &'a mut SlotRegistry,
    batch_size: usize,
}

impl<'a> SlotIo<'a> {
    pub(crate) fn new(registry: &'a mut SlotRegistry, batch_size: usize) -> Self {
        SlotIo { registry, batch_size }
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.registry.table().is_active(slot)
    }

    /// Handle on one slot.
    pub fn slot(&mut self, slot: usize) -> SlotHandle<'_> {
        SlotHandle { registry: &mut *self.registry, batch_size: self.batch_size, slot }
    }
}

/// One slot's `read` / `write` capability. Iterating yields batches until
/// the slot is exhausted.
pub struct SlotHandle<'s> {
    registry: &'s mut SlotRegistry,
    batch_size: usize,
    slot: usize,
}

impl SlotHandle<'_> {
    pub fn index(&self) -> usize {
        self.slot
    }

    /// Next batch of records, or `None` once the slot has been exhausted.
    pub fn read(&mut self) -> Result<Option<Vec<Value>>> {
        if !is_input_slot(self.slot) {
            return Err(HarnessError::Capability(format!(
                "model attempts to explicitly read from an output slot {}",
                self.slot
            )));
        }
        Ok(self.registry.read_batch(self.slot, self.batch_size)?.map(|b| b.records))
    }

    pub fn write(&mut self, record: &Value) -> Result<()> {
        self.registry.write_record(self.slot, record)
    }
}

impl Iterator for SlotHandle<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}
