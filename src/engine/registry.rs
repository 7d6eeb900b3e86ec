//! Slot registry: the runtime owner of every connection.
//!
//! Built from a validated `SlotTable`, it holds two ordered binding lists:
//!
//! ```text
//! inputs:  [ InputBinding { slot 0, stdin,      seq 1, action } ,
//!            InputBinding { slot 2, file a.jsonl, seq 1, action } ]
//! outputs: [ OutputBinding { slot 1, stdout } ]
//! ```
//!
//! Input bindings leave the list for good once their connection reports end
//! of stream (see `reader.rs`). Output bindings live until the registry is
//! dropped. Nothing else holds a connection.

use super::adapter::Action;
use super::metrics::SlotMetrics;
use super::resolve::SlotTable;
use crate::error::{HarnessError, Result};
use crate::MAX_SLOT;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The process's standard streams, injectable for tests and embedding.
pub struct StdStreams {
    pub stdin: Box<dyn BufRead>,
    pub stdout: Box<dyn Write>,
}

impl StdStreams {
    /// The real standard input and output of this process.
    pub fn process() -> Self {
        StdStreams { stdin: Box::new(io::stdin().lock()), stdout: Box::new(BufWriter::new(io::stdout())) }
    }
}

/// Where a connection points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Origin {
    Standard,
    File(PathBuf),
}

impl Origin {
    pub(crate) fn path(&self) -> &Path {
        match self {
            Origin::Standard => Path::new("<std>"),
            Origin::File(path) => path,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Standard => f.write_str("standard stream"),
            Origin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub(crate) struct InputBinding {
    pub slot: usize,
    pub conn: Box<dyn BufRead>,
    pub origin: Origin,
    /// Sequence number of the next record this slot delivers.
    pub seq_no: u64,
    /// Lines consumed so far, for decode error messages.
    pub lines_read: u64,
    pub action: Option<Action>,
}

pub(crate) struct OutputBinding {
    pub slot: usize,
    pub conn: Box<dyn Write>,
    pub origin: Origin,
}

/// Owner of the slot table, the binding lists and per-slot counters.
pub struct SlotRegistry {
    pub(super) table: SlotTable,
    pub(super) inputs: Vec<InputBinding>,
    pub(super) outputs: Vec<OutputBinding>,
    pub(super) metrics: Vec<SlotMetrics>,
}

impl SlotRegistry {
    /// Open a connection for every active slot of a validated table.
    ///
    /// Slot 0 without a file reads `streams.stdin`, slot 1 without a file
    /// writes `streams.stdout`. Output files are created or truncated.
    pub fn open(table: SlotTable, streams: StdStreams) -> Result<Self> {
        let StdStreams { stdin, stdout } = streams;
        let mut stdin = Some(stdin);
        let mut stdout = Some(stdout);
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        for c in table.slots().iter().filter(|c| c.active) {
            let slot = c.index;
            if c.is_input() {
                let (conn, origin): (Box<dyn BufRead>, Origin) = match &c.file {
                    Some(path) => {
                        if !path.is_file() {
                            return Err(HarnessError::Validation(format!("{} not found", path.display())));
                        }
                        let file = File::open(path).map_err(|e| HarnessError::io(path, e))?;
                        (Box::new(BufReader::new(file)), Origin::File(path.clone()))
                    }
                    None => match (slot, stdin.take()) {
                        (0, Some(conn)) => (conn, Origin::Standard),
                        _ => return Err(missing_file(slot)),
                    },
                };
                tracing::info!(slot, %origin, "input slot bound");
                inputs.push(InputBinding { slot, conn, origin, seq_no: 1, lines_read: 0, action: None });
            } else {
                let (conn, origin): (Box<dyn Write>, Origin) = match &c.file {
                    Some(path) => {
                        let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
                        (Box::new(BufWriter::new(file)), Origin::File(path.clone()))
                    }
                    None => match (slot, stdout.take()) {
                        (1, Some(conn)) => (conn, Origin::Standard),
                        _ => return Err(missing_file(slot)),
                    },
                };
                tracing::info!(slot, %origin, "output slot bound");
                outputs.push(OutputBinding { slot, conn, origin });
            }
        }

        let metrics = (0..MAX_SLOT).map(SlotMetrics::new).collect();
        Ok(SlotRegistry { table, inputs, outputs, metrics })
    }

    pub fn table(&self) -> &SlotTable {
        &self.table
    }

    /// Input slots that have not reached end of stream, in slot order.
    pub fn active_inputs(&self) -> Vec<usize> {
        self.inputs.iter().map(|b| b.slot).collect()
    }

    pub fn active_outputs(&self) -> Vec<usize> {
        self.outputs.iter().map(|b| b.slot).collect()
    }

    /// Sequence number the next record of `slot` will carry.
    pub fn next_seq(&self, slot: usize) -> Option<u64> {
        self.inputs.iter().find(|b| b.slot == slot).map(|b| b.seq_no)
    }

    pub(crate) fn action(&self, slot: usize) -> Option<&Action> {
        self.inputs.iter().find(|b| b.slot == slot).and_then(|b| b.action.as_ref())
    }

    pub fn metrics(&self) -> &[SlotMetrics] {
        &self.metrics
    }
}

fn missing_file(slot: usize) -> HarnessError {
    HarnessError::Validation(format!("model uses slot {slot} but there is no data file attached to it"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::FileBindings;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Writer whose bytes stay readable after the registry takes ownership.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.borrow().clone()).unwrap().lines().map(str::to_string).collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn streams(stdin: &str) -> (StdStreams, SharedBuf) {
        let out = SharedBuf::default();
        let streams = StdStreams { stdin: Box::new(Cursor::new(stdin.to_string())), stdout: Box::new(out.clone()) };
        (streams, out)
    }

    pub(crate) fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut body = lines.join("\n");
        body.push('\n');
        std::fs::write(&path, body).unwrap();
        path
    }

    pub(crate) fn registry(source: &str, files: &FileBindings, stdin: &str) -> (SlotRegistry, SharedBuf) {
        let mut table = SlotTable::from_source(source).unwrap();
        table.attach_files(files).unwrap();
        table.validate().unwrap();
        let (streams, out) = streams(stdin);
        (SlotRegistry::open(table, streams).unwrap(), out)
    }

    #[test]
    fn binds_active_slots_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_lines(dir.path(), "a.jsonl", &["1"]);
        let out3 = dir.path().join("out3.jsonl");
        let files = FileBindings::new().bind(2, &a).bind(3, &out3);
        let (reg, _) = registry("# fastscore.schema.2: x\n# fastscore.schema.3: x\n", &files, "");

        assert_eq!(reg.active_inputs(), vec![0, 2]);
        assert_eq!(reg.active_outputs(), vec![1, 3]);
        assert_eq!(reg.next_seq(0), Some(1));
        assert_eq!(reg.next_seq(2), Some(1));
        assert!(out3.exists(), "output file is created on open");
    }

    #[test]
    fn output_files_are_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_lines(dir.path(), "out.jsonl", &["stale"]);
        let (reg, _) = registry("", &FileBindings::new().bind(1, &out), "");
        drop(reg);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn unvalidated_table_without_file_is_rejected() {
        let table = SlotTable::from_source("# fastscore.schema.4: x\n").unwrap();
        let (streams, _) = streams("");
        let err = SlotRegistry::open(table, streams).err().unwrap();
        assert!(err.to_string().contains("slot 4"));
    }
}
