//! Stock scoring module shipped with the `slotrun` binary.
//!
//! Model sources run by the binary pick these functions by name in their
//! `action` directives:
//!
//! | name     | arity | result                                  |
//! |----------|-------|-----------------------------------------|
//! | `action` | 1     | the record unchanged                    |
//! | `number` | 2     | `{"seq": n, "record": r}`               |
//! | `tag`    | 3     | `{"slot": s, "seq": n, "record": r}`    |
//!
//! With `# fastscore.action: unused` the module copies slot 0 to slot 1
//! batch by batch.

use crate::error::Result;
use crate::module::{ModuleTable, SlotIo, UserFunction};
use serde_json::json;

pub fn module() -> ModuleTable {
    ModuleTable::new("stock")
        .function("action", UserFunction::unary(|record| Ok(Some(record))))
        .function("number", UserFunction::binary(|record, seq| Ok(Some(json!({"seq": seq, "record": record})))))
        .function(
            "tag",
            UserFunction::ternary(|record, slot, seq| Ok(Some(json!({"slot": slot, "seq": seq, "record": record})))),
        )
        .main(passthrough)
}

fn passthrough(io: &mut SlotIo<'_>) -> Result<()> {
    if !io.is_active(0) || !io.is_active(1) {
        return Ok(());
    }
    while let Some(batch) = io.slot(0).read()? {
        let mut out = io.slot(1);
        for record in &batch {
            out.write(record)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FileBindings, Options, RunMode, Selection, launch};
    use crate::engine::registry::tests::streams;

    fn run(source: &str, stdin: &str) -> (RunMode, Vec<String>) {
        let (streams, out) = streams(stdin);
        let options = Options { batch_size: 2, selection: Selection::Seeded(7), ..Options::default() };
        let report = launch(source, &FileBindings::new(), &mut module(), streams, &options).unwrap();
        (report.mode, out.lines())
    }

    #[test]
    fn default_action_echoes_records() {
        let (mode, lines) = run("", "{\"x\":1}\n[2]\n");
        assert_eq!(mode, RunMode::Dispatch);
        assert_eq!(lines, vec![r#"{"x":1}"#, "[2]"]);
    }

    #[test]
    fn number_and_tag_expose_sequence_and_slot() {
        let (_, lines) = run("# fastscore.action.0: number\n", "\"a\"\n\"b\"\n");
        assert_eq!(lines, vec![r#"{"record":"a","seq":1}"#, r#"{"record":"b","seq":2}"#]);

        let (_, lines) = run("# fastscore.action: tag\n# fastscore.slot.$in: unused\n# fastscore.schema.0: x\n", "0\n");
        assert_eq!(lines, vec![r#"{"record":0,"seq":1,"slot":0}"#]);
    }

    #[test]
    fn callback_less_source_copies_slot_zero() {
        let (mode, lines) = run("# fastscore.action: unused\n", "1\n2\n3\n");
        assert_eq!(mode, RunMode::ModuleDriven);
        assert_eq!(lines, vec!["1", "2", "3"]);
    }
}
