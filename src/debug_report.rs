use slotrun::{RunMode, RunReport, SlotTable};

/// ANSI styling keyed by what is being shown rather than by color.
struct Palette {
    enabled: bool,
}

impl Palette {
    const RESET: &'static str = "\x1b[0m";

    fn new(enabled: bool) -> Self {
        Palette { enabled }
    }

    fn sgr(&self, code: &str, text: impl AsRef<str>) -> String {
        let text = text.as_ref();
        if self.enabled { format!("\x1b[{code}m{text}{}", Self::RESET) } else { text.to_string() }
    }

    fn heading(&self, text: impl AsRef<str>) -> String {
        self.sgr("1;36", text)
    }

    fn rule(&self, title: &str) -> String {
        self.sgr("90", format!("━━━ {title} ━━━"))
    }

    fn slot(&self, text: impl AsRef<str>) -> String {
        self.sgr("34", text)
    }

    fn origin(&self, text: impl AsRef<str>) -> String {
        self.sgr("32", text)
    }

    fn callback(&self, text: impl AsRef<str>) -> String {
        self.sgr("36", text)
    }

    fn count(&self, n: impl ToString) -> String {
        self.sgr("33", n.to_string())
    }

    fn muted(&self, text: impl AsRef<str>) -> String {
        self.sgr("2", text)
    }
}

// Everything goes to stderr: stdout may be carrying slot 1 records.

pub fn print_slots(model: &str, table: &SlotTable, color: bool) {
    let p = Palette::new(color);
    eprintln!("\n{}", p.heading(format!("⚙  Model: {model}")));
    eprintln!("\n{}", p.rule("Slots"));

    for c in table.slots() {
        let role = if c.is_input() { "in " } else { "out" };
        let label = p.slot(format!("[{}] {role}", c.index));
        if !c.active {
            eprintln!("  {label} {}", p.muted("unused"));
            continue;
        }
        let origin = match &c.file {
            Some(path) => path.display().to_string(),
            None if c.is_input() => "<stdin>".to_string(),
            None => "<stdout>".to_string(),
        };
        let mut line = format!("  {label} {}", p.origin(origin));
        if let Some(action) = &c.action {
            line.push_str(&format!(" {} {}", p.muted("│ action"), p.callback(action)));
        }
        if c.recordsets {
            line.push_str(&format!(" {}", p.muted("│ recordsets")));
        }
        eprintln!("{line}");
    }
}

pub fn print_run(report: &RunReport, color: bool) {
    let p = Palette::new(color);
    let mode = match report.mode {
        RunMode::Dispatch => "dispatch loop",
        RunMode::ModuleDriven => "module-driven",
    };
    eprintln!("\n{}", p.rule("Run"));
    eprintln!("  {} {}  {} {}", p.muted("mode:"), p.slot(mode), p.muted("│ iterations:"), p.count(report.iterations));

    for m in &report.slots {
        eprintln!(
            "  {} {} {}  {} {}  {} {}{}",
            p.slot(format!("[{}]", m.slot)),
            p.muted("batches:"),
            p.count(m.batches),
            p.muted("read:"),
            p.count(m.records_read),
            p.muted("written:"),
            p.count(m.records_written),
            if m.exhausted { p.muted("  (exhausted)") } else { String::new() },
        );
    }

    eprintln!(
        "\n  Total: {}  │  Read: {}  │  Written: {}\n",
        p.origin(format!("{:?}", report.elapsed)),
        p.count(report.records_read()),
        p.count(report.records_written()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_only_styles_when_enabled() {
        assert_eq!(Palette::new(false).count(3), "3");
        assert_eq!(Palette::new(true).count(3), "\x1b[33m3\x1b[0m");
        assert_eq!(Palette::new(false).rule("Run"), "━━━ Run ━━━");
    }
}
