//! Directive scanning (smart comments).
//!
//! A scoring routine configures its slots with whole-line comments:
//!
//! ```text
//! # fastscore.action: score           item=action  scope=(default $in)  value=score
//! #odg.recordsets.$out: yes           item=recordsets scope=$out        value=yes
//! ## fastscore.slot.2: unused         item=slot    scope=2              value=unused
//! ```
//!
//! This module only deals with syntax: it recognizes the comment shape,
//! splits it into `(item, scope, value)` and resolves the scope token. What a
//! value *means* for a slot is decided by the resolver (`resolve.rs`).
//!
//! Lines that do not look like a directive are ignored, including directives
//! with an unknown item name. A directive-shaped line with a bad scope token
//! is a configuration error.

use crate::error::{HarnessError, Result};
use crate::{MAX_SLOT, SlotMask};
use std::fmt;

/// Configuration item named by a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    Recordsets,
    Action,
    Slot,
    Schema,
}

impl Item {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "recordsets" => Some(Item::Recordsets),
            "action" => Some(Item::Action),
            "slot" => Some(Item::Slot),
            "schema" => Some(Item::Schema),
            _ => None,
        }
    }

    /// Scope used when the directive does not name one.
    pub fn default_scope(self) -> Scope {
        match self {
            Item::Recordsets => Scope::All,
            Item::Action => Scope::In,
            Item::Slot => Scope::All,
            Item::Schema => Scope::All,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Item::Recordsets => "recordsets",
            Item::Action => "action",
            Item::Slot => "slot",
            Item::Schema => "schema",
        }
    }
}

/// The set of slots a directive applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    All,
    In,
    Out,
    Slot(usize),
}

impl Scope {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "$all" => Some(Scope::All),
            "$in" => Some(Scope::In),
            "$out" => Some(Scope::Out),
            _ => token.parse::<usize>().ok().filter(|&s| s < MAX_SLOT).map(Scope::Slot),
        }
    }

    /// Slots selected by this scope.
    pub fn mask(self) -> SlotMask {
        match self {
            Scope::All => SlotMask::all(),
            Scope::In => SlotMask::INPUTS,
            Scope::Out => SlotMask::OUTPUTS,
            Scope::Slot(s) => SlotMask::single(s),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("$all"),
            Scope::In => f.write_str("$in"),
            Scope::Out => f.write_str("$out"),
            Scope::Slot(s) => write!(f, "{s}"),
        }
    }
}

/// One parsed directive. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub line: usize,
    pub item: Item,
    pub scope: Scope,
    pub value: String,
}

/// Scan `source` line by line and collect every directive, in source order.
pub fn parse_directives(source: &str) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        if let Some(directive) = parse_line(idx + 1, line)? {
            directives.push(directive);
        }
    }
    Ok(directives)
}

/// Parse a single source line.
///
/// Returns `Ok(None)` for lines that are not directives.
pub(crate) fn parse_line(line_no: usize, line: &str) -> Result<Option<Directive>> {
    let re = regex!(r"^\s*#+\s*(?:fastscore|odg)\.(\S*)\s*:\s*(\S*)\s*$");
    let Some(caps) = re.captures(line) else {
        return Ok(None);
    };
    let target = caps.get(1).map_or("", |m| m.as_str());
    let value = caps.get(2).map_or("", |m| m.as_str());

    let mut parts = target.split('.');
    let item_name = parts.next().unwrap_or("");
    let scope_token = parts.next();
    if parts.next().is_some() {
        return Err(HarnessError::Configuration(format!("line {line_no}: smart comment '{target}' not recognized")));
    }

    let Some(item) = Item::from_name(item_name) else {
        // Dropped whole: an unknown item does not activate its scope either.
        tracing::warn!(line = line_no, item = item_name, "ignoring smart comment with unknown item");
        return Ok(None);
    };

    let scope = match scope_token {
        None => item.default_scope(),
        Some(token) => Scope::parse(token).ok_or_else(|| {
            HarnessError::Configuration(format!("line {line_no}: smart comment scope '{token}' not recognized"))
        })?,
    };

    tracing::debug!(line = line_no, item = item.name(), %scope, value, "smart comment");
    Ok(Some(Directive { line: line_no, item, scope, value: value.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(line: &str) -> Directive {
        parse_line(1, line).unwrap().expect("directive")
    }

    #[test]
    fn splits_item_scope_and_value() {
        let d = one("# fastscore.recordsets.$out: yes");
        assert_eq!(d.item, Item::Recordsets);
        assert_eq!(d.scope, Scope::Out);
        assert_eq!(d.value, "yes");

        let d = one("##odg.slot.3:unused");
        assert_eq!(d.item, Item::Slot);
        assert_eq!(d.scope, Scope::Slot(3));
        assert_eq!(d.value, "unused");
    }

    #[test]
    fn unset_scope_defaults_per_item() {
        assert_eq!(one("#fastscore.recordsets: both").scope, Scope::All);
        assert_eq!(one("#fastscore.action: score").scope, Scope::In);
        assert_eq!(one("#fastscore.slot: unused").scope, Scope::All);
        assert_eq!(one("#fastscore.schema: point").scope, Scope::All);
    }

    #[test]
    fn ignores_lines_that_are_not_directives() {
        let cases = [
            "def score(x):",
            "    return x  # fastscore.action: score",
            "# fastscore action: score",
            "# other.action: score",
            "# fastscore.action: two words",
            "",
        ];
        for line in cases {
            assert_eq!(parse_line(1, line).unwrap(), None, "line: {line:?}");
        }
    }

    #[test]
    fn ignores_unknown_items() {
        assert_eq!(parse_line(1, "# fastscore.module-attached: yes").unwrap(), None);
    }

    #[test]
    fn rejects_bad_scope_tokens() {
        for line in ["# fastscore.action.$both: f", "# fastscore.action.x: f", "# fastscore.slot.8: unused"] {
            let err = parse_line(4, line).unwrap_err();
            assert!(matches!(err, HarnessError::Configuration(_)), "line: {line:?}");
            assert!(err.to_string().contains("line 4"));
        }
        assert!(parse_line(1, "# fastscore.action.0.1: f").is_err());
    }

    #[test]
    fn collects_directives_in_source_order_with_line_numbers() {
        let src = "# fastscore.action: score\nimport x\n\n# odg.slot.2: unused\n";
        let ds = parse_directives(src).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!((ds[0].line, ds[0].item), (1, Item::Action));
        assert_eq!((ds[1].line, ds[1].scope), (4, Scope::Slot(2)));
    }

    #[test]
    fn scope_masks() {
        assert_eq!(Scope::All.mask(), SlotMask::all());
        assert_eq!(Scope::In.mask(), SlotMask::INPUTS);
        assert_eq!(Scope::Out.mask(), SlotMask::OUTPUTS);
        assert_eq!(Scope::Slot(5).mask(), SlotMask::SLOT_5);
    }
}
