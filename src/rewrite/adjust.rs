//! Block adjuster
//!
//! Places unpacked helper lines around the statement they came from. Simple
//! statements take their helpers in front; block headers need their helpers
//! somewhere the header's own control flow still reaches, which for `elif`
//! and `except` means opening an extra nesting level for the clause and its
//! later siblings.

use super::unpack::Unpacked;
use super::PlannedLine;

/// Extra nesting applied to a clause's body and its later siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftScope {
    /// Source nesting level of the rewritten clause
    pub level: usize,
    pub extra: usize,
    /// Clause keywords at `level` that still belong to the shifted chain
    pub continues: &'static [&'static str],
}

impl ShiftScope {
    pub fn elif(level: usize) -> Self {
        Self {
            level,
            extra: 1,
            continues: &["elif", "else"],
        }
    }

    pub fn except(level: usize) -> Self {
        Self {
            level,
            extra: 1,
            continues: &["except"],
        }
    }

    /// Whether a statement at `level` starting with `keyword` is still shifted
    pub fn covers(&self, level: usize, keyword: Option<&str>) -> bool {
        level > self.level
            || (level == self.level && keyword.map_or(false, |k| self.continues.contains(&k)))
    }
}

fn indented(lines: Vec<PlannedLine>, by: usize) -> impl Iterator<Item = PlannedLine> {
    lines.into_iter().map(move |mut line| {
        line.depth += by;
        line
    })
}

/// Helpers, then the rewritten statement
pub fn simple(unpacked: Unpacked) -> Vec<PlannedLine> {
    let mut plan = unpacked.helpers;
    if let Some(rest) = unpacked.remainder {
        plan.push(PlannedLine::at(0, rest));
    }
    plan
}

/// Helpers ahead of a loop header; the header is returned apart so the
/// caller can open its span
pub fn while_adjust(unpacked: Unpacked) -> (Vec<PlannedLine>, String) {
    let header = unpacked.remainder.unwrap_or_default();
    (unpacked.helpers, header)
}

/// `elif C:` becomes `else:` holding the helpers and `if C':`
pub fn elif_adjust(unpacked: Unpacked) -> Vec<PlannedLine> {
    let mut plan = vec![PlannedLine::at(0, "else:")];
    plan.extend(indented(unpacked.helpers, 1));
    if let Some(rest) = unpacked.remainder {
        plan.push(PlannedLine::at(1, rest));
    }
    plan
}

/// `except E:` catches everything, evaluates the filter, then re-raises
/// into a nested handler that applies it
pub fn except_adjust(unpacked: Unpacked) -> Vec<PlannedLine> {
    let mut plan = vec![PlannedLine::at(0, "except BaseException:")];
    plan.extend(indented(unpacked.helpers, 1));
    plan.push(PlannedLine::at(1, "try:"));
    plan.push(PlannedLine::at(2, "raise"));
    if let Some(rest) = unpacked.remainder {
        plan.push(PlannedLine::at(1, rest));
    }
    plan
}

/// Push one evaluated decorator onto `.decorator`
pub fn decorator_push(unpacked: Unpacked) -> Vec<PlannedLine> {
    let mut plan = unpacked.helpers;
    if let Some(rest) = unpacked.remainder {
        plan.push(PlannedLine::at(0, format!(".decorator += [{}]", rest)));
    }
    plan
}

/// Apply the pushed decorators innermost first
pub fn decorator_apply(name: &str, count: usize) -> Vec<PlannedLine> {
    (0..count)
        .map(|_| PlannedLine::at(0, format!("{} = .decorator.pop()({})", name, name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpacked(helpers: &[&str], rest: &str) -> Unpacked {
        Unpacked {
            helpers: helpers.iter().map(|h| PlannedLine::at(0, *h)).collect(),
            remainder: Some(rest.to_string()),
        }
    }

    fn texts(plan: &[PlannedLine]) -> Vec<String> {
        plan.iter()
            .map(|l| format!("{}{}", "  ".repeat(l.depth), l.text))
            .collect()
    }

    #[test]
    fn test_elif_adjust_nests_the_condition() {
        let plan = elif_adjust(unpacked(&["return 1", ".args += [.send]"], "if .args.pop(0):"));
        assert_eq!(
            texts(&plan),
            vec!["else:", "  return 1", "  .args += [.send]", "  if .args.pop(0):"]
        );
    }

    #[test]
    fn test_except_adjust_reraises_into_the_filter() {
        let plan = except_adjust(unpacked(&["return 1", ".args += [.send]"], "except .args.pop() as e:"));
        assert_eq!(
            texts(&plan),
            vec![
                "except BaseException:",
                "  return 1",
                "  .args += [.send]",
                "  try:",
                "    raise",
                "  except .args.pop() as e:",
            ]
        );
    }

    #[test]
    fn test_decorators_apply_once_each() {
        let plan = decorator_apply("f", 2);
        assert_eq!(texts(&plan), vec!["f = .decorator.pop()(f)", "f = .decorator.pop()(f)"]);
    }

    #[test]
    fn test_shift_scope_covers_siblings_and_bodies() {
        let scope = ShiftScope::elif(2);
        assert!(scope.covers(3, Some("x")));
        assert!(scope.covers(2, Some("else")));
        assert!(!scope.covers(2, Some("while")));
        assert!(!scope.covers(1, Some("elif")));
    }
}
