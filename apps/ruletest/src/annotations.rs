//! Extraction of expected findings from inline test annotations.
//!
//! A fixture marks the statement on the following line with a comment such as
//! `# ruleid: useless-eqeq` (must be reported) or `// ok: useless-eqeq` (must
//! not be reported). `todoruleid` and `todook` mark known gaps whose lines are
//! excluded from scoring. Comment openers `#`, `//`, `<!--` and `(*` are
//! recognized with zero or one space before the marker.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// Comment syntaxes as (opener, terminator); `\n` means line comment.
pub const COMMENT_SYNTAXES: [(&str, &str); 4] =
    [("#", "\n"), ("//", "\n"), ("<!--", "-->"), ("(*", "*)")];

pub const RULEID: &str = "ruleid";
pub const TODORULEID: &str = "todoruleid";
pub const OK: &str = "ok";
pub const TODOOK: &str = "todook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    RuleId,
    TodoRuleId,
    Ok,
    TodoOk,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 4] = [
        AnnotationKind::RuleId,
        AnnotationKind::TodoRuleId,
        AnnotationKind::Ok,
        AnnotationKind::TodoOk,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            AnnotationKind::RuleId => RULEID,
            AnnotationKind::TodoRuleId => TODORULEID,
            AnnotationKind::Ok => OK,
            AnnotationKind::TodoOk => TODOOK,
        }
    }

    fn pattern(self) -> Option<&'static Regex> {
        static PATTERNS: OnceLock<[Option<Regex>; 4]> = OnceLock::new();
        let all = PATTERNS.get_or_init(|| {
            let openers = COMMENT_SYNTAXES
                .iter()
                .map(|(open, _)| regex::escape(open))
                .collect::<Vec<_>>()
                .join("|");
            AnnotationKind::ALL.map(|k| {
                Regex::new(&format!("(?:{}) ?{}", openers, regex::escape(k.marker()))).ok()
            })
        });
        let index = match self {
            AnnotationKind::RuleId => 0,
            AnnotationKind::TodoRuleId => 1,
            AnnotationKind::Ok => 2,
            AnnotationKind::TodoOk => 3,
        };
        all[index].as_ref()
    }

    /// Whether `line` carries this marker under any comment syntax.
    pub fn in_line(self, line: &str) -> bool {
        self.pattern().is_some_and(|re| re.is_match(line))
    }
}

/// Line number (1-based, of the annotated statement) to rule ids.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineRules(BTreeMap<usize, BTreeSet<String>>);

impl LineRules {
    fn add(&mut self, line: usize, rule_ids: &BTreeSet<String>) {
        self.0.entry(line).or_default().extend(rule_ids.iter().cloned());
    }

    /// Rule ids on the given line.
    pub fn at(&self, line: usize) -> Option<&BTreeSet<String>> {
        self.0.get(&line)
    }

    /// Lines annotated with `rule_id`.
    pub fn lines_for(&self, rule_id: &str) -> BTreeSet<usize> {
        self.0
            .iter()
            .filter(|(_, ids)| ids.contains(rule_id))
            .map(|(line, _)| *line)
            .collect()
    }

    /// Every rule id referenced by any line.
    pub fn rule_ids(&self) -> BTreeSet<String> {
        self.0.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The four annotation maps of one fixture.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Annotations {
    /// `ruleid` and `todoruleid` lines.
    pub expected: LineRules,
    /// `ok` and `todoruleid` lines.
    pub ok: LineRules,
    pub todo_ok: LineRules,
    pub todo_expected: LineRules,
}

impl Annotations {
    /// Rule ids that the fixture claims to exercise (`expected` ∪ `ok`).
    pub fn tested_rule_ids(&self) -> BTreeSet<String> {
        let mut ids = self.expected.rule_ids();
        ids.extend(self.ok.rule_ids());
        ids
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("no ':' separator")]
    MissingSeparator,
    #[error("no rule id after ':'")]
    NoRuleIds,
}

fn remove_ending_comments(piece: &str) -> String {
    let mut out = piece.to_string();
    for (_, end) in COMMENT_SYNTAXES {
        out = if end == "\n" {
            out.trim().to_string()
        } else {
            out.trim().replace(end, "")
        };
    }
    out
}

/// Parse the rule ids of an annotation line such as `  # ruleid: a, b`.
pub fn parse_rule_ids(line: &str) -> Result<BTreeSet<String>, AnnotationError> {
    let (_, rules_text) = line
        .trim()
        .split_once(':')
        .ok_or(AnnotationError::MissingSeparator)?;
    let ids: BTreeSet<String> = rules_text
        .trim()
        .split(',')
        .map(remove_ending_comments)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(AnnotationError::NoRuleIds);
    }
    Ok(ids)
}

/// Extract annotations from fixture text. `source` is only used in warnings.
pub fn extract(text: &str, source: &Path) -> Annotations {
    let mut out = Annotations::default();
    for (i, line) in text.split('\n').enumerate() {
        // 0-based index, and the annotation precedes the flagged statement
        let effective_line = i + 2;

        let rule = AnnotationKind::RuleId.in_line(line);
        let todo_rule = AnnotationKind::TodoRuleId.in_line(line);
        let ok = AnnotationKind::Ok.in_line(line);
        let todo_ok = AnnotationKind::TodoOk.in_line(line);
        if !(rule || todo_rule || ok || todo_ok) || !line.contains(':') {
            continue;
        }

        let rule_ids = match parse_rule_ids(line) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    "Could not parse {:?} as a test annotation in file {} ({}). Skipping this line",
                    line,
                    source.display(),
                    e
                );
                continue;
            }
        };
        if rule || todo_rule {
            out.expected.add(effective_line, &rule_ids);
        }
        if ok || todo_rule {
            out.ok.add(effective_line, &rule_ids);
        }
        if todo_ok {
            out.todo_ok.add(effective_line, &rule_ids);
        }
        if todo_rule {
            out.todo_expected.add(effective_line, &rule_ids);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> BTreeSet<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn run(text: &str) -> Annotations {
        extract(text, Path::new("fixture"))
    }

    #[test]
    fn test_ruleid_list_lands_on_next_line() {
        let a = run("x = 1\n# ruleid:foo, bar\ncall()\n");
        assert_eq!(a.expected.at(3), Some(&ids(&["foo", "bar"])));
        assert!(a.ok.is_empty());
    }

    #[test]
    fn test_todoruleid_is_expected_ok_and_todo() {
        let a = run("# todoruleid:foo\nbad()\n");
        assert_eq!(a.expected.at(2), Some(&ids(&["foo"])));
        assert_eq!(a.ok.at(2), Some(&ids(&["foo"])));
        assert_eq!(a.todo_expected.at(2), Some(&ids(&["foo"])));
        assert!(a.todo_ok.is_empty());
    }

    #[test]
    fn test_comment_syntaxes_and_spacing() {
        let text = [
            "//ruleid: slash",
            "a",
            "<!-- ok: html -->",
            "b",
            "(* todook: ocaml *)",
            "c",
            "    # ruleid:indented",
            "d",
        ]
        .join("\n");
        let a = run(&text);
        assert_eq!(a.expected.lines_for("slash"), BTreeSet::from([2]));
        assert_eq!(a.ok.lines_for("html"), BTreeSet::from([4]));
        assert_eq!(a.todo_ok.lines_for("ocaml"), BTreeSet::from([6]));
        assert_eq!(a.expected.lines_for("indented"), BTreeSet::from([8]));
    }

    #[test]
    fn test_each_kind_matches_only_its_own_marker() {
        for kind in AnnotationKind::ALL {
            assert!(kind.pattern().is_some());
            for other in AnnotationKind::ALL {
                let line = format!("# {}: some-rule", other.marker());
                assert_eq!(kind.in_line(&line), kind == other, "{:?} on {:?}", kind, line);
            }
        }
    }

    #[test]
    fn test_two_spaces_is_not_an_annotation() {
        let a = run("#  ruleid: foo\nx\n");
        assert_eq!(a, Annotations::default());
    }

    #[test]
    fn test_lines_without_separator_are_ignored() {
        let a = run("# ruleid foo\n# ok\nx\n");
        assert_eq!(a, Annotations::default());
    }

    #[test]
    fn test_empty_rule_list_is_skipped() {
        let a = run("# ruleid:\nx\n# ruleid: good\ny\n");
        assert_eq!(a.expected.rule_ids(), ids(&["good"]));
        assert_eq!(parse_rule_ids("# ruleid:  "), Err(AnnotationError::NoRuleIds));
    }

    #[test]
    fn test_tested_rule_ids_union() {
        let a = run("# ruleid: a\nx\n# ok: b\ny\n# todook: c\nz\n");
        assert_eq!(a.tested_rule_ids(), ids(&["a", "b"]));
    }

    #[test]
    fn test_closing_tokens_are_stripped_from_each_id() {
        assert_eq!(
            parse_rule_ids("<!-- ruleid: a,b-->").unwrap(),
            ids(&["a", "b"])
        );
        assert_eq!(parse_rule_ids("(* ok: r *)").unwrap(), ids(&["r"]));
    }
}
