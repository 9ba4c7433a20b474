//! Signature location.
//!
//! Finds the span of a `def` or `class` signature from its keyword to the
//! `:` that terminates it. Parameter lists may wrap across lines and carry
//! nested brackets, strings, comments and return annotations; decorators
//! on preceding lines are never part of the span.

use crate::error::LocateError;
use crate::model::{DefinitionKind, IndentUnit};
use crate::syntax::{self, CodeChars};
use regex::Regex;
use std::ops::Range;

/// Byte span of a signature: `start` is the defining keyword (or `async`),
/// `end` is one past the terminating `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A located signature with the depth it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub span: Span,
    pub depth: usize,
}

/// Restricts a search to a byte range and, optionally, one nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub range: Range<usize>,
    pub depth: Option<usize>,
}

impl Scope {
    pub fn whole(text: &str) -> Self {
        Scope {
            range: 0..text.len(),
            depth: None,
        }
    }

    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }
}

fn signature_regex(kind: DefinitionKind, name: &str) -> Regex {
    let name = regex::escape(name);
    let pattern = match kind {
        DefinitionKind::Callable => {
            format!(r"(?m)^([ \t]*)((?:async[ \t]+)?def[ \t]+{name}[ \t]*\()")
        }
        DefinitionKind::Type => format!(r"(?m)^([ \t]*)(class[ \t]+{name}\b)"),
    };
    // Names are escaped, so the pattern is always valid.
    Regex::new(&pattern).unwrap()
}

/// Signature lookups over one unit's text.
pub struct Locator<'a> {
    text: &'a str,
    unit: IndentUnit,
    line_starts: Vec<usize>,
}

impl<'a> Locator<'a> {
    pub fn new(text: &'a str, unit: IndentUnit) -> Self {
        Locator {
            text,
            unit,
            line_starts: syntax::logical_line_starts(text),
        }
    }

    /// Locate the unique `kind` signature called `name` within `scope`.
    pub fn locate(
        &self,
        kind: DefinitionKind,
        name: &str,
        scope: &Scope,
    ) -> Result<Signature, LocateError> {
        let re = signature_regex(kind, name);
        let base = scope.range.start;
        let haystack = &self.text[scope.range.clone()];

        let candidates: Vec<(usize, usize, usize)> = re
            .captures_iter(haystack)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let keyword = caps.get(2)?;
                let depth = self.unit.depth(&caps[1]);
                Some((base + whole.start(), base + keyword.start(), depth))
            })
            .filter(|(line, _, _)| self.line_starts.binary_search(line).is_ok())
            .filter(|(_, _, depth)| scope.depth.map_or(true, |d| d == *depth))
            .collect();

        let (_, start, depth) = match candidates.as_slice() {
            [] => {
                return Err(LocateError::NotFound {
                    kind: kind.label(),
                    name: name.to_string(),
                })
            }
            [only] => *only,
            many => {
                return Err(LocateError::Ambiguous {
                    kind: kind.label(),
                    name: name.to_string(),
                    count: many.len(),
                })
            }
        };

        let end = signature_end(self.text, start).ok_or_else(|| LocateError::Unterminated {
            name: name.to_string(),
        })?;
        let rest = &self.text[end..line_end(self.text, end)];
        if !syntax::is_blank_or_comment(rest) {
            return Err(LocateError::InlineBody {
                name: name.to_string(),
            });
        }

        Ok(Signature {
            span: Span { start, end },
            depth,
        })
    }

    /// Byte range of the body of a type whose signature was found at `sig`.
    pub fn body_extent(&self, sig: &Signature) -> Range<usize> {
        block_extent(self.text, &self.line_starts, self.unit, sig.span.end, sig.depth)
    }
}

/// Offset one past the top-level `:` ending the header that starts at
/// `start`. `None` when a top-level line break comes first.
pub(crate) fn signature_end(text: &str, start: usize) -> Option<usize> {
    for c in CodeChars::new(text, start) {
        if c.depth > 0 {
            continue;
        }
        match c.ch {
            ':' => return Some(c.offset + 1),
            '\n' => return None,
            _ => {}
        }
    }
    None
}

/// Byte range of the block under a header that ends at `header_end` and
/// sits at `depth`.
///
/// The block runs from the line after the header up to the first logical
/// line indented no deeper than the header itself.
pub(crate) fn block_extent(
    text: &str,
    line_starts: &[usize],
    unit: IndentUnit,
    header_end: usize,
    depth: usize,
) -> Range<usize> {
    let start = (line_end(text, header_end) + 1).min(text.len());
    let end = line_starts
        .iter()
        .copied()
        .filter(|&s| s >= start)
        .find(|&s| {
            let line = syntax::line_at(text, s);
            !syntax::is_blank_or_comment(line)
                && unit.depth(syntax::leading_whitespace(line)) <= depth
        })
        .unwrap_or(text.len());
    start..end
}

/// Offset of the line terminator at or after `offset` (or end of text).
fn line_end(text: &str, offset: usize) -> usize {
    text[offset..].find('\n').map_or(text.len(), |i| offset + i)
}

/// Locate the unique `kind` signature called `name` anywhere in `text`.
pub fn locate(kind: DefinitionKind, name: &str, text: &str) -> Result<Span, LocateError> {
    let locator = Locator::new(text, IndentUnit::detect(text));
    locator
        .locate(kind, name, &Scope::whole(text))
        .map(|sig| sig.span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig_text(text: &str, kind: DefinitionKind, name: &str) -> String {
        let span = locate(kind, name, text).unwrap();
        text[span.start..span.end].to_string()
    }

    #[test]
    fn single_line_function() {
        let text = "def add(a: int, b: int) -> int:\n    return a + b\n";
        assert_eq!(
            sig_text(text, DefinitionKind::Callable, "add"),
            "def add(a: int, b: int) -> int:"
        );
    }

    #[test]
    fn multi_line_parameters_and_return() {
        let text = "def load(\n    path: str,\n    opts: Dict[str, int] = {'a': 1},\n) -> Tuple[int, int]:\n    pass\n";
        let span = locate(DefinitionKind::Callable, "load", text).unwrap();
        assert_eq!(span.start, 0);
        assert!(text[..span.end].ends_with("Tuple[int, int]:"));
    }

    #[test]
    fn decorated_signature_starts_at_keyword() {
        let text = "@to_document(\n    description=\"x: y\",\n)\n@cache\nasync def fetch(url):\n    pass\n";
        assert_eq!(
            sig_text(text, DefinitionKind::Callable, "fetch"),
            "async def fetch(url):"
        );
    }

    #[test]
    fn lambda_default_does_not_terminate() {
        let text = "def sort(items, key=lambda x: x):\n    pass\n";
        assert_eq!(
            sig_text(text, DefinitionKind::Callable, "sort"),
            "def sort(items, key=lambda x: x):"
        );
    }

    #[test]
    fn prefix_names_do_not_match() {
        let text = "def add_one(x):\n    pass\n\ndef add(a, b):\n    pass\n";
        assert_eq!(
            sig_text(text, DefinitionKind::Callable, "add"),
            "def add(a, b):"
        );
    }

    #[test]
    fn class_with_bases() {
        let text = "class Point(Base, metaclass=Meta):\n    x = 1\n";
        assert_eq!(
            sig_text(text, DefinitionKind::Type, "Point"),
            "class Point(Base, metaclass=Meta):"
        );
        let bare = "class Empty:\n    pass\n";
        assert_eq!(sig_text(bare, DefinitionKind::Type, "Empty"), "class Empty:");
    }

    #[test]
    fn missing_signature() {
        let err = locate(DefinitionKind::Callable, "nope", "def yes():\n    pass\n").unwrap_err();
        assert!(matches!(err, LocateError::NotFound { .. }));
    }

    #[test]
    fn duplicate_signature_is_ambiguous() {
        let text = "def f():\n    pass\n\ndef f():\n    pass\n";
        let err = locate(DefinitionKind::Callable, "f", text).unwrap_err();
        assert_eq!(
            err,
            LocateError::Ambiguous {
                kind: "function",
                name: "f".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn unterminated_signature() {
        let err = locate(DefinitionKind::Callable, "f", "def f(a,\n  b\n").unwrap_err();
        assert!(matches!(err, LocateError::Unterminated { .. }));
        let err = locate(DefinitionKind::Type, "A", "class A\n    x = 1\n").unwrap_err();
        assert!(matches!(err, LocateError::Unterminated { .. }));
    }

    #[test]
    fn inline_body_is_rejected() {
        let err = locate(DefinitionKind::Callable, "f", "def f(): return 1\n").unwrap_err();
        assert!(matches!(err, LocateError::InlineBody { .. }));
        assert!(locate(DefinitionKind::Callable, "g", "def g():  # note\n    pass\n").is_ok());
    }

    #[test]
    fn definitions_inside_strings_are_ignored() {
        let text = "\"\"\"\ndef f():\n\"\"\"\ndef f():\n    pass\n";
        let span = locate(DefinitionKind::Callable, "f", text).unwrap();
        assert_eq!(span.start, text.rfind("def f").unwrap());
    }

    #[test]
    fn scoped_search_picks_method_of_its_class() {
        let text = "class A:\n    def run(self):\n        pass\n\nclass B:\n    def run(self):\n        pass\n";
        let unit = IndentUnit::detect(text);
        let locator = Locator::new(text, unit);
        let b = locator
            .locate(DefinitionKind::Type, "B", &Scope::whole(text))
            .unwrap();
        let body = locator.body_extent(&b);
        assert_eq!(&text[body.clone()], "    def run(self):\n        pass\n");
        let run = locator
            .locate(
                DefinitionKind::Callable,
                "run",
                &Scope {
                    range: body,
                    depth: Some(1),
                },
            )
            .unwrap();
        assert_eq!(run.span.start, text.rfind("def run").unwrap());
        assert_eq!(run.depth, 1);
    }

    #[test]
    fn depth_filter_separates_function_from_method() {
        let text = "def run():\n    pass\n\nclass A:\n    def run(self):\n        pass\n";
        let locator = Locator::new(text, IndentUnit::detect(text));
        let top = locator
            .locate(
                DefinitionKind::Callable,
                "run",
                &Scope::whole(text).at_depth(0),
            )
            .unwrap();
        assert_eq!(top.span.start, 0);
    }

    #[test]
    fn body_extent_stops_at_dedent() {
        let text = "class A:\n    x = 1\n\n    # note\n    y = 2\nz = 3\n";
        let locator = Locator::new(text, IndentUnit::detect(text));
        let a = locator
            .locate(DefinitionKind::Type, "A", &Scope::whole(text))
            .unwrap();
        let body = locator.body_extent(&a);
        assert_eq!(&text[body], "    x = 1\n\n    # note\n    y = 2\n");
    }
}
