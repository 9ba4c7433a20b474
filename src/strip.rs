//! Marker decorator removal.
//!
//! Removes whole lines holding a `@marker` / `@marker(...)` /
//! `@module.marker(...)` decorator that sits on top of a definition. The
//! argument list may wrap across lines. Markers anywhere else (inside
//! strings, or not followed by a definition) are left alone, which makes
//! stripping idempotent.

use crate::syntax;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// A line that opens a definition or another decorator.
static RE_DEFINITION_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(?:@|(?:async[ \t]+)?def[ \t]|class[ \t])").unwrap());

pub(crate) fn marker_regex(marker: &str) -> Regex {
    let marker = regex::escape(marker);
    // Escaped identifier, always valid.
    Regex::new(&format!(r"(?m)^[ \t]*@(?:[A-Za-z_][\w.]*\.)?{marker}\b")).unwrap()
}

/// A marker decorator opening a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkerSite {
    /// Start of the decorator line.
    pub start: usize,
    /// Inside of the argument parentheses, when invoked.
    pub args: Option<Range<usize>>,
    /// Start of the line following the decorator.
    pub next: usize,
}

/// Every marker decorator at a logical line start. `Err` carries the line
/// offset of an invocation that is unterminated or followed by code.
pub(crate) fn marker_sites(
    text: &str,
    marker: &str,
    starts: &[usize],
) -> Vec<Result<MarkerSite, usize>> {
    marker_regex(marker)
        .find_iter(text)
        .filter(|m| starts.binary_search(&m.start()).is_ok())
        .map(|m| site_at(text, m.start(), m.end()).ok_or(m.start()))
        .collect()
}

fn site_at(text: &str, start: usize, after: usize) -> Option<MarkerSite> {
    let rest = &text[after..];
    let gap = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let (end, args) = if rest[gap..].starts_with('(') {
        let open = after + gap;
        let close = syntax::matching_close(text, open)?;
        (close + 1, Some(open + 1..close))
    } else {
        (after, None)
    };
    let line_end = text[end..].find('\n').map_or(text.len(), |i| end + i);
    syntax::is_blank_or_comment(&text[end..line_end]).then(|| MarkerSite {
        start,
        args,
        next: (line_end + 1).min(text.len()),
    })
}

/// True when the next non-blank, non-comment logical line after `from`
/// opens a definition or another decorator.
fn precedes_definition(text: &str, starts: &[usize], from: usize) -> bool {
    syntax::next_code_line(text, starts, from)
        .is_some_and(|s| RE_DEFINITION_HEAD.is_match(syntax::line_at(text, s)))
}

/// Line ranges (terminator included) holding strippable markers.
pub fn marker_lines(text: &str, marker: &str) -> Vec<Range<usize>> {
    let starts = syntax::logical_line_starts(text);
    marker_sites(text, marker, &starts)
        .into_iter()
        .flatten()
        .filter(|site| precedes_definition(text, &starts, site.next))
        .map(|site| site.start..site.next)
        .collect()
}

/// Remove every marker decorator line from `text`.
pub fn strip(text: &str, marker: &str) -> String {
    let ranges = marker_lines(text, marker);
    if ranges.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for range in ranges {
        out.push_str(&text[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}
