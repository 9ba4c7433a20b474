//! Worklist extraction.
//!
//! A static pass that finds every definition carrying the marker decorator
//! and reads what its docstring needs straight from the source: parameters,
//! defaults and return annotations of functions, and the attributes and
//! methods of classes. Only module-level definitions are entries; marked
//! methods of a marked class become its nested callables.

use crate::error::ScanError;
use crate::locate;
use crate::model::{
    CallableEntry, Entry, IndentUnit, ReturnSpec, Slot, TypeBody, TypeEntry, Worklist,
    DEFAULT_RETURN_LABEL,
};
use crate::strip;
use crate::syntax;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static RE_DEF_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)[ \t]*\(").unwrap()
});

static RE_CLASS_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)class[ \t]+([A-Za-z_]\w*)").unwrap());

static RE_DECORATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]*@").unwrap());

/// `name =`, `name: T` or `name: T = value` at the start of a line.
static RE_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*([A-Za-z_]\w*)[ \t]*([:=])").unwrap());

static RE_SELF_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*self\.([A-Za-z]\w*)[ \t]*(?::([^=\n]+))?=").unwrap()
});

static RE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").unwrap());

/// Block keywords that look like annotated names (`else:`).
const BLOCK_KEYWORDS: &[&str] = &["else", "try", "finally"];

/// Arguments given to one marker decorator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MarkerArgs {
    description: String,
    return_label: Option<String>,
}

/// A definition with the marker among its decorators.
#[derive(Debug, Clone)]
struct Marked {
    /// Start of the `def`/`class` line.
    line: usize,
    args: MarkerArgs,
}

#[derive(Debug)]
struct DefHeader<'a> {
    leading: &'a str,
    name: &'a str,
    parameters: IndexMap<String, Slot>,
    returns: Option<String>,
    end: usize,
}

#[derive(Debug)]
struct ClassHeader<'a> {
    leading: &'a str,
    name: &'a str,
    end: usize,
}

/// Build the worklist of a unit whose definitions are marked with
/// `@{marker}`.
pub fn scan_unit(text: &str, marker: &str) -> Result<Worklist, ScanError> {
    let code = syntax::blank_comments(text);
    let scanner = Scanner {
        code: &code,
        unit: IndentUnit::detect(text),
        starts: syntax::logical_line_starts(&code),
    };

    let marked = scanner.marked_definitions(marker)?;
    let mut entries = Vec::new();
    for m in &marked {
        let leading = syntax::leading_whitespace(syntax::line_at(&code, m.line));
        if scanner.unit.depth(leading) > 0 {
            continue;
        }
        if let Some(def) = scanner.def_header(m.line)? {
            debug!("found marked function '{}'", def.name);
            entries.push(Entry::Callable(callable_entry(&def, &m.args, scanner.unit)));
        } else if let Some(class) = scanner.class_header(m.line)? {
            debug!("found marked class '{}'", class.name);
            let body = scanner.class_body(&class, &marked)?;
            entries.push(Entry::Type(TypeEntry::new(
                class.name,
                m.args.description.clone(),
                body,
                class.leading,
                scanner.unit,
            )));
        }
    }

    Ok(Worklist {
        unit: scanner.unit,
        entries,
    })
}

fn callable_entry(def: &DefHeader<'_>, args: &MarkerArgs, unit: IndentUnit) -> CallableEntry {
    let returns = def.returns.clone().map(|annotation| ReturnSpec {
        label: args
            .return_label
            .clone()
            .unwrap_or_else(|| DEFAULT_RETURN_LABEL.to_string()),
        annotation,
    });
    CallableEntry::new(
        def.name,
        args.description.clone(),
        def.parameters.clone(),
        returns,
        def.leading,
        unit,
    )
}

/// Read-only view over a unit's comment-free text.
struct Scanner<'a> {
    code: &'a str,
    unit: IndentUnit,
    starts: Vec<usize>,
}

impl<'a> Scanner<'a> {
    /// Definitions carrying the marker, in source order, one per definition.
    fn marked_definitions(&self, marker: &str) -> Result<Vec<Marked>, ScanError> {
        let mut marked: Vec<Marked> = Vec::new();
        for site in strip::marker_sites(self.code, marker, &self.starts) {
            let site = site.map_err(|offset| ScanError::UnterminatedDecorator {
                line: syntax::line_number(self.code, offset),
                marker: marker.to_string(),
            })?;
            let Some(line) = self.decorated_definition(site.next) else {
                debug!(
                    "marker on line {} precedes no definition",
                    syntax::line_number(self.code, site.start)
                );
                continue;
            };
            if marked.last().is_some_and(|m| m.line == line) {
                continue;
            }
            let args = site
                .args
                .map(|r| marker_args(&self.code[r]))
                .unwrap_or_default();
            marked.push(Marked { line, args });
        }
        Ok(marked)
    }

    /// Start of the `def`/`class` line a decorator stack starting at `from`
    /// applies to.
    fn decorated_definition(&self, mut from: usize) -> Option<usize> {
        loop {
            let start = syntax::next_code_line(self.code, &self.starts, from)?;
            let rest = &self.code[start..];
            if RE_DECORATOR.is_match(rest) {
                from = self.next_line_start(start)?;
            } else if RE_DEF_HEAD.is_match(rest) || RE_CLASS_HEAD.is_match(rest) {
                return Some(start);
            } else {
                return None;
            }
        }
    }

    fn next_line_start(&self, start: usize) -> Option<usize> {
        let next = self.starts.partition_point(|&s| s <= start);
        self.starts.get(next).copied()
    }

    /// Text of the logical line starting at `start`.
    fn logical_line(&self, start: usize) -> &'a str {
        let end = self.next_line_start(start).unwrap_or(self.code.len());
        self.code[start..end].trim_end()
    }

    fn def_header(&self, start: usize) -> Result<Option<DefHeader<'a>>, ScanError> {
        let code = self.code;
        let Some(caps) = RE_DEF_HEAD.captures(&code[start..]) else {
            return Ok(None);
        };
        let (Some(leading), Some(name), Some(head)) = (caps.get(1), caps.get(2), caps.get(0))
        else {
            return Ok(None);
        };
        let name = name.as_str();
        let unterminated = || ScanError::UnterminatedSignature {
            line: syntax::line_number(code, start),
            name: name.to_string(),
        };

        let open = start + head.end() - 1;
        let close = syntax::matching_close(code, open).ok_or_else(unterminated)?;
        let end = locate::signature_end(code, close + 1).ok_or_else(unterminated)?;
        let returns = syntax::one_line(&code[close + 1..end - 1]);
        let returns = returns
            .strip_prefix("->")
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(Some(DefHeader {
            leading: leading.as_str(),
            name,
            parameters: parse_parameters(&code[open + 1..close]),
            returns,
            end,
        }))
    }

    fn class_header(&self, start: usize) -> Result<Option<ClassHeader<'a>>, ScanError> {
        let code = self.code;
        let Some(caps) = RE_CLASS_HEAD.captures(&code[start..]) else {
            return Ok(None);
        };
        let (Some(leading), Some(name)) = (caps.get(1), caps.get(2)) else {
            return Ok(None);
        };
        let end = locate::signature_end(code, start).ok_or_else(|| {
            ScanError::UnterminatedSignature {
                line: syntax::line_number(code, start),
                name: name.as_str().to_string(),
            }
        })?;
        Ok(Some(ClassHeader {
            leading: leading.as_str(),
            name: name.as_str(),
            end,
        }))
    }

    /// Code-bearing logical line starts inside `range`.
    fn code_lines(&self, range: Range<usize>) -> impl Iterator<Item = usize> + '_ {
        self.starts
            .iter()
            .copied()
            .filter(move |s| range.contains(s))
            .filter(move |&s| !syntax::is_blank_or_comment(syntax::line_at(self.code, s)))
    }

    fn depth_at(&self, start: usize) -> usize {
        self.unit
            .depth(syntax::leading_whitespace(syntax::line_at(self.code, start)))
    }

    fn class_body(
        &self,
        class: &ClassHeader<'_>,
        marked: &[Marked],
    ) -> Result<TypeBody, ScanError> {
        let class_depth = self.unit.depth(class.leading);
        let extent =
            locate::block_extent(self.code, &self.starts, self.unit, class.end, class_depth);
        let mut body = TypeBody::default();
        let Some(member_depth) = self.code_lines(extent.clone()).next().map(|s| self.depth_at(s))
        else {
            return Ok(body);
        };

        let mut instance_attributes = IndexMap::new();
        let lines: Vec<usize> = self
            .code_lines(extent)
            .filter(|&s| self.depth_at(s) == member_depth)
            .collect();
        for start in lines {
            if let Some(def) = self.def_header(start)? {
                if body.first_member_leading.is_none() {
                    body.first_member_leading = Some(def.leading.to_string());
                }
                if def.name == "__init__" {
                    body.constructor_leading = Some(def.leading.to_string());
                    let init = locate::block_extent(
                        self.code,
                        &self.starts,
                        self.unit,
                        def.end,
                        member_depth,
                    );
                    self.instance_attributes(init, &mut instance_attributes);
                }
                if let Some(m) = marked.iter().find(|m| m.line == start) {
                    body.nested_callables
                        .push(callable_entry(&def, &m.args, self.unit));
                }
                body.members.push((def.name.to_string(), def.returns));
            } else if let Some((name, slot)) = self.attribute(start) {
                body.attributes.entry(name).or_insert(slot);
            }
        }

        for (name, slot) in instance_attributes {
            body.attributes.entry(name).or_insert(slot);
        }
        Ok(body)
    }

    /// A class-level `name = ...` or `name: T` declaration.
    fn attribute(&self, start: usize) -> Option<(String, Slot)> {
        let line = self.logical_line(start);
        let caps = RE_ASSIGNMENT.captures(line)?;
        let name = caps.get(1)?.as_str();
        let op = caps.get(2)?;
        if name.starts_with('_') || BLOCK_KEYWORDS.contains(&name) {
            return None;
        }

        let rest = &line[op.end()..];
        if op.as_str() == "=" {
            return (!rest.starts_with('=')).then(|| (name.to_string(), Slot::default()));
        }
        let annotation = match syntax::find_top_level(rest, '=') {
            Some(eq) => &rest[..eq],
            None => rest,
        };
        let annotation = syntax::one_line(annotation);
        (!annotation.is_empty()).then(|| (name.to_string(), Slot::new(Some(&annotation), None)))
    }

    /// `self.name = ...` assignments inside a constructor body.
    fn instance_attributes(&self, body: Range<usize>, into: &mut IndexMap<String, Slot>) {
        for start in self.code_lines(body) {
            let line = self.logical_line(start);
            let Some(caps) = RE_SELF_ASSIGNMENT.captures(line) else {
                continue;
            };
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if line[whole.end()..].starts_with('=') {
                continue;
            }
            let annotation = caps.get(2).map(|a| a.as_str().trim()).filter(|a| !a.is_empty());
            into.entry(name.as_str().to_string())
                .or_insert_with(|| Slot::new(annotation, None));
        }
    }
}

/// Parameters of a `def` in declaration order.
///
/// A leading `self`/`cls` and the bare `*` and `/` separators are dropped.
fn parse_parameters(params: &str) -> IndexMap<String, Slot> {
    let mut out = IndexMap::new();
    for (index, param) in syntax::split_top_level(params, ',').into_iter().enumerate() {
        if param == "*" || param == "/" {
            continue;
        }
        let (head, default) = match syntax::find_top_level(param, '=') {
            Some(eq) => (&param[..eq], Some(syntax::one_line(&param[eq + 1..]))),
            None => (param, None),
        };
        let (name, annotation) = match syntax::find_top_level(head, ':') {
            Some(colon) => (head[..colon].trim(), Some(syntax::one_line(&head[colon + 1..]))),
            None => (head.trim(), None),
        };
        if index == 0 && matches!(name, "self" | "cls") {
            continue;
        }
        out.insert(name.to_string(), Slot { annotation, default });
    }
    out
}

/// Read `description` and `name_return` from a marker's argument list.
fn marker_args(args: &str) -> MarkerArgs {
    let mut out = MarkerArgs::default();
    let mut positional = 0;
    for arg in syntax::split_top_level(args, ',') {
        match keyword_argument(arg) {
            Some(("description", value)) => {
                out.description = literal_or_warn(value).unwrap_or_default();
            }
            Some(("name_return", value)) => out.return_label = literal_or_warn(value),
            Some(_) => {}
            None => {
                if positional == 0 {
                    out.description = literal_or_warn(arg).unwrap_or_default();
                }
                positional += 1;
            }
        }
    }
    out
}

fn keyword_argument(arg: &str) -> Option<(&str, &str)> {
    let eq = syntax::find_top_level(arg, '=')?;
    let key = arg[..eq].trim();
    let value = &arg[eq + 1..];
    (RE_IDENTIFIER.is_match(key) && !value.starts_with('=')).then(|| (key, value.trim()))
}

fn literal_or_warn(value: &str) -> Option<String> {
    let literal = syntax::string_literal_value(value);
    if literal.is_none() {
        debug!("ignoring non-literal marker argument {value}");
    }
    literal
}
