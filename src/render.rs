//! Docstring rendering.
//!
//! Turns an [`Entry`] into a triple-quoted block using a [`FormatLayout`].
//! Templates receive these placeholders:
//!
//! | Template      | Placeholders                                  |
//! |---------------|-----------------------------------------------|
//! | `description` | `{description}`                               |
//! | `fields`      | `{prefix}`, `{name}`, `{suffix}`, `{values}`  |
//! | `items`       | `{name}`, `{type}`, `{default}`, `{description}` |
//!
//! Any other `{word}` is left as written. Output order follows the entry's
//! declaration order, so rendering is deterministic.

use crate::layout::FormatLayout;
use crate::model::{CallableEntry, Entry, IndentUnit, Slot, TypeEntry};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Docstring delimiter.
pub const DELIMITER: &str = "\"\"\"";

/// Fill-in marker for an unknown type.
pub const TYPE_PLACEHOLDER: &str = "{TYPE}";

/// Fill-in marker for a missing description.
pub const DESCRIPTION_PLACEHOLDER: &str = "{DESCRIPTION}";

/// Rendered in place of a field with no items.
pub const NONE_MARKER: &str = "None";

static RE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());

static RE_TYPING_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btyping\.").unwrap());

static RE_SIMPLE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

/// Substitute `{key}` placeholders in a single pass. Unknown keys stay.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

/// Display label for a declared type.
pub fn type_label(annotation: Option<&str>) -> String {
    match annotation {
        None => TYPE_PLACEHOLDER.to_string(),
        Some(a) if RE_SIMPLE_NAME.is_match(a) => a.to_string(),
        Some(a) => RE_TYPING_PREFIX.replace_all(a, "").into_owned(),
    }
}

/// Renders entries with one layout for one source unit.
pub struct Formatter<'a> {
    layout: &'a FormatLayout,
    unit: IndentUnit,
}

impl<'a> Formatter<'a> {
    pub fn new(layout: &'a FormatLayout, unit: IndentUnit) -> Self {
        Formatter { layout, unit }
    }

    /// Render the block for `entry`, indented to its level and ending in a
    /// line terminator.
    pub fn render(&self, entry: &Entry) -> String {
        match entry {
            Entry::Callable(c) => self.render_callable(c),
            Entry::Type(t) => self.render_type(t),
        }
    }

    pub fn render_callable(&self, entry: &CallableEntry) -> String {
        let parameters = entry
            .parameters()
            .iter()
            .map(|(name, slot)| self.item(name, slot))
            .collect();
        let returns = entry
            .returns()
            .map(|r| self.item(&r.label, &Slot::new(Some(&r.annotation), None)))
            .into_iter()
            .collect();

        self.block(
            entry.description(),
            &[("Parameters", parameters), ("Returns", returns)],
            entry.indent_level(),
        )
    }

    pub fn render_type(&self, entry: &TypeEntry) -> String {
        let attributes = entry
            .attributes()
            .iter()
            .map(|(name, slot)| self.item(name, slot))
            .collect();
        let member = |(name, label): (&String, &Option<String>)| {
            self.item(name, &Slot::new(label.as_deref(), None))
        };
        let public = entry.public_members().iter().map(member).collect();
        let protected = entry.protected_members().iter().map(member).collect();

        self.block(
            entry.description(),
            &[
                ("Attributes", attributes),
                ("Public members", public),
                ("Protected members", protected),
            ],
            entry.indent_level(),
        )
    }

    /// Expand template tabs to the unit's indentation text.
    fn template(&self, template: &str) -> String {
        template.replace('\t', &self.unit.text())
    }

    fn item(&self, name: &str, slot: &Slot) -> String {
        let display = if slot.is_optional() {
            format!("OPTIONAL[{name}]")
        } else {
            name.to_string()
        };
        let default = slot
            .default
            .as_deref()
            .map(|d| format!("Default: {d}"))
            .unwrap_or_default();
        let ty = type_label(slot.annotation.as_deref());

        fill(
            &self.template(self.layout.items()),
            &[
                ("name", &display),
                ("type", &ty),
                ("default", &default),
                ("description", DESCRIPTION_PLACEHOLDER),
            ],
        )
        .trim_end()
        .to_string()
    }

    fn field(&self, name: &str, items: &[String]) -> String {
        let width = name.chars().count();
        let prefix = self.layout.prefix().repeat(width);
        let suffix = self.layout.suffix().repeat(width);
        let values = if items.is_empty() {
            NONE_MARKER.to_string()
        } else {
            items.join("\n")
        };

        fill(
            &self.template(self.layout.fields()),
            &[
                ("prefix", &prefix),
                ("name", name),
                ("suffix", &suffix),
                ("values", &values),
            ],
        )
    }

    fn block(&self, description: &str, fields: &[(&str, Vec<String>)], level: usize) -> String {
        let description = if description.is_empty() {
            DESCRIPTION_PLACEHOLDER
        } else {
            description
        };
        let head = fill(
            &self.template(self.layout.description()),
            &[("description", description)],
        );
        let body = fields
            .iter()
            .map(|(name, items)| self.field(name, items))
            .collect::<Vec<_>>()
            .join("\n");

        let raw = format!("{DELIMITER}{head}\n{}\n{DELIMITER}\n", body.trim());
        indent_block(&raw, &self.unit.repeat(level))
    }
}

/// Prefix every non-empty line of `block` with `indent`.
pub fn indent_block(block: &str, indent: &str) -> String {
    block
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
