//! Metadata model for documentable definitions; independent of any layout.
//!
//! Entries are built once per run from a unit's text and are read-only
//! afterwards: fields are private and `indent_level` is fixed at
//! construction.

use crate::syntax;
use indexmap::IndexMap;

/// Label used for the return entry unless the marker overrides it.
pub const DEFAULT_RETURN_LABEL: &str = "result";

/// Spaces counted as one level when they follow tabs in a tab-indented unit.
const SPACES_PER_TAB: usize = 4;

/// Indentation unit used by a source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentUnit {
    Tab,
    Spaces(usize),
}

impl Default for IndentUnit {
    fn default() -> Self {
        IndentUnit::Spaces(4)
    }
}

impl IndentUnit {
    /// Detect the unit from how far each block steps in.
    ///
    /// Only logical lines holding code are measured, so string contents,
    /// continuation lines and comments never count. Any tab-indented line
    /// selects [`IndentUnit::Tab`]; otherwise the smallest increase in
    /// leading spaces from one code line to the next wins.
    pub fn detect(text: &str) -> Self {
        let mut smallest: Option<usize> = None;
        let mut previous = 0;
        for start in syntax::logical_line_starts(text) {
            let line = syntax::line_at(text, start);
            if syntax::is_blank_or_comment(line) {
                continue;
            }
            let leading = syntax::leading_whitespace(line);
            if leading.starts_with('\t') {
                return IndentUnit::Tab;
            }
            let spaces = leading.len();
            if spaces > previous {
                let step = spaces - previous;
                smallest = Some(smallest.map_or(step, |s| s.min(step)));
            }
            previous = spaces;
        }
        smallest.map_or_else(IndentUnit::default, IndentUnit::Spaces)
    }

    /// Number of whole units in a run of leading whitespace.
    pub fn depth(self, leading: &str) -> usize {
        let tabs = leading.chars().filter(|&c| c == '\t').count();
        let spaces = leading.chars().filter(|&c| c == ' ').count();
        match self {
            IndentUnit::Tab => tabs + spaces / SPACES_PER_TAB,
            IndentUnit::Spaces(n) => tabs + spaces / n.max(1),
        }
    }

    /// Text of one unit.
    pub fn text(self) -> String {
        match self {
            IndentUnit::Tab => "\t".to_string(),
            IndentUnit::Spaces(n) => " ".repeat(n),
        }
    }

    /// Text of `level` units.
    pub fn repeat(self, level: usize) -> String {
        self.text().repeat(level)
    }
}

/// Declared shape of one parameter or attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    /// Declared type, `None` when not annotated.
    pub annotation: Option<String>,
    /// Default value as written in source, `None` when absent.
    pub default: Option<String>,
}

impl Slot {
    pub fn new(annotation: Option<&str>, default: Option<&str>) -> Self {
        Slot {
            annotation: annotation.map(str::to_string),
            default: default.map(str::to_string),
        }
    }

    /// A slot is optional exactly when it carries a default.
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// The `(label, type)` pair describing a callable's return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnSpec {
    pub label: String,
    pub annotation: String,
}

/// Visibility of a type member, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    /// Double-underscore names, never listed.
    Internal,
}

impl Visibility {
    pub fn of(name: &str) -> Self {
        if name.starts_with("__") {
            Visibility::Internal
        } else if name.starts_with('_') {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }
}

/// Kind of definition a signature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Callable,
    Type,
}

impl DefinitionKind {
    pub fn label(self) -> &'static str {
        match self {
            DefinitionKind::Callable => "function",
            DefinitionKind::Type => "class",
        }
    }
}

/// A function or method marked for documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableEntry {
    name: String,
    description: String,
    parameters: IndexMap<String, Slot>,
    returns: Option<ReturnSpec>,
    indent_level: usize,
}

impl CallableEntry {
    /// Build an entry whose signature is preceded by `leading` whitespace.
    ///
    /// The docstring sits one level inside the signature.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: IndexMap<String, Slot>,
        returns: Option<ReturnSpec>,
        leading: &str,
        unit: IndentUnit,
    ) -> Self {
        CallableEntry {
            name: name.into(),
            description: description.into(),
            parameters,
            returns,
            indent_level: unit.depth(leading) + 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &IndexMap<String, Slot> {
        &self.parameters
    }

    pub fn returns(&self) -> Option<&ReturnSpec> {
        self.returns.as_ref()
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    /// Depth of the signature line itself.
    pub fn signature_depth(&self) -> usize {
        self.indent_level.saturating_sub(1)
    }
}

/// A class marked for documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    name: String,
    description: String,
    attributes: IndexMap<String, Slot>,
    public_members: IndexMap<String, Option<String>>,
    protected_members: IndexMap<String, Option<String>>,
    nested_callables: Vec<CallableEntry>,
    signature_depth: usize,
    indent_level: usize,
}

/// Members of a type as discovered in its body, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TypeBody {
    pub attributes: IndexMap<String, Slot>,
    /// `(name, return annotation)` for every method.
    pub members: Vec<(String, Option<String>)>,
    /// Leading whitespace of the first method signature, if any.
    pub first_member_leading: Option<String>,
    /// Leading whitespace of `__init__`, if defined.
    pub constructor_leading: Option<String>,
    pub nested_callables: Vec<CallableEntry>,
}

impl TypeEntry {
    /// Build an entry for a class whose signature is preceded by `leading`.
    ///
    /// Members are split by [`Visibility`]; internal names are dropped.
    /// Nested callables must name members of `body`; others are discarded.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        body: TypeBody,
        leading: &str,
        unit: IndentUnit,
    ) -> Self {
        let signature_depth = unit.depth(leading);
        let indent_level = body
            .first_member_leading
            .as_deref()
            .or(body.constructor_leading.as_deref())
            .map_or(signature_depth + 1, |l| unit.depth(l));

        let mut public_members = IndexMap::new();
        let mut protected_members = IndexMap::new();
        for (member, label) in &body.members {
            match Visibility::of(member) {
                Visibility::Public => {
                    public_members.insert(member.clone(), label.clone());
                }
                Visibility::Protected => {
                    protected_members.insert(member.clone(), label.clone());
                }
                Visibility::Internal => {}
            }
        }

        let nested_callables = body
            .nested_callables
            .into_iter()
            .filter(|c| {
                public_members.contains_key(c.name()) || protected_members.contains_key(c.name())
            })
            .collect();

        TypeEntry {
            name: name.into(),
            description: description.into(),
            attributes: body.attributes,
            public_members,
            protected_members,
            nested_callables,
            signature_depth,
            indent_level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn attributes(&self) -> &IndexMap<String, Slot> {
        &self.attributes
    }

    pub fn public_members(&self) -> &IndexMap<String, Option<String>> {
        &self.public_members
    }

    pub fn protected_members(&self) -> &IndexMap<String, Option<String>> {
        &self.protected_members
    }

    pub fn nested_callables(&self) -> &[CallableEntry] {
        &self.nested_callables
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    pub fn signature_depth(&self) -> usize {
        self.signature_depth
    }
}

/// Anything the pipeline can document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Callable(CallableEntry),
    Type(TypeEntry),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Callable(c) => c.name(),
            Entry::Type(t) => t.name(),
        }
    }

    pub fn kind(&self) -> DefinitionKind {
        match self {
            Entry::Callable(_) => DefinitionKind::Callable,
            Entry::Type(_) => DefinitionKind::Type,
        }
    }

    pub fn indent_level(&self) -> usize {
        match self {
            Entry::Callable(c) => c.indent_level(),
            Entry::Type(t) => t.indent_level(),
        }
    }

    pub fn signature_depth(&self) -> usize {
        match self {
            Entry::Callable(c) => c.signature_depth(),
            Entry::Type(t) => t.signature_depth(),
        }
    }
}

/// Ordered entries of one unit, with the unit's indentation.
#[derive(Debug, Clone, Default)]
pub struct Worklist {
    pub unit: IndentUnit,
    pub entries: Vec<Entry>,
}
