//! Per-unit orchestration: scan, locate, render, splice, strip, write.

use crate::error::{DocError, LocateError};
use crate::layout::FormatLayout;
use crate::locate::{Locator, Scope, Signature};
use crate::model::{CallableEntry, Entry, Worklist};
use crate::render::Formatter;
use crate::scan;
use crate::splice::{self, Splice};
use crate::strip;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Decorator name recognised when none is configured.
pub const DEFAULT_MARKER: &str = "to_document";

/// Settings shared by every unit of a run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub layout: FormatLayout,
    /// Remove marker decorators from the written text.
    pub strip_markers: bool,
    /// Decorator name marking definitions for documentation.
    pub marker: String,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            layout: FormatLayout::default(),
            strip_markers: true,
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

/// An entry that could not be documented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// Qualified name (`Class.method` for nested callables).
    pub entry: String,
    pub error: LocateError,
}

/// Outcome of documenting one unit's text in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Documented {
    pub text: String,
    pub documented: Vec<String>,
    pub failures: Vec<EntryFailure>,
}

/// Outcome of processing one unit on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: PathBuf,
    pub destination: PathBuf,
    pub documented: Vec<String>,
    pub failures: Vec<EntryFailure>,
}

impl UnitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Documents single units with one set of [`ProcessOptions`].
#[derive(Debug, Clone, Default)]
pub struct UnitProcessor {
    options: ProcessOptions,
}

impl UnitProcessor {
    pub fn new(options: ProcessOptions) -> Self {
        UnitProcessor { options }
    }

    /// Insert a block for every entry of `worklist` into `text`.
    ///
    /// All signatures are located against the input text and the blocks
    /// are spliced in one pass, so entries never disturb each other. An
    /// entry that cannot be located is recorded and skipped.
    pub fn document(&self, text: &str, worklist: &Worklist) -> Documented {
        let locator = Locator::new(text, worklist.unit);
        let formatter = Formatter::new(&self.options.layout, worklist.unit);
        let whole = Scope::whole(text);

        let mut splices = Vec::new();
        let mut out = Documented::default();
        let mut place = |qualified: String, entry: &Entry, scope: &Scope| -> Option<Signature> {
            match locator.locate(entry.kind(), entry.name(), scope) {
                Ok(sig) => {
                    debug!("documenting {} '{}'", entry.kind().label(), qualified);
                    splices.push(Splice::after_signature(
                        text,
                        sig.span.end,
                        formatter.render(entry),
                    ));
                    out.documented.push(qualified);
                    Some(sig)
                }
                Err(error) => {
                    warn!("skipping '{qualified}': {error}");
                    out.failures.push(EntryFailure {
                        entry: qualified,
                        error,
                    });
                    None
                }
            }
        };

        for entry in &worklist.entries {
            let scope = whole.clone().at_depth(entry.signature_depth());
            let Some(sig) = place(entry.name().to_string(), entry, &scope) else {
                continue;
            };
            let Entry::Type(ty) = entry else {
                continue;
            };
            let body = Scope {
                range: locator.body_extent(&sig),
                depth: Some(ty.indent_level()),
            };
            for method in ty.nested_callables() {
                let nested = Entry::Callable(CallableEntry::clone(method));
                place(format!("{}.{}", ty.name(), method.name()), &nested, &body);
            }
        }

        let spliced = splice::apply(text, &splices);
        out.text = if self.options.strip_markers {
            strip::strip(&spliced, &self.options.marker)
        } else {
            spliced
        };
        out
    }

    /// Scan `text` for marked definitions and document them.
    pub fn document_text(&self, path: &Path, text: &str) -> Result<Documented, DocError> {
        let worklist =
            scan::scan_unit(text, &self.options.marker).map_err(|e| DocError::load(path, e))?;
        Ok(self.document(text, &worklist))
    }

    /// Document the unit at `unit` and write it to `destination`, or back
    /// to `unit` when no destination is given.
    pub fn process(&self, unit: &Path, destination: Option<&Path>) -> Result<UnitReport, DocError> {
        let text = fs::read_to_string(unit).map_err(|e| DocError::load(unit, e))?;
        let documented = self.document_text(unit, &text)?;

        let destination = destination.unwrap_or(unit);
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DocError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        if destination != unit || documented.text != text {
            fs::write(destination, &documented.text).map_err(|source| DocError::Write {
                path: destination.to_path_buf(),
                source,
            })?;
        }
        info!(
            "{}: {} documented, {} failed",
            unit.display(),
            documented.documented.len(),
            documented.failures.len()
        );

        Ok(UnitReport {
            unit: unit.to_path_buf(),
            destination: destination.to_path_buf(),
            documented: documented.documented,
            failures: documented.failures,
        })
    }
}
