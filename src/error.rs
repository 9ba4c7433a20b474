//! Error taxonomy for the documentation pipeline.
//!
//! Errors are split by blast radius: [`LocateError`] aborts a single entry,
//! [`DocError::Load`] and [`DocError::Write`] abort a single unit, and the
//! remaining [`DocError`] variants are pre-flight failures that stop the run
//! before anything is written.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Per-entry failure raised while locating a definition's signature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("no {kind} signature named '{name}' found")]
    NotFound { kind: &'static str, name: String },

    #[error("{count} {kind} signatures named '{name}' found, expected exactly one")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("signature of '{name}' is not terminated by ':'")]
    Unterminated { name: String },

    #[error("body of '{name}' starts on the signature line; no room for a docstring")]
    InlineBody { name: String },
}

/// Failure while building the worklist of a unit from its text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("line {line}: unterminated decorator '@{marker}'")]
    UnterminatedDecorator { line: usize, marker: String },

    #[error("line {line}: unterminated signature of '{name}'")]
    UnterminatedSignature { line: usize, name: String },
}

/// Failure while loading a custom layout.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read layout config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse layout config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("layout config {} is missing required key '{key}'", path.display())]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("unknown layout '{0}'. Use simple or emphasized")]
    UnknownLayout(String),
}

/// Unit- and run-level failures.
#[derive(Debug, Error)]
pub enum DocError {
    #[error("path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("not a package directory: {}", path.display())]
    NotAPackage { path: PathBuf },

    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("output {} must not be {expected_not}", path.display())]
    OutputConflict {
        path: PathBuf,
        expected_not: &'static str,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DocError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DocError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_doc_errors_show_paths_alike() {
        let path = PathBuf::from("layouts/custom.yaml");
        let missing = ConfigError::MissingKey {
            path: path.clone(),
            key: "suffix",
        };
        assert_eq!(
            missing.to_string(),
            "layout config layouts/custom.yaml is missing required key 'suffix'"
        );
        let wrapped = DocError::from(ConfigError::Parse {
            path: path.clone(),
            message: "bad".to_string(),
        });
        assert_eq!(
            wrapped.to_string(),
            "failed to parse layout config layouts/custom.yaml: bad"
        );
        let not_found = DocError::NotFound { path };
        assert_eq!(not_found.to_string(), "path not found: layouts/custom.yaml");
    }
}
