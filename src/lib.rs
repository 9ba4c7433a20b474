//! docsplice: synthesize docstrings for marked Python definitions.
//!
//! Definitions decorated with a marker (`@to_document` by default) are
//! scanned for their parameters, return annotation or class members, rendered
//! through a [`FormatLayout`] and spliced in right below their signature. The
//! marker lines are then stripped. Whole package trees can be processed in
//! place or mirrored into a separate output directory.

pub mod error;
pub mod layout;
pub mod locate;
pub mod model;
pub mod processor;
pub mod render;
pub mod scan;
pub mod splice;
pub mod strip;
pub mod syntax;
pub mod walk;

pub use error::{ConfigError, DocError, LocateError, ScanError};
pub use layout::FormatLayout;
pub use processor::{ProcessOptions, UnitProcessor, UnitReport, DEFAULT_MARKER};
pub use walk::{TreeWalker, WalkReport};
