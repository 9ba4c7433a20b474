//! Offset-based text insertion.
//!
//! Splices only ever add bytes: every byte of the input text survives
//! unchanged and in order, with inserted blocks between them.

/// One pending insertion into a unit's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub offset: usize,
    pub text: String,
}

impl Splice {
    /// Insert `doc` at the start of the first line after `signature_end`.
    ///
    /// A signature on the last line without a terminator gets one, so the
    /// block still starts on a fresh line.
    pub fn after_signature(source: &str, signature_end: usize, doc: String) -> Self {
        match insertion_offset(source, signature_end) {
            Some(offset) => Splice { offset, text: doc },
            None => Splice {
                offset: source.len(),
                text: format!("\n{doc}"),
            },
        }
    }
}

/// Start of the line following the first line terminator at or after
/// `end`. `None` when `end` is on the last, unterminated line.
pub fn insertion_offset(source: &str, end: usize) -> Option<usize> {
    source[end..].find('\n').map(|i| end + i + 1)
}

/// Insert `doc` at `offset`.
pub fn splice(source: &str, offset: usize, doc: &str) -> String {
    let mut out = String::with_capacity(source.len() + doc.len());
    out.push_str(&source[..offset]);
    out.push_str(doc);
    out.push_str(&source[offset..]);
    out
}

/// Apply a batch of splices computed against the same `source`.
///
/// Offsets always refer to the input text, so no insertion can shift
/// another. Splices sharing an offset keep their batch order.
pub fn apply(source: &str, splices: &[Splice]) -> String {
    let mut ordered: Vec<&Splice> = splices.iter().collect();
    ordered.sort_by_key(|s| s.offset);

    let extra: usize = splices.iter().map(|s| s.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;
    for s in ordered {
        out.push_str(&source[cursor..s.offset]);
        out.push_str(&s.text);
        cursor = s.offset;
    }
    out.push_str(&source[cursor..]);
    out
}
