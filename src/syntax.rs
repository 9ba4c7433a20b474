//! Lexical helpers for Python source.
//!
//! Walks source text skipping string literals and comments while tracking
//! bracket depth. Signature location, worklist scanning and marker stripping
//! all need the same answer to "is this character code, and how deeply is it
//! nested?", so the logic lives here once.

/// A character outside strings and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeChar {
    pub offset: usize,
    pub ch: char,
    /// Bracket depth the character sits at. Openers and closers report the
    /// depth outside the pair they delimit.
    pub depth: usize,
}

/// Iterator over the code characters of a source slice.
///
/// Escaped newlines (`\` at end of line) are swallowed so callers see one
/// logical line.
pub struct CodeChars<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    comments: bool,
}

impl<'a> CodeChars<'a> {
    pub fn new(src: &'a str, from: usize) -> Self {
        CodeChars {
            src,
            pos: from,
            depth: 0,
            comments: false,
        }
    }

    /// Also yield the `#` opening each comment.
    pub fn with_comments(mut self) -> Self {
        self.comments = true;
        self
    }

    fn peek_at(&self, pos: usize) -> Option<char> {
        self.src.get(pos..).and_then(|s| s.chars().next())
    }

    /// Skip a string literal whose opening quote is at `self.pos`.
    fn skip_string(&mut self, quote: char) {
        let delim: String = std::iter::repeat(quote).take(3).collect();
        let long = self.src[self.pos..].starts_with(&delim);
        let open_len = if long { 3 } else { 1 };
        let mut pos = self.pos + open_len;

        while let Some(ch) = self.peek_at(pos) {
            if ch == '\\' {
                pos += 1;
                if let Some(escaped) = self.peek_at(pos) {
                    pos += escaped.len_utf8();
                }
                continue;
            }
            if long {
                if self.src[pos..].starts_with(&delim) {
                    self.pos = pos + 3;
                    return;
                }
            } else if ch == quote {
                self.pos = pos + 1;
                return;
            } else if ch == '\n' {
                // Unterminated short string: resume at the newline.
                self.pos = pos;
                return;
            }
            pos += ch.len_utf8();
        }
        self.pos = self.src.len();
    }
}

impl Iterator for CodeChars<'_> {
    type Item = CodeChar;

    fn next(&mut self) -> Option<CodeChar> {
        loop {
            let ch = self.peek_at(self.pos)?;
            let offset = self.pos;
            match ch {
                '\'' | '"' => {
                    self.skip_string(ch);
                }
                '#' => {
                    let rest = &self.src[offset..];
                    self.pos = rest.find('\n').map_or(self.src.len(), |i| offset + i);
                    if self.comments {
                        return Some(CodeChar {
                            offset,
                            ch,
                            depth: self.depth,
                        });
                    }
                }
                '\\' if self.peek_at(offset + 1) == Some('\n') => {
                    self.pos += 2;
                }
                '\\' if self.src[offset + 1..].starts_with("\r\n") => {
                    self.pos += 3;
                }
                '(' | '[' | '{' => {
                    self.pos += 1;
                    let depth = self.depth;
                    self.depth += 1;
                    return Some(CodeChar { offset, ch, depth });
                }
                ')' | ']' | '}' => {
                    self.pos += 1;
                    self.depth = self.depth.saturating_sub(1);
                    return Some(CodeChar {
                        offset,
                        ch,
                        depth: self.depth,
                    });
                }
                _ => {
                    self.pos += ch.len_utf8();
                    return Some(CodeChar {
                        offset,
                        ch,
                        depth: self.depth,
                    });
                }
            }
        }
    }
}

/// Offset of the bracket closing the one opened at `open`.
pub fn matching_close(src: &str, open: usize) -> Option<usize> {
    CodeChars::new(src, open)
        .skip(1)
        .find(|c| c.depth == 0 && matches!(c.ch, ')' | ']' | '}'))
        .map(|c| c.offset)
}

/// Split `src` at top-level occurrences of `sep`, trimming each piece and
/// dropping empty ones (trailing commas).
pub fn split_top_level(src: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for c in CodeChars::new(src, 0) {
        if c.depth == 0 && c.ch == sep {
            pieces.push(&src[start..c.offset]);
            start = c.offset + sep.len_utf8();
        }
    }
    pieces.push(&src[start..]);
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Offset of the first top-level `ch` in `src`.
pub fn find_top_level(src: &str, ch: char) -> Option<usize> {
    CodeChars::new(src, 0)
        .find(|c| c.depth == 0 && c.ch == ch)
        .map(|c| c.offset)
}

/// Start offsets of the logical lines of `src`.
///
/// A physical line continuing a bracket, an escaped newline or a multi-line
/// string is not a logical line start.
pub fn logical_line_starts(src: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for c in CodeChars::new(src, 0) {
        if c.ch == '\n' && c.depth == 0 && c.offset + 1 < src.len() {
            starts.push(c.offset + 1);
        }
    }
    starts
}

/// Copy of `src` with every comment overwritten by spaces. Offsets are
/// preserved.
pub fn blank_comments(src: &str) -> String {
    let mut out = src.to_string();
    for c in CodeChars::new(src, 0).with_comments().filter(|c| c.ch == '#') {
        let end = src[c.offset..].find('\n').map_or(src.len(), |i| c.offset + i);
        out.replace_range(c.offset..end, &" ".repeat(end - c.offset));
    }
    out
}

/// Join the lines of a wrapped expression with single spaces.
pub fn one_line(src: &str) -> String {
    src.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First logical line start at or after `from` whose line holds code.
pub fn next_code_line(src: &str, starts: &[usize], from: usize) -> Option<usize> {
    let first = starts.partition_point(|&s| s < from);
    starts[first..]
        .iter()
        .copied()
        .find(|&s| !is_blank_or_comment(line_at(src, s)))
}

/// 1-based line number of `offset`.
pub fn line_number(src: &str, offset: usize) -> usize {
    src[..offset].matches('\n').count() + 1
}

/// The physical line containing `offset`, without its terminator.
pub fn line_at(src: &str, offset: usize) -> &str {
    let start = src[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = src[offset..].find('\n').map_or(src.len(), |i| offset + i);
    src[start..end].trim_end_matches('\r')
}

/// True when the rest of a line holds nothing but whitespace or a comment.
pub fn is_blank_or_comment(rest: &str) -> bool {
    let trimmed = rest.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Leading indentation of a line.
pub fn leading_whitespace(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Decode a Python string literal (`'..'`, `".."`, triple-quoted, with an
/// optional `r`/`u`/`b`/`f` prefix). Returns `None` for anything else.
pub fn string_literal_value(literal: &str) -> Option<String> {
    let literal = literal.trim();
    let body_start = literal.find(['\'', '"'])?;
    let prefix = &literal[..body_start];
    if !prefix.chars().all(|c| "rRuUbBfF".contains(c)) || prefix.len() > 2 {
        return None;
    }
    let raw = prefix.contains(['r', 'R']);
    let body = &literal[body_start..];
    let quote = body.chars().next()?;
    let triple: String = std::iter::repeat(quote).take(3).collect();
    let inner = if body.len() >= 6 && body.starts_with(&triple) && body.ends_with(&triple) {
        &body[3..body.len() - 3]
    } else if body.len() >= 2 && body.ends_with(quote) {
        &body[1..body.len() - 1]
    } else {
        return None;
    };
    if raw {
        return Some(inner.to_string());
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_report_outer_depth() {
        let chars: Vec<(char, usize)> = CodeChars::new("f(a[1])", 0)
            .map(|c| (c.ch, c.depth))
            .collect();
        assert_eq!(
            chars,
            vec![
                ('f', 0),
                ('(', 0),
                ('a', 1),
                ('[', 1),
                ('1', 2),
                (']', 1),
                (')', 0)
            ]
        );
    }

    #[test]
    fn strings_and_comments_are_skipped() {
        let code: String = CodeChars::new("x = ')' # (\ny", 0).map(|c| c.ch).collect();
        assert_eq!(code, "x =  \ny");
    }

    #[test]
    fn triple_quoted_string_spans_lines() {
        let src = "a = \"\"\"one\n(two\n\"\"\"\nb";
        let code: String = CodeChars::new(src, 0).map(|c| c.ch).collect();
        assert_eq!(code, "a = \nb");
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        let code: String = CodeChars::new(r#"s = "a\"(" + t"#, 0).map(|c| c.ch).collect();
        assert_eq!(code, "s =  + t");
    }

    #[test]
    fn matching_close_across_lines() {
        let src = "(a,\n (b, ')'),\n c)";
        assert_eq!(matching_close(src, 0), Some(src.len() - 1));
    }

    #[test]
    fn matching_close_unbalanced() {
        assert_eq!(matching_close("(a, (b)", 0), None);
    }

    #[test]
    fn split_respects_nesting_and_strings() {
        let parts = split_top_level("a: Dict[str, int], b=(1, 2), c=',' ,", ',');
        assert_eq!(parts, vec!["a: Dict[str, int]", "b=(1, 2)", "c=','"]);
    }

    #[test]
    fn find_top_level_skips_nested() {
        assert_eq!(find_top_level("f(x=1)=2", '='), Some(6));
        assert_eq!(find_top_level("'='", '='), None);
    }

    #[test]
    fn logical_lines_skip_continuations() {
        let src = "def f(a,\n      b):\n    x = \"\"\"\ndoc\n\"\"\"\n    y = 1 \\\n        + 2\nz\n";
        let starts = logical_line_starts(src);
        let firsts: Vec<&str> = starts.iter().map(|&s| line_at(src, s)).collect();
        assert_eq!(firsts, vec!["def f(a,", "    x = \"\"\"", "    y = 1 \\", "z"]);
    }

    #[test]
    fn next_code_line_skips_blanks_and_comments() {
        let src = "a\n\n  # c\n  b\n";
        let starts = logical_line_starts(src);
        assert_eq!(next_code_line(src, &starts, 1), Some(src.find("  b").unwrap()));
        assert_eq!(next_code_line(src, &starts, src.len()), None);
        assert_eq!(line_number(src, src.find('b').unwrap()), 4);
    }

    #[test]
    fn comments_are_blanked_in_place() {
        let src = "f(a,  # first\n  b)  # é\nx = '#'\n";
        let blanked = blank_comments(src);
        assert_eq!(blanked.len(), src.len());
        assert_eq!(blanked, "f(a,         \n  b)      \nx = '#'\n");
    }

    #[test]
    fn wrapped_expression_on_one_line() {
        assert_eq!(one_line("Dict[str,\n        int]"), "Dict[str, int]");
        assert_eq!(one_line("  3 "), "3");
    }

    #[test]
    fn blank_or_comment() {
        assert!(is_blank_or_comment("   "));
        assert!(is_blank_or_comment("  # note"));
        assert!(!is_blank_or_comment(" return 1"));
    }

    #[test]
    fn literal_values() {
        assert_eq!(string_literal_value("\"adds\""), Some("adds".to_string()));
        assert_eq!(string_literal_value("'it\\'s'"), Some("it's".to_string()));
        assert_eq!(
            string_literal_value("\"\"\"multi\nline\"\"\""),
            Some("multi\nline".to_string())
        );
        assert_eq!(string_literal_value("r'\\d+'"), Some("\\d+".to_string()));
        assert_eq!(string_literal_value("42"), None);
        assert_eq!(string_literal_value("name"), None);
    }
}
