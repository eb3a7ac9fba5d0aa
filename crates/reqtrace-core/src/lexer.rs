//! Comment lexer for extracting requirement annotations
//!
//! Annotations live in comments and look like:
//!
//! ```text
//! // @req FR:auth/login.session
//! # @req:partial FR:auth/login.mfa, NFR:auth/perf.p99
//! /**
//!  * @req REQ:auth/audit.log
//!  */
//! ```
//!
//! Recognition is text based: a comment region is anything after `//`, or
//! after a standalone `#` or `--` token, on a line, or anything inside
//! `/* */` or `<!-- -->`. Double-quoted strings outside comments are skipped.
//! An `@req` sitting in a string literal after a comment marker is reported.

use crate::req_id::{self, RequirementId};
use crate::sources::Sources;
use eyre::Result;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};

const TAG: &str = "@req";
const PARTIAL_SUFFIX: &str = ":partial";

const LINE_MARKERS: &[&str] = &["//", "#", "--"];
const BLOCK_DELIMITERS: &[(&str, &str)] = &[("/*", "*/"), ("<!--", "-->")];

/// A requirement annotation found in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementAnnotation {
    /// The referenced requirement
    pub id: RequirementId,
    /// File where the annotation was found
    pub file: PathBuf,
    /// Line number (1-indexed)
    pub line: usize,
    /// Introduced by `@req:partial`
    pub is_partial: bool,
    /// The file lives under a test directory
    pub is_test: bool,
}

impl RequirementAnnotation {
    /// `file:line` location used in reports
    pub fn location(&self) -> String {
        format!("{}:{}", self.file.display(), self.line)
    }
}

/// Collection of annotations extracted from source files
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    pub annotations: Vec<RequirementAnnotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Extract annotations from any source
    pub fn extract(sources: impl Sources) -> Result<Annotations> {
        sources.extract()
    }

    /// Extract annotations from raw content (no I/O)
    pub fn extract_from_content(path: &Path, content: &str, is_test: bool) -> Self {
        let mut annotations = Annotations::new();
        extract_from_content(path, content, is_test, &mut annotations);
        annotations
    }

    /// Merge another collection into this one
    pub fn extend(&mut self, other: Annotations) {
        self.annotations.extend(other.annotations);
    }

    pub fn into_vec(self) -> Vec<RequirementAnnotation> {
        self.annotations
    }
}

/// Extract annotations from source content into the collection
pub(crate) fn extract_from_content(
    path: &Path,
    content: &str,
    is_test: bool,
    annotations: &mut Annotations,
) {
    let mut open_block: Option<&'static str> = None;

    for (line_idx, line) in content.lines().enumerate() {
        for region in comment_regions(line, &mut open_block) {
            for (id, is_partial) in extract_tags(&line[region]) {
                annotations.annotations.push(RequirementAnnotation {
                    id,
                    file: path.to_path_buf(),
                    line: line_idx + 1,
                    is_partial,
                    is_test,
                });
            }
        }
    }
}

/// Byte ranges of `line` that are inside comments.
///
/// `open_block` carries the closing delimiter of a block comment that spans
/// multiple lines. Outside comments, `"..."` string literals are skipped so
/// that `"https://x"` or `"target/**"` never start a comment.
fn comment_regions(line: &str, open_block: &mut Option<&'static str>) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut pos = 0;

    while pos < line.len() {
        if let Some(close) = *open_block {
            match line[pos..].find(close) {
                Some(idx) => {
                    regions.push(pos..pos + idx);
                    pos += idx + close.len();
                    *open_block = None;
                }
                None => {
                    regions.push(pos..line.len());
                    break;
                }
            }
            continue;
        }

        let rest = &line[pos..];
        if rest.starts_with('"') {
            pos += string_literal_len(rest);
            continue;
        }
        if let Some(&(open, close)) = BLOCK_DELIMITERS
            .iter()
            .find(|(open, _)| rest.starts_with(open))
        {
            pos += open.len();
            *open_block = Some(close);
            continue;
        }
        if is_line_marker(line, pos) {
            regions.push(pos..line.len());
            break;
        }

        pos += rest.chars().next().map_or(1, char::len_utf8);
    }

    regions
}

/// Whether a line comment starts at byte `pos`.
///
/// `//` counts anywhere; `#` and `--` only as a standalone token, so
/// `#define`, `#[derive]` and `x--` are code.
fn is_line_marker(line: &str, pos: usize) -> bool {
    let rest = &line[pos..];
    let Some(marker) = LINE_MARKERS.iter().find(|marker| rest.starts_with(**marker)) else {
        return false;
    };
    if *marker == "//" {
        return true;
    }

    let at_boundary = line[..pos]
        .chars()
        .next_back()
        .is_none_or(char::is_whitespace);
    let after = rest[marker.len()..].chars().next();
    let ends_token = after.is_none_or(|c| c.is_whitespace() || marker.starts_with(c));
    at_boundary && ends_token
}

/// Length in bytes of the `"..."` literal at the start of `text`, honouring
/// backslash escapes. An unterminated literal runs to the end of the line.
fn string_literal_len(text: &str) -> usize {
    let mut escaped = false;
    for (idx, c) in text.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return idx + 1,
            _ => {}
        }
    }
    text.len()
}

/// Find every `@req` / `@req:partial` tag in a comment region and parse the
/// comma-separated identifiers following it.
fn extract_tags(text: &str) -> Vec<(RequirementId, bool)> {
    let mut found = Vec::new();
    let mut search_from = 0;

    while let Some(idx) = text[search_from..].find(TAG) {
        let tag_start = search_from + idx;
        let mut rest = &text[tag_start + TAG.len()..];
        search_from = tag_start + TAG.len();

        // `foo@req` is not a tag
        if text[..tag_start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            continue;
        }

        let is_partial = match rest.strip_prefix(PARTIAL_SUFFIX) {
            Some(after) => {
                rest = after;
                true
            }
            None => false,
        };

        // The tag must be followed by whitespace (`@requires` is not a tag)
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }

        for candidate in identifier_list(rest) {
            if let Some(id) = req_id::parse(candidate) {
                found.push((id, is_partial));
            }
        }
    }

    found
}

/// Characters that can appear in either identifier form
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '/' | '.' | '-' | '_')
}

/// Split `  FR:a, FR:b , FR:c trailing words` into the comma-separated
/// identifier candidates. The list ends at the first token not followed by a
/// comma.
fn identifier_list(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut rest = text;

    loop {
        rest = rest.trim_start();
        let end = rest.find(|c: char| !is_id_char(c)).unwrap_or(rest.len());
        if end == 0 {
            break;
        }
        // a sentence-ending period is never part of an identifier
        candidates.push(rest[..end].trim_end_matches('.'));

        rest = rest[end..].trim_start();
        match rest.strip_prefix(',') {
            Some(after) => rest = after,
            None => break,
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Vec<RequirementAnnotation> {
        Annotations::extract_from_content(Path::new("src/auth.rs"), content, false).into_vec()
    }

    fn ids(annotations: &[RequirementAnnotation]) -> Vec<&str> {
        annotations.iter().map(|a| a.id.qualified()).collect()
    }

    #[test]
    fn test_line_comment_styles() {
        let content = r#"
// @req FR:auth/login
# @req FR:auth/logout
-- @req NFR:db/index.usage
fn f() {} // @req REQ:auth/trailing
"#;
        let found = extract(content);
        assert_eq!(
            ids(&found),
            [
                "FR:auth/login",
                "FR:auth/logout",
                "NFR:db/index.usage",
                "REQ:auth/trailing"
            ]
        );
        assert_eq!(found[0].line, 2);
        assert_eq!(found[3].line, 5);
        assert!(found.iter().all(|a| !a.is_partial && !a.is_test));
    }

    #[test]
    fn test_comma_separated_share_line() {
        let found = extract("// @req FR:auth/login, FR:auth/logout,NFR:auth/perf.p99 and more");
        assert_eq!(
            ids(&found),
            ["FR:auth/login", "FR:auth/logout", "NFR:auth/perf.p99"]
        );
        assert!(found.iter().all(|a| a.line == 1));
    }

    #[test]
    fn test_partial_tag() {
        let found = extract("// @req:partial FR:auth/login, FR:auth/mfa\n// @req FR:auth/logout");
        assert_eq!(found.len(), 3);
        assert!(found[0].is_partial);
        assert!(found[1].is_partial);
        assert!(!found[2].is_partial);
    }

    #[test]
    fn test_block_comment_lines() {
        let content = r#"/**
 * Session handling.
 * @req FR:auth/session
 *
 * @req:partial FR:auth/session.expiry
 */
fn session() {}
"#;
        let found = extract(content);
        assert_eq!(ids(&found), ["FR:auth/session", "FR:auth/session.expiry"]);
        assert_eq!(found[0].line, 3);
        assert_eq!(found[1].line, 5);
        assert!(found[1].is_partial);
    }

    #[test]
    fn test_inline_block_comment() {
        let found = extract("let x = 1; /* @req FR:auth/inline */ let y = 2;");
        assert_eq!(ids(&found), ["FR:auth/inline"]);
    }

    #[test]
    fn test_html_comment() {
        let found = extract("<div>\n<!-- @req FR:ui/header.search -->\n</div>");
        assert_eq!(ids(&found), ["FR:ui/header.search"]);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_block_comment_not_counted_twice() {
        let found = extract("/* @req FR:auth/once // still in block */");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_malformed_ids_dropped_individually() {
        let found = extract("// @req FR:auth/Bad, FR:auth/good, BUG:x/y, FR:auth/a.b.c.d.e.f, FR:auth/also-good");
        assert_eq!(ids(&found), ["FR:auth/good", "FR:auth/also-good"]);
    }

    #[test]
    fn test_short_form_ids_are_kept_unscoped() {
        let found = extract("// @req FR:auth.login");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.scope(), "");
        assert_eq!(found[0].id.qualified(), "FR:auth.login");
    }

    #[test]
    fn test_not_in_comment_ignored() {
        let found = extract("@req FR:auth/login\nlet s = \"@req FR:auth/x\";");
        assert!(found.is_empty());
    }

    #[test]
    fn test_string_literal_after_marker_is_reported() {
        let found = extract("call(); // see \"@req FR:auth/in-string\"");
        assert_eq!(ids(&found), ["FR:auth/in-string"]);
    }

    #[test]
    fn test_url_in_string_is_not_a_comment() {
        let found = extract("let url = \"http://x\"; let s = \"@req FR:auth/in-string\";");
        assert!(found.is_empty());
    }

    #[test]
    fn test_block_opens_after_preprocessor_line() {
        let found = extract("#define AUTH 1 /*\n * @req FR:auth/login\n */");
        assert_eq!(ids(&found), ["FR:auth/login"]);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_block_opens_after_string_with_slashes() {
        let found = extract("const u = \"https://x\"; /**\n * @req FR:auth/logout\n */");
        assert_eq!(ids(&found), ["FR:auth/logout"]);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_glob_in_string_does_not_open_block() {
        let found = extract(
            "let p = \"target/**\";\nlet s = \"@req FR:auth/in-code\";\n// @req FR:auth/real */",
        );
        assert_eq!(ids(&found), ["FR:auth/real"]);
        assert_eq!(found[0].line, 3);
    }

    #[test]
    fn test_hash_and_dashes_need_token_boundary() {
        let found = extract(
            "#[derive(Debug)] x-- # @req FR:a/one\n#@req FR:a/two\ni--; -- @req FR:a/three\n## @req FR:a/four",
        );
        assert_eq!(ids(&found), ["FR:a/one", "FR:a/three", "FR:a/four"]);
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let found = extract("let s = \"a \\\" /* not a comment\"; // @req FR:a/b");
        assert_eq!(ids(&found), ["FR:a/b"]);
    }

    #[test]
    fn test_lookalike_tags_ignored() {
        let found = extract("// @requires FR:auth/a\n// foo@req FR:auth/b\n// @req:partialx FR:auth/c");
        assert!(found.is_empty());
    }

    #[test]
    fn test_trailing_period_tolerated() {
        let found = extract("// Implements @req FR:auth/login.");
        assert_eq!(ids(&found), ["FR:auth/login"]);
    }

    #[test]
    fn test_is_test_flag_propagates() {
        let found =
            Annotations::extract_from_content(Path::new("tests/auth.rs"), "// @req FR:a/b", true)
                .into_vec();
        assert!(found[0].is_test);
        assert_eq!(found[0].file, PathBuf::from("tests/auth.rs"));
    }
}
