//! Requirement identifier parsing
//!
//! Identifiers come in two textual forms:
//!
//! - short form: `FR:auth.session` (no scope)
//! - qualified form: `FR:my-feature/auth.session`
//!
//! Every parser here returns `None` for malformed input so that callers can
//! skip non-matching text uniformly.

use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Maximum number of dot-separated segments in a requirement path.
pub const MAX_PATH_DEPTH: usize = 5;

/// The kind of requirement an identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequirementType {
    /// Functional requirement
    Fr,
    /// Non-functional requirement
    Nfr,
    /// Generic requirement
    Req,
}

impl RequirementType {
    /// Parse a type prefix. Only the exact uppercase spellings are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FR" => Some(RequirementType::Fr),
            "NFR" => Some(RequirementType::Nfr),
            "REQ" => Some(RequirementType::Req),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Fr => "FR",
            RequirementType::Nfr => "NFR",
            RequirementType::Req => "REQ",
        }
    }
}

impl Display for RequirementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RequirementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Structured requirement identifier.
///
/// Instances can only be obtained through the parsers in this module, so the
/// segment grammar always holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequirementId {
    kind: RequirementType,
    scope: String,
    path: String,
    qualified: String,
    short: String,
}

impl RequirementId {
    fn from_parts(kind: RequirementType, scope: &str, path: &str) -> Self {
        let short = format!("{kind}:{path}");
        let qualified = if scope.is_empty() {
            short.clone()
        } else {
            format!("{kind}:{scope}/{path}")
        };
        Self {
            kind,
            scope: scope.to_string(),
            path: path.to_string(),
            qualified,
            short,
        }
    }

    pub fn kind(&self) -> RequirementType {
        self.kind
    }

    /// Scope segment, empty for short-form identifiers.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Dot-separated path without type or scope.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// `TYPE:scope/path`, or `TYPE:path` when the scope is empty.
    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    /// `TYPE:path`
    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn has_scope(&self) -> bool {
        !self.scope.is_empty()
    }

    /// Returns true if `other` lives strictly beneath this identifier:
    /// same type and scope, and `other.path` starts with `self.path + "."`.
    pub fn is_strict_prefix_of(&self, other: &RequirementId) -> bool {
        self.kind == other.kind
            && self.scope == other.scope
            && other
                .path
                .strip_prefix(self.path.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl Display for RequirementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified)
    }
}

impl AsRef<str> for RequirementId {
    fn as_ref(&self) -> &str {
        &self.qualified
    }
}

impl PartialEq<&str> for RequirementId {
    fn eq(&self, other: &&str) -> bool {
        self.qualified == *other
    }
}

impl Serialize for RequirementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.qualified)
    }
}

/// A single kebab-case segment: `[a-z0-9]+(-[a-z0-9]+)*`
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('-')
        && !segment.ends_with('-')
        && !segment.contains("--")
        && segment
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn is_valid_path(path: &str) -> bool {
    let mut depth = 0;
    for segment in path.split('.') {
        depth += 1;
        if depth > MAX_PATH_DEPTH || !is_valid_segment(segment) {
            return false;
        }
    }
    depth > 0
}

/// Parse `TYPE:path`. The result has an empty scope.
pub fn parse_short_form(text: &str) -> Option<RequirementId> {
    let (kind, path) = text.split_once(':')?;
    let kind = RequirementType::parse(kind)?;
    if !is_valid_path(path) {
        return None;
    }
    Some(RequirementId::from_parts(kind, "", path))
}

/// Parse `TYPE:scope/path`.
pub fn parse_qualified(text: &str) -> Option<RequirementId> {
    let (kind, rest) = text.split_once(':')?;
    let kind = RequirementType::parse(kind)?;
    let (scope, path) = rest.split_once('/')?;
    if !is_valid_segment(scope) || !is_valid_path(path) {
        return None;
    }
    Some(RequirementId::from_parts(kind, scope, path))
}

/// Parse either form, dispatching on whether a slash follows the first colon.
pub fn parse(text: &str) -> Option<RequirementId> {
    let (_, rest) = text.split_once(':')?;
    if rest.contains('/') {
        parse_qualified(text)
    } else {
        parse_short_form(text)
    }
}

/// Attach `scope` to an unscoped identifier. An explicit scope is never
/// overridden.
pub fn build_qualified(id: RequirementId, scope: &str) -> RequirementId {
    if id.has_scope() {
        return id;
    }
    RequirementId::from_parts(id.kind, scope, &id.path)
}

pub fn is_valid(text: &str) -> bool {
    parse(text).is_some()
}
