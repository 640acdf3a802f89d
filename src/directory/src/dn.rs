//! Distinguished name model
//!
//! A [`Dn`] is an ordered list of relative distinguished names, leaf first:
//! `cn=tester,ou=Users,dc=test` has the RDNs `cn=tester`, `ou=Users` and `dc=test`.
//! Values keep the text they were written with; comparison goes through a
//! normalized form (attribute types and values are case-insensitive, surrounding
//! whitespace is ignored).

use crate::error::{DirectoryError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// One component of a distinguished name, e.g. `ou=Groups`
#[derive(Debug, Clone)]
pub struct Rdn {
    /// Attribute type as written (`ou`, `cn`, ...)
    attr: String,
    /// Attribute value as written, escapes included
    raw_value: String,
}

impl Rdn {
    /// Parses a single `type=value` component
    pub fn new(s: &str) -> Result<Self> {
        let s = s.trim();
        let eq = find_unescaped(s, '=')
            .ok_or_else(|| DirectoryError::InvalidDn(format!("RDN without '=': \"{}\"", s)))?;

        let attr = s[..eq].trim();
        let raw_value = s[eq + 1..].trim();

        if attr.is_empty() {
            return Err(DirectoryError::InvalidDn(format!(
                "RDN without attribute type: \"{}\"",
                s
            )));
        }
        if !attr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(DirectoryError::InvalidDn(format!(
                "Illegal attribute type \"{}\" in RDN \"{}\"",
                attr, s
            )));
        }
        if raw_value.is_empty() {
            return Err(DirectoryError::InvalidDn(format!(
                "RDN without value: \"{}\"",
                s
            )));
        }

        Ok(Self {
            attr: attr.to_string(),
            raw_value: raw_value.to_string(),
        })
    }

    /// Attribute type, as written
    pub fn attr(&self) -> &str {
        &self.attr
    }

    /// Attribute value with escapes resolved
    pub fn value(&self) -> String {
        unescape(&self.raw_value)
    }

    /// Attribute value exactly as written
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Whether the attribute type matches `attr`, ignoring case
    pub fn has_attr(&self, attr: &str) -> bool {
        self.attr.eq_ignore_ascii_case(attr)
    }

    fn normalized(&self) -> String {
        format!(
            "{}={}",
            self.attr.to_ascii_lowercase(),
            self.value().trim().to_lowercase()
        )
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr, self.raw_value)
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Rdn {}

/// A parsed distinguished name
#[derive(Debug, Clone)]
pub struct Dn {
    /// Original DN string
    raw: String,
    /// RDNs, leaf first
    rdns: Vec<Rdn>,
}

impl Dn {
    /// Parses a DN string. The empty string is the root DN.
    pub fn new(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let rdns = split_unescaped(trimmed, ',')
            .into_iter()
            .map(Rdn::new)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| match e {
                DirectoryError::InvalidDn(msg) => {
                    DirectoryError::InvalidDn(format!("{} (in \"{}\")", msg, s))
                }
                other => other,
            })?;

        Ok(Self {
            raw: trimmed.to_string(),
            rdns,
        })
    }

    /// The root DN (no components)
    pub fn root() -> Self {
        Self {
            raw: String::new(),
            rdns: Vec::new(),
        }
    }

    fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let raw = rdns
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self { raw, rdns }
    }

    /// The DN string as it was parsed
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// All RDNs, leaf first
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The leading (leaf) RDN, absent for the root DN
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// Number of RDNs
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Whether this is the root DN
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The immediate parent, absent for the root DN
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self::from_rdns(self.rdns[1..].to_vec()))
    }

    /// Returns a new DN with `rdn` prepended as leaf
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// The RDNs of `self` that lie below `ancestor`, leaf first.
    ///
    /// Returns `None` when `ancestor` is not a suffix of `self`. An equal DN
    /// yields an empty slice.
    pub fn relative_to(&self, ancestor: &Dn) -> Option<&[Rdn]> {
        if ancestor.len() > self.len() {
            return None;
        }
        let split = self.len() - ancestor.len();
        if self.rdns[split..] == ancestor.rdns[..] {
            Some(&self.rdns[..split])
        } else {
            None
        }
    }

    /// Whether `self` lies strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        matches!(self.relative_to(ancestor), Some(rel) if !rel.is_empty())
    }

    /// Whether `self` is an immediate child of `parent`
    pub fn is_child_of(&self, parent: &Dn) -> bool {
        matches!(self.relative_to(parent), Some(rel) if rel.len() == 1)
    }

    /// Normalized form used for comparison and as a lookup key
    pub fn normalized(&self) -> String {
        self.rdns
            .iter()
            .map(Rdn::normalized)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Dn {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self> {
        Dn::new(s)
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

/// Byte offset of the first occurrence of `needle` not preceded by a backslash escape
fn find_unescaped(s: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(idx);
        }
    }
    None
}

fn split_unescaped(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(idx) = find_unescaped(rest, separator) {
        parts.push(&rest[..idx]);
        rest = &rest[idx + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}

/// Resolves `\,` style and `\2C` style escapes
fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut out = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'\\' && idx + 1 < bytes.len() {
            if idx + 2 < bytes.len()
                && bytes[idx + 1].is_ascii_hexdigit()
                && bytes[idx + 2].is_ascii_hexdigit()
            {
                if let Ok(byte) = u8::from_str_radix(&s[idx + 1..idx + 3], 16) {
                    out.push(byte);
                    idx += 3;
                    continue;
                }
            }
            out.push(bytes[idx + 1]);
            idx += 2;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
