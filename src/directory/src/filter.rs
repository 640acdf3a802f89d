//! Search filters (RFC 4515 string representation)
//!
//! Supports the subset the authorization graph relies on: `&`, `|`, `!`,
//! equality, presence and substring items. Matching is case-insensitive, and
//! equality falls back to DN comparison when both sides parse as DNs, so
//! `member=cn=a, ou=Users, dc=test` matches a value stored as `cn=a,ou=Users,dc=test`.

use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::error::{DirectoryError, Result};
use std::fmt;
use std::str::FromStr;

/// Parsed search filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters must match
    And(Vec<Filter>),
    /// At least one sub-filter must match
    Or(Vec<Filter>),
    /// The sub-filter must not match
    Not(Box<Filter>),
    /// `(attr=value)`
    Equal { attr: String, value: String },
    /// `(attr=*)`
    Present { attr: String },
    /// `(attr=initial*any*final)`
    Substring {
        attr: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
}

impl Filter {
    /// Parses a filter string such as `(&(objectClass=groupOfNames)(cn=tester))`
    pub fn parse(s: &str) -> Result<Self> {
        let input = s.trim();
        if input.is_empty() {
            return Err(DirectoryError::InvalidFilter("empty filter".to_string()));
        }

        let mut parser = Parser { input, pos: 0 };
        let filter = parser.parse_filter()?;
        if parser.pos != input.len() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(filter)
    }

    /// The catch-all filter `(objectClass=*)`
    pub fn any_object() -> Self {
        Filter::Present {
            attr: crate::entry::OBJECT_CLASS.to_string(),
        }
    }

    /// `(attr=value)`; the value is escaped when the filter is rendered
    pub fn equal(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equal {
            attr: attr.into(),
            value: value.into(),
        }
    }

    /// Conjunction that collapses to the lone sub-filter when there is only one
    pub fn and(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            return filters.remove(0);
        }
        Filter::And(filters)
    }

    /// Disjunction that collapses to the lone sub-filter when there is only one
    pub fn or(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            return filters.remove(0);
        }
        Filter::Or(filters)
    }

    /// Evaluates the filter against an entry
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Filter::Not(filter) => !filter.matches(entry),
            Filter::Present { attr } => !entry.get_all(attr).is_empty(),
            Filter::Equal { attr, value } => entry
                .get_all(attr)
                .iter()
                .any(|candidate| values_equal(candidate, value)),
            Filter::Substring {
                attr,
                initial,
                any,
                last,
            } => entry
                .get_all(attr)
                .iter()
                .any(|candidate| {
                    substring_match(candidate, initial.as_deref(), any, last.as_deref())
                }),
        }
    }
}

impl FromStr for Filter {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self> {
        Filter::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) => {
                write!(f, "(&")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            Filter::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            Filter::Not(filter) => write!(f, "(!{})", filter),
            Filter::Present { attr } => write!(f, "({}=*)", attr),
            Filter::Equal { attr, value } => write!(f, "({}={})", attr, escape(value)),
            Filter::Substring {
                attr,
                initial,
                any,
                last,
            } => {
                write!(f, "({}=", attr)?;
                if let Some(initial) = initial {
                    write!(f, "{}", escape(initial))?;
                }
                write!(f, "*")?;
                for part in any {
                    write!(f, "{}*", escape(part))?;
                }
                if let Some(last) = last {
                    write!(f, "{}", escape(last))?;
                }
                write!(f, ")")
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, msg: &str) -> DirectoryError {
        DirectoryError::InvalidFilter(format!(
            "{} at offset {} in \"{}\"",
            msg, self.pos, self.input
        ))
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_filter(&mut self) -> Result<Filter> {
        self.expect('(')?;
        let filter = match self.peek() {
            Some('&') => {
                self.bump();
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.bump();
                Filter::Or(self.parse_list()?)
            }
            Some('!') => {
                self.bump();
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        while self.peek() == Some('(') {
            filters.push(self.parse_filter()?);
        }
        Ok(filters)
    }

    fn parse_item(&mut self) -> Result<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                ')' => break,
                '(' => return Err(self.error("unexpected '(' inside filter item")),
                _ => self.bump(),
            }
        }
        let item = &self.input[start..self.pos];

        let eq = item
            .find('=')
            .ok_or_else(|| self.error("filter item without '='"))?;
        let attr = &item[..eq];
        let value = &item[eq + 1..];

        if attr.is_empty() {
            return Err(self.error("filter item without attribute"));
        }
        if attr.ends_with(|c| matches!(c, '>' | '<' | '~' | ':')) {
            return Err(self.error("only equality, presence and substring items are supported"));
        }
        if !attr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == ';')
        {
            return Err(self.error("illegal attribute description"));
        }

        let attr = attr.to_string();
        if value == "*" {
            return Ok(Filter::Present { attr });
        }
        if !value.contains('*') {
            return Ok(Filter::Equal {
                attr,
                value: unescape(value).map_err(|msg| self.error(&msg))?,
            });
        }

        let pieces = value
            .split('*')
            .map(unescape)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|msg| self.error(&msg))?;
        let count = pieces.len();
        let mut initial = None;
        let mut last = None;
        let mut any = Vec::new();
        for (idx, piece) in pieces.into_iter().enumerate() {
            if piece.is_empty() {
                continue;
            }
            if idx == 0 {
                initial = Some(piece);
            } else if idx == count - 1 {
                last = Some(piece);
            } else {
                any.push(piece);
            }
        }
        Ok(Filter::Substring {
            attr,
            initial,
            any,
            last,
        })
    }
}

/// Resolves `\XX` hex escapes in an assertion value
fn unescape(value: &str) -> std::result::Result<String, String> {
    if !value.contains('\\') {
        return Ok(value.to_string());
    }

    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'\\' {
            let hex = bytes
                .get(idx + 1..idx + 3)
                .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                .ok_or_else(|| format!("invalid escape in value \"{}\"", value))?;
            let hex = std::str::from_utf8(hex).map_err(|e| e.to_string())?;
            out.push(u8::from_str_radix(hex, 16).map_err(|e| e.to_string())?);
            idx += 3;
        } else {
            out.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(out).map_err(|e| format!("invalid UTF-8 in value \"{}\": {}", value, e))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

fn values_equal(candidate: &str, asserted: &str) -> bool {
    if candidate.trim().to_lowercase() == asserted.trim().to_lowercase() {
        return true;
    }
    if candidate.contains('=') && asserted.contains('=') {
        if let (Ok(a), Ok(b)) = (Dn::new(candidate), Dn::new(asserted)) {
            return a == b;
        }
    }
    false
}

fn substring_match(
    candidate: &str,
    initial: Option<&str>,
    any: &[String],
    last: Option<&str>,
) -> bool {
    let candidate = candidate.to_lowercase();
    let mut rest = candidate.as_str();

    if let Some(initial) = initial {
        let initial = initial.to_lowercase();
        match rest.strip_prefix(initial.as_str()) {
            Some(tail) => rest = tail,
            None => return false,
        }
    }

    for part in any {
        let part = part.to_lowercase();
        match rest.find(part.as_str()) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }

    match last {
        Some(last) => rest.ends_with(last.to_lowercase().as_str()),
        None => true,
    }
}
