//! Call-site patterns: `Owner.method`, `*.method`, `Owner.*`, `*`, each with
//! an optional parameter list (`(..)` for any, `(T1,T2)` for exact, `()` for none).
//!
//! The owner is everything before the last `.` of the head, so dotted owner
//! paths such as `billing.Invoice.total` are accepted.

use std::fmt;

/// Errors produced while compiling a pattern string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("pattern '{0}' has no method segment (expected Owner.method)")]
    MissingMethod(String),

    #[error("pattern '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("pattern '{0}': wildcards must span a whole segment")]
    PartialWildcard(String),

    #[error("pattern '{0}' has an unterminated parameter list")]
    UnterminatedParams(String),

    #[error("pattern '{0}' has unbalanced parentheses")]
    UnbalancedParams(String),

    #[error("pattern '{0}' contains whitespace inside a segment")]
    Whitespace(String),
}

/// One name segment: exact name or `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Any,
    Exact(String),
}

impl Segment {
    fn parse(raw: &str, source: &str) -> Result<Self, PatternError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PatternError::EmptySegment(source.to_string()));
        }
        if raw == "*" {
            return Ok(Segment::Any);
        }
        if raw.contains(['(', ')']) {
            return Err(PatternError::UnbalancedParams(source.to_string()));
        }
        if raw.contains('*') {
            return Err(PatternError::PartialWildcard(source.to_string()));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(PatternError::Whitespace(source.to_string()));
        }
        Ok(Segment::Exact(raw.to_string()))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Segment::Any => true,
            Segment::Exact(expected) => expected == name,
        }
    }
}

/// Parameter-list constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    Any,
    Exact(Vec<String>),
}

impl Params {
    pub fn matches(&self, types: &[String]) -> bool {
        match self {
            Params::Any => true,
            Params::Exact(expected) => expected.as_slice() == types,
        }
    }
}

/// A compiled call-site pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    owner: Segment,
    method: Segment,
    params: Params,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }

        let (head, params) = match trimmed.split_once('(') {
            Some((head, rest)) => {
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| PatternError::UnterminatedParams(trimmed.to_string()))?;
                if head.contains(')') || inner.contains(['(', ')']) {
                    return Err(PatternError::UnbalancedParams(trimmed.to_string()));
                }
                (head.trim(), parse_params(inner, trimmed)?)
            }
            None => (trimmed, Params::Any),
        };

        let (owner, method) = if head == "*" {
            (Segment::Any, Segment::Any)
        } else {
            let (owner, method) = head
                .rsplit_once('.')
                .ok_or_else(|| PatternError::MissingMethod(trimmed.to_string()))?;
            (
                Segment::parse(owner, trimmed)?,
                Segment::parse(method, trimmed)?,
            )
        };

        Ok(Self {
            source: trimmed.to_string(),
            owner,
            method,
            params,
        })
    }

    pub fn matches(&self, owner: &str, method: &str, parameter_types: &[String]) -> bool {
        self.owner.matches(owner) && self.method.matches(method) && self.params.matches(parameter_types)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn owner(&self) -> &Segment {
        &self.owner
    }

    pub fn method(&self) -> &Segment {
        &self.method
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_params(inner: &str, source: &str) -> Result<Params, PatternError> {
    let inner = inner.trim();
    if inner == ".." {
        return Ok(Params::Any);
    }
    if inner.is_empty() {
        return Ok(Params::Exact(Vec::new()));
    }
    let types = inner
        .split(',')
        .map(|t| match Segment::parse(t, source)? {
            Segment::Exact(name) => Ok(name),
            Segment::Any => Err(PatternError::PartialWildcard(source.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Params::Exact(types))
}
