//! `Range`: a predicate over [`Version`]s, parsed from the Wally
//! range grammar (exact / caret / tilde / comparator / hyphen /
//! disjunction / wildcard).
//!
//! The parser is a small hand-written recursive-descent affair in the
//! structural style of `cargo_platform::CfgExpr` (tokenize, then
//! combine), not `semver::VersionReq` — Wally inverts Cargo's own
//! convention (a bare `"1.4.0"` means *exact*, not caret), so reusing
//! `VersionReq` would silently implement the wrong language.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Atom {
    op: Op,
    version: Version,
}

impl Atom {
    fn matches(&self, v: &Version) -> bool {
        match self.op {
            Op::Eq => v == &self.version,
            Op::Ge => v >= &self.version,
            Op::Gt => v > &self.version,
            Op::Le => v <= &self.version,
            Op::Lt => v < &self.version,
        }
    }
}

/// A range predicate over versions, retaining its original textual
/// form so manifests and lockfiles round-trip byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Range {
    raw: String,
    /// Disjunctive normal form: OR of AND-of-atoms. An empty outer Vec
    /// matches nothing; an inner Vec that is empty matches everything
    /// (the wildcard clause).
    clauses: Vec<Vec<Atom>>,
}

impl Range {
    /// Parses a range string. Never fails: unparseable grammar falls
    /// back to treating the raw string as an exact version; if that
    /// also fails to parse as a version, the range matches nothing.
    pub fn parse(raw: &str) -> Range {
        match parse_clauses(raw) {
            Ok(clauses) => Range {
                raw: raw.to_string(),
                clauses,
            },
            Err(_) => {
                let clauses = match Version::parse(raw.trim()) {
                    Ok(version) => vec![vec![Atom {
                        op: Op::Eq,
                        version,
                    }]],
                    Err(_) => Vec::new(),
                };
                Range {
                    raw: raw.to_string(),
                    clauses,
                }
            }
        }
    }

    pub fn any() -> Range {
        Range::parse("*")
    }

    pub fn satisfies(&self, version: &Version) -> bool {
        self.clauses
            .iter()
            .any(|clause| clause.iter().all(|atom| atom.matches(version)))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<Range> for String {
    fn from(range: Range) -> Self {
        range.raw
    }
}

impl TryFrom<String> for Range {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Range::parse(&value))
    }
}

#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error("expected a version after `{0}`")]
    ExpectedVersion(String),
    #[error("could not parse `{0}` as a version: {1}")]
    BadVersion(String, semver::Error),
    #[error("could not parse `{0}` as a version or partial version")]
    BadPartialVersion(String),
    #[error("empty range clause")]
    Empty,
}

/// How many leading components a hyphen-range bound actually named.
/// `"1.0 - 2.0"`'s high bound is `Minor`-precision and widens to
/// everything below `3.0.0`; a fully-specified bound stays inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precision {
    Major,
    Minor,
    Patch,
}

/// Parses a hyphen-range bound, which may omit its minor and/or patch
/// component (`"1"`, `"1.0"`, `"1.0.0"` are all accepted). Missing
/// components are treated as zero; the caller uses `Precision` to
/// decide how far a bound should widen.
fn parse_partial_version(s: &str) -> Result<(Version, Precision), ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::ExpectedVersion(s.to_string()));
    }
    if let Ok(version) = Version::parse(s) {
        return Ok((version, Precision::Patch));
    }

    let parts: Vec<&str> = s.splitn(2, '-').next().unwrap_or(s).split('.').collect();
    let numeric = |p: &str| p.parse::<u64>().ok();
    match parts.as_slice() {
        [major] => numeric(major)
            .map(|major| (Version::new(major, 0, 0), Precision::Major))
            .ok_or_else(|| ParseError::BadPartialVersion(s.to_string())),
        [major, minor] => match (numeric(major), numeric(minor)) {
            (Some(major), Some(minor)) => Ok((Version::new(major, minor, 0), Precision::Minor)),
            _ => Err(ParseError::BadPartialVersion(s.to_string())),
        },
        _ => Err(ParseError::BadPartialVersion(s.to_string())),
    }
}

fn parse_clauses(raw: &str) -> Result<Vec<Vec<Atom>>, ParseError> {
    let mut clauses = Vec::new();
    for branch in raw.split("||") {
        clauses.push(parse_branch(branch.trim())?);
    }
    Ok(clauses)
}

fn parse_branch(branch: &str) -> Result<Vec<Atom>, ParseError> {
    if branch.is_empty() || branch == "*" {
        return Ok(Vec::new());
    }

    if let Some(rest) = branch.strip_prefix('^') {
        let version = parse_version(rest.trim())?;
        return Ok(desugar_caret(version));
    }

    if let Some(rest) = branch.strip_prefix('~') {
        let version = parse_version(rest.trim())?;
        return Ok(desugar_tilde(version));
    }

    if let Some((lo, hi)) = branch.split_once(" - ") {
        let (lo, _) = parse_partial_version(lo.trim())?;
        let (hi, hi_precision) = parse_partial_version(hi.trim())?;
        let upper = match hi_precision {
            Precision::Patch => Atom {
                op: Op::Le,
                version: hi,
            },
            Precision::Minor => Atom {
                op: Op::Lt,
                version: Version::new(hi.major, hi.minor + 1, 0),
            },
            Precision::Major => Atom {
                op: Op::Lt,
                version: Version::new(hi.major + 1, 0, 0),
            },
        };
        return Ok(vec![
            Atom {
                op: Op::Ge,
                version: lo,
            },
            upper,
        ]);
    }

    branch
        .split_whitespace()
        .map(parse_atom)
        .collect::<Result<Vec<_>, _>>()
        .and_then(|atoms| {
            if atoms.is_empty() {
                Err(ParseError::Empty)
            } else {
                Ok(atoms)
            }
        })
}

fn parse_atom(token: &str) -> Result<Atom, ParseError> {
    if let Some(rest) = token.strip_prefix(">=") {
        Ok(Atom {
            op: Op::Ge,
            version: parse_version(rest)?,
        })
    } else if let Some(rest) = token.strip_prefix("<=") {
        Ok(Atom {
            op: Op::Le,
            version: parse_version(rest)?,
        })
    } else if let Some(rest) = token.strip_prefix('>') {
        Ok(Atom {
            op: Op::Gt,
            version: parse_version(rest)?,
        })
    } else if let Some(rest) = token.strip_prefix('<') {
        Ok(Atom {
            op: Op::Lt,
            version: parse_version(rest)?,
        })
    } else if let Some(rest) = token.strip_prefix('=') {
        Ok(Atom {
            op: Op::Eq,
            version: parse_version(rest)?,
        })
    } else {
        Ok(Atom {
            op: Op::Eq,
            version: parse_version(token)?,
        })
    }
}

fn parse_version(s: &str) -> Result<Version, ParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseError::ExpectedVersion(s.to_string()));
    }
    Version::parse(s).map_err(|e| ParseError::BadVersion(s.to_string(), e))
}

fn desugar_caret(version: Version) -> Vec<Atom> {
    let upper = if version.major > 0 {
        Version::new(version.major + 1, 0, 0)
    } else {
        Version::new(0, version.minor + 1, 0)
    };
    vec![
        Atom {
            op: Op::Ge,
            version: version.clone(),
        },
        Atom {
            op: Op::Lt,
            version: upper,
        },
    ]
}

fn desugar_tilde(version: Version) -> Vec<Atom> {
    let upper = Version::new(version.major, version.minor + 1, 0);
    vec![
        Atom {
            op: Op::Ge,
            version: version.clone(),
        },
        Atom {
            op: Op::Lt,
            version: upper,
        },
    ]
}
