//! Version handling. SemVer 2.0 parsing and precedence are delegated
//! entirely to the `semver` crate rather than hand-rolled.

pub use semver::Version;

/// Parses a version string, returning `None` rather than erroring —
/// several call sites (the unknown-range fallback, lockfile repair)
/// want to treat "not a version" as "no match" instead of aborting.
pub fn parse(s: &str) -> Option<Version> {
    Version::parse(s.trim()).ok()
}
