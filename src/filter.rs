use std::fmt::{Display, Formatter, Result as FmtResult};

use semver::Version;
use serde::{Deserialize, Serialize};

/// The command-line dialect a compiler speaks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompilerDriver {
    Unknown,
    Gcc,
    Clang,
    Sdcc,
    Msvc,
    ClangCl,
}

impl Display for CompilerDriver {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let name = match self {
            CompilerDriver::Unknown => "Unknown",
            CompilerDriver::Gcc => "GCC",
            CompilerDriver::Clang => "Clang",
            CompilerDriver::Sdcc => "SDCC",
            CompilerDriver::Msvc => "MSVC",
            CompilerDriver::ClangCl => "ClangCl",
        };

        f.write_str(name)
    }
}

/// A driver together with the version it reported.
///
/// `version` is `None` when the compiler printed something that does not
/// start with a number. Such an identity sorts below every concrete bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerIdentity {
    pub driver: CompilerDriver,
    pub version: Option<Version>,
}

impl CompilerIdentity {
    pub fn new(driver: CompilerDriver, version: &str) -> CompilerIdentity {
        CompilerIdentity {
            driver,
            version: parse_version(version),
        }
    }

    pub fn with_version(driver: CompilerDriver, major: u64, minor: u64, patch: u64) -> Self {
        CompilerIdentity {
            driver,
            version: Some(Version::new(major, minor, patch)),
        }
    }
}

impl Display for CompilerIdentity {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match &self.version {
            Some(v) => write!(f, "{} {}", self.driver, v),
            None => write!(f, "{} (unknown version)", self.driver),
        }
    }
}

/// Reads the leading `major[.minor[.patch]]` of a compiler version string.
///
/// Anything after the numeric prefix (`-win32`, ` (Fedora 13.2.1-4)`, `git`
/// suffixes...) is ignored and missing components default to zero.
pub fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let prefix_len = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());

    let mut components = raw[..prefix_len]
        .split('.')
        .take(3)
        .map(|part| part.parse::<u64>().ok());

    let major = components.next().flatten()?;
    let minor = components.next().flatten().unwrap_or(0);
    let patch = components.next().flatten().unwrap_or(0);

    Some(Version::new(major, minor, patch))
}

/// A pure predicate deciding whether an option or a choice is legal for a
/// given compiler.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Always,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Driver(CompilerDriver),
    AtLeast(CompilerDriver, Version),
    LessThan(CompilerDriver, Version),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Always
    }
}

impl Filter {
    pub fn eval(&self, identity: &CompilerIdentity) -> bool {
        match self {
            Filter::Always => true,
            Filter::And(filters) => filters.iter().all(|f| f.eval(identity)),
            Filter::Or(filters) => filters.iter().any(|f| f.eval(identity)),
            Filter::Not(filter) => !filter.eval(identity),
            Filter::Driver(driver) => identity.driver == *driver,
            Filter::AtLeast(driver, bound) => {
                identity.driver == *driver
                    && matches!(&identity.version, Some(v) if v >= bound)
            }
            Filter::LessThan(driver, bound) => {
                identity.driver == *driver
                    && identity.version.as_ref().map_or(true, |v| v < bound)
            }
        }
    }

    pub fn and(self, other: Filter) -> Filter {
        Filter::And(vec![self, other])
    }

    pub fn or(self, other: Filter) -> Filter {
        Filter::Or(vec![self, other])
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

pub fn gcc_at_least(major: u64, minor: u64) -> Filter {
    Filter::AtLeast(CompilerDriver::Gcc, Version::new(major, minor, 0))
}

pub fn gcc_less_than(major: u64, minor: u64) -> Filter {
    Filter::LessThan(CompilerDriver::Gcc, Version::new(major, minor, 0))
}

pub fn clang() -> Filter {
    Filter::Driver(CompilerDriver::Clang)
}

pub fn clang_at_least(major: u64, minor: u64) -> Filter {
    Filter::AtLeast(CompilerDriver::Clang, Version::new(major, minor, 0))
}

pub fn clang_less_than(major: u64, minor: u64) -> Filter {
    Filter::LessThan(CompilerDriver::Clang, Version::new(major, minor, 0))
}

pub fn msvc_at_least(major: u64, minor: u64) -> Filter {
    Filter::AtLeast(CompilerDriver::Msvc, Version::new(major, minor, 0))
}

pub fn clang_cl_at_least(major: u64, minor: u64) -> Filter {
    Filter::AtLeast(CompilerDriver::ClangCl, Version::new(major, minor, 0))
}
