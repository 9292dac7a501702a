//! Scraping of SDCC diagnostic output.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::ProbeError, family::CompilerType, utils::add_existing_dir};

use super::{ProbeResult, Prober};

const BANNER_PREFIX: &str = "SDCC";

static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(\d+\.\d+\.\d+)\s+").expect("hard-coded regex is valid"));

/// Returns the version found on the banner line, empty when it has none,
/// or `None` when the output is not SDCC's.
pub(crate) fn parse_banner(output: &str) -> Option<String> {
    if !output.starts_with(BANNER_PREFIX) {
        return None;
    }

    let first_line = output.split(|c: char| c < ' ').next().unwrap_or_default();
    let version = VERSION
        .captures(first_line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default();

    Some(version)
}

/// Lines found between the `start` label and the `end` label.
pub(crate) fn parse_section<'a>(output: &'a str, start: &str, end: &str) -> Vec<&'a str> {
    let from = match output.find(start) {
        Some(pos) => pos + start.len(),
        None => return Vec::new(),
    };
    let to = match output[from..].find(end) {
        Some(len) => from + len,
        None => return Vec::new(),
    };

    output[from..to]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

pub(super) fn probe(prober: &Prober, bin_dir: &Path, exe: &str) -> Result<ProbeResult, ProbeError> {
    let output = prober.output(bin_dir, exe, &["-v"])?;
    let version = parse_banner(&output).ok_or_else(|| ProbeError::Unrecognized {
        program: exe.to_owned(),
    })?;

    let name = if version.is_empty() {
        BANNER_PREFIX.to_owned()
    } else {
        format!("{} {}", BANNER_PREFIX, version)
    };

    let mut result = ProbeResult {
        compiler_type: CompilerType::Sdcc,
        version,
        name,
        ..ProbeResult::default()
    };
    add_existing_dir(&mut result.bin_dirs, bin_dir);

    let output = prober.output_or_empty(bin_dir, exe, &["--print-search-dirs"]);
    for dir in parse_section(&output, "programs:", "datadir:") {
        add_existing_dir(&mut result.bin_dirs, dir);
    }
    for dir in parse_section(&output, "includedir:", "libdir:") {
        add_existing_dir(&mut result.default_c_include_dirs, dir);
    }
    for dir in parse_section(&output, "libdir:", "libpath:") {
        add_existing_dir(&mut result.default_lib_dirs, dir);
    }

    Ok(result)
}
