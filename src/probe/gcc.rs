//! Scraping of GCC and Clang diagnostic output.

use std::path::Path;

use crate::{
    error::ProbeError,
    family::CompilerType,
    utils::{self, add_existing_dir, NULL_FILE},
};

use super::{ProbeResult, Prober};

const TARGET_MARKER: &str = "Target: ";
const CLANG_VERSION_MARKER: &str = "clang version ";
const GCC_VERSION_MARKER: &str = "gcc version ";
const INCLUDE_START_MARKER: &str = "#include <...> search starts here:";
const INCLUDE_END_MARKER: &str = "End of search list.";
const PROGRAMS_MARKER: &str = "programs: =";
const LIBRARIES_MARKER: &str = "libraries: =";

const SEARCH_DIR_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// Architectures LLVM's triple parser considers 64-bit, minus the
/// non-CPU targets.
const TARGETS_64BIT: &[&str] = &[
    "amd64",
    "x86_64",
    "x86_64h",
    "powerpc64",
    "ppu",
    "ppc64",
    "powerpc64le",
    "ppc64le",
    "aarch64",
    "arm64",
    "arm64e",
    "aarch64_be",
    "aarch64_32",
    "arm64_32",
    "mips64",
    "mips64eb",
    "mipsn32",
    "mipsisa64r6",
    "mips64r6",
    "mipsn32r6",
    "mips64el",
    "mipsn32el",
    "mipsisa64r6el",
    "mips64r6el",
    "mipsn32r6el",
    "riscv64",
    "s390x",
    "systemz",
    "sparcv9",
    "sparc64",
    "wasm64",
    "loongarch64",
];

pub(crate) fn is_target_64bit(target: &str) -> bool {
    TARGETS_64BIT.contains(&target)
}

/// Parses the leading integer of a dotted version, `-1` when there is none.
pub(crate) fn major_version(version: &str) -> i32 {
    version
        .split('.')
        .next()
        .and_then(|major| major.trim().parse().ok())
        .unwrap_or(-1)
}

/// What `<compiler> -v` tells about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Banner {
    pub(crate) compiler_type: CompilerType,
    pub(crate) target: String,
    pub(crate) version: String,
    pub(crate) vendor: String,
    pub(crate) name: String,
}

/// Returns the printable token following `marker` and the byte offset right
/// after it.
fn token_after<'a>(output: &'a str, marker: &str) -> Option<(&'a str, usize)> {
    let start = output.find(marker)? + marker.len();
    let len = output[start..]
        .find(|c: char| c <= ' ')
        .unwrap_or(output.len() - start);

    Some((&output[start..start + len], start + len))
}

pub(crate) fn parse_banner(output: &str, windows: bool) -> Option<Banner> {
    let (triple, _) = token_after(output, TARGET_MARKER)?;
    let target = triple.split('-').next().unwrap_or_default().to_owned();

    if let Some((version, _)) = token_after(output, CLANG_VERSION_MARKER) {
        return Some(Banner {
            compiler_type: CompilerType::Clang,
            target,
            name: format!("Clang {}", version),
            version: version.to_owned(),
            vendor: String::new(),
        });
    }

    let (version, end) = token_after(output, GCC_VERSION_MARKER)?;
    let vendor = parenthesized(&output[end..]).unwrap_or_default();

    let compiler_type = if major_version(version) >= 12 && vendor.contains("MSYS2") {
        CompilerType::GccUtf8
    } else {
        CompilerType::Gcc
    };

    Some(Banner {
        compiler_type,
        target,
        name: friendly_name(vendor, version, windows),
        version: version.to_owned(),
        vendor: vendor.to_owned(),
    })
}

fn parenthesized(text: &str) -> Option<&str> {
    let open = text.find('(')?;
    let close = text[open..].find(')')?;

    Some(&text[open + 1..open + close])
}

/// Builds a display name out of the distribution label of a GCC build.
pub(crate) fn friendly_name(vendor: &str, version: &str, windows: bool) -> String {
    let vendor = vendor.to_lowercase();

    let brand = if vendor.contains("tdm") {
        "TDM-GCC"
    } else if vendor.contains("msys2") || vendor.contains("mingw-w64") {
        "MinGW-w64 GCC"
    } else if !windows {
        "GCC"
    } else if vendor.contains("gcc") {
        "MinGW GCC"
    } else {
        "MinGW-w64 GCC"
    };

    format!("{} {}", brand, version)
}

/// Extracts the default include directories of a `-v -E` run.
pub(crate) fn parse_include_block(output: &str) -> Vec<&str> {
    let start = match output.find(INCLUDE_START_MARKER) {
        Some(pos) => pos + INCLUDE_START_MARKER.len(),
        None => return Vec::new(),
    };
    let end = match output[start..].find(INCLUDE_END_MARKER) {
        Some(len) => start + len,
        None => return Vec::new(),
    };

    output[start..end]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Extracts one `label: =dir1<sep>dir2` line of `-print-search-dirs`.
pub(crate) fn parse_search_dirs<'a>(output: &'a str, marker: &str, separator: char) -> Vec<&'a str> {
    let start = match output.find(marker) {
        Some(pos) => pos + marker.len(),
        None => return Vec::new(),
    };
    let line = output[start..].lines().next().unwrap_or_default();

    line.split(separator)
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .collect()
}

pub(super) fn probe(prober: &Prober, bin_dir: &Path, exe: &str) -> Result<ProbeResult, ProbeError> {
    let output = prober.output(bin_dir, exe, &["-v"])?;
    let banner = parse_banner(&output, cfg!(windows)).ok_or_else(|| ProbeError::Unrecognized {
        program: exe.to_owned(),
    })?;

    let dump_machine = prober.output_or_empty(bin_dir, exe, &["-dumpmachine"]);
    let dump_machine = dump_machine.trim().to_owned();
    let root = bin_dir.parent().unwrap_or(bin_dir);

    let mut result = ProbeResult {
        compiler_type: banner.compiler_type,
        target: banner.target,
        dump_machine,
        version: banner.version,
        vendor: banner.vendor,
        name: banner.name,
        ..ProbeResult::default()
    };

    add_existing_dir(&mut result.bin_dirs, root.join("bin"));
    if !result.dump_machine.is_empty() {
        let lib_dir = gcc_lib_dir(root, &result);
        add_existing_dir(&mut result.bin_dirs, lib_dir);
    }

    collect_directories(prober, bin_dir, root, &mut result);

    Ok(result)
}

fn gcc_lib_dir(root: &Path, result: &ProbeResult) -> std::path::PathBuf {
    root.join("lib")
        .join("gcc")
        .join(&result.dump_machine)
        .join(&result.version)
}

fn collect_directories(prober: &Prober, bin_dir: &Path, root: &Path, result: &mut ProbeResult) {
    let c_prog = if result.compiler_type == CompilerType::Clang {
        utils::program_name("clang")
    } else {
        utils::program_name("gcc")
    };

    let output = prober.output_or_empty(bin_dir, &c_prog, &["-xc", "-v", "-E", NULL_FILE]);
    for dir in parse_include_block(&output) {
        add_existing_dir(&mut result.default_c_include_dirs, dir);
    }

    let output = prober.output_or_empty(bin_dir, &c_prog, &["-xc++", "-E", "-v", NULL_FILE]);
    for dir in parse_include_block(&output) {
        add_existing_dir(&mut result.default_cpp_include_dirs, dir);
    }

    let output = prober.output_or_empty(bin_dir, &c_prog, &["-print-search-dirs", NULL_FILE]);
    for dir in parse_search_dirs(&output, PROGRAMS_MARKER, SEARCH_DIR_SEPARATOR) {
        add_existing_dir(&mut result.bin_dirs, dir);
    }
    for dir in parse_search_dirs(&output, LIBRARIES_MARKER, SEARCH_DIR_SEPARATOR) {
        add_existing_dir(&mut result.default_lib_dirs, dir);
    }

    if result.dump_machine.is_empty() {
        return;
    }

    let dm = result.dump_machine.clone();
    let lib_gcc = gcc_lib_dir(root, result);
    let cxx = root.join("include").join("c++").join(&result.version);

    add_existing_dir(&mut result.bin_dirs, &lib_gcc);

    for dir in [
        root.join(&dm).join("include"),
        lib_gcc.join("include"),
        lib_gcc.join("include-fixed"),
    ] {
        add_existing_dir(&mut result.default_c_include_dirs, &dir);
        add_existing_dir(&mut result.default_cpp_include_dirs, &dir);
    }

    for dir in [
        lib_gcc.join("include").join("c++"),
        lib_gcc.join("include").join("c++").join(&dm),
        lib_gcc.join("include").join("c++").join("backward"),
        cxx.clone(),
        cxx.join("backward"),
        cxx.join(&dm),
    ] {
        add_existing_dir(&mut result.default_cpp_include_dirs, dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSYS2_GCC: &str = "Using built-in specs.
COLLECT_GCC=C:\\msys64\\mingw64\\bin\\gcc.exe
Target: x86_64-w64-mingw32
Thread model: posix
gcc version 13.2.0 (Rev3, Built by MSYS2 project)";

    const UBUNTU_GCC: &str = "Using built-in specs.
Target: x86_64-linux-gnu
gcc version 11.4.0 (Ubuntu 11.4.0-1ubuntu1~22.04)";

    const CLANG: &str = "Ubuntu clang version 14.0.0-1ubuntu1.1
Target: aarch64-unknown-linux-gnu
Thread model: posix";

    mod banner {
        use super::*;

        #[test]
        fn msys2_gcc_12_speaks_utf8() {
            let banner = parse_banner(MSYS2_GCC, true).unwrap();

            assert_eq!(banner.compiler_type, CompilerType::GccUtf8);
            assert_eq!(banner.target, "x86_64");
            assert_eq!(banner.version, "13.2.0");
            assert_eq!(banner.vendor, "Rev3, Built by MSYS2 project");
            assert_eq!(banner.name, "MinGW-w64 GCC 13.2.0");
        }

        #[test]
        fn distribution_gcc() {
            let banner = parse_banner(UBUNTU_GCC, false).unwrap();

            assert_eq!(banner.compiler_type, CompilerType::Gcc);
            assert_eq!(banner.vendor, "Ubuntu 11.4.0-1ubuntu1~22.04");
            assert_eq!(banner.name, "GCC 11.4.0");
        }

        #[test]
        fn clang_wins_over_gcc_marker() {
            let banner = parse_banner(CLANG, false).unwrap();

            assert_eq!(banner.compiler_type, CompilerType::Clang);
            assert_eq!(banner.target, "aarch64");
            assert_eq!(banner.name, "Clang 14.0.0-1ubuntu1.1");
        }

        #[test]
        fn missing_markers() {
            assert!(parse_banner("gcc version 9.1.0", false).is_none());
            assert!(parse_banner("Target: x86_64-pc-linux-gnu\n", false).is_none());
        }

        #[test]
        fn old_msys2_gcc_is_plain_gcc() {
            let output = "Target: x86_64-w64-mingw32\ngcc version 11.2.0 (Rev1, Built by MSYS2 project)";

            assert_eq!(
                parse_banner(output, true).unwrap().compiler_type,
                CompilerType::Gcc
            );
        }
    }

    #[test]
    fn friendly_names() {
        assert_eq!(friendly_name("tdm64-1", "10.3.0", true), "TDM-GCC 10.3.0");
        assert_eq!(friendly_name("x86_64-posix-seh-rev0, Built by MinGW-W64 project", "8.1.0", true), "MinGW-w64 GCC 8.1.0");
        assert_eq!(friendly_name("MinGW.org GCC-6.3.0-1", "6.3.0", true), "MinGW GCC 6.3.0");
        assert_eq!(friendly_name("MinGW.org GCC-6.3.0-1", "6.3.0", false), "GCC 6.3.0");
        assert_eq!(friendly_name("", "9.2.0", true), "MinGW-w64 GCC 9.2.0");
        assert_eq!(friendly_name("GCC", "13.1.1", false), "GCC 13.1.1");
    }

    #[test]
    fn major_versions() {
        assert_eq!(major_version("13.2.0"), 13);
        assert_eq!(major_version("9"), 9);
        assert_eq!(major_version("trunk"), -1);
        assert_eq!(major_version(""), -1);
    }

    #[test]
    fn include_block() {
        let output = "ignoring nonexistent directory \"/usr/local/include/x86_64-linux-gnu\"
#include \"...\" search starts here:
#include <...> search starts here:
 /usr/lib/gcc/x86_64-linux-gnu/11/include
 /usr/local/include
 /usr/include
End of search list.";

        assert_eq!(
            parse_include_block(output),
            [
                "/usr/lib/gcc/x86_64-linux-gnu/11/include",
                "/usr/local/include",
                "/usr/include"
            ]
        );
        assert!(parse_include_block("End of search list.").is_empty());
    }

    #[test]
    fn search_dirs() {
        let output = "install: /usr/lib/gcc/x86_64-linux-gnu/11/
programs: =/usr/lib/gcc/x86_64-linux-gnu/11/:/usr/libexec/gcc/
libraries: =/usr/lib/gcc/x86_64-linux-gnu/11/:/lib/x86_64-linux-gnu/";

        assert_eq!(
            parse_search_dirs(output, PROGRAMS_MARKER, ':'),
            ["/usr/lib/gcc/x86_64-linux-gnu/11/", "/usr/libexec/gcc/"]
        );
        assert_eq!(
            parse_search_dirs(output, LIBRARIES_MARKER, ':'),
            ["/usr/lib/gcc/x86_64-linux-gnu/11/", "/lib/x86_64-linux-gnu/"]
        );
        assert!(parse_search_dirs("", PROGRAMS_MARKER, ':').is_empty());
    }

    #[test]
    fn target_bitness() {
        assert!(is_target_64bit("x86_64"));
        assert!(is_target_64bit("aarch64"));
        assert!(!is_target_64bit("i686"));
        assert!(!is_target_64bit(""));
    }
}
