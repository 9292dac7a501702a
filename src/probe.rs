//! Out-of-process compiler probing.
//!
//! A probe runs a candidate binary with diagnostic flags and scrapes its
//! output. Every marker string lives in the per-family submodules so that a
//! change in a vendor's output format stays local to one file.

mod gcc;
mod runner;
mod sdcc;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::debug;

use crate::{error::ProbeError, family::CompilerType, utils};

pub use runner::SystemRunner;

pub(crate) use gcc::{is_target_64bit, major_version};

/// Default wall-clock budget of one compiler invocation.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// One invocation of a program living in `dir`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory, also the only entry of `PATH`.
    pub dir: PathBuf,
    pub timeout: Duration,
}

/// Spawns processes on behalf of the probes.
///
/// Implementations return stdout followed by stderr.
pub trait CommandRunner {
    fn run(&self, request: &CommandRequest) -> Result<Vec<u8>, ProbeError>;
}

/// Facts scraped from a compiler installation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeResult {
    pub compiler_type: CompilerType,
    /// Architecture component of the target triple.
    pub target: String,
    pub dump_machine: String,
    pub version: String,
    /// Distribution label found between parentheses in the version banner.
    pub vendor: String,
    pub name: String,
    pub bin_dirs: Vec<PathBuf>,
    pub default_c_include_dirs: Vec<PathBuf>,
    pub default_cpp_include_dirs: Vec<PathBuf>,
    pub default_lib_dirs: Vec<PathBuf>,
}

pub struct Prober<'r> {
    runner: &'r dyn CommandRunner,
    timeout: Duration,
}

impl<'r> Prober<'r> {
    pub fn new(runner: &'r dyn CommandRunner, timeout: Duration) -> Prober<'r> {
        Prober { runner, timeout }
    }

    /// Identifies the compiler `exe` found in `bin_dir`.
    ///
    /// `exe` is a file name, already carrying the platform executable
    /// suffix.
    pub fn probe(&self, bin_dir: &Path, exe: &str) -> Result<ProbeResult, ProbeError> {
        let result = if exe == utils::program_name("sdcc") {
            sdcc::probe(self, bin_dir, exe)
        } else {
            gcc::probe(self, bin_dir, exe)
        }?;

        debug!(
            "Probed `{}`: {} {} ({})",
            bin_dir.join(exe).display(),
            result.compiler_type,
            result.version,
            result.dump_machine
        );

        Ok(result)
    }

    /// Runs `program` from `dir` and returns its trimmed output.
    pub fn output(&self, dir: &Path, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let request = CommandRequest {
            program: dir.join(program),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            dir: dir.to_path_buf(),
            timeout: self.timeout,
        };

        debug!("Running `{}` {:?}", request.program.display(), request.args);

        let bytes = self.runner.run(&request)?;
        Ok(String::from_utf8_lossy(&bytes).trim_end().to_owned())
    }

    /// Like [`Prober::output`], reading any failure as empty output.
    pub(crate) fn output_or_empty(&self, dir: &Path, program: &str, args: &[&str]) -> String {
        self.output(dir, program, args).unwrap_or_else(|e| {
            debug!("Ignoring failed invocation of `{}`: {}", program, e);
            String::new()
        })
    }
}

#[cfg(test)]
use std::cell::RefCell;

#[cfg(test)]
#[allow(clippy::type_complexity)]
pub(crate) struct FakeRunner<'a> {
    on_run: Box<dyn Fn(&str, &[String]) -> Result<String, ProbeError> + 'a>,

    pub(crate) calls: RefCell<Vec<FakeRunnerCall>>,
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FakeRunnerCall {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
}

#[cfg(test)]
impl<'a> FakeRunner<'a> {
    pub(crate) fn new() -> FakeRunner<'a> {
        FakeRunner {
            on_run: Box::new(|program, _| panic!("`{}` is run but `on_run` is not set", program)),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Answers every invocation with `f(program file name, args)`.
    pub(crate) fn on_run(
        mut self,
        f: impl Fn(&str, &[String]) -> Result<String, ProbeError> + 'a,
    ) -> FakeRunner<'a> {
        self.on_run = Box::new(f);
        self
    }
}

#[cfg(test)]
impl<'a> CommandRunner for FakeRunner<'a> {
    fn run(&self, request: &CommandRequest) -> Result<Vec<u8>, ProbeError> {
        let program = request
            .program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.calls.borrow_mut().push(FakeRunnerCall {
            program: program.clone(),
            args: request.args.clone(),
        });

        (self.on_run)(&program, &request.args).map(String::into_bytes)
    }
}
