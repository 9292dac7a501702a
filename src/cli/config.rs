use std::path::PathBuf;

use clap::{
    arg, crate_authors, crate_description, crate_name, crate_version, Arg, ArgMatches, Command,
};
use figment::providers::{Env, Format, Json, Serialized, Toml};
use figment::value::{Dict, Map};
use figment::{Error, Figment, Metadata, Profile, Provider};
use log::LevelFilter;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static MATCHES: Lazy<ArgMatches> = Lazy::new(|| command().get_matches());

static CONFIG: Lazy<ProgramConfig> = Lazy::new(|| ProgramConfig::from_matches(&MATCHES));

pub fn get() -> &'static ProgramConfig {
    &CONFIG
}

/// The parsed command line, subcommand included.
pub fn matches() -> &'static ArgMatches {
    &MATCHES
}

#[repr(usize)]
#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Maps the number of `-v` flags on top of the default `Warn` level.
impl From<u64> for LogLevel {
    fn from(occurrences: u64) -> Self {
        match occurrences {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Settings file the compiler sets are persisted in.
    pub store_path: PathBuf,
    /// Base of `%AppPath%` and of the bundled toolchains. Defaults to the
    /// directory of the running executable.
    pub app_dir: Option<PathBuf>,
    pub portable: bool,
    /// Defaults to `<app_dir>/libexec/compiler_hint.lua` when it exists.
    pub hint_script: Option<PathBuf>,
    pub probe_timeout_ms: u64,
    pub hint_timeout_ms: u64,
    pub verbosity: LogLevel,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig {
            store_path: PathBuf::from("compiler-sets.store.json"),
            app_dir: None,
            portable: false,
            hint_script: None,
            probe_timeout_ms: 10_000,
            hint_timeout_ms: 1_000,
            verbosity: LogLevel::Warn,
        }
    }
}

struct ClapProvider<'a>(&'a ArgMatches);

impl<'a> Provider for ClapProvider<'a> {
    fn metadata(&self) -> Metadata {
        Metadata::named("clap")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let profile = Profile::default();
        let mut res = Dict::new();

        if let Some(store) = self.0.value_of("store") {
            res.insert("store_path".into(), store.into());
        }

        if let Some(app_dir) = self.0.value_of("app-dir") {
            res.insert("app_dir".into(), app_dir.into());
        }

        if self.0.is_present("portable") {
            res.insert("portable".into(), true.into());
        }

        if let Some(hint) = self.0.value_of("hint") {
            res.insert("hint_script".into(), hint.into());
        }

        if let Some(timeout) = self.0.value_of("probe-timeout") {
            let timeout = timeout
                .parse::<u64>()
                .map_err(|e| Error::from(format!("invalid probe timeout `{}`: {}", timeout, e)))?;
            res.insert("probe_timeout_ms".into(), timeout.into());
        }

        let verbosity = self.0.occurrences_of("verbose");
        if verbosity > 0 {
            res.insert(
                "verbosity".into(),
                format!("{:?}", LogLevel::from(verbosity)).into(),
            );
        }

        Ok(profile.collect(res))
    }
}

fn index_arg() -> Arg<'static> {
    Arg::new("index")
        .help("Position of the compiler set, as printed by `list`")
        .required(true)
}

pub(crate) fn command() -> Command<'static> {
    Command::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("verbose")
            .short('v')
            .global(true)
            .multiple_occurrences(true)
            .help("Increase verbosity of output"))
        .arg(arg!(--store <PATH> "Settings file holding the compiler sets")
            .required(false)
            .global(true))
        .arg(arg!(--"app-dir" <DIR> "Directory bundled toolchains and `%AppPath%` refer to")
            .required(false)
            .global(true))
        .arg(arg!(--portable "Save paths below the application directory as `%AppPath%/...`")
            .global(true))
        .arg(arg!(--hint <FILE> "Compiler hint script to run before scanning")
            .required(false)
            .global(true))
        .arg(arg!(--"probe-timeout" <MS> "Time budget of one compiler invocation")
            .required(false)
            .global(true))
        .subcommand(Command::new("find")
            .about("Discovers the installed compilers and saves the result"))
        .subcommand(Command::new("list")
            .about("Lists the saved compiler sets, `*` marks the default"))
        .subcommand(Command::new("show")
            .about("Prints a compiler set as JSON")
            .arg(index_arg()))
        .subcommand(Command::new("defines")
            .about("Prints the macros the compiler predefines")
            .arg(index_arg())
            .arg(arg!(--cpp "Ask for the C++ macros")))
        .subcommand(Command::new("options")
            .about("Prints the options available to a compiler set")
            .arg(index_arg()))
        .subcommand(Command::new("default")
            .about("Makes a compiler set the default one")
            .arg(index_arg()))
        .subcommand(Command::new("import")
            .about("Adds a compiler set described by a JSON file")
            .arg(Arg::new("file").required(true)))
        .subcommand(Command::new("export")
            .about("Writes a compiler set as JSON")
            .arg(index_arg())
            .arg(arg!(-o --output <FILE> "Write to a file instead of stdout").required(false)))
        .subcommand(Command::new("delete")
            .about("Deletes a compiler set")
            .arg(index_arg()))
}

impl ProgramConfig {
    pub(crate) fn from_matches(matches: &ArgMatches) -> ProgramConfig {
        ProgramConfig::figment(matches)
            .extract()
            .unwrap_or_else(|e| {
                eprintln!("Failed to load configuration: {}", e);
                std::process::exit(1);
            })
    }

    fn figment(matches: &ArgMatches) -> Figment {
        Figment::from(ClapProvider(matches))
            .join(Env::prefixed("COMPILER_SETS_"))
            .join(Toml::file("compiler-sets.toml"))
            .join(Json::file("compiler-sets.json"))
            .join(Serialized::defaults(ProgramConfig::default()))
    }
}
