pub mod config;

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result as AnyResult};
use clap::ArgMatches;
use itertools::Itertools;
use log::warn;
use tap::Tap;

use crate::{
    collection::{AppPath, CompilerSetCollection, DiscoveryOptions},
    compiler_set::CompilerSet,
    hint::COMPILER_HINT_SCRIPT,
    probe::{Prober, SystemRunner},
    registry,
    store::FileStore,
};

use self::config::ProgramConfig;

/// Everything a subcommand works with.
struct Session {
    config: &'static ProgramConfig,
    app_dir: PathBuf,
    store: FileStore,
    sets: CompilerSetCollection,
    runner: SystemRunner,
}

fn default_app_dir() -> AnyResult<PathBuf> {
    let exe = env::current_exe().context("Failed to locate the running executable")?;

    Ok(exe.parent().map(Path::to_path_buf).unwrap_or_default())
}

impl Session {
    fn open(config: &'static ProgramConfig) -> AnyResult<Session> {
        let app_dir = match &config.app_dir {
            Some(dir) => dir.clone(),
            None => default_app_dir()?,
        };

        let store = FileStore::open(&config.store_path)?;
        let mut sets = CompilerSetCollection::new(
            registry::global(),
            AppPath::new(app_dir.clone(), config.portable),
        );
        sets.load_sets(&store);

        Ok(Session {
            config,
            app_dir,
            store,
            sets,
            runner: SystemRunner::new(),
        })
    }

    fn prober(&self) -> Prober {
        Prober::new(
            &self.runner,
            Duration::from_millis(self.config.probe_timeout_ms),
        )
    }

    fn discovery_options(&self) -> DiscoveryOptions {
        let mut options = DiscoveryOptions::from_env(&self.app_dir);
        options.hint_timeout = Duration::from_millis(self.config.hint_timeout_ms);

        if let Some(script) = &self.config.hint_script {
            options.hint_script = Some(script.clone());
        } else {
            let script = self
                .app_dir
                .clone()
                .tap_mut(|p| p.push("libexec"))
                .tap_mut(|p| p.push(COMPILER_HINT_SCRIPT));
            options.hint_script = script.is_file().then(|| script);
        }

        options
    }

    fn set(&self, matches: &ArgMatches) -> AnyResult<(usize, &CompilerSet)> {
        let index = index(matches)?;
        let set = self
            .sets
            .get_set(index)
            .with_context(|| format!("There is no compiler set #{}", index))?;

        Ok((index, set))
    }
}

fn index(matches: &ArgMatches) -> AnyResult<usize> {
    let raw = matches.value_of("index").unwrap_or_default();

    raw.parse()
        .with_context(|| format!("`{}` is not a compiler set index", raw))
}

pub fn run() -> AnyResult<()> {
    let matches = config::matches();
    let mut session = Session::open(config::get())?;

    match matches.subcommand() {
        Some(("find", _)) => find(&mut session),
        Some(("list", _)) => {
            print!("{}", session.sets);
            Ok(())
        }
        Some(("show", args)) => show(&session, args),
        Some(("defines", args)) => defines(&session, args),
        Some(("options", args)) => options(&session, args),
        Some(("default", args)) => default(&mut session, args),
        Some(("import", args)) => import(&mut session, args),
        Some(("export", args)) => export(&session, args),
        Some(("delete", args)) => {
            let index = index(args)?;
            session.sets.delete_set(&mut session.store, index)?;
            print!("{}", session.sets);
            Ok(())
        }
        Some((other, _)) => bail!("Unknown subcommand `{}`", other),
        None => bail!("No subcommand given"),
    }
}

fn find(session: &mut Session) -> AnyResult<()> {
    let options = session.discovery_options();
    let prober = Prober::new(
        &session.runner,
        Duration::from_millis(session.config.probe_timeout_ms),
    );

    let report = session.sets.find_sets(&prober, &options);
    if let Some(e) = &report.hint_error {
        eprintln!("Error executing platform compiler hint add-on: {}", e);
    }

    session
        .sets
        .save_sets(&mut session.store)
        .context("Failed to save compiler sets")?;

    println!(
        "Scanned {} director{}, {} set(s) from the hint script",
        report.scanned_dirs,
        if report.scanned_dirs == 1 { "y" } else { "ies" },
        report.hinted_sets
    );
    print!("{}", session.sets);

    Ok(())
}

fn show(session: &Session, args: &ArgMatches) -> AnyResult<()> {
    let (_, set) = session.set(args)?;
    let json = serde_json::to_string_pretty(&set.to_json())
        .context("Failed to serialize compiler set")?;

    println!("{}", json);
    Ok(())
}

fn defines(session: &Session, args: &ArgMatches) -> AnyResult<()> {
    let (index, set) = session.set(args)?;
    let defines = set
        .defines(&session.prober(), args.is_present("cpp"))
        .with_context(|| format!("Failed to query the defines of compiler set #{}", index))?;

    for define in defines {
        println!("{}", define);
    }

    Ok(())
}

fn options(session: &Session, args: &ArgMatches) -> AnyResult<()> {
    let (_, set) = session.set(args)?;
    let identity = set.identity();
    let options = set
        .registry()
        .option_list(set.compiler_type().driver())
        .iter()
        .filter(|option| option.is_available(&identity));

    for (section, options) in &options.group_by(|option| option.section.as_str()) {
        println!("[{}]", section);

        for option in options {
            let value = set.compile_option(&option.key).unwrap_or("-");
            println!("  {:<36} {:<10} {}", option.key, value, option.name);

            let choices = option
                .available_choices(&identity)
                .map(|choice| format!("{}={}", choice.value, choice.display))
                .join(", ");
            if !choices.is_empty() {
                println!("  {:<36} {:<10} {}", "", "", choices);
            }
        }
    }

    Ok(())
}

fn default(session: &mut Session, args: &ArgMatches) -> AnyResult<()> {
    let index = index(args)?;
    if session.sets.get_set(index).is_none() {
        bail!("There is no compiler set #{}", index);
    }

    session.sets.set_default_index(Some(index));
    session
        .sets
        .persist_default_index(&mut session.store)
        .context("Failed to save the default compiler set")?;

    print!("{}", session.sets);
    Ok(())
}

fn import(session: &mut Session, args: &ArgMatches) -> AnyResult<()> {
    let path = args.value_of("file").unwrap_or_default();
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read `{}`", path))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("`{}` is not valid JSON", path))?;

    let mut set = CompilerSet::from_json(registry::global(), value)?;
    if let Err(e) = set.ensure_default_dirs(&session.prober()) {
        warn!("Could not detect the default directories of `{}`: {}", set.name, e);
    }

    let index = session.sets.add_set(set);
    session
        .sets
        .save_sets(&mut session.store)
        .context("Failed to save compiler sets")?;

    println!("Imported as compiler set #{}", index);
    Ok(())
}

fn export(session: &Session, args: &ArgMatches) -> AnyResult<()> {
    let (_, set) = session.set(args)?;
    let json = serde_json::to_string_pretty(&set.to_json())
        .context("Failed to serialize compiler set")?;

    match args.value_of("output") {
        Some(path) => fs::write(path, json).with_context(|| format!("Failed to write `{}`", path)),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}
