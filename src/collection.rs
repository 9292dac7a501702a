//! The list of compiler sets: discovery, default selection and persistence.

pub mod legacy;
pub mod persist;

use std::{
    collections::HashSet,
    env,
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::Result as AnyResult;
use log::{debug, info, warn};

use crate::{
    compiler_set::CompilerSet,
    error::ScriptError,
    family::{
        CompilerType, CC_CMD_OPT_ADDRESS_SANITIZER, CC_CMD_OPT_DEBUG_INFO, CC_CMD_OPT_OPTIMIZE,
        CC_CMD_OPT_POINTER_SIZE, CC_CMD_OPT_USE_PIPE, CC_CMD_OPT_WARNING_ALL,
        LINK_CMD_OPT_STRIP_EXE, SDCC_OPT_NOSTARTUP,
    },
    hint::{self, CompilerHint, HintEnvironment, COMPILER_HINT_TIMEOUT},
    probe::{self, Prober},
    registry::FamilyRegistry,
    schema::OPTION_ON,
    store::SettingsStore,
    utils,
};

pub use persist::AppPath;

const GCC_PROGRAM: &str = "gcc";
const CLANG_PROGRAM: &str = "clang";
const SDCC_PROGRAM: &str = "sdcc";

/// Toolchain directories shipped next to the application on Windows.
const BUNDLED_DIRS: &[&str] = &["clang64/bin", "mingw64/bin", "mingw32/bin"];

/// Where and how [`CompilerSetCollection::find_sets`] looks for compilers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Directories to scan, in `PATH` order.
    pub search_path: Vec<PathBuf>,
    pub app_dir: PathBuf,
    pub hint_script: Option<PathBuf>,
    pub hint_timeout: Duration,
}

impl DiscoveryOptions {
    /// Scans `PATH` and runs the hint script of `app_dir` if there is one.
    pub fn from_env(app_dir: &Path) -> DiscoveryOptions {
        let search_path = env::var_os("PATH")
            .map(|path| env::split_paths(&path).collect())
            .unwrap_or_default();

        let hint_script = HintEnvironment::detect(app_dir).script_path();

        DiscoveryOptions {
            search_path,
            app_dir: app_dir.to_path_buf(),
            hint_script: hint_script.is_file().then(|| hint_script),
            hint_timeout: COMPILER_HINT_TIMEOUT,
        }
    }
}

/// What a discovery run went through.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub scanned_dirs: usize,
    pub hinted_sets: usize,
    /// Set when the hint script failed. Discovery still scanned.
    pub hint_error: Option<ScriptError>,
}

/// An ordered list of compiler sets with a default one.
#[derive(Clone, Debug)]
pub struct CompilerSetCollection {
    registry: Arc<FamilyRegistry>,
    app_path: AppPath,
    sets: Vec<CompilerSet>,
    default_index: Option<usize>,
    default_index_timestamp: i64,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

fn set_release_options(set: &mut CompilerSet) {
    set.set_compile_option(CC_CMD_OPT_OPTIMIZE, "2");
    set.set_compile_option(LINK_CMD_OPT_STRIP_EXE, OPTION_ON);
    set.set_compile_option(CC_CMD_OPT_USE_PIPE, OPTION_ON);
    set.static_link = true;
}

fn set_debug_options(set: &mut CompilerSet, sanitize_address: bool) {
    set.set_compile_option(CC_CMD_OPT_DEBUG_INFO, OPTION_ON);
    set.set_compile_option(CC_CMD_OPT_WARNING_ALL, OPTION_ON);
    set.set_compile_option(CC_CMD_OPT_USE_PIPE, OPTION_ON);

    if sanitize_address {
        let sanitizer = if cfg!(target_arch = "aarch64") {
            "hwaddress"
        } else {
            "address"
        };
        set.set_compile_option(CC_CMD_OPT_ADDRESS_SANITIZER, sanitizer);
    }
    set.static_link = false;
}

fn set_32bit_options(set: &mut CompilerSet) {
    set.set_compile_option(CC_CMD_OPT_POINTER_SIZE, "32");
}

/// Hosts where the sanitized debug profile works well enough with the
/// debugger to be the default.
const ASAN_IS_DEFAULT: bool = cfg!(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_pointer_width = "32"
));

impl CompilerSetCollection {
    pub fn new(registry: Arc<FamilyRegistry>, app_path: AppPath) -> CompilerSetCollection {
        CompilerSetCollection {
            registry,
            app_path,
            sets: Vec::new(),
            default_index: None,
            default_index_timestamp: 0,
        }
    }

    pub fn registry(&self) -> &Arc<FamilyRegistry> {
        &self.registry
    }

    pub fn app_path(&self) -> &AppPath {
        &self.app_path
    }

    pub fn sets(&self) -> &[CompilerSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn get_set(&self, index: usize) -> Option<&CompilerSet> {
        self.sets.get(index)
    }

    pub fn get_set_mut(&mut self, index: usize) -> Option<&mut CompilerSet> {
        self.sets.get_mut(index)
    }

    /// The set at the default index, if that index is valid.
    pub fn default_set(&self) -> Option<&CompilerSet> {
        self.sets.get(self.default_index?)
    }

    pub fn default_index(&self) -> Option<usize> {
        self.default_index
    }

    /// Milliseconds since the epoch of the last [`Self::set_default_index`].
    pub fn default_index_timestamp(&self) -> i64 {
        self.default_index_timestamp
    }

    pub fn set_default_index(&mut self, index: Option<usize>) {
        self.default_index = index;
        self.default_index_timestamp = now_millis();
    }

    /// Appends `set`, returning its index.
    pub fn add_set(&mut self, set: CompilerSet) -> usize {
        self.sets.push(set);
        self.sets.len() - 1
    }

    /// Detects `exe` in `folder` and appends the profiles built from it.
    ///
    /// A GCC-compatible compiler yields a release set and a debug set, plus
    /// a sanitized debug set on Linux and 32-bit sets for TDM-GCC on 64-bit
    /// targets. SDCC yields a single set. Returns `false` when nothing was
    /// added: the pair is already known, or the probe failed.
    pub fn add_sets(&mut self, prober: &Prober, folder: &Path, exe: &str) -> bool {
        let known = self.sets.iter().any(|set| {
            set.bin_dirs.iter().any(|dir| dir == folder)
                && set
                    .c_compiler()
                    .and_then(Path::file_name)
                    .map_or(false, |name| name == exe)
        });
        if known {
            debug!("`{}` in `{}` is already known", exe, folder.display());
            return false;
        }

        let mut base = match CompilerSet::detect(prober, Arc::clone(&self.registry), folder, exe) {
            Ok(set) => set,
            Err(e) => {
                warn!("Skipping `{}` in `{}`: {}", exe, folder.display(), e);
                return false;
            }
        };

        if exe == utils::program_name(GCC_PROGRAM) && base.compiler_type() == CompilerType::Clang {
            debug!("`{}` is clang in disguise", folder.join(exe).display());
            return false;
        }

        if base.compiler_type() == CompilerType::Sdcc {
            base.set_compile_option(SDCC_OPT_NOSTARTUP, OPTION_ON);
            info!("Found {}", base.name);
            self.sets.push(base);
        } else {
            let base_name = base.name.clone();
            let is_64bit = probe::is_target_64bit(&base.target);
            let platform = if is_64bit { "64-bit" } else { "32-bit" };

            let mut variants = Vec::new();
            if is_64bit && base_name.starts_with("TDM-GCC ") {
                let mut release = base.clone();
                release.name = format!("{} 32-bit Release", base_name);
                set_32bit_options(&mut release);
                set_release_options(&mut release);
                variants.push(release);

                let mut debug = base.clone();
                debug.name = format!("{} 32-bit Debug", base_name);
                set_32bit_options(&mut debug);
                set_debug_options(&mut debug, false);
                variants.push(debug);
            }

            let mut debug = base.clone();
            debug.name = format!("{} {} Debug", base_name, platform);
            set_debug_options(&mut debug, false);
            variants.push(debug);

            if cfg!(target_os = "linux") {
                let mut asan = base.clone();
                asan.name = format!("{} {} Debug with ASan", base_name, platform);
                set_debug_options(&mut asan, true);
                variants.push(asan);
            }

            base.name = format!("{} {} Release", base_name, platform);
            set_release_options(&mut base);

            info!("Found {} in `{}`", base_name, folder.display());
            self.sets.push(base);
            self.sets.extend(variants);
        }

        let back = if cfg!(target_os = "linux") && !ASAN_IS_DEFAULT {
            2
        } else {
            1
        };
        self.default_index = self.sets.len().checked_sub(back);

        true
    }

    /// Adds the sets of every known compiler found in `folder`.
    pub fn add_sets_for_dir(&mut self, prober: &Prober, folder: &Path) -> bool {
        if !folder.is_dir() {
            return false;
        }

        let mut found = false;
        for program in [GCC_PROGRAM, CLANG_PROGRAM, SDCC_PROGRAM] {
            let exe = utils::program_name(program);
            if folder.join(&exe).is_file() {
                self.add_sets(prober, folder, &exe);
                found = true;
            }
        }

        found
    }

    /// Empties the list, returning the sets marked to survive discovery.
    pub fn clear_sets(&mut self) -> Vec<CompilerSet> {
        self.default_index = None;

        let (persisted, _): (Vec<_>, Vec<_>) = self
            .sets
            .drain(..)
            .partition(|set| set.persist_in_auto_find);

        persisted
    }

    fn run_hint(&self, options: &DiscoveryOptions) -> Result<Option<CompilerHint>, ScriptError> {
        let path = match &options.hint_script {
            Some(path) => path,
            None => return Ok(None),
        };

        let script = match fs::read_to_string(path) {
            Ok(script) => script,
            Err(e) => {
                debug!("No hint script at `{}`: {}", path.display(), e);
                return Ok(None);
            }
        };

        let env = HintEnvironment::detect(&options.app_dir);
        hint::run_compiler_hint(&script, &env, options.hint_timeout).map(Some)
    }

    /// Rebuilds the list from the hint script and a scan of the search path.
    ///
    /// Directories are scanned last to first and each canonical directory
    /// once. Sets marked to survive discovery are kept and moved to the
    /// end of the list.
    pub fn find_sets(&mut self, prober: &Prober, options: &DiscoveryOptions) -> DiscoveryReport {
        let persisted = self.clear_sets();
        let mut report = DiscoveryReport::default();
        let mut searched = HashSet::new();

        let hint = match self.run_hint(options) {
            Ok(hint) => hint.unwrap_or_default(),
            Err(e) => {
                warn!("Compiler hint script failed: {}", e);
                report.hint_error = Some(e);
                CompilerHint::default()
            }
        };

        for value in &hint.compiler_list {
            match CompilerSet::from_json(Arc::clone(&self.registry), value.clone()) {
                Ok(set) => {
                    self.sets.push(set);
                    report.hinted_sets += 1;
                }
                Err(e) => warn!("Ignoring hinted compiler set: {:#}", e),
            }
        }
        for dir in &hint.no_search {
            if let Ok(canonical) = fs::canonicalize(dir) {
                searched.insert(canonical);
            }
        }

        let mut dirs = Vec::new();
        if cfg!(windows) {
            dirs.extend(BUNDLED_DIRS.iter().map(|dir| options.app_dir.join(dir)));
        }
        dirs.extend(options.search_path.iter().cloned());

        for dir in dirs.iter().rev() {
            let canonical = match fs::canonicalize(dir) {
                Ok(canonical) => canonical,
                Err(_) => continue,
            };
            if !searched.insert(canonical) {
                continue;
            }

            report.scanned_dirs += 1;
            self.add_sets_for_dir(prober, &utils::absolutize(dir));
        }

        if let Some(prefer) = hint.prefer_compiler {
            if prefer >= 1 && prefer as usize <= self.sets.len() {
                self.default_index = Some(prefer as usize - 1);
            }
        }

        self.sets.extend(persisted);

        info!("Discovery found {} compiler set(s)", self.sets.len());
        report
    }

    /// Writes every set and the list metadata to `store`, then syncs it.
    pub fn save_sets(&mut self, store: &mut dyn SettingsStore) -> AnyResult<()> {
        for (index, set) in self.sets.iter().enumerate() {
            persist::save_set(store, index, set, &self.app_path);
        }

        let stored = store
            .int(persist::SETS_GROUP, persist::COUNT_KEY)
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or_default();
        for index in self.sets.len()..stored {
            store.remove_group(&persist::set_group(index));
        }

        if self.default_index.map_or(false, |index| index >= self.sets.len()) {
            self.set_default_index(self.sets.len().checked_sub(1));
        }
        self.save_default_index(store);
        store.set_value(
            persist::SETS_GROUP,
            persist::COUNT_KEY,
            self.sets.len().into(),
        );

        store.sync()
    }

    fn save_default_index(&self, store: &mut dyn SettingsStore) {
        let index = self.default_index.map_or(-1, |index| index as i64);

        store.set_value(persist::SETS_GROUP, persist::DEFAULT_INDEX_KEY, index.into());
        store.set_value(
            persist::SETS_GROUP,
            persist::DEFAULT_INDEX_TIMESTAMP_KEY,
            self.default_index_timestamp.into(),
        );
    }

    /// Writes only the default index, leaving the sets alone.
    pub fn persist_default_index(&self, store: &mut dyn SettingsStore) -> AnyResult<()> {
        self.save_default_index(store);
        store.sync()
    }

    /// Replaces the list with what `store` holds.
    ///
    /// Sets that cannot be read are dropped with a warning. The default
    /// index is clamped to the loaded list.
    pub fn load_sets(&mut self, store: &dyn SettingsStore) {
        self.sets.clear();

        let group = persist::SETS_GROUP;
        let default_index = store.int(group, persist::DEFAULT_INDEX_KEY).unwrap_or(-1);
        self.default_index_timestamp = store
            .int(group, persist::DEFAULT_INDEX_TIMESTAMP_KEY)
            .unwrap_or_default()
            .min(now_millis());
        let count = store
            .int(group, persist::COUNT_KEY)
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or_default();

        for index in 0..count {
            if let Some(set) = persist::load_set(store, index, &self.registry, &self.app_path) {
                self.sets.push(set);
            }
        }

        self.default_index = match usize::try_from(default_index) {
            Ok(index) if index < self.sets.len() => Some(index),
            Ok(_) => self.sets.len().checked_sub(1),
            Err(_) => None,
        };

        debug!(
            "Loaded {} of {} compiler set(s), default {:?}",
            self.sets.len(),
            count,
            self.default_index
        );
    }

    /// Removes the set at `index` and rewrites the store from there on.
    pub fn delete_set(&mut self, store: &mut dyn SettingsStore, index: usize) -> AnyResult<()> {
        if index >= self.sets.len() {
            anyhow::bail!("There is no compiler set #{}", index);
        }

        for i in index..self.sets.len() {
            store.remove_group(&persist::set_group(i));
        }
        self.sets.remove(index);

        match self.default_index {
            Some(default) if default == index => self.set_default_index(None),
            Some(default) if default > index => self.default_index = Some(default - 1),
            _ => (),
        }

        self.save_sets(store)
    }
}

impl Display for CompilerSetCollection {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        for (index, set) in self.sets.iter().enumerate() {
            let marker = if Some(index) == self.default_index {
                '*'
            } else {
                ' '
            };

            writeln!(f, "{} {:>2}  {} [{}]", marker, index, set.name, set.compiler_type())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::{
        error::ProbeError,
        probe::{FakeRunner, DEFAULT_PROBE_TIMEOUT},
        registry,
        store::MemoryStore,
    };

    const GCC_V: &str = "Using built-in specs.
COLLECT_GCC=gcc
Target: x86_64-linux-gnu
gcc version 13.2.0 (Ubuntu 13.2.0-4ubuntu3)";

    const TDM_V: &str = "Using built-in specs.
COLLECT_GCC=gcc
Target: x86_64-w64-mingw32
gcc version 10.3.0 (tdm64-1)";

    fn collection() -> CompilerSetCollection {
        CompilerSetCollection::new(registry::global(), AppPath::new("/opt/ide", false))
    }

    fn gcc_runner<'a>(banner: &'static str) -> FakeRunner<'a> {
        FakeRunner::new().on_run(move |_, args| match args.first().map(String::as_str) {
            Some("-v") => Ok(banner.to_owned()),
            Some("-dumpmachine") => Ok("x86_64-linux-gnu\n".to_owned()),
            _ => Err(ProbeError::Unrecognized {
                program: "gcc".to_owned(),
            }),
        })
    }

    /// A `<root>/bin` holding an executable `gcc`.
    struct BinDir {
        _root: tempfile::TempDir,
        bin: PathBuf,
    }

    impl BinDir {
        fn path(&self) -> &Path {
            &self.bin
        }
    }

    fn bin_dir() -> BinDir {
        let root = tempfile::tempdir().unwrap();
        let bin = utils::absolutize(&root.path().join("bin"));
        fs::create_dir(&bin).unwrap();

        let gcc = bin.join(utils::program_name("gcc"));
        fs::write(&gcc, "").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&gcc, fs::Permissions::from_mode(0o755)).unwrap();
        }

        BinDir { _root: root, bin }
    }

    #[test]
    fn gcc_profiles() {
        let dir = bin_dir();
        let runner = gcc_runner(GCC_V);
        let prober = Prober::new(&runner, DEFAULT_PROBE_TIMEOUT);
        let mut sets = collection();

        assert!(sets.add_sets(&prober, dir.path(), &utils::program_name("gcc")));

        let names = sets.sets().iter().map(|set| set.name.as_str()).collect::<Vec<_>>();
        let release = &sets.sets()[0];
        assert!(names[0].ends_with(" 64-bit Release"));
        assert!(names[1].ends_with(" 64-bit Debug"));
        assert_eq!(release.compile_option(CC_CMD_OPT_OPTIMIZE), Some("2"));
        assert!(release.static_link);
        assert!(!sets.sets()[1].static_link);
        assert_eq!(sets.sets()[1].compile_option(CC_CMD_OPT_DEBUG_INFO), Some(OPTION_ON));

        if cfg!(target_os = "linux") {
            assert_eq!(names.len(), 3);
            assert!(names[2].ends_with(" 64-bit Debug with ASan"));
            assert!(sets.sets()[2]
                .compile_option(CC_CMD_OPT_ADDRESS_SANITIZER)
                .is_some());
        } else {
            assert_eq!(names.len(), 2);
        }
        assert!(sets.default_set().is_some());
    }

    #[test]
    fn same_compiler_is_added_once() {
        let dir = bin_dir();
        let runner = gcc_runner(GCC_V);
        let prober = Prober::new(&runner, DEFAULT_PROBE_TIMEOUT);
        let mut sets = collection();
        let folder = dir.path();
        let exe = utils::program_name("gcc");

        assert!(sets.add_sets(&prober, folder, &exe));
        assert_eq!(sets.sets()[0].bin_dirs[0], folder);
        let count = sets.len();
        let probes = runner.calls.borrow().len();

        assert!(!sets.add_sets(&prober, folder, &exe));
        assert_eq!(sets.len(), count);
        assert_eq!(runner.calls.borrow().len(), probes);
    }

    #[test]
    fn tdm_gets_32bit_profiles() {
        let dir = bin_dir();
        let runner = gcc_runner(TDM_V);
        let prober = Prober::new(&runner, DEFAULT_PROBE_TIMEOUT);
        let mut sets = collection();

        sets.add_sets(&prober, dir.path(), &utils::program_name("gcc"));

        let release32 = &sets.sets()[1];
        assert!(release32.name.starts_with("TDM-GCC "));
        assert!(release32.name.ends_with(" 32-bit Release"));
        assert_eq!(release32.compile_option(CC_CMD_OPT_POINTER_SIZE), Some("32"));
        assert!(sets.sets()[2].name.ends_with(" 32-bit Debug"));
    }

    #[test]
    fn unrecognized_compiler_adds_nothing() {
        let dir = bin_dir();
        let runner = FakeRunner::new().on_run(|_, _| Ok("not a compiler".to_owned()));
        let prober = Prober::new(&runner, DEFAULT_PROBE_TIMEOUT);
        let mut sets = collection();

        assert!(!sets.add_sets_for_dir(&prober, &dir.path().join("nope")));
        sets.add_sets_for_dir(&prober, dir.path());

        assert!(sets.is_empty());
        assert_eq!(sets.default_index(), None);
    }

    #[test]
    fn clear_keeps_persisted_sets() {
        let mut sets = collection();
        let mut kept = CompilerSet::new(registry::global());
        kept.name = "kept".to_owned();
        kept.persist_in_auto_find = true;
        sets.add_set(kept);
        sets.add_set(CompilerSet::new(registry::global()));
        sets.set_default_index(Some(1));

        let persisted = sets.clear_sets();

        assert!(sets.is_empty());
        assert_eq!(sets.default_index(), None);
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].name, "kept");
    }

    fn named(name: &str) -> CompilerSet {
        let mut set = CompilerSet::new(registry::global());
        set.set_compiler_type(CompilerType::Gcc);
        set.name = name.to_owned();
        set
    }

    #[test]
    fn save_load_and_delete() {
        let mut store = MemoryStore::new();
        let mut sets = collection();
        for name in ["a", "b", "c"] {
            sets.add_set(named(name));
        }
        sets.set_default_index(Some(2));
        sets.save_sets(&mut store).unwrap();

        let mut loaded = collection();
        loaded.load_sets(&store);
        assert_eq!(loaded.sets(), sets.sets());
        assert_eq!(loaded.default_index(), Some(2));

        loaded.delete_set(&mut store, 0).unwrap();
        assert_eq!(loaded.default_index(), Some(1));
        assert_eq!(store.int("CompilerSets", "count"), Some(2));
        assert!(!store.has_group("CompilerSet_2"));
        assert_eq!(store.string("CompilerSet_0", "Name").as_deref(), Some("b"));

        assert!(loaded.delete_set(&mut store, 5).is_err());
    }

    #[test]
    fn default_index_is_clamped_on_load() {
        let mut store = MemoryStore::new();
        let mut sets = collection();
        sets.add_set(named("only"));
        sets.save_sets(&mut store).unwrap();
        store.set_value("CompilerSets", "defaultIndex", json!(7));
        store.set_value("CompilerSets", "defaultIndexTimestamp", json!(i64::MAX));

        let mut loaded = collection();
        loaded.load_sets(&store);

        assert_eq!(loaded.default_index(), Some(0));
        assert!(loaded.default_index_timestamp() <= now_millis());

        loaded.load_sets(&MemoryStore::new());
        assert_eq!(loaded.default_index(), None);
        assert!(loaded.default_set().is_none());
    }

    #[test]
    fn broken_set_is_dropped_alone() {
        let mut store = MemoryStore::new();
        let mut sets = collection();
        sets.add_set(named("a"));
        sets.add_set(named("b"));
        sets.save_sets(&mut store).unwrap();
        store.remove_group("CompilerSet_0");

        let mut loaded = collection();
        loaded.load_sets(&store);

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.sets()[0].name, "b");
    }

    #[test]
    fn listing_marks_the_default() {
        let mut sets = collection();
        sets.add_set(named("a"));
        sets.add_set(named("b"));
        sets.set_default_index(Some(1));

        assert_eq!(sets.to_string(), "   0  a [GCC]\n*  1  b [GCC]\n");
    }
}
