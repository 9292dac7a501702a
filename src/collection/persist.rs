//! Layout of compiler sets inside a [`SettingsStore`].

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use itertools::Itertools;
use log::{debug, warn};
use serde_json::{json, Value};

use super::legacy::{self, LEGACY_OPTION_TABLE};
use crate::{
    compiler_set::{
        CompilationStage, CompilerSet, DEFAULT_ASSEMBLING_SUFFIX, DEFAULT_COMPILATION_SUFFIX,
        DEFAULT_EXECUTABLE_SUFFIX, DEFAULT_PREPROCESSING_SUFFIX, ENCODING_SYSTEM_DEFAULT,
    },
    family::CompilerType,
    registry::FamilyRegistry,
    store::SettingsStore,
    utils,
};

pub const SETS_GROUP: &str = "CompilerSets";
pub const DEFAULT_INDEX_KEY: &str = "defaultIndex";
pub const DEFAULT_INDEX_TIMESTAMP_KEY: &str = "defaultIndexTimestamp";
pub const COUNT_KEY: &str = "count";

/// Packed option string of older releases.
pub const LEGACY_OPTIONS_KEY: &str = "Options";

pub const APP_PATH_PREFIX: &str = "%AppPath%/";

pub fn set_group(index: usize) -> String {
    format!("CompilerSet_{}", index)
}

/// Rewrites paths below the application directory as `%AppPath%/...`.
///
/// Paths are only rewritten when saving for a portable installation, the
/// prefix is always expanded on load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppPath {
    dir: PathBuf,
    portable: bool,
}

impl AppPath {
    pub fn new(dir: impl Into<PathBuf>, portable: bool) -> AppPath {
        AppPath {
            dir: dir.into(),
            portable,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_portable(&self) -> bool {
        self.portable
    }

    pub fn encode(&self, path: &Path) -> String {
        if self.portable {
            if let Ok(rest) = path.strip_prefix(&self.dir) {
                let rest = rest
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .join("/");
                return format!("{}{}", APP_PATH_PREFIX, rest);
            }
        }

        path.display().to_string()
    }

    /// Expands the prefix and makes the result absolute. Empty strings
    /// decode to nothing.
    pub fn decode(&self, raw: &str) -> Option<PathBuf> {
        if raw.is_empty() {
            return None;
        }

        let path = match raw.strip_prefix(APP_PATH_PREFIX) {
            Some(rest) => self.dir.join(rest),
            None => PathBuf::from(raw),
        };

        Some(utils::absolutize(&path))
    }
}

fn save_path(store: &mut dyn SettingsStore, group: &str, key: &str, path: Option<&Path>, app: &AppPath) {
    let value = path.map(|path| app.encode(path)).unwrap_or_default();
    store.set_value(group, key, Value::String(value));
}

fn save_path_list(
    store: &mut dyn SettingsStore,
    group: &str,
    key: &str,
    paths: &[PathBuf],
    app: &AppPath,
) {
    let value = paths.iter().map(|path| app.encode(path)).collect::<Vec<_>>();
    store.set_value(group, key, json!(value));
}

fn load_path(store: &dyn SettingsStore, group: &str, key: &str, app: &AppPath) -> Option<PathBuf> {
    store
        .string(group, key)
        .and_then(|raw| app.decode(&raw))
}

fn load_path_list(store: &dyn SettingsStore, group: &str, key: &str, app: &AppPath) -> Vec<PathBuf> {
    store
        .string_list(group, key)
        .iter()
        .filter_map(|raw| app.decode(raw))
        .collect()
}

/// Writes `set` to group `index`, replacing whatever the group held.
pub fn save_set(store: &mut dyn SettingsStore, index: usize, set: &CompilerSet, app: &AppPath) {
    let group = set_group(index);
    store.remove_group(&group);

    save_path(store, &group, "ccompiler", set.c_compiler(), app);
    save_path(store, &group, "cppcompiler", set.cpp_compiler.as_deref(), app);
    save_path(store, &group, "debugger", set.debugger.as_deref(), app);
    save_path(store, &group, "debug_server", set.debug_server.as_deref(), app);
    save_path(store, &group, "make", set.make.as_deref(), app);
    save_path(store, &group, "windres", set.resource_compiler.as_deref(), app);

    for (key, value) in set.compile_options() {
        store.set_value(&group, key, Value::String(value.clone()));
    }

    store.set_value(&group, "useCustomCompileParams", json!(set.use_custom_compile_params));
    store.set_value(&group, "customCompileParams", json!(set.custom_compile_params));
    store.set_value(&group, "useCustomLinkParams", json!(set.use_custom_link_params));
    store.set_value(&group, "customLinkParams", json!(set.custom_link_params));
    store.set_value(&group, "AddCharset", json!(set.auto_add_charset_params));
    store.set_value(&group, "StaticLink", json!(set.static_link));
    store.set_value(&group, "ExecCharset", json!(set.exec_charset));
    store.set_value(&group, "PersistInAutoFind", json!(set.persist_in_auto_find));
    store.set_value(&group, "forceEnglishOutput", json!(set.force_english_output));

    store.set_value(&group, "preprocessingSuffix", json!(set.suffixes.preprocessing));
    store.set_value(&group, "compilationProperSuffix", json!(set.suffixes.compilation_proper));
    store.set_value(&group, "assemblingSuffix", json!(set.suffixes.assembling));
    store.set_value(&group, "executableSuffix", json!(set.suffixes.executable));
    store.set_value(&group, "compilationStage", json!(set.compilation_stage.code()));

    store.set_value(&group, "DumpMachine", json!(set.dump_machine));
    store.set_value(&group, "Version", json!(set.version));
    store.set_value(&group, "Type", json!(set.vendor));
    store.set_value(&group, "Name", json!(set.name));
    store.set_value(&group, "Target", json!(set.target));
    store.set_value(&group, "CompilerType", json!(set.compiler_type().code()));

    save_path_list(store, &group, "Bins", &set.bin_dirs, app);
    save_path_list(store, &group, "C", &set.c_include_dirs, app);
    save_path_list(store, &group, "Cpp", &set.cpp_include_dirs, app);
    save_path_list(store, &group, "Libs", &set.lib_dirs, app);
}

fn load_compiler_type(store: &dyn SettingsStore, group: &str) -> CompilerType {
    match store.value(group, "CompilerType") {
        Some(Value::String(name)) => CompilerType::from_name(&name)
            .or_else(|| name.trim().parse().ok().map(CompilerType::from_code))
            .unwrap_or_default(),
        Some(Value::Number(code)) => code.as_i64().map(CompilerType::from_code).unwrap_or_default(),
        _ => CompilerType::Unknown,
    }
}

/// Reads group `index` back, or `None` when the group is missing or holds
/// neither a compiler nor a name.
pub fn load_set(
    store: &dyn SettingsStore,
    index: usize,
    registry: &Arc<FamilyRegistry>,
    app: &AppPath,
) -> Option<CompilerSet> {
    let group = set_group(index);
    if !store.has_group(&group) {
        warn!("Compiler set #{} is missing from the settings", index);
        return None;
    }

    let mut set = CompilerSet::new(Arc::clone(registry));
    set.set_compiler_type(load_compiler_type(store, &group));
    set.set_c_compiler(load_path(store, &group, "ccompiler", app));
    set.cpp_compiler = load_path(store, &group, "cppcompiler", app);
    set.debugger = load_path(store, &group, "debugger", app);
    set.debug_server = load_path(store, &group, "debug_server", app);
    set.make = load_path(store, &group, "make", app);
    set.resource_compiler = load_path(store, &group, "windres", app);

    let string = |key: &str| store.string(&group, key).unwrap_or_default();
    set.dump_machine = string("DumpMachine");
    set.version = string("Version");
    set.vendor = string("Type");
    set.name = string("Name");
    set.target = string("Target");

    if set.c_compiler().is_none() && set.name.is_empty() {
        warn!("Dropping compiler set #{}: it has neither a compiler nor a name", index);
        return None;
    }

    let flag = |key: &str, default: bool| store.bool(&group, key).unwrap_or(default);
    set.use_custom_compile_params = flag("useCustomCompileParams", false);
    set.custom_compile_params = store.string_list(&group, "customCompileParams");
    set.use_custom_link_params = flag("useCustomLinkParams", false);
    set.custom_link_params = store.string_list(&group, "customLinkParams");
    set.auto_add_charset_params = flag("AddCharset", true);
    set.static_link = flag("StaticLink", false);
    set.persist_in_auto_find = flag("PersistInAutoFind", false);
    set.force_english_output = flag("forceEnglishOutput", true);

    set.exec_charset = store
        .string(&group, "ExecCharset")
        .filter(|charset| !charset.is_empty())
        .unwrap_or_else(|| ENCODING_SYSTEM_DEFAULT.to_owned());

    let suffix = |key: &str, default: &str| {
        store
            .string(&group, key)
            .unwrap_or_else(|| default.to_owned())
    };
    set.suffixes.preprocessing = suffix("preprocessingSuffix", DEFAULT_PREPROCESSING_SUFFIX);
    set.suffixes.compilation_proper = suffix("compilationProperSuffix", DEFAULT_COMPILATION_SUFFIX);
    set.suffixes.assembling = suffix("assemblingSuffix", DEFAULT_ASSEMBLING_SUFFIX);
    set.suffixes.executable = suffix("executableSuffix", DEFAULT_EXECUTABLE_SUFFIX);
    set.compilation_stage = store
        .int(&group, "compilationStage")
        .and_then(CompilationStage::from_code)
        .unwrap_or_default();

    let packed = string(LEGACY_OPTIONS_KEY);
    if !packed.is_empty() {
        debug!("Decoding legacy options of compiler set #{}", index);
        legacy::decode_options(&mut set, &packed, LEGACY_OPTION_TABLE);
    } else {
        let driver = set.compiler_type().driver();
        for key in store.keys(&group) {
            if !registry.has_option(driver, &key) {
                continue;
            }
            if let Some(value) = store.string(&group, &key) {
                set.set_compile_option(&key, value);
            }
        }
    }

    set.bin_dirs = load_path_list(store, &group, "Bins", app);
    set.c_include_dirs = load_path_list(store, &group, "C", app);
    set.cpp_include_dirs = load_path_list(store, &group, "Cpp", app);
    set.lib_dirs = load_path_list(store, &group, "Libs", app);

    Some(set)
}
