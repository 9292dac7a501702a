use std::{fs, path::Path};

use compiler_sets::{
    collection::{AppPath, CompilerSetCollection},
    family::{CompilerType, CC_CMD_OPT_DEBUG_INFO, CC_CMD_OPT_USE_PIPE, CC_CMD_OPT_WARNING_ALL},
    registry,
    schema::OPTION_ON,
    CompilerSet, FileStore, SettingsStore,
};

fn portable(dir: &Path) -> CompilerSetCollection {
    CompilerSetCollection::new(registry::global(), AppPath::new(dir, true))
}

fn bundled_gcc(app_dir: &Path, name: &str) -> CompilerSet {
    let bin = app_dir.join("mingw64").join("bin");

    let mut set = CompilerSet::new(registry::global());
    set.set_compiler_type(CompilerType::Gcc);
    set.set_c_compiler(Some(bin.join("gcc")));
    set.cpp_compiler = Some(bin.join("g++"));
    set.make = Some(bin.join("mingw32-make"));
    set.debugger = Some(bin.join("gdb"));
    set.bin_dirs = vec![bin];
    set.c_include_dirs = vec![Path::new("/usr/local/include").to_path_buf()];
    set.name = name.to_owned();
    set.version = "13.2.0".to_owned();
    set.target = "x86_64".to_owned();
    set.dump_machine = "x86_64-w64-mingw32".to_owned();
    set.use_custom_compile_params = true;
    set.custom_compile_params = vec!["-fno-rtti".to_owned()];
    set.auto_add_charset_params = true;
    set.exec_charset = "UTF-8".to_owned();
    set.force_english_output = true;
    set.static_link = true;
    set.set_compile_option(CC_CMD_OPT_WARNING_ALL, OPTION_ON);
    set.set_compile_option(CC_CMD_OPT_DEBUG_INFO, OPTION_ON);
    set
}

fn round_trip(file_name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(file_name);
    let mut sets = portable(dir.path());
    sets.add_set(bundled_gcc(dir.path(), "Release"));
    sets.add_set(bundled_gcc(dir.path(), "Debug"));
    sets.set_default_index(Some(1));

    let mut store = FileStore::open(&path).unwrap();
    sets.save_sets(&mut store).unwrap();
    assert!(path.is_file());

    let store = FileStore::open(&path).unwrap();
    assert_eq!(
        store.string("CompilerSet_0", "ccompiler").as_deref(),
        Some("%AppPath%/mingw64/bin/gcc")
    );

    let mut loaded = portable(dir.path());
    loaded.load_sets(&store);

    assert_eq!(loaded.sets(), sets.sets());
    assert_eq!(loaded.default_index(), Some(1));
    assert_eq!(loaded.default_index_timestamp(), sets.default_index_timestamp());
}

#[test]
fn json_store_round_trip() {
    round_trip("compilers.json");
}

#[test]
fn toml_store_round_trip() {
    round_trip("compilers.toml");
}

#[test]
fn legacy_packed_options_are_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    fs::write(
        &path,
        r#"{
  "CompilerSets": { "count": 1, "defaultIndex": 0 },
  "CompilerSet_0": {
    "Name": "MinGW GCC 9.2.0",
    "ccompiler": "/opt/mingw/bin/gcc",
    "CompilerType": "GCC",
    "cc_cmd_opt_warning_all": "on",
    "Options": "111000b000000000000001001"
  }
}"#,
    )
    .unwrap();

    let store = FileStore::open(&path).unwrap();
    let mut sets = CompilerSetCollection::new(registry::global(), AppPath::new("/opt/ide", false));
    sets.load_sets(&store);

    let set = sets.default_set().unwrap();
    assert_eq!(set.compiler_type(), CompilerType::Gcc);
    assert_eq!(set.compile_option(CC_CMD_OPT_DEBUG_INFO), Some(OPTION_ON));
    assert_eq!(set.compile_option(CC_CMD_OPT_USE_PIPE), Some(OPTION_ON));
    assert_eq!(set.compile_option(CC_CMD_OPT_WARNING_ALL), None);
    assert!(set.auto_add_charset_params);
    assert!(set.force_english_output);
    assert_eq!(set.exec_charset, "SYSTEM");
}

#[test]
fn deleting_shifts_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sets.json");
    let mut sets = portable(dir.path());
    for name in ["a", "b", "c"] {
        sets.add_set(bundled_gcc(dir.path(), name));
    }
    sets.set_default_index(Some(2));

    let mut store = FileStore::open(&path).unwrap();
    sets.save_sets(&mut store).unwrap();
    sets.delete_set(&mut store, 1).unwrap();

    let store = FileStore::open(&path).unwrap();
    let mut loaded = portable(dir.path());
    loaded.load_sets(&store);

    let names = loaded
        .sets()
        .iter()
        .map(|set| set.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, ["a", "c"]);
    assert_eq!(loaded.default_index(), Some(1));
    assert!(!store.has_group("CompilerSet_2"));
}

#[test]
fn corrupt_store_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(FileStore::open(&path).is_err());
}
