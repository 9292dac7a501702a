//! A configured compiler installation.

mod json;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use derivative::Derivative;
use log::debug;

use crate::{
    error::ProbeError,
    family::{
        CompilerType, CC_CMD_OPT_DEBUG_INFO, CC_CMD_OPT_STD, C_CMD_OPT_STD, SDCC_CMD_OPT_PROCESSOR,
        SDCC_CMD_OPT_STD,
    },
    filter::CompilerIdentity,
    probe::{self, Prober},
    registry::FamilyRegistry,
    schema::{OptionKind, OptionTarget, OPTION_ON},
    utils::{self, NULL_FILE},
};

pub use json::{json_option_name, JSON_OPTION_NAMES};

/// Charset marker meaning "let the compiler pick".
pub const ENCODING_SYSTEM_DEFAULT: &str = "SYSTEM";
pub const ENCODING_UTF8: &str = "UTF-8";

pub const DEFAULT_PREPROCESSING_SUFFIX: &str = "i";
pub const DEFAULT_COMPILATION_SUFFIX: &str = "s";
pub const DEFAULT_ASSEMBLING_SUFFIX: &str = "o";
pub const DEFAULT_EXECUTABLE_SUFFIX: &str = if cfg!(windows) { "exe" } else { "" };
pub const SDCC_HEX_SUFFIX: &str = "hex";

/// How far a build goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompilationStage {
    PreprocessingOnly,
    CompilationProperOnly,
    AssemblingOnly,
    GenerateExecutable,
}

impl Default for CompilationStage {
    fn default() -> Self {
        CompilationStage::GenerateExecutable
    }
}

impl CompilationStage {
    pub fn code(self) -> i64 {
        match self {
            CompilationStage::PreprocessingOnly => 0,
            CompilationStage::CompilationProperOnly => 1,
            CompilationStage::AssemblingOnly => 2,
            CompilationStage::GenerateExecutable => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<CompilationStage> {
        match code {
            0 => Some(CompilationStage::PreprocessingOnly),
            1 => Some(CompilationStage::CompilationProperOnly),
            2 => Some(CompilationStage::AssemblingOnly),
            3 => Some(CompilationStage::GenerateExecutable),
            _ => None,
        }
    }

    pub fn is_output_executable(self) -> bool {
        self == CompilationStage::GenerateExecutable
    }
}

impl Display for CompilationStage {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let name = match self {
            CompilationStage::PreprocessingOnly => "preprocessing only",
            CompilationStage::CompilationProperOnly => "compilation proper only",
            CompilationStage::AssemblingOnly => "assembling only",
            CompilationStage::GenerateExecutable => "generate executable",
        };

        f.write_str(name)
    }
}

/// Output file extensions, one per stage.
#[derive(Clone, Debug, PartialEq, Eq, Derivative)]
#[derivative(Default)]
pub struct Suffixes {
    #[derivative(Default(value = "DEFAULT_PREPROCESSING_SUFFIX.to_owned()"))]
    pub preprocessing: String,
    #[derivative(Default(value = "DEFAULT_COMPILATION_SUFFIX.to_owned()"))]
    pub compilation_proper: String,
    #[derivative(Default(value = "DEFAULT_ASSEMBLING_SUFFIX.to_owned()"))]
    pub assembling: String,
    #[derivative(Default(value = "DEFAULT_EXECUTABLE_SUFFIX.to_owned()"))]
    pub executable: String,
}

impl Suffixes {
    pub fn for_stage(&self, stage: CompilationStage) -> &str {
        match stage {
            CompilationStage::PreprocessingOnly => &self.preprocessing,
            CompilationStage::CompilationProperOnly => &self.compilation_proper,
            CompilationStage::AssemblingOnly => &self.assembling,
            CompilationStage::GenerateExecutable => &self.executable,
        }
    }
}

/// One toolchain installation together with the user's choices for it.
///
/// User directories (`c_include_dirs`, ...) and detected ones
/// (`default_c_include_dirs`, ...) are kept apart so a re-detection never
/// touches what the user typed. Option values only enter the map through
/// [`CompilerSet::set_compile_option`] and friends, which check the key
/// against the catalog of the set's family.
#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct CompilerSet {
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    registry: Arc<FamilyRegistry>,

    c_compiler: Option<PathBuf>,
    pub cpp_compiler: Option<PathBuf>,
    pub debugger: Option<PathBuf>,
    pub debug_server: Option<PathBuf>,
    pub make: Option<PathBuf>,
    pub resource_compiler: Option<PathBuf>,

    pub bin_dirs: Vec<PathBuf>,
    pub c_include_dirs: Vec<PathBuf>,
    pub cpp_include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    pub default_c_include_dirs: Vec<PathBuf>,
    pub default_cpp_include_dirs: Vec<PathBuf>,
    pub default_lib_dirs: Vec<PathBuf>,

    pub dump_machine: String,
    pub version: String,
    /// Distribution label, e.g. `Rev3, Built by MSYS2 project`.
    pub vendor: String,
    pub name: String,
    pub target: String,
    compiler_type: CompilerType,

    pub use_custom_compile_params: bool,
    pub custom_compile_params: Vec<String>,
    pub use_custom_link_params: bool,
    pub custom_link_params: Vec<String>,
    pub auto_add_charset_params: bool,
    pub exec_charset: String,
    pub static_link: bool,
    /// Survives a re-run of the discovery.
    pub persist_in_auto_find: bool,
    pub force_english_output: bool,

    pub suffixes: Suffixes,
    pub compilation_stage: CompilationStage,

    compile_options: BTreeMap<String, String>,
}

impl CompilerSet {
    /// An empty set of unknown type.
    pub fn new(registry: Arc<FamilyRegistry>) -> CompilerSet {
        CompilerSet {
            registry,
            c_compiler: None,
            cpp_compiler: None,
            debugger: None,
            debug_server: None,
            make: None,
            resource_compiler: None,
            bin_dirs: Vec::new(),
            c_include_dirs: Vec::new(),
            cpp_include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
            default_c_include_dirs: Vec::new(),
            default_cpp_include_dirs: Vec::new(),
            default_lib_dirs: Vec::new(),
            dump_machine: String::new(),
            version: String::new(),
            vendor: String::new(),
            name: String::new(),
            target: String::new(),
            compiler_type: CompilerType::Unknown,
            use_custom_compile_params: false,
            custom_compile_params: Vec::new(),
            use_custom_link_params: false,
            custom_link_params: Vec::new(),
            auto_add_charset_params: false,
            exec_charset: ENCODING_SYSTEM_DEFAULT.to_owned(),
            static_link: false,
            persist_in_auto_find: false,
            force_english_output: false,
            suffixes: Suffixes::default(),
            compilation_stage: CompilationStage::default(),
            compile_options: BTreeMap::new(),
        }
    }

    /// Probes `exe` in `bin_dir` and builds a set out of what it reports.
    pub fn detect(
        prober: &Prober,
        registry: Arc<FamilyRegistry>,
        bin_dir: &Path,
        exe: &str,
    ) -> Result<CompilerSet, ProbeError> {
        let facts = prober.probe(bin_dir, exe)?;
        if facts.name.is_empty() {
            return Err(ProbeError::Unrecognized {
                program: exe.to_owned(),
            });
        }

        let mut set = CompilerSet::new(registry);
        set.compiler_type = facts.compiler_type;
        set.target = facts.target;
        set.dump_machine = facts.dump_machine;
        set.version = facts.version;
        set.vendor = facts.vendor;
        set.name = facts.name;
        set.bin_dirs = facts.bin_dirs;
        set.default_c_include_dirs = facts.default_c_include_dirs;
        set.default_cpp_include_dirs = facts.default_cpp_include_dirs;
        set.default_lib_dirs = facts.default_lib_dirs;

        set.set_executables();
        set.set_user_input();
        if set.compiler_type == CompilerType::Sdcc {
            set.suffixes.executable = SDCC_HEX_SUFFIX.to_owned();
        }

        Ok(set)
    }

    fn set_executables(&mut self) {
        let find = |name: &str| self.find_program_in_bin_dirs(name);

        let (c, cpp, debugger, debug_server) = match self.compiler_type {
            CompilerType::Clang => {
                let c = find("clang").or_else(|| find("gcc"));
                let cpp = find("clang++").or_else(|| find("g++"));

                match find("gdb") {
                    Some(gdb) => (c, cpp, Some(gdb), find("gdbserver")),
                    None => (c, cpp, find("lldb-mi"), find("lldb-server")),
                }
            }
            CompilerType::Sdcc => (find("sdcc"), None, None, None),
            _ => (find("gcc"), find("g++"), find("gdb"), find("gdbserver")),
        };

        let make = find(if cfg!(windows) { "mingw32-make" } else { "make" });
        let resource_compiler = find("windres");

        self.c_compiler = c;
        self.cpp_compiler = cpp;
        self.debugger = debugger;
        self.debug_server = debug_server;
        self.make = make;
        self.resource_compiler = resource_compiler;
    }

    fn set_user_input(&mut self) {
        let charset_and_static = self.compiler_type != CompilerType::Sdcc;

        self.use_custom_compile_params = false;
        self.use_custom_link_params = false;
        self.auto_add_charset_params = charset_and_static;
        self.static_link = charset_and_static;
    }

    pub fn registry(&self) -> &Arc<FamilyRegistry> {
        &self.registry
    }

    pub fn compiler_type(&self) -> CompilerType {
        self.compiler_type
    }

    /// Changes the type, dropping the option values the new family does
    /// not know.
    pub fn set_compiler_type(&mut self, compiler_type: CompilerType) {
        self.compiler_type = compiler_type;

        let driver = compiler_type.driver();
        let registry = &self.registry;
        self.compile_options
            .retain(|key, _| registry.has_option(driver, key));
    }

    pub fn c_compiler(&self) -> Option<&Path> {
        self.c_compiler.as_deref()
    }

    /// Sets the C compiler path, guessing the type from the file name when
    /// it is still unknown.
    pub fn set_c_compiler(&mut self, path: Option<PathBuf>) {
        if self.c_compiler == path {
            return;
        }
        self.c_compiler = path;

        if self.compiler_type != CompilerType::Unknown {
            return;
        }

        let file_name = self
            .c_compiler
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());

        if file_name.as_deref() == Some(utils::program_name("clang").as_str()) {
            self.set_compiler_type(CompilerType::Clang);
        } else if file_name.as_deref() == Some(utils::program_name("gcc").as_str()) {
            self.set_compiler_type(CompilerType::Gcc);
        }
    }

    pub fn identity(&self) -> CompilerIdentity {
        CompilerIdentity::new(self.compiler_type.driver(), &self.version)
    }

    /// Major version number, `-1` when unknown.
    pub fn main_version(&self) -> i32 {
        if !self.version.contains('.') {
            return -1;
        }

        probe::major_version(&self.version)
    }

    /// Stores `value` for `key`. Returns `false`, storing nothing, when the
    /// family of this set has no such option.
    pub fn set_compile_option(&mut self, key: &str, value: impl Into<String>) -> bool {
        if !self.registry.has_option(self.compiler_type.driver(), key) {
            debug!("`{}` has no option `{}`", self.compiler_type, key);
            return false;
        }

        self.compile_options.insert(key.to_owned(), value.into());
        true
    }

    /// Selects a value by its 1-based position among the option's choices.
    ///
    /// For an option without choices `1` means on and anything else off.
    /// Out of range positions unset the option.
    pub fn set_compile_option_index(&mut self, key: &str, index: i32) -> bool {
        let option = match self.registry.get_option(self.compiler_type.driver(), key) {
            Some(option) => option,
            None => return false,
        };

        let value = if option.choices.is_empty() {
            (index == 1).then(|| OPTION_ON.to_owned())
        } else {
            usize::try_from(index)
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|index| option.choices.get(index))
                .map(|choice| choice.value.clone())
        };

        match value {
            Some(value) => self.compile_options.insert(key.to_owned(), value),
            None => self.compile_options.remove(key),
        };

        true
    }

    pub fn unset_compile_option(&mut self, key: &str) {
        self.compile_options.remove(key);
    }

    pub fn compile_option(&self, key: &str) -> Option<&str> {
        self.compile_options.get(key).map(String::as_str)
    }

    pub fn compile_options(&self) -> &BTreeMap<String, String> {
        &self.compile_options
    }

    /// Replaces every option value, skipping keys the family does not know.
    pub fn set_compile_options(&mut self, options: BTreeMap<String, String>) {
        self.compile_options.clear();

        for (key, value) in options {
            self.set_compile_option(&key, value);
        }
    }

    pub fn reset_compile_options(&mut self) {
        self.compile_options.clear();
    }

    /// Renders the selected options passed to `target`, followed by the
    /// custom parameters of that tool.
    pub fn compile_arguments(&self, target: OptionTarget) -> Vec<String> {
        let identity = self.identity();

        let mut args = self
            .registry
            .option_list(self.compiler_type.driver())
            .iter()
            .filter(|option| option.applies_to.contains(target))
            .filter(|option| option.is_available(&identity))
            .filter_map(|option| {
                let value = self.compile_options.get(&option.key)?;
                Some(option.render_argument(value))
            })
            .flatten()
            .collect::<Vec<_>>();

        let custom = match target {
            OptionTarget::Linker if self.use_custom_link_params => &self.custom_link_params,
            OptionTarget::CCompiler | OptionTarget::CppCompiler if self.use_custom_compile_params => {
                &self.custom_compile_params
            }
            _ => return args,
        };

        args.extend(custom.iter().cloned());
        args
    }

    pub fn output_filename(&self, source: &Path) -> PathBuf {
        self.output_filename_for_stage(source, self.compilation_stage)
    }

    pub fn output_filename_for_stage(&self, source: &Path, stage: CompilationStage) -> PathBuf {
        utils::change_file_ext(source, self.suffixes.for_stage(stage))
    }

    pub fn is_output_executable(&self) -> bool {
        self.compilation_stage.is_output_executable()
    }

    /// Asks the C compiler for the macros it predefines under the current
    /// settings.
    pub fn defines(&self, prober: &Prober, is_cpp: bool) -> Result<Vec<String>, ProbeError> {
        let c_compiler = self
            .c_compiler
            .as_deref()
            .ok_or_else(|| ProbeError::MissingExecutable {
                program: format!("C compiler of `{}`", self.name),
            })?;

        let dir = utils::absolutize(c_compiler.parent().unwrap_or_else(|| Path::new(".")));
        let program = c_compiler
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let args = self.defines_arguments(is_cpp);
        let args = args.iter().map(String::as_str).collect::<Vec<_>>();
        let output = prober.output(&dir, &program, &args)?;

        Ok(if self.compiler_type == CompilerType::Sdcc {
            parse_sdcc_defines(&output)
        } else {
            parse_gcc_defines(&output)
        })
    }

    fn defines_arguments(&self, is_cpp: bool) -> Vec<String> {
        let driver = self.compiler_type.driver();
        let mut args = vec!["-dM".to_owned(), "-E".to_owned(), "-x".to_owned()];

        let selected = |key: &str| -> Option<String> {
            let option = self.registry.get_option(driver, key)?;
            let value = self.compile_options.get(key).filter(|v| !v.is_empty())?;
            Some(format!("{}{}", option.setting, value))
        };

        if self.compiler_type == CompilerType::Sdcc {
            args.extend(["c".to_owned(), "-V".to_owned()]);
            args.extend(selected(SDCC_CMD_OPT_PROCESSOR));
            args.extend(selected(SDCC_CMD_OPT_STD));
        } else {
            let (lang, std_key) = if is_cpp {
                ("c++", CC_CMD_OPT_STD)
            } else {
                ("c", C_CMD_OPT_STD)
            };
            args.push(lang.to_owned());
            args.extend(selected(std_key));

            if self.compile_options.contains_key(CC_CMD_OPT_DEBUG_INFO) {
                if let Some(option) = self.registry.get_option(driver, CC_CMD_OPT_DEBUG_INFO) {
                    args.push(option.setting.clone());
                }
            }
        }

        if self.use_custom_compile_params {
            args.extend(self.custom_compile_params.iter().cloned());
        }
        if args.iter().any(|arg| arg == "-g3") {
            args.push("-D_DEBUG".to_owned());
        }
        args.push(NULL_FILE.to_owned());

        args
    }

    /// Looks `name` up in the bin dirs, returning the first executable hit.
    pub fn find_program_in_bin_dirs(&self, name: &str) -> Option<PathBuf> {
        let file_name = utils::program_name(name);

        self.bin_dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|path| utils::is_executable(path))
            .map(|path| utils::absolutize(&path))
    }

    pub fn can_compile_c(&self) -> bool {
        exists(&self.c_compiler)
    }

    pub fn can_compile_cpp(&self) -> bool {
        self.compiler_type != CompilerType::Sdcc && exists(&self.cpp_compiler)
    }

    pub fn can_make(&self) -> bool {
        exists(&self.make)
    }

    pub fn can_debug(&self) -> bool {
        self.compiler_type != CompilerType::Sdcc && exists(&self.debugger)
    }

    /// Whether the debug info and diagnostics this compiler emits are UTF-8.
    pub fn is_debug_info_using_utf8(&self) -> bool {
        match self.compiler_type {
            CompilerType::Clang | CompilerType::GccUtf8 => true,
            // Assumes Windows 10 or later.
            CompilerType::Gcc => cfg!(windows) && self.main_version() >= 13,
            _ => false,
        }
    }

    pub fn force_utf8(&self) -> bool {
        self.compiler_type.capabilities().utf8_in_debugger
    }

    pub fn needs_default_dirs(&self) -> bool {
        self.compiler_type != CompilerType::Unknown
            && !self.bin_dirs.is_empty()
            && self.default_c_include_dirs.is_empty()
            && self.default_cpp_include_dirs.is_empty()
            && self.default_lib_dirs.is_empty()
    }

    /// Fills the detected directories of a set created without probing,
    /// such as one handed over by a hint script.
    pub fn ensure_default_dirs(&mut self, prober: &Prober) -> Result<(), ProbeError> {
        if !self.needs_default_dirs() {
            return Ok(());
        }

        let bin_dir = self.bin_dirs[0].clone();
        let exe = self
            .c_compiler
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| match self.compiler_type {
                CompilerType::Clang => utils::program_name("clang"),
                CompilerType::Sdcc => utils::program_name("sdcc"),
                _ => utils::program_name("gcc"),
            });

        let facts = prober.probe(&bin_dir, &exe)?;
        self.default_c_include_dirs = facts.default_c_include_dirs;
        self.default_cpp_include_dirs = facts.default_cpp_include_dirs;
        self.default_lib_dirs = facts.default_lib_dirs;

        Ok(())
    }

    /// Whether the option's value is the "on" marker or a real choice.
    pub fn is_option_set(&self, key: &str) -> bool {
        let driver = self.compiler_type.driver();

        match (self.registry.get_option(driver, key), self.compile_option(key)) {
            (Some(option), Some(value)) if option.kind == OptionKind::Boolean => value == OPTION_ON,
            (Some(_), Some(value)) => !value.is_empty(),
            _ => false,
        }
    }
}

fn exists(path: &Option<PathBuf>) -> bool {
    path.as_deref().map_or(false, Path::is_file)
}

/// Keeps the non-blank lines of a `-dM -E` run.
pub fn parse_gcc_defines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Rebuilds `#define` lines from the `-D` flags SDCC echoes on its
/// `+ <preprocessor command>` line under `-V`.
pub fn parse_sdcc_defines(output: &str) -> Vec<String> {
    let command = match output.lines().find(|line| line.trim().starts_with('+')) {
        Some(line) => line,
        None => return Vec::new(),
    };

    command
        .split(' ')
        .map(str::trim)
        .filter_map(|token| token.strip_prefix("-D"))
        .map(|define| match define.split_once('=') {
            Some((name, value)) => format!("#define {} {}", name, value),
            None => format!("#define {}", define),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{
        family::{
            CC_CMD_OPT_ADDRESS_SANITIZER, CC_CMD_OPT_OPTIMIZE, CC_CMD_OPT_WARNING_ALL,
            LINK_CMD_OPT_STRIP_EXE, SDCC_OPT_NOSTARTUP,
        },
        probe::{FakeRunner, DEFAULT_PROBE_TIMEOUT},
        registry,
    };

    fn gcc_set() -> CompilerSet {
        let mut set = CompilerSet::new(registry::global());
        set.set_compiler_type(CompilerType::Gcc);
        set.version = "13.2.0".to_owned();
        set.name = "GCC 13.2.0".to_owned();
        set
    }

    mod options {
        use super::*;

        #[test]
        fn unknown_keys_are_rejected() {
            let mut set = gcc_set();

            assert!(!set.set_compile_option("no_such_option", "on"));
            assert!(!set.set_compile_option(SDCC_OPT_NOSTARTUP, OPTION_ON));
            assert!(set.compile_options().is_empty());
        }

        #[test]
        fn unknown_type_accepts_nothing() {
            let mut set = CompilerSet::new(registry::global());

            assert!(!set.set_compile_option(CC_CMD_OPT_OPTIMIZE, "2"));
        }

        #[test]
        fn index_selects_choice() {
            let mut set = gcc_set();
            let first = registry::global()
                .get_option(CompilerType::Gcc.driver(), CC_CMD_OPT_OPTIMIZE)
                .unwrap()
                .choices[0]
                .value
                .clone();

            assert!(set.set_compile_option_index(CC_CMD_OPT_OPTIMIZE, 1));
            assert_eq!(set.compile_option(CC_CMD_OPT_OPTIMIZE), Some(first.as_str()));

            assert!(set.set_compile_option_index(CC_CMD_OPT_OPTIMIZE, 0));
            assert_eq!(set.compile_option(CC_CMD_OPT_OPTIMIZE), None);

            assert!(set.set_compile_option_index(CC_CMD_OPT_OPTIMIZE, 1000));
            assert_eq!(set.compile_option(CC_CMD_OPT_OPTIMIZE), None);
        }

        #[test]
        fn index_on_boolean() {
            let mut set = gcc_set();

            set.set_compile_option_index(CC_CMD_OPT_WARNING_ALL, 1);
            assert_eq!(set.compile_option(CC_CMD_OPT_WARNING_ALL), Some(OPTION_ON));

            set.set_compile_option_index(CC_CMD_OPT_WARNING_ALL, 2);
            assert_eq!(set.compile_option(CC_CMD_OPT_WARNING_ALL), None);
        }

        #[test]
        fn changing_family_drops_foreign_values() {
            let mut set = gcc_set();
            set.set_compile_option(CC_CMD_OPT_OPTIMIZE, "2");

            set.set_compiler_type(CompilerType::Clang);
            assert_eq!(set.compile_option(CC_CMD_OPT_OPTIMIZE), Some("2"));

            set.set_compiler_type(CompilerType::Sdcc);
            assert!(set.compile_options().is_empty());
        }

        #[test]
        fn bulk_replace_skips_unknown_keys() {
            let mut set = gcc_set();

            set.set_compile_options(BTreeMap::from([
                (CC_CMD_OPT_OPTIMIZE.to_owned(), "s".to_owned()),
                ("stale_key".to_owned(), "1".to_owned()),
            ]));

            assert_eq!(
                set.compile_options().keys().collect::<Vec<_>>(),
                [CC_CMD_OPT_OPTIMIZE]
            );
        }

        #[test]
        fn arguments_follow_catalog_order() {
            let mut set = gcc_set();
            set.set_compile_option(CC_CMD_OPT_WARNING_ALL, OPTION_ON);
            set.set_compile_option(CC_CMD_OPT_OPTIMIZE, "2");
            set.set_compile_option(LINK_CMD_OPT_STRIP_EXE, OPTION_ON);
            set.use_custom_compile_params = true;
            set.custom_compile_params = vec!["-DFOO".to_owned()];

            assert_eq!(
                set.compile_arguments(OptionTarget::CCompiler),
                ["-O2", "-Wall", "-DFOO"]
            );
            assert_eq!(set.compile_arguments(OptionTarget::Linker), ["-s"]);
        }

        #[test]
        fn sanitizer_is_an_option_value() {
            let mut set = gcc_set();

            assert!(set.set_compile_option(CC_CMD_OPT_ADDRESS_SANITIZER, "address"));
            assert!(set.is_option_set(CC_CMD_OPT_ADDRESS_SANITIZER));
        }
    }

    #[test]
    fn output_filenames() {
        let mut set = gcc_set();
        let source = Path::new("/work/main.c");

        assert_eq!(
            set.output_filename_for_stage(source, CompilationStage::PreprocessingOnly),
            Path::new("/work/main.i")
        );
        assert_eq!(
            set.output_filename_for_stage(source, CompilationStage::AssemblingOnly),
            Path::new("/work/main.o")
        );

        set.suffixes.executable = SDCC_HEX_SUFFIX.to_owned();
        assert_eq!(set.output_filename(source), Path::new("/work/main.hex"));
        assert!(set.is_output_executable());

        set.compilation_stage = CompilationStage::CompilationProperOnly;
        assert_eq!(set.output_filename(source), Path::new("/work/main.s"));
        assert!(!set.is_output_executable());
    }

    #[test]
    fn main_version_needs_a_dot() {
        let mut set = gcc_set();
        assert_eq!(set.main_version(), 13);

        set.version = "13".to_owned();
        assert_eq!(set.main_version(), -1);

        set.version = "x.1".to_owned();
        assert_eq!(set.main_version(), -1);
    }

    #[test]
    fn c_compiler_name_infers_type() {
        let mut set = CompilerSet::new(registry::global());

        set.set_c_compiler(Some(PathBuf::from("/usr/bin").join(utils::program_name("clang"))));
        assert_eq!(set.compiler_type(), CompilerType::Clang);

        set.set_c_compiler(Some(PathBuf::from("/usr/bin").join(utils::program_name("gcc"))));
        assert_eq!(set.compiler_type(), CompilerType::Clang);
    }

    #[test]
    fn utf8_flags() {
        let mut set = gcc_set();
        assert!(!set.force_utf8());

        set.set_compiler_type(CompilerType::GccUtf8);
        assert!(set.force_utf8());
        assert!(set.is_debug_info_using_utf8());

        set.set_compiler_type(CompilerType::Sdcc);
        assert!(!set.is_debug_info_using_utf8());
    }

    mod defines {
        use super::*;

        #[test]
        fn gcc_arguments_carry_std_and_debug() {
            let mut set = gcc_set();
            set.set_compile_option(CC_CMD_OPT_STD, "c++17");
            set.set_compile_option(C_CMD_OPT_STD, "c11");
            set.set_compile_option(CC_CMD_OPT_DEBUG_INFO, OPTION_ON);

            assert_eq!(
                set.defines_arguments(true),
                ["-dM", "-E", "-x", "c++", "-std=c++17", "-g3", "-D_DEBUG", NULL_FILE]
            );
            assert_eq!(
                set.defines_arguments(false),
                ["-dM", "-E", "-x", "c", "-std=c11", "-g3", "-D_DEBUG", NULL_FILE]
            );
        }

        #[test]
        fn sdcc_arguments_carry_processor() {
            let mut set = CompilerSet::new(registry::global());
            set.set_compiler_type(CompilerType::Sdcc);
            set.set_compile_option(SDCC_CMD_OPT_PROCESSOR, "z80");

            assert_eq!(
                set.defines_arguments(false),
                ["-dM", "-E", "-x", "c", "-V", "-mz80", NULL_FILE]
            );
        }

        #[test]
        fn runs_the_c_compiler_from_its_dir() {
            let dir = tempfile::tempdir().unwrap();
            let gcc = dir.path().join(utils::program_name("gcc"));
            fs::write(&gcc, "").unwrap();

            let mut set = gcc_set();
            set.set_c_compiler(Some(gcc));

            let runner = FakeRunner::new()
                .on_run(|_, _| Ok("#define __GNUC__ 13\n\n#define __x86_64__ 1\n".to_owned()));
            let prober = Prober::new(&runner, DEFAULT_PROBE_TIMEOUT);

            let defines = set.defines(&prober, false).unwrap();

            assert_eq!(defines, ["#define __GNUC__ 13", "#define __x86_64__ 1"]);
            assert_eq!(runner.calls.borrow()[0].program, utils::program_name("gcc"));
        }

        #[test]
        fn sdcc_command_line_is_decoded() {
            let output = "sdcc: Calling preprocessor...
+ /usr/bin/sdcpp -nostdinc -Wall -std=c11 -DSDCC=4_2_0 -DSDCC_z80 -D__STDC_NO_COMPLEX__=1 -dM
sdcc: Generating code...";

            assert_eq!(
                parse_sdcc_defines(output),
                [
                    "#define SDCC 4_2_0",
                    "#define SDCC_z80",
                    "#define __STDC_NO_COMPLEX__ 1"
                ]
            );
            assert!(parse_sdcc_defines("no command line").is_empty());
        }

        #[test]
        fn missing_c_compiler() {
            let runner = FakeRunner::new();
            let prober = Prober::new(&runner, DEFAULT_PROBE_TIMEOUT);

            let err = gcc_set().defines(&prober, true).unwrap_err();
            assert!(matches!(err, ProbeError::MissingExecutable { .. }));
        }
    }
}
