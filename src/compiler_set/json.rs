//! The JSON shape of a compiler set, shared by hint scripts and
//! import/export.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result as AnyResult};
use derivative::Derivative;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{
    CompilationStage, CompilerSet, DEFAULT_ASSEMBLING_SUFFIX, DEFAULT_COMPILATION_SUFFIX,
    DEFAULT_EXECUTABLE_SUFFIX, DEFAULT_PREPROCESSING_SUFFIX, ENCODING_UTF8,
};
use crate::{
    family::{
        CompilerType, CC_CMD_OPT_ABORT_ON_ERROR, CC_CMD_OPT_ADDRESS_SANITIZER,
        CC_CMD_OPT_CHECK_ISO_CONFORMANCE, CC_CMD_OPT_DEBUG_INFO, CC_CMD_OPT_INHIBIT_ALL_WARNING,
        CC_CMD_OPT_INSTRUCTION, CC_CMD_OPT_OPTIMIZE, CC_CMD_OPT_POINTER_SIZE,
        CC_CMD_OPT_PROFILE_INFO, CC_CMD_OPT_STACK_PROTECTOR, CC_CMD_OPT_STD,
        CC_CMD_OPT_SYNTAX_ONLY, CC_CMD_OPT_USE_PIPE, CC_CMD_OPT_WARNING_ALL,
        CC_CMD_OPT_WARNING_AS_ERROR, CC_CMD_OPT_WARNING_EXTRA, C_CMD_OPT_STD,
        LINK_CMD_OPT_NO_CONSOLE, LINK_CMD_OPT_NO_LINK_STDLIB, LINK_CMD_OPT_STRIP_EXE,
    },
    registry::FamilyRegistry,
};

/// Option keys and the camel-case field names they take in JSON.
pub const JSON_OPTION_NAMES: &[(&str, &str)] = &[
    (CC_CMD_OPT_OPTIMIZE, "ccCmdOptOptimize"),
    (CC_CMD_OPT_STD, "ccCmdOptStd"),
    (C_CMD_OPT_STD, "cCmdOptStd"),
    (CC_CMD_OPT_INSTRUCTION, "ccCmdOptInstruction"),
    (CC_CMD_OPT_POINTER_SIZE, "ccCmdOptPointerSize"),
    (CC_CMD_OPT_DEBUG_INFO, "ccCmdOptDebugInfo"),
    (CC_CMD_OPT_PROFILE_INFO, "ccCmdOptProfileInfo"),
    (CC_CMD_OPT_SYNTAX_ONLY, "ccCmdOptSyntaxOnly"),
    (CC_CMD_OPT_INHIBIT_ALL_WARNING, "ccCmdOptInhibitAllWarning"),
    (CC_CMD_OPT_WARNING_ALL, "ccCmdOptWarningAll"),
    (CC_CMD_OPT_WARNING_EXTRA, "ccCmdOptWarningExtra"),
    (CC_CMD_OPT_CHECK_ISO_CONFORMANCE, "ccCmdOptCheckIsoConformance"),
    (CC_CMD_OPT_WARNING_AS_ERROR, "ccCmdOptWarningAsError"),
    (CC_CMD_OPT_ABORT_ON_ERROR, "ccCmdOptAbortOnError"),
    (CC_CMD_OPT_STACK_PROTECTOR, "ccCmdOptStackProtector"),
    (CC_CMD_OPT_ADDRESS_SANITIZER, "ccCmdOptAddressSanitizer"),
    (CC_CMD_OPT_USE_PIPE, "ccCmdOptUsePipe"),
    (LINK_CMD_OPT_NO_LINK_STDLIB, "linkCmdOptNoLinkStdlib"),
    (LINK_CMD_OPT_NO_CONSOLE, "linkCmdOptNoConsole"),
    (LINK_CMD_OPT_STRIP_EXE, "linkCmdOptStripExe"),
];

pub fn json_option_name(key: &str) -> Option<&'static str> {
    JSON_OPTION_NAMES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
}

fn option_key(json_name: &str) -> Option<&'static str> {
    JSON_OPTION_NAMES
        .iter()
        .find(|(_, name)| *name == json_name)
        .map(|(key, _)| *key)
}

/// Accepts an array, `null`, or the empty object an empty Lua table turns
/// into.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let code = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    Ok(code.unwrap_or_else(|| CompilationStage::default().code()))
}

#[derive(Clone, Debug, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
#[serde(rename_all = "camelCase", default)]
struct CompilerSetJson {
    c_compiler: String,
    cxx_compiler: String,
    make: String,
    debugger: String,
    resource_compiler: String,
    debug_server: String,

    #[serde(deserialize_with = "lenient_list")]
    bin_dirs: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    c_include_dirs: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    cxx_include_dirs: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    lib_dirs: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    default_lib_dirs: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    default_c_include_dirs: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    default_cxx_include_dirs: Vec<String>,

    dump_machine: String,
    version: String,
    #[serde(rename = "type")]
    vendor: String,
    name: String,
    target: String,
    compiler_type: String,

    #[serde(deserialize_with = "lenient_list")]
    custom_compile_params: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    custom_link_params: Vec<String>,
    exec_charset: String,
    static_link: bool,

    #[derivative(Default(value = "DEFAULT_PREPROCESSING_SUFFIX.to_owned()"))]
    preprocessing_suffix: String,
    #[derivative(Default(value = "DEFAULT_COMPILATION_SUFFIX.to_owned()"))]
    compilation_proper_suffix: String,
    #[derivative(Default(value = "DEFAULT_ASSEMBLING_SUFFIX.to_owned()"))]
    assembling_suffix: String,
    #[derivative(Default(value = "DEFAULT_EXECUTABLE_SUFFIX.to_owned()"))]
    executable_suffix: String,
    #[derivative(Default(value = "CompilationStage::default().code()"))]
    #[serde(deserialize_with = "lenient_int")]
    compilation_stage: i64,

    #[serde(flatten)]
    options: BTreeMap<String, Value>,
}

fn to_path(raw: String) -> Option<PathBuf> {
    if raw.is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

fn to_paths(raw: Vec<String>) -> Vec<PathBuf> {
    raw.into_iter().map(PathBuf::from).collect()
}

fn from_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default()
}

fn from_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|path| path.display().to_string()).collect()
}

impl CompilerSet {
    /// Builds a set out of its JSON description. No process is spawned.
    ///
    /// Option fields are named after [`JSON_OPTION_NAMES`]; other fields
    /// whose name is a catalog key are accepted as well. Unknown fields are
    /// ignored.
    pub fn from_json(registry: Arc<FamilyRegistry>, value: Value) -> AnyResult<CompilerSet> {
        let json: CompilerSetJson =
            serde_json::from_value(value).context("Malformed compiler set description")?;

        let mut set = CompilerSet::new(registry);
        set.compiler_type = CompilerType::from_name(&json.compiler_type).unwrap_or_default();

        set.c_compiler = to_path(json.c_compiler);
        set.cpp_compiler = to_path(json.cxx_compiler);
        set.make = to_path(json.make);
        set.debugger = to_path(json.debugger);
        set.resource_compiler = to_path(json.resource_compiler);
        set.debug_server = to_path(json.debug_server);

        set.bin_dirs = to_paths(json.bin_dirs);
        set.c_include_dirs = to_paths(json.c_include_dirs);
        set.cpp_include_dirs = to_paths(json.cxx_include_dirs);
        set.lib_dirs = to_paths(json.lib_dirs);
        set.default_lib_dirs = to_paths(json.default_lib_dirs);
        set.default_c_include_dirs = to_paths(json.default_c_include_dirs);
        set.default_cpp_include_dirs = to_paths(json.default_cxx_include_dirs);

        set.dump_machine = json.dump_machine;
        set.version = json.version;
        set.vendor = json.vendor;
        set.name = json.name;
        set.target = json.target;

        set.use_custom_compile_params = !json.custom_compile_params.is_empty();
        set.custom_compile_params = json.custom_compile_params;
        set.use_custom_link_params = !json.custom_link_params.is_empty();
        set.custom_link_params = json.custom_link_params;

        if json.exec_charset.is_empty() {
            set.auto_add_charset_params = false;
            set.exec_charset = ENCODING_UTF8.to_owned();
        } else {
            set.auto_add_charset_params = true;
            set.exec_charset = json.exec_charset;
        }
        set.static_link = json.static_link;

        set.suffixes.preprocessing = json.preprocessing_suffix;
        set.suffixes.compilation_proper = json.compilation_proper_suffix;
        set.suffixes.assembling = json.assembling_suffix;
        set.suffixes.executable = json.executable_suffix;
        set.compilation_stage =
            CompilationStage::from_code(json.compilation_stage).unwrap_or_default();

        for (name, value) in json.options {
            let value = match value {
                Value::String(s) if !s.is_empty() => s,
                _ => continue,
            };
            let key = option_key(&name).unwrap_or(&name).to_owned();

            set.set_compile_option(&key, value);
        }

        Ok(set)
    }

    pub fn to_json(&self) -> Value {
        let options = self
            .compile_options
            .iter()
            .map(|(key, value)| {
                let name = json_option_name(key).unwrap_or(key).to_owned();
                (name, Value::String(value.clone()))
            })
            .collect();

        let json = CompilerSetJson {
            c_compiler: from_path(&self.c_compiler),
            cxx_compiler: from_path(&self.cpp_compiler),
            make: from_path(&self.make),
            debugger: from_path(&self.debugger),
            resource_compiler: from_path(&self.resource_compiler),
            debug_server: from_path(&self.debug_server),
            bin_dirs: from_paths(&self.bin_dirs),
            c_include_dirs: from_paths(&self.c_include_dirs),
            cxx_include_dirs: from_paths(&self.cpp_include_dirs),
            lib_dirs: from_paths(&self.lib_dirs),
            default_lib_dirs: from_paths(&self.default_lib_dirs),
            default_c_include_dirs: from_paths(&self.default_c_include_dirs),
            default_cxx_include_dirs: from_paths(&self.default_cpp_include_dirs),
            dump_machine: self.dump_machine.clone(),
            version: self.version.clone(),
            vendor: self.vendor.clone(),
            name: self.name.clone(),
            target: self.target.clone(),
            compiler_type: self.compiler_type.name().to_owned(),
            custom_compile_params: if self.use_custom_compile_params {
                self.custom_compile_params.clone()
            } else {
                Vec::new()
            },
            custom_link_params: if self.use_custom_link_params {
                self.custom_link_params.clone()
            } else {
                Vec::new()
            },
            exec_charset: if self.auto_add_charset_params {
                self.exec_charset.clone()
            } else {
                String::new()
            },
            static_link: self.static_link,
            preprocessing_suffix: self.suffixes.preprocessing.clone(),
            compilation_proper_suffix: self.suffixes.compilation_proper.clone(),
            assembling_suffix: self.suffixes.assembling.clone(),
            executable_suffix: self.suffixes.executable.clone(),
            compilation_stage: self.compilation_stage.code(),
            options,
        };

        serde_json::to_value(json).unwrap_or(Value::Null)
    }
}
