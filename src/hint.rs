//! Sandboxed execution of the compiler hint script.
//!
//! A distribution may ship a Lua script that describes the toolchains it
//! bundles, so that discovery does not have to probe them. The script runs
//! in an interpreter holding only pure standard libraries plus a few
//! read-only host queries, under an instruction-sampled time budget.

use std::{
    env,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::debug;
use mlua::{HookTriggers, Lua, LuaOptions, StdLib, Table, Variadic};
use serde_json::{Map, Number, Value};

use crate::{error::ScriptError, utils};

/// File name the hint script is looked up under, in the libexec directory.
pub const COMPILER_HINT_SCRIPT: &str = "compiler_hint.lua";

pub const COMPILER_HINT_TIMEOUT: Duration = Duration::from_secs(1);

/// The timeout hook fires every this many VM instructions.
const HOOK_INSTRUCTION_INTERVAL: u32 = 1_000_000;

const MAX_DEPTH: usize = 32;

/// Base library functions that reach the host file system, the collector or
/// stdout. Removed from the globals before the script runs.
const REMOVED_BASE_FUNCTIONS: &[&str] =
    &["dofile", "loadfile", "load", "collectgarbage", "print"];

/// What the host tells the script about itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HintEnvironment {
    pub app_dir: PathBuf,
    pub app_libexec_dir: PathBuf,
    pub app_resource_dir: PathBuf,
    pub app_arch: String,
    pub os_arch: String,
    pub supported_app_archs: Vec<String>,
    pub desktop_environment: String,
    pub language: String,
}

fn arch_name(arch: &str) -> String {
    match arch {
        "x86" => "i386",
        "aarch64" => "arm64",
        other => other,
    }
    .to_owned()
}

impl HintEnvironment {
    /// Describes the running process, installed under `app_dir`.
    pub fn detect(app_dir: &Path) -> HintEnvironment {
        let app_arch = arch_name(env::consts::ARCH);

        let supported_app_archs = if cfg!(windows) {
            match env::consts::ARCH {
                "x86_64" => vec!["i386".to_owned(), "x86_64".to_owned()],
                "aarch64" => vec!["i386".to_owned(), "x86_64".to_owned(), "arm64".to_owned()],
                _ => vec![app_arch.clone()],
            }
        } else {
            vec![app_arch.clone()]
        };

        let desktop_environment = if cfg!(windows) {
            "windows".to_owned()
        } else if cfg!(target_os = "macos") {
            "macos".to_owned()
        } else {
            env::var("XDG_CURRENT_DESKTOP")
                .ok()
                .filter(|desktop| !desktop.is_empty())
                .map(|desktop| desktop.to_lowercase())
                .unwrap_or_else(|| "xdg".to_owned())
        };

        let language = env::var("LC_ALL")
            .ok()
            .filter(|lang| !lang.is_empty())
            .or_else(|| env::var("LANG").ok())
            .and_then(|lang| lang.split('.').next().map(str::to_owned))
            .filter(|lang| !lang.is_empty() && lang != "C" && lang != "POSIX")
            .unwrap_or_else(|| "en_US".to_owned());

        HintEnvironment {
            app_dir: app_dir.to_path_buf(),
            app_libexec_dir: app_dir.join("libexec"),
            app_resource_dir: app_dir.to_path_buf(),
            os_arch: app_arch.clone(),
            app_arch,
            supported_app_archs,
            desktop_environment,
            language,
        }
    }

    /// Where the hint script of this installation lives.
    pub fn script_path(&self) -> PathBuf {
        self.app_libexec_dir.join(COMPILER_HINT_SCRIPT)
    }
}

/// The parsed return value of a hint script.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompilerHint {
    /// Compiler set descriptions in the JSON compiler set shape.
    pub compiler_list: Vec<Value>,
    /// Directories discovery must not scan.
    pub no_search: Vec<String>,
    /// 1-based position of the preferred set in the final list.
    pub prefer_compiler: Option<i64>,
}

impl CompilerHint {
    fn from_json(value: Value) -> Result<CompilerHint, ScriptError> {
        let mut object = match value {
            Value::Object(object) => object,
            Value::Null => return Ok(CompilerHint::default()),
            _ => {
                return Err(ScriptError::Shape(
                    "Compiler hint script must return an object.".to_owned(),
                ))
            }
        };

        let compiler_list = match object.remove("compilerList") {
            Some(Value::Array(list)) => list,
            _ => Vec::new(),
        };

        let no_search = match object.remove("noSearch") {
            Some(Value::Array(dirs)) => dirs
                .into_iter()
                .filter_map(|dir| match dir {
                    Value::String(dir) => Some(dir),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let prefer_compiler = object.get("preferCompiler").and_then(|prefer| {
            prefer
                .as_i64()
                .or_else(|| prefer.as_f64().map(|prefer| prefer as i64))
        });

        Ok(CompilerHint {
            compiler_list,
            no_search,
            prefer_compiler,
        })
    }
}

/// Expands `%1` to `%9` with the matching argument.
fn substitute_args(format: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        let arg = match (c, chars.peek().and_then(|d| d.to_digit(10))) {
            ('%', Some(n)) if n >= 1 => args.get(n as usize - 1),
            _ => None,
        };

        match arg {
            Some(arg) => {
                chars.next();
                out.push_str(arg);
            }
            None => out.push(c),
        }
    }

    out
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

fn install_api(lua: &Lua, env: &HintEnvironment) -> mlua::Result<()> {
    let globals = lua.globals();
    for name in REMOVED_BASE_FUNCTIONS {
        globals.set(*name, mlua::Value::Nil)?;
    }

    let debug = lua.create_table()?;
    debug.set(
        "debug",
        lua.create_function(|_, message: String| {
            debug!(target: "hint", "{}", message);
            Ok(())
        })?,
    )?;
    globals.set("C_Debug", debug)?;

    let desktop = lua.create_table()?;
    let desktop_environment = env.desktop_environment.clone();
    desktop.set(
        "desktopEnvironment",
        lua.create_function(move |_, ()| Ok(desktop_environment.clone()))?,
    )?;
    let language = env.language.clone();
    desktop.set(
        "language",
        lua.create_function(move |_, ()| Ok(language.clone()))?,
    )?;
    globals.set("C_Desktop", desktop)?;

    let file_system = lua.create_table()?;
    file_system.set(
        "exists",
        lua.create_function(|_, path: String| Ok(Path::new(&path).exists()))?,
    )?;
    file_system.set(
        "isExecutable",
        lua.create_function(|_, path: String| Ok(utils::is_executable(Path::new(&path))))?,
    )?;
    globals.set("C_FileSystem", file_system)?;

    let system = lua.create_table()?;
    let values = [
        ("appArch", env.app_arch.clone()),
        ("appDir", path_string(&env.app_dir)),
        ("appLibexecDir", path_string(&env.app_libexec_dir)),
        ("appResourceDir", path_string(&env.app_resource_dir)),
        ("osArch", env.os_arch.clone()),
    ];
    for (name, value) in values {
        system.set(name, lua.create_function(move |_, ()| Ok(value.clone()))?)?;
    }
    let archs = env.supported_app_archs.clone();
    system.set(
        "supportedAppArchList",
        lua.create_function(move |_, ()| Ok(archs.clone()))?,
    )?;
    globals.set("C_System", system)?;

    let util = lua.create_table()?;
    util.set(
        "format",
        lua.create_function(|_, (format, args): (String, Variadic<String>)| {
            Ok(substitute_args(&format, &args))
        })?,
    )?;
    globals.set("C_Util", util)?;

    Ok(())
}

fn table_to_json(table: Table, depth: usize) -> Result<Value, ScriptError> {
    let len = table.raw_len();
    let mut entries = Vec::new();
    for pair in table.pairs::<mlua::Value, mlua::Value>() {
        let pair = pair.map_err(|e| ScriptError::Runtime(e.to_string()))?;
        entries.push(pair);
    }

    let is_array = len > 0 && entries.len() as i64 == len as i64;
    if is_array {
        let mut items = vec![Value::Null; entries.len()];
        for (key, value) in entries {
            if let mlua::Value::Integer(i) = key {
                if let Some(slot) = usize::try_from(i - 1).ok().and_then(|i| items.get_mut(i)) {
                    *slot = lua_to_json(value, depth + 1)?;
                }
            }
        }
        return Ok(Value::Array(items));
    }

    let mut object = Map::new();
    for (key, value) in entries {
        let key = match key {
            mlua::Value::String(s) => s.to_str().map(str::to_owned).ok(),
            mlua::Value::Integer(i) => Some(i.to_string()),
            mlua::Value::Number(n) => Some(n.to_string()),
            _ => None,
        };

        if let Some(key) = key {
            object.insert(key, lua_to_json(value, depth + 1)?);
        }
    }

    Ok(Value::Object(object))
}

fn lua_to_json(value: mlua::Value, depth: usize) -> Result<Value, ScriptError> {
    if depth > MAX_DEPTH {
        return Err(ScriptError::Shape(
            "Compiler hint result is nested too deeply.".to_owned(),
        ));
    }

    Ok(match value {
        mlua::Value::Nil => Value::Null,
        mlua::Value::Boolean(b) => Value::Bool(b),
        mlua::Value::Integer(i) => Value::Number(i.into()),
        mlua::Value::Number(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
        mlua::Value::String(s) => Value::String(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        mlua::Value::Table(table) => table_to_json(table, depth)?,
        _ => Value::Null,
    })
}

/// Runs `script` and parses what it returns.
///
/// A script returning `nil` yields an empty hint. Anything else than a
/// table with string keys is a [`ScriptError::Shape`].
pub fn run_compiler_hint(
    script: &str,
    env: &HintEnvironment,
    timeout: Duration,
) -> Result<CompilerHint, ScriptError> {
    let value = run_script(COMPILER_HINT_SCRIPT, script, env, timeout)?;
    CompilerHint::from_json(value)
}

fn run_script(
    name: &str,
    script: &str,
    env: &HintEnvironment,
    timeout: Duration,
) -> Result<Value, ScriptError> {
    let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8;
    let lua = Lua::new_with(libs, LuaOptions::new())
        .map_err(|e| ScriptError::Load(e.to_string()))?;

    install_api(&lua, env).map_err(|e| ScriptError::Load(e.to_string()))?;

    let started = Instant::now();
    let timed_out = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&timed_out);
    let triggers = HookTriggers {
        every_nth_instruction: Some(HOOK_INSTRUCTION_INTERVAL),
        ..Default::default()
    };
    lua.set_hook(triggers, move |_, _| {
        if started.elapsed() > timeout {
            flag.store(true, Ordering::SeqCst);
            return Err(mlua::Error::RuntimeError("timeout".to_owned()));
        }
        Ok(())
    })
    .map_err(|e| ScriptError::Load(e.to_string()))?;

    let function = lua
        .load(script)
        .set_name(name)
        .and_then(|chunk| chunk.into_function())
        .map_err(|e| ScriptError::Load(e.to_string()))?;

    let result = function.call::<_, mlua::Value>(());
    if timed_out.load(Ordering::SeqCst) {
        return Err(ScriptError::Timeout {
            name: name.to_owned(),
            elapsed_ms: started.elapsed().as_millis(),
            limit_ms: timeout.as_millis(),
        });
    }

    let value = result.map_err(|e| ScriptError::Runtime(e.to_string()))?;
    lua_to_json(value, 0)
}
