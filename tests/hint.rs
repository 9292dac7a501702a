use std::{path::Path, time::Duration};

use compiler_sets::{
    error::ScriptError,
    hint::{run_compiler_hint, HintEnvironment},
};

fn env() -> HintEnvironment {
    HintEnvironment::detect(Path::new("/opt/ide"))
}

fn run(script: &str) -> Result<compiler_sets::hint::CompilerHint, ScriptError> {
    run_compiler_hint(script, &env(), Duration::from_secs(1))
}

#[test]
fn returns_compiler_list() {
    let hint = run(r#"
local list = {}
for _, arch in ipairs(C_System.supportedAppArchList()) do
    table.insert(list, {
        name = C_Util.format("Bundled GCC (%1)", arch),
        compilerType = "GCC",
        cCompiler = C_System.appDir() .. "/mingw/bin/gcc",
    })
end
return { compilerList = list, noSearch = { "/opt/ide/mingw/bin" }, preferCompiler = 1 }
"#)
    .unwrap();

    assert!(!hint.compiler_list.is_empty());
    assert_eq!(
        hint.compiler_list[0]["cCompiler"].as_str(),
        Some("/opt/ide/mingw/bin/gcc")
    );
    assert!(hint.compiler_list[0]["name"]
        .as_str()
        .unwrap()
        .starts_with("Bundled GCC ("));
    assert_eq!(hint.no_search, ["/opt/ide/mingw/bin"]);
    assert_eq!(hint.prefer_compiler, Some(1));
}

#[test]
fn nil_means_no_hint() {
    let hint = run("return nil").unwrap();

    assert!(hint.compiler_list.is_empty());
    assert!(hint.no_search.is_empty());
    assert_eq!(hint.prefer_compiler, None);
}

#[test]
fn non_table_result_is_rejected() {
    assert!(matches!(run("return 42"), Err(ScriptError::Shape(_))));
}

#[test]
fn host_access_is_limited() {
    let hint = run(r#"
return { compilerList = {}, noSearch = {
    type(io), type(os), type(require), type(dofile), type(loadfile),
    type(load), type(collectgarbage), type(print),
} }
"#)
    .unwrap();

    assert_eq!(hint.no_search, ["nil"; 8]);
}

#[test]
fn host_files_cannot_be_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let secret = dir.path().join("secret.txt");
    std::fs::write(&secret, "password = hunter2").unwrap();

    let err = run(&format!("return loadfile({:?})", secret.display().to_string()))
        .unwrap_err();

    assert!(matches!(err, ScriptError::Runtime(_)));
    assert!(!err.to_string().contains("hunter2"));
}

#[test]
fn syntax_error_fails_to_load() {
    assert!(matches!(run("return {"), Err(ScriptError::Load(_))));
}

#[test]
fn runtime_error_is_reported() {
    let err = run("error('broken toolchain')").unwrap_err();

    assert!(matches!(err, ScriptError::Runtime(_)));
    assert!(err.to_string().contains("broken toolchain"));
}

#[test]
fn endless_script_times_out() {
    let err = run_compiler_hint("while true do end", &env(), Duration::from_millis(100))
        .unwrap_err();

    match err {
        ScriptError::Timeout {
            name,
            elapsed_ms,
            limit_ms,
        } => {
            assert_eq!(name, "compiler_hint.lua");
            assert_eq!(limit_ms, 100);
            assert!(elapsed_ms >= 100);
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
}
