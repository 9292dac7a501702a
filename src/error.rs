use std::{io, time::Duration};

use thiserror::Error;

/// Raised while building an option catalog.
///
/// Built-in catalogs treat this as a programming error and abort, runtime
/// registrations get it back as a regular error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("option `{key}` is registered twice in the `{family}` catalog")]
    DuplicateKey { family: String, key: String },

    #[error("choice option `{key}` has no choices")]
    EmptyChoices { key: String },
}

/// Why a candidate compiler could not be turned into facts.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("`{program}` does not exist")]
    MissingExecutable { program: String },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` did not finish within {}ms", timeout.as_millis())]
    Timeout { program: String, timeout: Duration },

    #[error("`{program}` is not a known compiler")]
    Unrecognized { program: String },
}

/// Failure of an embedded hint script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Lua script load error: {0}.")]
    Load(String),

    #[error("Lua error: {0}.")]
    Runtime(String),

    #[error("timeout in script '{name}' ({elapsed_ms}/{limit_ms} ms)")]
    Timeout {
        name: String,
        elapsed_ms: u128,
        limit_ms: u128,
    },

    #[error("{0}")]
    Shape(String),
}
