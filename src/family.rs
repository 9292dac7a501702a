//! Compiler families, their option catalogs and per-type capabilities.

mod gcc;
mod msvc;
mod sdcc;

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::{error::SchemaError, filter::CompilerDriver, schema::OptionSchema};

pub const C_CMD_OPT_STD: &str = "c_cmd_opt_std";

pub const CC_CMD_OPT_ANSI: &str = "cc_cmd_opt_ansi";
pub const CC_CMD_OPT_NO_ASM: &str = "cc_cmd_opt_no_asm";
pub const CC_CMD_OPT_TRADITIONAL_CPP: &str = "cc_cmd_opt_traditional_cpp";

pub const CC_CMD_OPT_ARCH: &str = "cc_cmd_opt_arch";
pub const CC_CMD_OPT_TUNE: &str = "cc_cmd_opt_tune";
pub const CC_CMD_OPT_INSTRUCTION: &str = "cc_cmd_opt_instruction";
pub const CC_CMD_OPT_OPTIMIZE: &str = "cc_cmd_opt_optimize";
pub const CC_CMD_OPT_POINTER_SIZE: &str = "cc_cmd_opt_pointer_size";
pub const CC_CMD_OPT_MIPS_ABI: &str = "cc_cmd_opt_mips_abi";
pub const CC_CMD_OPT_STD: &str = "cc_cmd_opt_std";

pub const CC_CMD_OPT_INHIBIT_ALL_WARNING: &str = "cc_cmd_opt_inhibit_all_warning";
pub const CC_CMD_OPT_WARNING_ALL: &str = "cc_cmd_opt_warning_all";
pub const CC_CMD_OPT_WARNING_EXTRA: &str = "cc_cmd_opt_warning_extra";
pub const CC_CMD_OPT_CHECK_ISO_CONFORMANCE: &str = "cc_cmd_opt_check_iso_conformance";
pub const CC_CMD_OPT_SYNTAX_ONLY: &str = "cc_cmd_opt_syntax_only";
pub const CC_CMD_OPT_WARNING_AS_ERROR: &str = "cc_cmd_opt_warning_as_error";
pub const CC_CMD_OPT_ABORT_ON_ERROR: &str = "cc_cmd_opt_abort_on_error";

pub const CC_CMD_OPT_PROFILE_INFO: &str = "cc_cmd_opt_profile_info";

pub const LINK_CMD_OPT_LINK_OBJC: &str = "link_cmd_opt_link_objc";
pub const LINK_CMD_OPT_NO_LINK_STDLIB: &str = "link_cmd_opt_no_link_stdlib";
pub const LINK_CMD_OPT_NO_CONSOLE: &str = "link_cmd_opt_no_console";
pub const LINK_CMD_OPT_STRIP_EXE: &str = "link_cmd_opt_strip_exe";
pub const LINK_CMD_OPT_STACK_SIZE: &str = "link_cmd_opt_stack_size";
pub const CC_CMD_OPT_DEBUG_INFO: &str = "cc_cmd_opt_debug_info";
pub const CC_CMD_OPT_ADDRESS_SANITIZER: &str = "cc_cmd_opt_address_sanitizer";
pub const CC_CMD_OPT_STACK_PROTECTOR: &str = "cc_cmd_opt_stack_protector";

pub const CC_CMD_OPT_VERBOSE_ASM: &str = "cc_cmd_opt_verbose_asm";
pub const CC_CMD_OPT_ONLY_GEN_ASM_CODE: &str = "cc_cmd_opt_only_gen_asm_code";
pub const CC_CMD_OPT_USE_PIPE: &str = "cc_cmd_opt_use_pipe";

pub const SDCC_CMD_OPT_PROCESSOR: &str = "sdcc_cmd_opt_processor";
pub const SDCC_CMD_OPT_STD: &str = "sdcc_cmd_opt_std";
pub const SDCC_OPT_MEMORY_MODEL: &str = "sdcc_opt_memory_model";
pub const SDCC_OPT_XSTACK: &str = "sdcc_opt_xstack";
pub const SDCC_OPT_XRAM_MOVC: &str = "sdcc_opt_xram_movc";
pub const SDCC_OPT_ACALL_AJMP: &str = "sdcc_opt_acall_ajmp";
pub const SDCC_OPT_NO_XINIT_OPT: &str = "sdcc_opt_no_xinit_opt";
pub const SDCC_OPT_NOSTARTUP: &str = "sdcc_opt_nostartup";
pub const SDCC_OPT_IRAM_SIZE: &str = "sdcc_opt_iram_size";
pub const SDCC_OPT_XRAM_SIZE: &str = "sdcc_opt_xram_size";
pub const SDCC_OPT_XRAM_LOC: &str = "sdcc_opt_xram_loc";
pub const SDCC_OPT_XSTACK_LOC: &str = "sdcc_opt_xstack_loc";
pub const SDCC_OPT_CODE_LOC: &str = "sdcc_opt_code_loc";
pub const SDCC_OPT_CODE_SIZE: &str = "sdcc_opt_code_size";
pub const SDCC_OPT_STACK_LOC: &str = "sdcc_opt_stack_loc";
pub const SDCC_OPT_DATA_LOC: &str = "sdcc_opt_data_loc";

/// A group of drivers sharing a flag dialect.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompilerFamily {
    Gcc,
    Sdcc,
    Msvc,
}

impl CompilerFamily {
    pub fn name(self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "GCC",
            CompilerFamily::Sdcc => "SDCC",
            CompilerFamily::Msvc => "MSVC",
        }
    }

    /// Builds the built-in option catalog of this family.
    pub fn catalog(self) -> Result<OptionSchema, SchemaError> {
        match self {
            CompilerFamily::Gcc => gcc::catalog(),
            CompilerFamily::Sdcc => sdcc::catalog(),
            CompilerFamily::Msvc => msvc::catalog(),
        }
    }

    pub fn of_driver(driver: CompilerDriver) -> Option<CompilerFamily> {
        match driver {
            CompilerDriver::Gcc | CompilerDriver::Clang => Some(CompilerFamily::Gcc),
            CompilerDriver::Sdcc => Some(CompilerFamily::Sdcc),
            CompilerDriver::Msvc | CompilerDriver::ClangCl => Some(CompilerFamily::Msvc),
            CompilerDriver::Unknown => None,
        }
    }
}

/// What a compiler type can do beyond its option catalog.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub converting_charset: bool,
    pub static_link: bool,
    pub syntax_check: bool,
    pub utf8_in_debugger: bool,
    pub utf8_in_makefile: bool,
}

/// The persisted compiler type of a set.
///
/// `GccUtf8` is a GCC build whose console speaks UTF-8 (MSYS2 GCC 12 and
/// later), it shares the GCC catalog.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompilerType {
    #[serde(rename = "GCC")]
    Gcc,
    #[serde(rename = "GCC_UTF8")]
    GccUtf8,
    Clang,
    #[serde(rename = "SDCC")]
    Sdcc,
    Unknown,
}

impl Default for CompilerType {
    fn default() -> Self {
        CompilerType::Unknown
    }
}

impl Display for CompilerType {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        f.write_str(self.name())
    }
}

impl CompilerType {
    pub fn name(self) -> &'static str {
        match self {
            CompilerType::Gcc => "GCC",
            CompilerType::GccUtf8 => "GCC_UTF8",
            CompilerType::Clang => "Clang",
            CompilerType::Sdcc => "SDCC",
            CompilerType::Unknown => "Unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<CompilerType> {
        match name {
            "GCC" => Some(CompilerType::Gcc),
            "GCC_UTF8" => Some(CompilerType::GccUtf8),
            "Clang" => Some(CompilerType::Clang),
            "SDCC" => Some(CompilerType::Sdcc),
            _ => None,
        }
    }

    /// Integer written to the settings store.
    pub fn code(self) -> i64 {
        match self {
            CompilerType::Gcc => 0,
            CompilerType::Clang => 1,
            CompilerType::GccUtf8 => 2,
            CompilerType::Sdcc => 3,
            CompilerType::Unknown => -1,
        }
    }

    pub fn from_code(code: i64) -> CompilerType {
        match code {
            0 => CompilerType::Gcc,
            1 => CompilerType::Clang,
            2 => CompilerType::GccUtf8,
            3 => CompilerType::Sdcc,
            _ => CompilerType::Unknown,
        }
    }

    pub fn driver(self) -> CompilerDriver {
        match self {
            CompilerType::Gcc | CompilerType::GccUtf8 => CompilerDriver::Gcc,
            CompilerType::Clang => CompilerDriver::Clang,
            CompilerType::Sdcc => CompilerDriver::Sdcc,
            CompilerType::Unknown => CompilerDriver::Unknown,
        }
    }

    pub fn family(self) -> Option<CompilerFamily> {
        CompilerFamily::of_driver(self.driver())
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            CompilerType::Gcc => Capabilities {
                converting_charset: true,
                static_link: true,
                syntax_check: true,
                utf8_in_debugger: false,
                utf8_in_makefile: false,
            },
            CompilerType::GccUtf8 => Capabilities {
                converting_charset: true,
                static_link: true,
                syntax_check: true,
                utf8_in_debugger: true,
                utf8_in_makefile: true,
            },
            CompilerType::Clang => Capabilities {
                converting_charset: false,
                static_link: true,
                syntax_check: true,
                utf8_in_debugger: true,
                utf8_in_makefile: false,
            },
            CompilerType::Sdcc | CompilerType::Unknown => Capabilities {
                converting_charset: false,
                static_link: false,
                syntax_check: self != CompilerType::Sdcc,
                utf8_in_debugger: false,
                utf8_in_makefile: false,
            },
        }
    }
}
