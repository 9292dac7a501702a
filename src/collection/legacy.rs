//! Decoding of the packed option string older releases persisted.
//!
//! Each character of that string selects the value of the option found at
//! the same position of [`LEGACY_OPTION_TABLE`]. The encoding is read on
//! load and never written.

use log::debug;

use crate::{
    compiler_set::CompilerSet,
    family::{
        CC_CMD_OPT_ABORT_ON_ERROR, CC_CMD_OPT_ANSI, CC_CMD_OPT_ARCH,
        CC_CMD_OPT_CHECK_ISO_CONFORMANCE, CC_CMD_OPT_DEBUG_INFO, CC_CMD_OPT_INHIBIT_ALL_WARNING,
        CC_CMD_OPT_INSTRUCTION, CC_CMD_OPT_NO_ASM, CC_CMD_OPT_ONLY_GEN_ASM_CODE,
        CC_CMD_OPT_OPTIMIZE, CC_CMD_OPT_POINTER_SIZE, CC_CMD_OPT_PROFILE_INFO, CC_CMD_OPT_STD,
        CC_CMD_OPT_SYNTAX_ONLY, CC_CMD_OPT_TRADITIONAL_CPP, CC_CMD_OPT_TUNE, CC_CMD_OPT_USE_PIPE,
        CC_CMD_OPT_VERBOSE_ASM, CC_CMD_OPT_WARNING_ALL, CC_CMD_OPT_WARNING_AS_ERROR,
        CC_CMD_OPT_WARNING_EXTRA, LINK_CMD_OPT_LINK_OBJC, LINK_CMD_OPT_NO_CONSOLE,
        LINK_CMD_OPT_NO_LINK_STDLIB, LINK_CMD_OPT_STRIP_EXE,
    },
};

/// Option keys in the order of the packed string. Never reorder.
pub const LEGACY_OPTION_TABLE: &[&str] = &[
    CC_CMD_OPT_ANSI,
    CC_CMD_OPT_NO_ASM,
    CC_CMD_OPT_TRADITIONAL_CPP,
    CC_CMD_OPT_ARCH,
    CC_CMD_OPT_TUNE,
    CC_CMD_OPT_INSTRUCTION,
    CC_CMD_OPT_OPTIMIZE,
    CC_CMD_OPT_POINTER_SIZE,
    CC_CMD_OPT_STD,
    CC_CMD_OPT_INHIBIT_ALL_WARNING,
    CC_CMD_OPT_WARNING_ALL,
    CC_CMD_OPT_WARNING_EXTRA,
    CC_CMD_OPT_CHECK_ISO_CONFORMANCE,
    CC_CMD_OPT_SYNTAX_ONLY,
    CC_CMD_OPT_WARNING_AS_ERROR,
    CC_CMD_OPT_ABORT_ON_ERROR,
    CC_CMD_OPT_PROFILE_INFO,
    LINK_CMD_OPT_LINK_OBJC,
    LINK_CMD_OPT_NO_LINK_STDLIB,
    LINK_CMD_OPT_NO_CONSOLE,
    LINK_CMD_OPT_STRIP_EXE,
    CC_CMD_OPT_DEBUG_INFO,
    CC_CMD_OPT_VERBOSE_ASM,
    CC_CMD_OPT_ONLY_GEN_ASM_CODE,
    CC_CMD_OPT_USE_PIPE,
];

/// `'1'` is 1, `'a'..='z'` are 2 and up, anything else is 0.
pub fn char_to_value(c: char) -> i32 {
    match c {
        '1' => 1,
        'a'..='z' => c as i32 - 'a' as i32 + 2,
        _ => 0,
    }
}

/// Applies `packed` to `set`, position by position against `table`.
///
/// A value of 1 turns a boolean option on. Letters pick the choice of the
/// same rank, `'a'` being the first one. Everything else leaves the option
/// unset, as do letters given to options without choices and keys the
/// family of `set` does not know.
pub fn decode_options(set: &mut CompilerSet, packed: &str, table: &[&str]) {
    for (key, c) in table.iter().zip(packed.chars()) {
        let value = char_to_value(c);
        let driver = set.compiler_type().driver();

        let index = match set.registry().get_option(driver, key) {
            Some(option) if option.choices.is_empty() => value,
            Some(_) => value - 1,
            None => {
                debug!("Dropping legacy option `{}` unknown to {}", key, set.compiler_type());
                continue;
            }
        };

        set.set_compile_option_index(key, index);
    }
}
