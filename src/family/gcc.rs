use super::*;
use crate::{
    filter::{clang, clang_at_least, clang_less_than, gcc_at_least, gcc_less_than, Filter},
    schema::{AppliesTo, NumberSpec, OptionChoice as C},
};

const CODE_GENERATION: &str = "Code Generation";
const WARNINGS: &str = "Warnings";
const LINKER: &str = "Linker";

/// Catalog shared by GCC and Clang.
pub(super) fn catalog() -> Result<OptionSchema, SchemaError> {
    let mut schema = OptionSchema::new("GCC");

    schema.add_choice_option(
        CC_CMD_OPT_OPTIMIZE,
        "Optimization level (-Ox)",
        CODE_GENERATION,
        AppliesTo::COMPILERS,
        "-O",
        vec![
            C::when("-Og for debugging", "g", gcc_at_least(4, 8).or(clang_at_least(4, 0))),
            C::new("-O1 for optimizing", "1"),
            C::when("-Oz aggressively for size", "z", gcc_at_least(12, 0).or(clang())),
            C::new("-Os for size", "s"),
            C::new("-O2 for even more", "2"),
            C::new("-O3 for yet more", "3"),
            C::when("-Ofast against compliance", "fast", gcc_at_least(4, 6).or(clang())),
        ],
    )?;

    schema
        .add_choice_option(
            CC_CMD_OPT_STD,
            "C++ Language standard (-std)",
            CODE_GENERATION,
            AppliesTo::CPP,
            "-std=",
            cpp_standards(),
        )?
        .availability = gcc_at_least(3, 3).or(clang());

    schema.add_choice_option(
        C_CMD_OPT_STD,
        "C Language standard (-std)",
        CODE_GENERATION,
        AppliesTo::C,
        "-std=",
        c_standards(),
    )?;

    schema.add_choice_option(
        CC_CMD_OPT_ARCH,
        "µ-arch level (-march=)",
        CODE_GENERATION,
        AppliesTo::COMPILERS,
        "-march=",
        vec![
            C::new("x86-64", "x86-64"),
            C::new("x86-64-v2 (SSE4.2)", "x86-64-v2"),
            C::new("x86-64-v3 (AVX2)", "x86-64-v3"),
            C::new("x86-64-v4 (AVX-512)", "x86-64-v4"),
            C::new("armv8-a", "armv8-a"),
            C::new("rv64g", "rv64g"),
            C::new("rv64gc", "rv64gc"),
            C::new("rv64gcv", "rv64gcv"),
        ],
    )?;

    schema.add_choice_option(
        CC_CMD_OPT_INSTRUCTION,
        "Enable use of specific instructions (-mx)",
        CODE_GENERATION,
        AppliesTo::COMPILERS,
        "-m",
        [
            ("MMX", "mmx"),
            ("3D Now", "3dnow"),
            ("SSE", "sse"),
            ("SSE2", "sse2"),
            ("SSE3", "sse3"),
            ("SSSE3", "ssse3"),
            ("SSE4", "sse4"),
            ("SSE4A", "sse4a"),
            ("SSE4.1", "sse4.1"),
            ("SSE4.2", "sse4.2"),
            ("AVX", "avx"),
            ("AVX2", "avx2"),
            ("FMA4", "fma4"),
            ("XOP", "xop"),
            ("AES", "aes"),
        ]
        .into_iter()
        .map(|(display, value)| C::new(display, value))
        .collect(),
    )?;

    schema.add_choice_option(
        CC_CMD_OPT_POINTER_SIZE,
        "x86 multilib (-mx)",
        CODE_GENERATION,
        AppliesTo::ALL,
        "-m",
        vec![
            C::new("-m32", "32"),
            C::new("-m64", "64"),
            C::new("-mx32", "x32"),
        ],
    )?;

    schema.add_choice_option(
        CC_CMD_OPT_MIPS_ABI,
        "MIPS ABI (-mabi=)",
        CODE_GENERATION,
        AppliesTo::ALL,
        "-mabi=",
        vec![C::new("32", "32"), C::new("n32", "n32"), C::new("64", "64")],
    )?;

    schema.add_boolean_option(
        CC_CMD_OPT_DEBUG_INFO,
        "Generate debugging information (-g3)",
        CODE_GENERATION,
        AppliesTo::COMPILERS,
        "-g3",
    )?;
    schema.add_boolean_option(
        CC_CMD_OPT_PROFILE_INFO,
        "Generate profiling info for analysis (-pg)",
        CODE_GENERATION,
        AppliesTo::ALL,
        "-pg",
    )?;
    schema.add_boolean_option(
        CC_CMD_OPT_SYNTAX_ONLY,
        "Only check the code for syntax errors (-fsyntax-only)",
        CODE_GENERATION,
        AppliesTo::COMPILERS,
        "-fsyntax-only",
    )?;

    for (key, name, setting) in [
        (CC_CMD_OPT_INHIBIT_ALL_WARNING, "Inhibit all warning messages (-w)", "-w"),
        (CC_CMD_OPT_WARNING_ALL, "Show most warnings (-Wall)", "-Wall"),
        (CC_CMD_OPT_WARNING_EXTRA, "Show some more warnings (-Wextra)", "-Wextra"),
        (CC_CMD_OPT_CHECK_ISO_CONFORMANCE, "Check ISO C/C++ conformance (-pedantic)", "-pedantic"),
        (CC_CMD_OPT_WARNING_AS_ERROR, "Make all warnings into errors (-Werror)", "-Werror"),
        (CC_CMD_OPT_ABORT_ON_ERROR, "Abort compilation on first error (-Wfatal-errors)", "-Wfatal-errors"),
    ] {
        schema.add_boolean_option(key, name, WARNINGS, AppliesTo::COMPILERS, setting)?;
    }

    schema.add_choice_option(
        CC_CMD_OPT_STACK_PROTECTOR,
        "Check for stack smashing attacks (-fstack-protector)",
        WARNINGS,
        AppliesTo::LINKER,
        "-fstack-",
        vec![
            C::new("Normal", "protector"),
            C::new("Explicit", "protector-explicit"),
            C::new("Strong", "protector-strong"),
            C::new("All", "protector-all"),
        ],
    )?;

    schema.add_choice_option(
        CC_CMD_OPT_ADDRESS_SANITIZER,
        "Enable Sanitizer (-fsanitize=)",
        WARNINGS,
        AppliesTo::ALL,
        "-fsanitize=",
        vec![
            C::new("Address", "address"),
            C::new("Hwaddress", "hwaddress"),
            C::new("Thread", "thread"),
            C::new("Leak", "leak"),
            C::new("Undefined", "undefined"),
        ],
    )?;

    if cfg!(windows) {
        schema.add_number_option(
            LINK_CMD_OPT_STACK_SIZE,
            "Stack Size",
            LINKER,
            AppliesTo::LINKER,
            "-Wl,--stack,",
            NumberSpec {
                scale: 1024 * 1024,
                default: 12,
                min: 0,
                max: 99999,
                suffix: "MB".to_owned(),
            },
        )?;
    }

    schema.add_boolean_option(
        CC_CMD_OPT_USE_PIPE,
        "Use pipes instead of temporary files during compilation (-pipe)",
        LINKER,
        AppliesTo::COMPILERS,
        "-pipe",
    )?;
    schema.add_boolean_option(
        LINK_CMD_OPT_NO_LINK_STDLIB,
        "Do not use standard system libraries (-nostdlib)",
        LINKER,
        AppliesTo::LINKER,
        "-nostdlib",
    )?;
    schema.add_boolean_option(
        LINK_CMD_OPT_NO_CONSOLE,
        "Do not create a console window (-mwindows)",
        LINKER,
        AppliesTo::LINKER,
        "-mwindows",
    )?;
    schema.add_boolean_option(
        LINK_CMD_OPT_STRIP_EXE,
        "Strip executable (-s)",
        LINKER,
        AppliesTo::LINKER,
        "-s",
    )?;

    Ok(schema)
}

fn cpp_standards() -> Vec<C> {
    vec![
        C::new("ISO C++98", "c++98"),
        C::when("ISO C++11", "c++0x", gcc_at_least(4, 3).and(gcc_less_than(4, 7))),
        C::when("ISO C++11", "c++11", gcc_at_least(4, 7).or(clang())),
        C::when("ISO C++14", "c++1y", gcc_at_least(4, 8).and(gcc_less_than(5, 0))),
        C::when("ISO C++14", "c++14", gcc_at_least(5, 0).or(clang_at_least(3, 5))),
        C::when(
            "ISO C++17",
            "c++1z",
            Filter::Or(vec![
                gcc_at_least(5, 0).and(gcc_less_than(8, 0)),
                clang_at_least(3, 0).and(clang_less_than(5, 0)),
            ]),
        ),
        C::when("ISO C++17", "c++17", gcc_at_least(8, 0).or(clang_at_least(5, 0))),
        C::when(
            "ISO C++20",
            "c++2a",
            Filter::Or(vec![
                gcc_at_least(8, 0).and(gcc_less_than(10, 0)),
                clang_at_least(5, 0).and(clang_less_than(10, 0)),
            ]),
        ),
        C::when("ISO C++20", "c++20", gcc_at_least(10, 0).or(clang_at_least(10, 0))),
        C::when("ISO C++23", "c++2b", clang_at_least(12, 0).and(clang_less_than(17, 0))),
        C::when("ISO C++23", "c++23", gcc_at_least(11, 0).or(clang_at_least(17, 0))),
        C::when("ISO C++26", "c++26", gcc_at_least(14, 0).or(clang_at_least(17, 0))),
        C::new("GNU C++98", "gnu++98"),
        C::new("GNU C++11", "gnu++0x"),
        C::new("GNU C++11", "gnu++11"),
        C::new("GNU C++14", "gnu++1y"),
        C::new("GNU C++14", "gnu++14"),
        C::new("GNU C++17", "gnu++1z"),
        C::new("GNU C++17", "gnu++17"),
        C::new("GNU C++20", "gnu++2a"),
        C::new("GNU C++20", "gnu++20"),
        C::new("GNU C++23", "gnu++2b"),
        C::new("GNU C++23", "gnu++23"),
        C::new("GNU C++26", "gnu++2c"),
    ]
}

fn c_standards() -> Vec<C> {
    // -std=c?? replaced -fstd=c?? in 3.0, older releases are not supported.
    vec![
        C::new("ISO C90", "c90"),
        C::new("ISO C95", "iso9899:199409"),
        C::new("ISO C99", "c99"),
        C::when("ISO C11", "c1x", gcc_at_least(4, 6).and(gcc_less_than(4, 7))),
        C::when("ISO C11", "c11", gcc_at_least(4, 7).or(clang())),
        C::when("ISO C17", "c17", gcc_at_least(8, 0)),
        C::when("ISO C23", "c2x", gcc_at_least(9, 0).and(gcc_less_than(14, 0))),
        C::when("ISO C23", "c23", gcc_at_least(14, 0).or(clang_at_least(18, 0))),
        C::new("GNU C90", "gnu90"),
        C::new("GNU C99", "gnu99"),
        C::new("GNU C11", "gnu1x"),
        C::new("GNU C11", "gnu11"),
        C::new("GNU C17", "gnu17"),
        C::new("GNU C23", "gnu2x"),
        C::new("GNU C23", "gnu23"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CompilerIdentity;

    fn values(schema: &OptionSchema, key: &str, identity: &CompilerIdentity) -> Vec<String> {
        schema
            .get_option(key)
            .unwrap()
            .available_choices(identity)
            .map(|c| c.value.clone())
            .collect()
    }

    #[test]
    fn builds_without_duplicates() {
        let schema = catalog().unwrap();

        assert!(schema.has_option(CC_CMD_OPT_OPTIMIZE));
        assert!(schema.has_option(CC_CMD_OPT_MIPS_ABI));
        assert_eq!(schema.has_option(LINK_CMD_OPT_STACK_SIZE), cfg!(windows));
    }

    #[test]
    fn old_gcc_gets_old_standard_spellings() {
        let schema = catalog().unwrap();
        let gcc45 = CompilerIdentity::with_version(CompilerDriver::Gcc, 4, 5, 0);

        let std = values(&schema, CC_CMD_OPT_STD, &gcc45);

        assert!(std.contains(&"c++0x".to_owned()));
        assert!(!std.contains(&"c++11".to_owned()));
        assert!(!std.contains(&"c++17".to_owned()));
    }

    #[test]
    fn clang_gets_modern_spellings() {
        let schema = catalog().unwrap();
        let clang17 = CompilerIdentity::with_version(CompilerDriver::Clang, 17, 0, 6);

        let std = values(&schema, CC_CMD_OPT_STD, &clang17);
        assert!(std.contains(&"c++23".to_owned()));
        assert!(!std.contains(&"c++2b".to_owned()));

        let opt = values(&schema, CC_CMD_OPT_OPTIMIZE, &clang17);
        assert_eq!(opt, ["g", "1", "z", "s", "2", "3", "fast"]);
    }

    #[test]
    fn cpp_standard_needs_gcc_3_3() {
        let schema = catalog().unwrap();
        let std = schema.get_option(CC_CMD_OPT_STD).unwrap();

        assert!(!std.is_available(&CompilerIdentity::with_version(CompilerDriver::Gcc, 3, 2, 0)));
        assert!(std.is_available(&CompilerIdentity::with_version(CompilerDriver::Gcc, 3, 3, 0)));
    }
}
