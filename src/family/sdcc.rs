use super::*;
use crate::schema::{AppliesTo, OptionChoice};

const CODE_GENERATION: &str = "Code Generation";
const MCU_SPECIFICATION: &str = "MCU Specification";

fn choices(pairs: &[(&str, &str)]) -> Vec<OptionChoice> {
    pairs
        .iter()
        .map(|(display, value)| OptionChoice::new(display, value))
        .collect()
}

pub(super) fn catalog() -> Result<OptionSchema, SchemaError> {
    let mut schema = OptionSchema::new("SDCC");

    schema.add_choice_option(
        SDCC_CMD_OPT_PROCESSOR,
        "Processor (-m)",
        CODE_GENERATION,
        AppliesTo::C,
        "-m",
        choices(&[
            ("Intel MCS51", "mcs51"),
            ("Dallas DS80C390", "ds390"),
            ("Dallas DS80C400", "ds400"),
            ("Freescale/Motorola HC08", "hc08"),
            ("Freescale/Motorola S08", "s08"),
            ("Zilog Z80", "z80"),
            ("Zilog Z180", "z180"),
            ("Rabbit 2000/3000", "r2k"),
            ("Rabbit 3000", "r3ka"),
            ("Sharp SM83", "sm83"),
            ("Toshiba TLCS-90", "tlcs90"),
            ("Zilog eZ80", "ez80_z80"),
            ("STM8", "stm8"),
            ("Padauk processors-13bit width memory", "pdk13"),
            ("Padauk processors-14bit width memory", "pdk14"),
            ("Padauk processors-15bit width memory", "pdk15"),
        ]),
    )?;

    schema.add_choice_option(
        SDCC_CMD_OPT_STD,
        "Language standard (--std)",
        CODE_GENERATION,
        AppliesTo::C,
        "--std-",
        choices(&[
            ("ANSI C89/ISO C90", "c89"),
            ("ISO C99", "c99"),
            ("ISO C11", "c11"),
            ("ISO C17", "c17"),
            ("ISO C2x", "c2x"),
            ("SDCC C89", "sdcc89"),
            ("SDCC C99", "sdcc99"),
            ("SDCC C11", "sdcc11"),
            ("SDCC C17", "sdcc17"),
            ("SDCC C2x", "sdcc2x"),
        ]),
    )?;

    schema.add_choice_option(
        SDCC_OPT_MEMORY_MODEL,
        "Memory model (--model)",
        CODE_GENERATION,
        AppliesTo::C,
        "--model",
        choices(&[
            ("Small", "-small"),
            ("Medium", "-medium"),
            ("Large", "-large"),
            ("Huge", "-huge"),
        ]),
    )?;

    for (key, name, setting) in [
        (SDCC_OPT_XSTACK, "Use external stack", "--xstack"),
        (SDCC_OPT_XRAM_MOVC, "Use movc instead of movx to read from external ram", "--xram-movc"),
        (SDCC_OPT_ACALL_AJMP, "Replaces lcall/ljmp with acall/ajmp", "--acall-ajmp"),
        (SDCC_OPT_NO_XINIT_OPT, "Don't memcpy initialized xram from code", "--no-xinit-opt"),
    ] {
        schema.add_boolean_option(key, name, CODE_GENERATION, AppliesTo::C, setting)?;
    }

    // Consumed by the build pipeline, never passed to sdcc itself.
    schema.add_boolean_option(
        SDCC_OPT_NOSTARTUP,
        "Don't generate startup code",
        CODE_GENERATION,
        AppliesTo::NONE,
        "nostartup",
    )?;

    for (key, name, setting) in [
        (SDCC_OPT_IRAM_SIZE, "Internal ram size", "--iram-size"),
        (SDCC_OPT_XRAM_LOC, "External ram start location", "--xram-loc"),
        (SDCC_OPT_XRAM_SIZE, "External ram size", "--xram-size"),
        (SDCC_OPT_STACK_LOC, "Stack pointer initial value", "--stack-loc"),
        (SDCC_OPT_XSTACK_LOC, "External stack start location", "--xstack-loc"),
        (SDCC_OPT_DATA_LOC, "Direct data start location", "--data-loc"),
        (SDCC_OPT_CODE_LOC, "Code segment location", "--code-loc"),
        (SDCC_OPT_CODE_SIZE, "Code segment size", "--code-size"),
    ] {
        schema.add_string_option(key, name, MCU_SPECIFICATION, AppliesTo::LINKER, setting)?;
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_model_renders_glued() {
        let schema = catalog().unwrap();

        let model = schema.get_option(SDCC_OPT_MEMORY_MODEL).unwrap();
        assert_eq!(model.render_argument("-large"), ["--model-large"]);
    }

    #[test]
    fn mcu_sizes_take_a_separate_value() {
        let schema = catalog().unwrap();

        let iram = schema.get_option(SDCC_OPT_IRAM_SIZE).unwrap();
        assert_eq!(iram.render_argument("256"), ["--iram-size", "256"]);
    }

    #[test]
    fn sections() {
        assert_eq!(catalog().unwrap().sections(), [CODE_GENERATION, MCU_SPECIFICATION]);
    }
}
