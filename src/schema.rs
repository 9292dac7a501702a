use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    error::SchemaError,
    filter::{CompilerIdentity, Filter},
};

/// Value assigned to a boolean option that is switched on.
pub const OPTION_ON: &str = "on";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Boolean,
    Choice,
    Number,
    String,
    Args,
}

/// Which tool an option is passed to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptionTarget {
    CCompiler,
    CppCompiler,
    Linker,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliesTo {
    pub c: bool,
    pub cpp: bool,
    pub linker: bool,
}

impl AppliesTo {
    pub const NONE: AppliesTo = AppliesTo::new(false, false, false);
    pub const COMPILERS: AppliesTo = AppliesTo::new(true, true, false);
    pub const C: AppliesTo = AppliesTo::new(true, false, false);
    pub const CPP: AppliesTo = AppliesTo::new(false, true, false);
    pub const LINKER: AppliesTo = AppliesTo::new(false, false, true);
    pub const ALL: AppliesTo = AppliesTo::new(true, true, true);

    pub const fn new(c: bool, cpp: bool, linker: bool) -> AppliesTo {
        AppliesTo { c, cpp, linker }
    }

    pub fn contains(&self, target: OptionTarget) -> bool {
        match target {
            OptionTarget::CCompiler => self.c,
            OptionTarget::CppCompiler => self.cpp,
            OptionTarget::Linker => self.linker,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionChoice {
    pub display: String,
    pub value: String,
    pub availability: Filter,
}

impl OptionChoice {
    pub fn new(display: &str, value: &str) -> OptionChoice {
        OptionChoice {
            display: display.to_owned(),
            value: value.to_owned(),
            availability: Filter::Always,
        }
    }

    pub fn when(display: &str, value: &str, availability: Filter) -> OptionChoice {
        OptionChoice {
            availability,
            ..OptionChoice::new(display, value)
        }
    }
}

/// Spin-box parameters of a numeric option.
///
/// Values are stored and clamped in display units (`MB` for a stack size)
/// and multiplied by `scale` when rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberSpec {
    pub scale: i64,
    pub default: i64,
    pub min: i64,
    pub max: i64,
    pub suffix: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionDescriptor {
    pub key: String,
    pub name: String,
    pub section: String,
    pub applies_to: AppliesTo,
    /// Flag token, or the prefix a chosen value is appended to.
    pub setting: String,
    pub kind: OptionKind,
    pub choices: Vec<OptionChoice>,
    pub number: Option<NumberSpec>,
    pub availability: Filter,
}

impl OptionDescriptor {
    fn new(
        key: &str,
        name: &str,
        section: &str,
        applies_to: AppliesTo,
        setting: &str,
        kind: OptionKind,
    ) -> OptionDescriptor {
        OptionDescriptor {
            key: key.to_owned(),
            name: name.to_owned(),
            section: section.to_owned(),
            applies_to,
            setting: setting.to_owned(),
            kind,
            choices: Vec::new(),
            number: None,
            availability: Filter::Always,
        }
    }

    pub fn is_available(&self, identity: &CompilerIdentity) -> bool {
        self.availability.eval(identity)
    }

    pub fn available_choices<'a>(
        &'a self,
        identity: &'a CompilerIdentity,
    ) -> impl Iterator<Item = &'a OptionChoice> + 'a {
        self.choices
            .iter()
            .filter(move |choice| choice.availability.eval(identity))
    }

    pub fn choice_by_value(&self, value: &str) -> Option<&OptionChoice> {
        self.choices.iter().find(|choice| choice.value == value)
    }

    /// Turns a stored value into command-line arguments.
    ///
    /// An empty value renders nothing for every kind except numbers, which
    /// fall back to their default.
    pub fn render_argument(&self, value: &str) -> Vec<String> {
        match self.kind {
            OptionKind::Boolean if value.is_empty() => Vec::new(),
            OptionKind::Boolean => vec![self.setting.clone()],

            OptionKind::Choice if value.is_empty() => Vec::new(),
            OptionKind::Choice => vec![format!("{}{}", self.setting, value)],

            OptionKind::Number => {
                let spec = match &self.number {
                    Some(spec) => spec,
                    None => return Vec::new(),
                };

                let value = value.trim().parse::<i64>().unwrap_or(spec.default);
                let value = value.clamp(spec.min, spec.max);

                vec![format!("{}{}", self.setting, value.saturating_mul(spec.scale))]
            }

            OptionKind::String if value.is_empty() => Vec::new(),
            OptionKind::String => vec![self.setting.clone(), value.to_owned()],

            OptionKind::Args => {
                let tokens = value.split_whitespace().map(str::to_owned);

                if self.setting.is_empty() {
                    tokens.collect()
                } else if value.trim().is_empty() {
                    Vec::new()
                } else {
                    std::iter::once(self.setting.clone()).chain(tokens).collect()
                }
            }
        }
    }
}

/// The option catalog of one compiler family.
#[derive(Clone, Debug, Default)]
pub struct OptionSchema {
    name: String,
    options: Vec<OptionDescriptor>,
    index: HashMap<String, usize>,
}

impl OptionSchema {
    pub fn new(name: &str) -> OptionSchema {
        OptionSchema {
            name: name.to_owned(),
            ..OptionSchema::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &[OptionDescriptor] {
        &self.options
    }

    pub fn get_option(&self, key: &str) -> Option<&OptionDescriptor> {
        self.index.get(key).map(|idx| &self.options[*idx])
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn sections(&self) -> Vec<&str> {
        self.options
            .iter()
            .map(|option| option.section.as_str())
            .unique()
            .collect()
    }

    pub fn add_boolean_option(
        &mut self,
        key: &str,
        name: &str,
        section: &str,
        applies_to: AppliesTo,
        setting: &str,
    ) -> Result<&mut OptionDescriptor, SchemaError> {
        let option = OptionDescriptor::new(
            key,
            name,
            section,
            applies_to,
            setting,
            OptionKind::Boolean,
        );

        self.insert(option)
    }

    pub fn add_choice_option(
        &mut self,
        key: &str,
        name: &str,
        section: &str,
        applies_to: AppliesTo,
        setting: &str,
        choices: Vec<OptionChoice>,
    ) -> Result<&mut OptionDescriptor, SchemaError> {
        if choices.is_empty() {
            return Err(SchemaError::EmptyChoices {
                key: key.to_owned(),
            });
        }

        let mut option =
            OptionDescriptor::new(key, name, section, applies_to, setting, OptionKind::Choice);
        option.choices = choices;

        self.insert(option)
    }

    pub fn add_number_option(
        &mut self,
        key: &str,
        name: &str,
        section: &str,
        applies_to: AppliesTo,
        setting: &str,
        spec: NumberSpec,
    ) -> Result<&mut OptionDescriptor, SchemaError> {
        let mut option =
            OptionDescriptor::new(key, name, section, applies_to, setting, OptionKind::Number);
        option.number = Some(spec);

        self.insert(option)
    }

    pub fn add_string_option(
        &mut self,
        key: &str,
        name: &str,
        section: &str,
        applies_to: AppliesTo,
        setting: &str,
    ) -> Result<&mut OptionDescriptor, SchemaError> {
        let option =
            OptionDescriptor::new(key, name, section, applies_to, setting, OptionKind::String);

        self.insert(option)
    }

    pub fn add_args_option(
        &mut self,
        key: &str,
        name: &str,
        section: &str,
        applies_to: AppliesTo,
        setting: &str,
    ) -> Result<&mut OptionDescriptor, SchemaError> {
        let option =
            OptionDescriptor::new(key, name, section, applies_to, setting, OptionKind::Args);

        self.insert(option)
    }

    fn insert(&mut self, option: OptionDescriptor) -> Result<&mut OptionDescriptor, SchemaError> {
        if self.index.contains_key(&option.key) {
            return Err(SchemaError::DuplicateKey {
                family: self.name.clone(),
                key: option.key,
            });
        }

        let idx = self.options.len();
        self.index.insert(option.key.clone(), idx);
        self.options.push(option);

        Ok(&mut self.options[idx])
    }
}

/// Renders `value` for `descriptor`.
pub fn render_argument(descriptor: &OptionDescriptor, value: &str) -> Vec<String> {
    descriptor.render_argument(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{gcc_at_least, CompilerDriver};

    fn sample_schema() -> OptionSchema {
        let mut schema = OptionSchema::new("sample");

        schema
            .add_choice_option(
                "opt",
                "Optimization",
                "Code Generation",
                AppliesTo::COMPILERS,
                "-O",
                vec![
                    OptionChoice::new("-O2", "2"),
                    OptionChoice::when("-Ofast", "fast", gcc_at_least(4, 6)),
                ],
            )
            .unwrap();
        schema
            .add_boolean_option("g", "Debug info", "Code Generation", AppliesTo::COMPILERS, "-g3")
            .unwrap();
        schema
            .add_number_option(
                "stack",
                "Stack Size",
                "Linker",
                AppliesTo::LINKER,
                "-Wl,--stack,",
                NumberSpec {
                    scale: 1024 * 1024,
                    default: 12,
                    min: 0,
                    max: 99999,
                    suffix: "MB".to_owned(),
                },
            )
            .unwrap();
        schema
            .add_string_option("iram", "Internal ram size", "MCU", AppliesTo::LINKER, "--iram-size")
            .unwrap();
        schema
            .add_args_option("extra", "Extra", "Misc", AppliesTo::ALL, "")
            .unwrap();

        schema
    }

    mod registration {
        use super::*;

        #[test]
        fn lookup_by_key() {
            let schema = sample_schema();

            assert!(schema.has_option("opt"));
            assert_eq!(schema.get_option("g").unwrap().setting, "-g3");
            assert!(schema.get_option("nope").is_none());
        }

        #[test]
        fn duplicate_key_is_rejected() {
            let mut schema = sample_schema();

            let err = schema
                .add_boolean_option("g", "Again", "Code Generation", AppliesTo::C, "-g")
                .unwrap_err();

            assert_eq!(
                err,
                SchemaError::DuplicateKey {
                    family: "sample".to_owned(),
                    key: "g".to_owned()
                }
            );
            assert_eq!(schema.options().len(), 5);
        }

        #[test]
        fn choice_option_needs_choices() {
            let mut schema = OptionSchema::new("sample");

            let err = schema
                .add_choice_option("c", "C", "S", AppliesTo::C, "-c", vec![])
                .unwrap_err();

            assert!(matches!(err, SchemaError::EmptyChoices { .. }));
        }

        #[test]
        fn sections_keep_first_seen_order() {
            assert_eq!(
                sample_schema().sections(),
                ["Code Generation", "Linker", "MCU", "Misc"]
            );
        }
    }

    mod rendering {
        use super::*;

        #[test]
        fn choice_is_prefix_plus_value() {
            let schema = sample_schema();

            let opt = schema.get_option("opt").unwrap();
            assert_eq!(render_argument(opt, "fast"), ["-Ofast"]);
            assert!(render_argument(opt, "").is_empty());
        }

        #[test]
        fn boolean_is_flag_when_set() {
            let schema = sample_schema();

            let g = schema.get_option("g").unwrap();
            assert_eq!(render_argument(g, OPTION_ON), ["-g3"]);
            assert!(render_argument(g, "").is_empty());
        }

        #[test]
        fn number_is_scaled() {
            let schema = sample_schema();

            let stack = schema.get_option("stack").unwrap();
            assert_eq!(render_argument(stack, "12"), ["-Wl,--stack,12582912"]);
        }

        #[test]
        fn number_is_clamped_before_scaling() {
            let schema = sample_schema();

            let stack = schema.get_option("stack").unwrap();
            assert_eq!(
                render_argument(stack, "100000"),
                [format!("-Wl,--stack,{}", 99999_i64 * 1024 * 1024)]
            );
            assert_eq!(render_argument(stack, "-4"), ["-Wl,--stack,0"]);
        }

        #[test]
        fn number_falls_back_to_default() {
            let schema = sample_schema();

            let stack = schema.get_option("stack").unwrap();
            assert_eq!(render_argument(stack, "lots"), ["-Wl,--stack,12582912"]);
        }

        #[test]
        fn string_is_separate_argument() {
            let schema = sample_schema();

            let iram = schema.get_option("iram").unwrap();
            assert_eq!(render_argument(iram, "0x100"), ["--iram-size", "0x100"]);
        }

        #[test]
        fn args_are_split_on_whitespace() {
            let schema = sample_schema();

            let extra = schema.get_option("extra").unwrap();
            assert_eq!(
                render_argument(extra, " -DFOO  -fno-rtti "),
                ["-DFOO", "-fno-rtti"]
            );
        }
    }

    #[test]
    fn choices_are_filtered_by_identity() {
        let schema = sample_schema();
        let opt = schema.get_option("opt").unwrap();

        let old = CompilerIdentity::with_version(CompilerDriver::Gcc, 4, 4, 7);
        let values = opt
            .available_choices(&old)
            .map(|c| c.value.as_str())
            .collect::<Vec<_>>();

        assert_eq!(values, ["2"]);
    }
}
