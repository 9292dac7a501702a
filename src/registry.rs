use std::{collections::HashMap, sync::Arc};

use log::debug;
use once_cell::sync::Lazy;

use crate::{
    error::SchemaError,
    family::CompilerFamily,
    filter::CompilerDriver,
    schema::{OptionDescriptor, OptionSchema},
};

static BUILTIN: Lazy<Arc<FamilyRegistry>> = Lazy::new(|| Arc::new(FamilyRegistry::builtin()));

/// The process-wide registry holding the built-in families.
///
/// Built on first access, never torn down. Callers needing extra families
/// clone it with [`FamilyRegistry::to_owned_registry`] and inject their own.
pub fn global() -> Arc<FamilyRegistry> {
    Arc::clone(&BUILTIN)
}

/// Maps a driver to the option catalog of its family.
#[derive(Clone, Debug, Default)]
pub struct FamilyRegistry {
    infos: HashMap<CompilerDriver, Arc<OptionSchema>>,
}

impl FamilyRegistry {
    pub fn empty() -> FamilyRegistry {
        FamilyRegistry::default()
    }

    pub fn try_builtin() -> Result<FamilyRegistry, SchemaError> {
        let mut registry = FamilyRegistry::empty();

        let gcc = Arc::new(CompilerFamily::Gcc.catalog()?);
        let sdcc = Arc::new(CompilerFamily::Sdcc.catalog()?);
        let msvc = Arc::new(CompilerFamily::Msvc.catalog()?);

        registry.insert(CompilerDriver::Gcc, Arc::clone(&gcc));
        registry.insert(CompilerDriver::Clang, gcc);
        registry.insert(CompilerDriver::Sdcc, sdcc);
        registry.insert(CompilerDriver::Msvc, Arc::clone(&msvc));
        registry.insert(CompilerDriver::ClangCl, msvc);

        Ok(registry)
    }

    /// Builds the built-in families.
    ///
    /// # Panics
    ///
    /// Panics when a built-in catalog registers the same key twice.
    pub fn builtin() -> FamilyRegistry {
        match FamilyRegistry::try_builtin() {
            Ok(registry) => registry,
            Err(e) => panic!("invalid built-in compiler catalog: {}", e),
        }
    }

    pub fn to_owned_registry(&self) -> FamilyRegistry {
        self.clone()
    }

    pub fn get_info(&self, driver: CompilerDriver) -> Option<&OptionSchema> {
        self.infos.get(&driver).map(AsRef::as_ref)
    }

    pub fn has_option(&self, driver: CompilerDriver, key: &str) -> bool {
        self.get_info(driver)
            .map_or(false, |schema| schema.has_option(key))
    }

    pub fn get_option(&self, driver: CompilerDriver, key: &str) -> Option<&OptionDescriptor> {
        self.get_info(driver)?.get_option(key)
    }

    pub fn option_list(&self, driver: CompilerDriver) -> &[OptionDescriptor] {
        self.get_info(driver)
            .map(OptionSchema::options)
            .unwrap_or_default()
    }

    /// Registers (or replaces) the catalog of `driver`.
    pub fn add_info(&mut self, driver: CompilerDriver, schema: OptionSchema) {
        debug!("Registering `{}` catalog for {}", schema.name(), driver);
        self.insert(driver, Arc::new(schema));
    }

    fn insert(&mut self, driver: CompilerDriver, schema: Arc<OptionSchema>) {
        self.infos.insert(driver, schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        family::{CC_CMD_OPT_OPTIMIZE, SDCC_CMD_OPT_PROCESSOR},
        schema::AppliesTo,
    };

    #[test]
    fn gcc_and_clang_share_a_catalog() {
        let registry = FamilyRegistry::builtin();

        assert!(registry.has_option(CompilerDriver::Gcc, CC_CMD_OPT_OPTIMIZE));
        assert!(registry.has_option(CompilerDriver::Clang, CC_CMD_OPT_OPTIMIZE));
        assert!(!registry.has_option(CompilerDriver::Sdcc, CC_CMD_OPT_OPTIMIZE));
        assert!(registry.has_option(CompilerDriver::Sdcc, SDCC_CMD_OPT_PROCESSOR));
    }

    #[test]
    fn msvc_is_a_stub() {
        let registry = FamilyRegistry::builtin();

        assert!(registry.get_info(CompilerDriver::Msvc).is_some());
        assert!(registry.option_list(CompilerDriver::ClangCl).is_empty());
    }

    #[test]
    fn unknown_driver_has_nothing() {
        let registry = FamilyRegistry::builtin();

        assert!(registry.get_info(CompilerDriver::Unknown).is_none());
        assert!(registry.get_option(CompilerDriver::Unknown, CC_CMD_OPT_OPTIMIZE).is_none());
        assert!(registry.option_list(CompilerDriver::Unknown).is_empty());
    }

    #[test]
    fn add_info_on_an_owned_copy() {
        let mut registry = global().to_owned_registry();

        let mut schema = OptionSchema::new("cl");
        schema
            .add_boolean_option("msvc_opt_nologo", "No logo", "Misc", AppliesTo::COMPILERS, "/nologo")
            .unwrap();
        registry.add_info(CompilerDriver::Msvc, schema);

        assert!(registry.has_option(CompilerDriver::Msvc, "msvc_opt_nologo"));
        assert!(!global().has_option(CompilerDriver::Msvc, "msvc_opt_nologo"));
    }

    #[test]
    fn global_is_built_once() {
        assert!(Arc::ptr_eq(&global(), &global()));
    }
}
