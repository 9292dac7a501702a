use super::*;

/// MSVC sets are never detected, so the catalog is intentionally empty.
pub(super) fn catalog() -> Result<OptionSchema, SchemaError> {
    Ok(OptionSchema::new("MSVC"))
}
