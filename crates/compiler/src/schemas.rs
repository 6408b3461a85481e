/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use serde_json::Value;

/// Embed the instance catalog schema at compile time
/// This avoids file I/O which is not available in WASM environments
const CATALOG_SCHEMA_JSON: &str = include_str!("../../../schemas/instance-catalog.schema.v1.json");

/// Embed the bundled instance catalog at compile time
pub const EMBEDDED_CATALOG_YAML: &str = include_str!("../../../catalogs/instance-types.v1.yaml");

/// Load the instance catalog schema
///
/// Returns the parsed JSON schema as a `serde_json::Value`.
/// This function never fails at runtime since the schema is embedded at compile time.
///
/// # Panics
///
/// Panics if the embedded schema JSON is invalid (this should never happen).
#[must_use]
pub fn load_catalog_schema() -> Value {
    serde_json::from_str(CATALOG_SCHEMA_JSON)
        .expect("Failed to parse embedded catalog schema - this should never happen")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_catalog_schema() {
        let schema = load_catalog_schema();
        assert!(schema.is_object());
        assert_eq!(schema["$schema"], "http://json-schema.org/draft-07/schema#");
        assert_eq!(schema["required"][2], "architectures");
    }

    #[test]
    fn test_embedded_catalog_is_not_empty() {
        assert!(EMBEDDED_CATALOG_YAML.contains("architectures:"));
    }
}
