/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Versioned catalog of CPU architectures and the EC2 instance types allowed for each.
 */

pub mod parse;

use std::collections::HashSet;

use jsonschema::JSONSchema;
use semver::{Version, VersionReq};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CatalogError;
use crate::schemas;

/// Catalog versions this build understands.
pub const SUPPORTED_VERSIONS: &str = "^1.0";

/// One CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    /// Value of the `CpuArchitecture` parameter, e.g. `ARM64`.
    pub name: String,
    /// ECS runtime platform spelling, e.g. `X86_64`.
    pub platform: String,
    /// Machine image used by cluster instances.
    pub image_id: String,
    pub instance_types: Vec<String>,
}

/// Instance catalog consumed by the assembler and the rule compiler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceCatalog {
    pub version: String,
    pub default_instance_type: String,
    pub architectures: Vec<Architecture>,
}

impl InstanceCatalog {
    /// The catalog bundled with this build.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled catalog is broken.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::parse(schemas::EMBEDDED_CATALOG_YAML, Some("instance-types.v1.yaml"))
    }

    /// Parse, schema-validate and check a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` describing the first problem found.
    pub fn parse(content: &str, file_name: Option<&str>) -> Result<Self, CatalogError> {
        let document = parse::parse_yaml_or_json(content, file_name)?;
        validate_schema(&document)?;

        let catalog: Self = serde_json::from_value(document)
            .map_err(|e| CatalogError::SchemaValidation(e.to_string()))?;
        catalog.check_version()?;
        catalog.check_consistency()?;

        tracing::debug!(
            version = %catalog.version,
            architectures = catalog.architectures.len(),
            "loaded instance catalog"
        );
        Ok(catalog)
    }

    /// Architecture names in catalog order.
    pub fn architecture_names(&self) -> impl Iterator<Item = &str> {
        self.architectures.iter().map(|a| a.name.as_str())
    }

    /// Every instance type, architectures in catalog order.
    pub fn all_instance_types(&self) -> impl Iterator<Item = &str> {
        self.architectures
            .iter()
            .flat_map(|a| a.instance_types.iter().map(String::as_str))
    }

    /// The architecture offered by default (the first one).
    #[must_use]
    pub fn default_architecture(&self) -> &Architecture {
        // Non-empty: enforced by the schema.
        &self.architectures[0]
    }

    fn check_version(&self) -> Result<(), CatalogError> {
        let version =
            Version::parse(&self.version).map_err(|_| CatalogError::InvalidVersion(self.version.clone()))?;
        let supported = VersionReq::parse(SUPPORTED_VERSIONS)
            .map_err(|_| CatalogError::InvalidVersion(SUPPORTED_VERSIONS.to_string()))?;
        if !supported.matches(&version) {
            return Err(CatalogError::UnsupportedVersion {
                found: self.version.clone(),
                supported: SUPPORTED_VERSIONS.to_string(),
            });
        }
        Ok(())
    }

    fn check_consistency(&self) -> Result<(), CatalogError> {
        let mut names = HashSet::new();
        for architecture in &self.architectures {
            if !names.insert(architecture.name.as_str()) {
                return Err(CatalogError::Inconsistent(format!(
                    "architecture \"{}\" is listed twice",
                    architecture.name
                )));
            }
        }

        let mut instance_types = HashSet::new();
        for instance_type in self.all_instance_types() {
            if !instance_types.insert(instance_type) {
                return Err(CatalogError::Inconsistent(format!(
                    "instance type \"{instance_type}\" is listed more than once"
                )));
            }
        }

        if !self.default_architecture().instance_types.contains(&self.default_instance_type) {
            return Err(CatalogError::Inconsistent(format!(
                "default instance type \"{}\" is not offered by the default architecture \"{}\"",
                self.default_instance_type,
                self.default_architecture().name
            )));
        }
        Ok(())
    }
}

fn validate_schema(document: &Value) -> Result<(), CatalogError> {
    let schema = schemas::load_catalog_schema();
    let compiled = JSONSchema::compile(&schema)
        .map_err(|e| CatalogError::SchemaValidation(format!("Failed to compile schema: {e}")))?;

    if let Err(errors) = compiled.validate(document) {
        let messages: Vec<String> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{path}: {error}")
                }
            })
            .collect();
        return Err(CatalogError::SchemaValidation(messages.join("; ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
version: "1.2.0"
defaultInstanceType: m7g.large
architectures:
  - name: ARM64
    platform: ARM64
    imageId: ami-arm
    instanceTypes: [m7g.large, m7g.xlarge]
  - name: AMD64
    platform: X86_64
    imageId: ami-x86
    instanceTypes: [m7i.large]
"#;

    #[test]
    fn test_embedded_catalog() {
        let catalog = InstanceCatalog::embedded().unwrap();
        assert_eq!(
            catalog.architecture_names().collect::<Vec<_>>(),
            vec!["ARM64", "AMD64"]
        );
        assert_eq!(catalog.default_instance_type, "c7g.medium");
        assert_eq!(catalog.architectures[1].platform, "X86_64");
        assert_eq!(catalog.all_instance_types().count(), 13 + 33);
    }

    #[test]
    fn test_parse_small_catalog() {
        let catalog = InstanceCatalog::parse(SMALL, None).unwrap();
        assert_eq!(catalog.default_architecture().name, "ARM64");
        assert_eq!(
            catalog.all_instance_types().collect::<Vec<_>>(),
            vec!["m7g.large", "m7g.xlarge", "m7i.large"]
        );
    }

    #[test]
    fn test_parse_json_catalog() {
        let json = r#"{
            "version": "1.0.0",
            "defaultInstanceType": "a.b",
            "architectures": [
                {"name": "ARM64", "platform": "ARM64", "imageId": "ami", "instanceTypes": ["a.b"]}
            ]
        }"#;
        let catalog = InstanceCatalog::parse(json, Some("catalog.json")).unwrap();
        assert_eq!(catalog.architectures.len(), 1);
    }

    #[test]
    fn test_reject_schema_violation() {
        let broken = SMALL.replace("platform: X86_64", "platform: SPARC");
        assert!(matches!(
            InstanceCatalog::parse(&broken, None),
            Err(CatalogError::SchemaValidation(_))
        ));

        let missing = "version: \"1.0.0\"\narchitectures: []\n";
        assert!(matches!(
            InstanceCatalog::parse(missing, None),
            Err(CatalogError::SchemaValidation(_))
        ));
    }

    #[test]
    fn test_reject_non_alphanumeric_architecture_name() {
        // Names end up inside rule logical ids, which only allow letters and digits.
        let underscored = SMALL.replace("name: ARM64", "name: ARM_64");
        assert!(matches!(
            InstanceCatalog::parse(&underscored, None),
            Err(CatalogError::SchemaValidation(_))
        ));

        let lowercase = SMALL.replace("name: AMD64", "name: amd64");
        assert!(matches!(
            InstanceCatalog::parse(&lowercase, None),
            Err(CatalogError::SchemaValidation(_))
        ));
    }

    #[test]
    fn test_reject_unsupported_version() {
        let future = SMALL.replace("1.2.0", "2.0.0");
        match InstanceCatalog::parse(&future, None) {
            Err(CatalogError::UnsupportedVersion { found, .. }) => assert_eq!(found, "2.0.0"),
            other => panic!("Expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_reject_duplicate_instance_type() {
        let duplicated = SMALL.replace("[m7i.large]", "[m7i.large, m7g.large]");
        assert!(matches!(
            InstanceCatalog::parse(&duplicated, None),
            Err(CatalogError::Inconsistent(msg)) if msg.contains("m7g.large")
        ));
    }

    #[test]
    fn test_reject_duplicate_architecture() {
        let duplicated = SMALL.replace("name: AMD64", "name: ARM64");
        assert!(matches!(
            InstanceCatalog::parse(&duplicated, None),
            Err(CatalogError::Inconsistent(msg)) if msg.contains("ARM64")
        ));
    }

    #[test]
    fn test_reject_foreign_default_instance_type() {
        let foreign = SMALL.replace("defaultInstanceType: m7g.large", "defaultInstanceType: m7i.large");
        assert!(matches!(
            InstanceCatalog::parse(&foreign, None),
            Err(CatalogError::Inconsistent(_))
        ));
    }
}
