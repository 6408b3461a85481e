/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 */
use thiserror::Error;

/// Top-level error type for the compiler
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Declaration error: {0}")]
    Declaration(#[from] DeclarationError),

    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(#[from] ReferentialIntegrityError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
}

impl CompilerError {
    /// Whether the error was caused by user input rather than a defect in the assembler.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Catalog(_))
    }
}

/// Invalid deployment flag combinations, rejected before any model is built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("--no-cluster can be used only with --no-network")]
    ClusterRequiresExternalNetwork,

    #[error("Unknown launch type \"{0}\" (expected FARGATE or EC2)")]
    UnknownLaunchType(String),

    #[error("Subnet count must be between 1 and {max}, got {count}")]
    SubnetCountOutOfRange { count: u32, max: u32 },

    #[error("Unknown output format \"{0}\" (expected yaml or json)")]
    UnknownOutputFormat(String),
}

/// Instance catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid YAML: {0}")]
    InvalidYaml(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Invalid catalog version \"{0}\"")]
    InvalidVersion(String),

    #[error("Unsupported catalog version {found} (supported: {supported})")]
    UnsupportedVersion { found: String, supported: String },

    #[error("Invalid catalog: {0}")]
    Inconsistent(String),
}

/// Template model declaration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("{section} \"{id}\" is already declared")]
    DuplicateIdentifier { section: &'static str, id: String },
}

/// Broken cross-references in an assembled template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferentialIntegrityError {
    #[error("{owner} references undeclared {kind} \"{target}\"")]
    DanglingReference {
        owner: String,
        kind: &'static str,
        target: String,
    },

    #[error("Resource \"{owner}\" depends on \"{target}\", which is not declared")]
    MissingDependency { owner: String, target: String },

    #[error("{owner} is gated by undeclared condition \"{condition}\"")]
    UnknownCondition { owner: String, condition: String },

    #[error("{owner} looks up key \"{key}\" which mapping \"{mapping}\" does not declare")]
    UndeclaredMappingKey {
        owner: String,
        mapping: String,
        key: String,
    },

    #[error("{owner} looks up mapping \"{mapping}\" with a key that cannot be resolved statically")]
    UnresolvableMappingKey { owner: String, mapping: String },

    #[error("Parameter \"{0}\" is declared but nothing references it")]
    UnusedParameter(String),

    #[error("{owner} references \"{target}\", which only exists when condition \"{condition}\" holds")]
    UngatedReference {
        owner: String,
        target: String,
        condition: String,
    },
}

/// Rendering errors
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("No encoding rule registered for expression \"{0}\"")]
    UnknownExpression(String),

    #[error("Malformed payload for expression \"{tag}\": {reason}")]
    MalformedPayload { tag: String, reason: String },

    #[error("JSON serialization failed: {0}")]
    Json(String),

    #[error("YAML serialization failed: {0}")]
    Yaml(String),
}
