/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Serializer - renders a finished template as JSON or YAML
 *
 * This module handles:
 * - Integrity checking before anything is emitted
 * - Encoding of expressions, including custom kinds (`encoders`)
 * - Canonical, deterministic document order (`document`)
 */

pub mod document;
pub mod encoders;

use std::fmt;
use std::str::FromStr;

use yaml_rust::YamlEmitter;

pub use document::{Lowerer, Node};
pub use encoders::{Encoders, Encoding, MAX_OR_OPERANDS};

use crate::error::{CompilerError, ConfigurationError, SerializationError};
use crate::template::{integrity, Template};

/// Document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigurationError::UnknownOutputFormat(s.to_string())),
        }
    }
}

/// Check and render a template.
///
/// The output always ends with a newline.
///
/// # Errors
///
/// Returns `CompilerError::ReferentialIntegrity` if the template is
/// inconsistent and `CompilerError::Serialization` if it cannot be encoded.
pub fn render(
    template: &Template,
    format: OutputFormat,
    encoders: &Encoders,
) -> Result<String, CompilerError> {
    integrity::check(template)?;
    let document = Lowerer::new(encoders).template(template)?;

    let mut out = match format {
        OutputFormat::Json => to_json(&document)?,
        OutputFormat::Yaml => to_yaml(&document)?,
    };
    out.push('\n');

    tracing::debug!(%format, bytes = out.len(), "rendered template");
    Ok(out)
}

fn to_json(document: &Node) -> Result<String, SerializationError> {
    serde_json::to_string_pretty(document).map_err(|e| SerializationError::Json(e.to_string()))
}

fn to_yaml(document: &Node) -> Result<String, SerializationError> {
    let mut out = String::new();
    let mut emitter = YamlEmitter::new(&mut out);
    emitter
        .dump(&document.to_yaml())
        .map_err(|e| SerializationError::Yaml(format!("{e:?}")))?;
    Ok(out)
}
