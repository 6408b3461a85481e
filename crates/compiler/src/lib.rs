//! imgproxy Stack Compiler Library
//!
//! Copyright 2025 imgproxy stack contributors
//! Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
//! See the LICENSE file in the project root for details.
//!
//! This library assembles the CloudFormation template that runs imgproxy on ECS.
//! It works only with in-memory data (no file I/O) and keeps every section in
//! declaration order, so the same flags always produce byte-identical output.
//!
//! The pipeline is:
//! 1. [`config::resolve`] validates the deployment flags.
//! 2. [`assembler::assemble`] builds a [`template::Template`], deciding which
//!    subgraphs exist and gating the rest behind deploy-time conditions.
//! 3. [`render::render`] checks referential integrity and emits YAML or JSON.
//!
//! # Example
//!
//! ```rust,no_run
//! use imgproxy_stack_compiler::{generate, Encoders, InstanceCatalog, OutputFormat, RawFlags};
//!
//! let catalog = InstanceCatalog::embedded()?;
//! let flags = RawFlags {
//!     launch_type: "EC2".to_string(),
//!     ..RawFlags::default()
//! };
//! let yaml = generate(&flags, &catalog, OutputFormat::Yaml, &Encoders::standard())?;
//! assert!(yaml.contains("EC2AutoScalingGroup"));
//! # Ok::<(), imgproxy_stack_compiler::CompilerError>(())
//! ```

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod error;
pub mod render;
pub mod rules;
pub mod schemas;
pub mod template;

pub use assembler::assemble;
pub use catalog::InstanceCatalog;
pub use config::{resolve, DeploymentConfig, LaunchType, RawFlags};
pub use error::CompilerError;
pub use render::{render, Encoders, OutputFormat};
pub use template::Template;

/// Resolve `flags`, assemble the template and render it.
///
/// # Errors
///
/// Returns `CompilerError::Configuration` for rejected flags; any other
/// variant indicates a defect in the assembler.
pub fn generate(
    flags: &RawFlags,
    catalog: &InstanceCatalog,
    format: OutputFormat,
    encoders: &Encoders,
) -> Result<String, CompilerError> {
    let config = resolve(flags)?;
    let template = assemble(&config, catalog)?;
    render(&template, format, encoders)
}
