/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Template model - typed registries for the six template sections
 *
 * This module handles:
 * - Reference expressions and property values (`value`)
 * - Typed identifier handles (`ids`)
 * - Declaration of parameters, conditions, mappings, rules, resources and outputs
 * - Integrity checks run before rendering (`integrity`)
 */

pub mod entities;
pub mod ids;
pub mod integrity;
pub mod section;
pub mod value;

pub use entities::{
    Assertion, Condition, Mapping, Output, Parameter, ParameterType, Resource, Rule,
};
pub use ids::{ConditionId, MappingId, OutputId, ParameterId, ResourceId, RuleId};
pub use section::Section;
pub use value::{Expr, Properties, Pseudo, Target, Value};

use crate::error::{CompilerError, DeclarationError, ReferentialIntegrityError};

/// Template format version understood by the interpreter.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// An infrastructure template under construction.
///
/// Sections are append-only. Parameters and resources share one namespace in
/// the rendered document, so an identifier may appear in only one of them.
#[derive(Debug, Clone)]
pub struct Template {
    description: String,
    parameters: Section<Parameter>,
    conditions: Section<Condition>,
    mappings: Section<Mapping>,
    rules: Section<Rule>,
    resources: Section<Resource>,
    outputs: Section<Output>,
}

impl Template {
    #[must_use]
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            parameters: Section::new("Parameter"),
            conditions: Section::new("Condition"),
            mappings: Section::new("Mapping"),
            rules: Section::new("Rule"),
            resources: Section::new("Resource"),
            outputs: Section::new("Output"),
        }
    }

    /// # Errors
    ///
    /// Returns `DeclarationError` if the identifier is taken by a parameter or resource.
    pub fn declare_parameter(
        &mut self,
        id: &str,
        parameter: Parameter,
    ) -> Result<ParameterId, DeclarationError> {
        if self.resources.contains(id) {
            return Err(DeclarationError::DuplicateIdentifier {
                section: self.resources.name(),
                id: id.to_string(),
            });
        }
        self.parameters.declare(id, parameter)?;
        Ok(ParameterId::new(id))
    }

    /// # Errors
    ///
    /// Returns `DeclarationError` if the condition is already declared.
    pub fn declare_condition(
        &mut self,
        id: &str,
        condition: Condition,
    ) -> Result<ConditionId, DeclarationError> {
        self.conditions.declare(id, condition)?;
        Ok(ConditionId::new(id))
    }

    /// # Errors
    ///
    /// Returns `DeclarationError` if the mapping is already declared.
    pub fn declare_mapping(
        &mut self,
        id: &str,
        mapping: Mapping,
    ) -> Result<MappingId, DeclarationError> {
        self.mappings.declare(id, mapping)?;
        Ok(MappingId::new(id))
    }

    /// # Errors
    ///
    /// Returns `DeclarationError` if the rule is already declared.
    pub fn declare_rule(&mut self, id: &str, rule: Rule) -> Result<RuleId, DeclarationError> {
        self.rules.declare(id, rule)?;
        Ok(RuleId::new(id))
    }

    /// Declare a resource. Every `DependsOn` target must already be declared.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError` for a taken identifier and
    /// `ReferentialIntegrityError::MissingDependency` for an edge to an
    /// undeclared resource.
    pub fn declare_resource(
        &mut self,
        id: &str,
        resource: Resource,
    ) -> Result<ResourceId, CompilerError> {
        if self.parameters.contains(id) {
            return Err(DeclarationError::DuplicateIdentifier {
                section: self.parameters.name(),
                id: id.to_string(),
            }
            .into());
        }
        if let Some(missing) = resource
            .depends_on
            .iter()
            .find(|dependency| !self.resources.contains(dependency.as_str()))
        {
            return Err(ReferentialIntegrityError::MissingDependency {
                owner: id.to_string(),
                target: missing.to_string(),
            }
            .into());
        }
        self.resources.declare(id, resource)?;
        Ok(ResourceId::new(id))
    }

    /// # Errors
    ///
    /// Returns `DeclarationError` if the output is already declared.
    pub fn declare_output(&mut self, id: &str, output: Output) -> Result<OutputId, DeclarationError> {
        self.outputs.declare(id, output)?;
        Ok(OutputId::new(id))
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn parameters(&self) -> &Section<Parameter> {
        &self.parameters
    }

    #[must_use]
    pub fn conditions(&self) -> &Section<Condition> {
        &self.conditions
    }

    #[must_use]
    pub fn mappings(&self) -> &Section<Mapping> {
        &self.mappings
    }

    #[must_use]
    pub fn rules(&self) -> &Section<Rule> {
        &self.rules
    }

    #[must_use]
    pub fn resources(&self) -> &Section<Resource> {
        &self.resources
    }

    #[must_use]
    pub fn outputs(&self) -> &Section<Output> {
        &self.outputs
    }

    /// Resources of the given kind, in declaration order.
    pub fn resources_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = (&'a str, &'a Resource)> {
        self.resources.iter().filter(move |(_, r)| r.kind == kind)
    }

    /// Parameter groups in order of first appearance, each with its parameters.
    #[must_use]
    pub fn parameter_groups(&self) -> Vec<(&str, Vec<&str>)> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (id, parameter) in self.parameters.iter() {
            let Some(group) = parameter.group.as_deref() else {
                continue;
            };
            match groups.iter_mut().find(|(name, _)| *name == group) {
                Some((_, members)) => members.push(id),
                None => groups.push((group, vec![id])),
            }
        }
        groups
    }
}
