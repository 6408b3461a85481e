/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Section entry bodies: parameters, conditions, mappings, rules, resources and outputs.
 */

use crate::template::ids::{ConditionId, ResourceId};
use crate::template::value::{Properties, Value};

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Number,
    CommaDelimitedList,
    VpcId,
    SubnetIdList,
    SecurityGroupId,
}

impl ParameterType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::CommaDelimitedList => "CommaDelimitedList",
            Self::VpcId => "AWS::EC2::VPC::Id",
            Self::SubnetIdList => "List<AWS::EC2::Subnet::Id>",
            Self::SecurityGroupId => "AWS::EC2::SecurityGroup::Id",
        }
    }
}

/// A deploy-time input.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub kind: ParameterType,
    pub description: String,
    pub default: Option<Value>,
    pub allowed_values: Vec<String>,
    pub allowed_pattern: Option<String>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub constraint_description: Option<String>,
    pub group: Option<String>,
    pub label: Option<String>,
}

impl Parameter {
    #[must_use]
    pub fn new(kind: ParameterType, description: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
            default: None,
            allowed_values: Vec::new(),
            allowed_pattern: None,
            min_value: None,
            max_value: None,
            constraint_description: None,
            group: None,
            label: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn allowed_values<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.allowed_values = values.iter().map(|v| v.as_ref().to_string()).collect();
        self
    }

    #[must_use]
    pub fn allowed_pattern(mut self, pattern: &str, constraint: &str) -> Self {
        self.allowed_pattern = Some(pattern.to_string());
        self.constraint_description = Some(constraint.to_string());
        self
    }

    #[must_use]
    pub fn min(mut self, value: i64) -> Self {
        self.min_value = Some(value);
        self
    }

    #[must_use]
    pub fn max(mut self, value: i64) -> Self {
        self.max_value = Some(value);
        self
    }

    /// Place the parameter in a UI group under a human readable label.
    #[must_use]
    pub fn labelled(mut self, group: &str, label: &str) -> Self {
        self.group = Some(group.to_string());
        self.label = Some(label.to_string());
        self
    }
}

/// A deploy-time boolean, evaluated by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub expr: Value,
}

impl Condition {
    #[must_use]
    pub fn new(expr: Value) -> Self {
        Self { expr }
    }
}

/// A static two-level lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Properties)>,
}

impl Mapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entry(mut self, key: &str, values: Properties) -> Self {
        self.entries.push((key.to_string(), values));
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Properties)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Whether every outer key carries `attribute`.
    #[must_use]
    pub fn has_attribute(&self, attribute: &str) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|(_, v)| v.get(attribute).is_some())
    }
}

/// One assertion of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub assert: Value,
    pub description: String,
}

/// A deploy-time check of parameter values: all assertions must hold when the guard does.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub guard: Value,
    pub assertions: Vec<Assertion>,
}

impl Rule {
    #[must_use]
    pub fn new(guard: Value) -> Self {
        Self {
            guard,
            assertions: Vec::new(),
        }
    }

    #[must_use]
    pub fn assert(mut self, assert: Value, description: &str) -> Self {
        self.assertions.push(Assertion {
            assert,
            description: description.to_string(),
        });
        self
    }
}

/// A provisioned resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: String,
    pub properties: Properties,
    pub condition: Option<ConditionId>,
    pub depends_on: Vec<ResourceId>,
    pub creation_policy: Option<Properties>,
    pub update_policy: Option<Properties>,
}

impl Resource {
    #[must_use]
    pub fn new(kind: &str, properties: Properties) -> Self {
        Self {
            kind: kind.to_string(),
            properties,
            condition: None,
            depends_on: Vec::new(),
            creation_policy: None,
            update_policy: None,
        }
    }

    /// Gate the resource on a deploy-time condition.
    #[must_use]
    pub fn gated_by(mut self, condition: &ConditionId) -> Self {
        self.condition = Some(condition.clone());
        self
    }

    #[must_use]
    pub fn depends_on(mut self, resource: &ResourceId) -> Self {
        if !self.depends_on.contains(resource) {
            self.depends_on.push(resource.clone());
        }
        self
    }

    #[must_use]
    pub fn creation_policy(mut self, policy: Properties) -> Self {
        self.creation_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn update_policy(mut self, policy: Properties) -> Self {
        self.update_policy = Some(policy);
        self
    }
}

/// A stack output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub description: String,
    pub value: Value,
    pub condition: Option<ConditionId>,
}

impl Output {
    #[must_use]
    pub fn new(description: &str, value: Value) -> Self {
        Self {
            description: description.to_string(),
            value,
            condition: None,
        }
    }

    #[must_use]
    pub fn gated_by(mut self, condition: &ConditionId) -> Self {
        self.condition = Some(condition.clone());
        self
    }
}
