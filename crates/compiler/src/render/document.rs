/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Lowering of a template into an ordered document tree.
 *
 * JSON objects from `serde_json` sort their keys, so the tree keeps its own
 * ordered maps and implements `Serialize` directly.
 */

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use yaml_rust::yaml::Hash;
use yaml_rust::Yaml;

use crate::error::SerializationError;
use crate::render::encoders::{Encoders, Encoding};
use crate::template::value::{Expr, Properties, Value};
use crate::template::{Mapping, Output, Parameter, Resource, Rule, Template, FORMAT_VERSION};

/// A rendered document node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Node>),
    Map(Vec<(String, Node)>),
}

impl Node {
    fn str(value: &str) -> Self {
        Self::Str(value.to_string())
    }

    /// A single-key object, the shape of every intrinsic function.
    fn single(key: &str, value: Node) -> Self {
        Self::Map(vec![(key.to_string(), value)])
    }

    fn no_value() -> Self {
        Self::single("Ref", Self::str("AWS::NoValue"))
    }

    /// Convert to a `yaml-rust` value; hashes keep insertion order.
    #[must_use]
    pub fn to_yaml(&self) -> Yaml {
        match self {
            Self::Bool(b) => Yaml::Boolean(*b),
            Self::Int(i) => Yaml::Integer(*i),
            Self::Str(s) => Yaml::String(s.clone()),
            Self::List(items) => Yaml::Array(items.iter().map(Self::to_yaml).collect()),
            Self::Map(entries) => {
                let mut hash = Hash::new();
                for (key, value) in entries {
                    hash.insert(Yaml::String(key.clone()), value.to_yaml());
                }
                Yaml::Hash(hash)
            }
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Ordered map builder that leaves out absent and empty entries.
#[derive(Default)]
struct MapBuilder(Vec<(String, Node)>);

impl MapBuilder {
    fn put(&mut self, key: &str, value: Node) {
        self.0.push((key.to_string(), value));
    }

    fn put_opt(&mut self, key: &str, value: Option<Node>) {
        if let Some(value) = value {
            self.put(key, value);
        }
    }

    fn put_section(&mut self, key: &str, entries: Vec<(String, Node)>) {
        if !entries.is_empty() {
            self.put(key, Node::Map(entries));
        }
    }

    fn finish(self) -> Node {
        Node::Map(self.0)
    }
}

/// Lowers template entities into document nodes using a set of encoders.
pub struct Lowerer<'a> {
    encoders: &'a Encoders,
}

impl<'a> Lowerer<'a> {
    #[must_use]
    pub fn new(encoders: &'a Encoders) -> Self {
        Self { encoders }
    }

    /// The whole document, top-level keys in canonical order.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if a custom expression cannot be encoded.
    pub fn template(&self, template: &Template) -> Result<Node, SerializationError> {
        let mut document = MapBuilder::default();
        document.put("AWSTemplateFormatVersion", Node::str(FORMAT_VERSION));
        document.put("Description", Node::str(template.description()));
        document.put_opt("Metadata", interface_metadata(template));

        document.put_section(
            "Parameters",
            template
                .parameters()
                .iter()
                .map(|(id, p)| Ok((id.to_string(), self.parameter(p)?)))
                .collect::<Result<_, SerializationError>>()?,
        );
        document.put_section(
            "Conditions",
            template
                .conditions()
                .iter()
                .map(|(id, c)| Ok((id.to_string(), self.value(&c.expr)?)))
                .collect::<Result<_, SerializationError>>()?,
        );
        document.put_section(
            "Mappings",
            template
                .mappings()
                .iter()
                .map(|(id, m)| Ok((id.to_string(), self.mapping(m)?)))
                .collect::<Result<_, SerializationError>>()?,
        );
        document.put_section(
            "Rules",
            template
                .rules()
                .iter()
                .map(|(id, r)| Ok((id.to_string(), self.rule(r)?)))
                .collect::<Result<_, SerializationError>>()?,
        );
        document.put_section(
            "Resources",
            template
                .resources()
                .iter()
                .map(|(id, r)| Ok((id.to_string(), self.resource(r)?)))
                .collect::<Result<_, SerializationError>>()?,
        );
        document.put_section(
            "Outputs",
            template
                .outputs()
                .iter()
                .map(|(id, o)| Ok((id.to_string(), self.output(o)?)))
                .collect::<Result<_, SerializationError>>()?,
        );

        Ok(document.finish())
    }

    fn parameter(&self, parameter: &Parameter) -> Result<Node, SerializationError> {
        let mut node = MapBuilder::default();
        node.put("Type", Node::str(parameter.kind.as_str()));
        node.put("Description", Node::str(&parameter.description));
        if let Some(default) = &parameter.default {
            node.put("Default", self.value(default)?);
        }
        if !parameter.allowed_values.is_empty() {
            node.put(
                "AllowedValues",
                Node::List(parameter.allowed_values.iter().map(|v| Node::str(v)).collect()),
            );
        }
        node.put_opt("AllowedPattern", parameter.allowed_pattern.as_deref().map(Node::str));
        node.put_opt("MinValue", parameter.min_value.map(Node::Int));
        node.put_opt("MaxValue", parameter.max_value.map(Node::Int));
        node.put_opt(
            "ConstraintDescription",
            parameter.constraint_description.as_deref().map(Node::str),
        );
        Ok(node.finish())
    }

    fn mapping(&self, mapping: &Mapping) -> Result<Node, SerializationError> {
        let entries = mapping
            .entries()
            .map(|(key, values)| Ok((key.to_string(), self.properties(values)?)))
            .collect::<Result<_, SerializationError>>()?;
        Ok(Node::Map(entries))
    }

    fn rule(&self, rule: &Rule) -> Result<Node, SerializationError> {
        let assertions = rule
            .assertions
            .iter()
            .map(|assertion| {
                Ok(Node::Map(vec![
                    ("Assert".to_string(), self.value(&assertion.assert)?),
                    ("AssertDescription".to_string(), Node::str(&assertion.description)),
                ]))
            })
            .collect::<Result<_, SerializationError>>()?;

        let mut node = MapBuilder::default();
        node.put("RuleCondition", self.value(&rule.guard)?);
        node.put("Assertions", Node::List(assertions));
        Ok(node.finish())
    }

    fn resource(&self, resource: &Resource) -> Result<Node, SerializationError> {
        let mut node = MapBuilder::default();
        node.put("Type", Node::str(&resource.kind));
        node.put_opt("Condition", resource.condition.as_ref().map(|c| Node::str(c.as_str())));
        match resource.depends_on.as_slice() {
            [] => {}
            [single] => node.put("DependsOn", Node::str(single.as_str())),
            many => node.put(
                "DependsOn",
                Node::List(many.iter().map(|id| Node::str(id.as_str())).collect()),
            ),
        }
        node.put("Properties", self.properties(&resource.properties)?);
        if let Some(policy) = &resource.creation_policy {
            node.put("CreationPolicy", self.properties(policy)?);
        }
        if let Some(policy) = &resource.update_policy {
            node.put("UpdatePolicy", self.properties(policy)?);
        }
        Ok(node.finish())
    }

    fn output(&self, output: &Output) -> Result<Node, SerializationError> {
        let mut node = MapBuilder::default();
        node.put("Description", Node::str(&output.description));
        node.put("Value", self.value(&output.value)?);
        node.put_opt("Condition", output.condition.as_ref().map(|c| Node::str(c.as_str())));
        Ok(node.finish())
    }

    fn properties(&self, properties: &Properties) -> Result<Node, SerializationError> {
        let entries = properties
            .iter()
            .map(|(key, value)| Ok((key.to_string(), self.value(value)?)))
            .collect::<Result<_, SerializationError>>()?;
        Ok(Node::Map(entries))
    }

    fn values(&self, values: &[Value]) -> Result<Node, SerializationError> {
        let items = values
            .iter()
            .map(|value| self.value(value))
            .collect::<Result<_, SerializationError>>()?;
        Ok(Node::List(items))
    }

    /// Encode a property value.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if a custom expression cannot be encoded.
    pub fn value(&self, value: &Value) -> Result<Node, SerializationError> {
        match value {
            Value::Bool(b) => Ok(Node::Bool(*b)),
            Value::Int(i) => Ok(Node::Int(*i)),
            Value::Str(s) => Ok(Node::str(s)),
            Value::List(items) => self.values(items),
            Value::Map(map) => self.properties(map),
            Value::Expr(expr) => self.expr(expr),
        }
    }

    fn expr(&self, expr: &Expr) -> Result<Node, SerializationError> {
        let node = match expr {
            Expr::Ref(target) => Node::single("Ref", Node::str(target.name())),
            Expr::GetAtt(resource, attribute) => Node::single(
                "Fn::GetAtt",
                Node::List(vec![Node::str(resource.as_str()), Node::str(attribute)]),
            ),
            Expr::Join(separator, parts) => Node::single(
                "Fn::Join",
                Node::List(vec![Node::str(separator), self.value(parts)?]),
            ),
            Expr::Select(index, list) => Node::single(
                "Fn::Select",
                Node::List(vec![Node::Int(i64::from(*index)), self.value(list)?]),
            ),
            Expr::FindInMap(mapping, key, attribute) => Node::single(
                "Fn::FindInMap",
                Node::List(vec![
                    Node::str(mapping.as_str()),
                    self.value(key)?,
                    self.value(attribute)?,
                ]),
            ),
            Expr::Sub(template, variables) if variables.is_empty() => {
                Node::single("Fn::Sub", Node::str(template))
            }
            Expr::Sub(template, variables) => {
                let variables = variables
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), self.value(value)?)))
                    .collect::<Result<_, SerializationError>>()?;
                Node::single(
                    "Fn::Sub",
                    Node::List(vec![Node::str(template), Node::Map(variables)]),
                )
            }
            Expr::Base64(inner) => Node::single("Fn::Base64", self.value(inner)?),
            Expr::AvailabilityZones => Node::single("Fn::GetAZs", Node::str("")),
            Expr::Not(inner) => Node::single("Fn::Not", Node::List(vec![self.value(inner)?])),
            Expr::Equals(left, right) => Node::single(
                "Fn::Equals",
                Node::List(vec![self.value(left)?, self.value(right)?]),
            ),
            Expr::And(items) => Node::single("Fn::And", self.values(items)?),
            Expr::Or(items) => Node::single("Fn::Or", self.values(items)?),
            Expr::Condition(id) => Node::single("Condition", Node::str(id.as_str())),
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                let branch = |value: &Option<Value>| match value {
                    Some(value) => self.value(value),
                    None => Ok(Node::no_value()),
                };
                Node::single(
                    "Fn::If",
                    Node::List(vec![
                        Node::str(condition.as_str()),
                        branch(then)?,
                        branch(otherwise)?,
                    ]),
                )
            }
            Expr::Custom { tag, payload } => match self.encoders.get(tag)? {
                Encoding::Intrinsic(name) => Node::single(name, self.value(payload)?),
                Encoding::Lowered(lower) => self.value(&lower(tag, payload)?)?,
            },
        };
        Ok(node)
    }
}

/// `AWS::CloudFormation::Interface` metadata, when any parameter is grouped or labelled.
fn interface_metadata(template: &Template) -> Option<Node> {
    let groups: Vec<Node> = template
        .parameter_groups()
        .into_iter()
        .map(|(group, members)| {
            Node::Map(vec![
                ("Label".to_string(), Node::single("default", Node::str(group))),
                (
                    "Parameters".to_string(),
                    Node::List(members.into_iter().map(Node::str).collect()),
                ),
            ])
        })
        .collect();
    let labels: Vec<(String, Node)> = template
        .parameters()
        .iter()
        .filter_map(|(id, p)| {
            p.label
                .as_deref()
                .map(|label| (id.to_string(), Node::single("default", Node::str(label))))
        })
        .collect();

    if groups.is_empty() && labels.is_empty() {
        return None;
    }

    let mut interface = MapBuilder::default();
    if !groups.is_empty() {
        interface.put("ParameterGroups", Node::List(groups));
    }
    interface.put_section("ParameterLabels", labels);
    Some(Node::single(
        "AWS::CloudFormation::Interface",
        interface.finish(),
    ))
}
