/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Referential integrity checks run before a template is rendered.
 *
 * A template passes when:
 * - every `Ref`, `Fn::GetAtt`, `Fn::Sub` variable, condition reference and
 *   `DependsOn` edge names a declared entity;
 * - every gating condition is declared;
 * - every `Fn::FindInMap` lookup resolves against declared mapping keys, either
 *   literally or through the allowed values of the parameter used as key;
 * - every parameter is referenced by something;
 * - a conditioned resource is only referenced under the same condition.
 */

use std::collections::HashSet;

use crate::error::ReferentialIntegrityError;
use crate::template::value::{Expr, Target, Value};
use crate::template::{MappingId, Template};

/// Check every invariant of an assembled template.
///
/// # Errors
///
/// Returns the first `ReferentialIntegrityError` found.
pub fn check(template: &Template) -> Result<(), ReferentialIntegrityError> {
    let mut checker = Checker {
        template,
        used_parameters: HashSet::new(),
    };

    for (id, condition) in template.conditions().iter() {
        let owner = format!("Condition \"{id}\"");
        checker.value(&owner, &condition.expr, &mut Vec::new())?;
    }

    for (id, rule) in template.rules().iter() {
        let owner = format!("Rule \"{id}\"");
        checker.value(&owner, &rule.guard, &mut Vec::new())?;
        for assertion in &rule.assertions {
            checker.value(&owner, &assertion.assert, &mut Vec::new())?;
        }
    }

    for (id, resource) in template.resources().iter() {
        let owner = format!("Resource \"{id}\"");
        let mut gates = checker.gate(&owner, resource.condition.as_ref().map(|c| c.as_str()))?;

        for dependency in &resource.depends_on {
            if !template.resources().contains(dependency.as_str()) {
                return Err(ReferentialIntegrityError::MissingDependency {
                    owner: id.to_string(),
                    target: dependency.to_string(),
                });
            }
            checker.resource_gate(&owner, dependency.as_str(), &gates)?;
        }

        for (_, value) in resource.properties.iter() {
            checker.value(&owner, value, &mut gates)?;
        }
        for policy in [&resource.creation_policy, &resource.update_policy].into_iter().flatten() {
            for (_, value) in policy.iter() {
                checker.value(&owner, value, &mut gates)?;
            }
        }
    }

    for (id, output) in template.outputs().iter() {
        let owner = format!("Output \"{id}\"");
        let mut gates = checker.gate(&owner, output.condition.as_ref().map(|c| c.as_str()))?;
        checker.value(&owner, &output.value, &mut gates)?;
    }

    if let Some(unused) = template
        .parameters()
        .ids()
        .find(|id| !checker.used_parameters.contains(*id))
    {
        return Err(ReferentialIntegrityError::UnusedParameter(unused.to_string()));
    }

    Ok(())
}

struct Checker<'a> {
    template: &'a Template,
    used_parameters: HashSet<String>,
}

impl Checker<'_> {
    /// Validate an entity's gating condition and open the gate list with it.
    fn gate(
        &self,
        owner: &str,
        condition: Option<&str>,
    ) -> Result<Vec<String>, ReferentialIntegrityError> {
        match condition {
            Some(condition) => {
                if !self.template.conditions().contains(condition) {
                    return Err(ReferentialIntegrityError::UnknownCondition {
                        owner: owner.to_string(),
                        condition: condition.to_string(),
                    });
                }
                Ok(vec![condition.to_string()])
            }
            None => Ok(Vec::new()),
        }
    }

    fn value(
        &mut self,
        owner: &str,
        value: &Value,
        gates: &mut Vec<String>,
    ) -> Result<(), ReferentialIntegrityError> {
        match value {
            Value::Bool(_) | Value::Int(_) | Value::Str(_) => Ok(()),
            Value::List(items) => {
                for item in items {
                    self.value(owner, item, gates)?;
                }
                Ok(())
            }
            Value::Map(map) => {
                for (_, item) in map.iter() {
                    self.value(owner, item, gates)?;
                }
                Ok(())
            }
            Value::Expr(expr) => self.expr(owner, expr, gates),
        }
    }

    fn expr(
        &mut self,
        owner: &str,
        expr: &Expr,
        gates: &mut Vec<String>,
    ) -> Result<(), ReferentialIntegrityError> {
        match expr {
            Expr::Ref(Target::Parameter(id)) => self.parameter(owner, id.as_str()),
            Expr::Ref(Target::Resource(id)) | Expr::GetAtt(id, _) => {
                self.resource(owner, id.as_str(), gates)
            }
            Expr::Ref(Target::Pseudo(_)) | Expr::AvailabilityZones => Ok(()),
            Expr::Join(_, parts) => self.value(owner, parts, gates),
            Expr::Select(_, list) => self.value(owner, list, gates),
            Expr::Base64(inner) | Expr::Not(inner) => self.value(owner, inner, gates),
            Expr::Equals(left, right) => {
                self.value(owner, left, gates)?;
                self.value(owner, right, gates)
            }
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    self.value(owner, item, gates)?;
                }
                Ok(())
            }
            Expr::FindInMap(mapping, key, attribute) => {
                self.value(owner, key, gates)?;
                self.value(owner, attribute, gates)?;
                self.mapping_lookup(owner, mapping, key, attribute)
            }
            Expr::Sub(template, variables) => {
                for (_, variable) in variables {
                    self.value(owner, variable, gates)?;
                }
                for name in sub_references(template) {
                    if variables.iter().any(|(var, _)| var == name) || name.contains("::") {
                        continue;
                    }
                    match name.split_once('.') {
                        Some((resource, _)) => self.resource(owner, resource, gates)?,
                        None if self.template.parameters().contains(name) => {
                            self.parameter(owner, name)?;
                        }
                        None => self.resource(owner, name, gates)?,
                    }
                }
                Ok(())
            }
            Expr::Condition(id) => self.condition(owner, id.as_str()),
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                self.condition(owner, condition.as_str())?;
                if let Some(then) = then {
                    gates.push(condition.to_string());
                    let result = self.value(owner, then, gates);
                    gates.pop();
                    result?;
                }
                if let Some(otherwise) = otherwise {
                    self.value(owner, otherwise, gates)?;
                }
                Ok(())
            }
            Expr::Custom { payload, .. } => self.value(owner, payload, gates),
        }
    }

    fn parameter(&mut self, owner: &str, id: &str) -> Result<(), ReferentialIntegrityError> {
        if !self.template.parameters().contains(id) {
            return Err(ReferentialIntegrityError::DanglingReference {
                owner: owner.to_string(),
                kind: "parameter",
                target: id.to_string(),
            });
        }
        self.used_parameters.insert(id.to_string());
        Ok(())
    }

    fn resource(
        &self,
        owner: &str,
        id: &str,
        gates: &[String],
    ) -> Result<(), ReferentialIntegrityError> {
        if !self.template.resources().contains(id) {
            return Err(ReferentialIntegrityError::DanglingReference {
                owner: owner.to_string(),
                kind: "resource",
                target: id.to_string(),
            });
        }
        self.resource_gate(owner, id, gates)
    }

    /// A conditioned resource may only be reached under its own condition.
    fn resource_gate(
        &self,
        owner: &str,
        id: &str,
        gates: &[String],
    ) -> Result<(), ReferentialIntegrityError> {
        let condition = self
            .template
            .resources()
            .get(id)
            .and_then(|resource| resource.condition.as_ref());
        match condition {
            Some(condition) if !gates.iter().any(|gate| gate == condition.as_str()) => {
                Err(ReferentialIntegrityError::UngatedReference {
                    owner: owner.to_string(),
                    target: id.to_string(),
                    condition: condition.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn condition(&self, owner: &str, id: &str) -> Result<(), ReferentialIntegrityError> {
        if self.template.conditions().contains(id) {
            Ok(())
        } else {
            Err(ReferentialIntegrityError::DanglingReference {
                owner: owner.to_string(),
                kind: "condition",
                target: id.to_string(),
            })
        }
    }

    fn mapping_lookup(
        &self,
        owner: &str,
        mapping_id: &MappingId,
        key: &Value,
        attribute: &Value,
    ) -> Result<(), ReferentialIntegrityError> {
        let Some(mapping) = self.template.mappings().get(mapping_id.as_str()) else {
            return Err(ReferentialIntegrityError::DanglingReference {
                owner: owner.to_string(),
                kind: "mapping",
                target: mapping_id.to_string(),
            });
        };

        let unresolvable = || ReferentialIntegrityError::UnresolvableMappingKey {
            owner: owner.to_string(),
            mapping: mapping_id.to_string(),
        };
        let undeclared = |key: &str| ReferentialIntegrityError::UndeclaredMappingKey {
            owner: owner.to_string(),
            mapping: mapping_id.to_string(),
            key: key.to_string(),
        };

        let keys: Vec<&str> = match key {
            Value::Str(key) => vec![key.as_str()],
            Value::Expr(expr) => match expr.as_ref() {
                Expr::Ref(Target::Parameter(parameter)) => {
                    let allowed = self
                        .template
                        .parameters()
                        .get(parameter.as_str())
                        .map(|p| p.allowed_values.as_slice())
                        .unwrap_or_default();
                    if allowed.is_empty() {
                        return Err(unresolvable());
                    }
                    allowed.iter().map(String::as_str).collect()
                }
                _ => return Err(unresolvable()),
            },
            _ => return Err(unresolvable()),
        };
        if let Some(missing) = keys.iter().find(|key| !mapping.has_key(key)) {
            return Err(undeclared(missing));
        }

        match attribute.as_str() {
            Some(attribute) if mapping.has_attribute(attribute) => Ok(()),
            Some(attribute) => Err(undeclared(attribute)),
            None => Err(unresolvable()),
        }
    }
}

/// Variable names used by a `Fn::Sub` template, skipping `${!literal}` escapes.
fn sub_references(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !name.starts_with('!') {
            names.push(name);
        }
        rest = &after[end + 1..];
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::value::{equals, find_in_map, get_att, reference, sub, when};
    use crate::template::{
        Condition, Mapping, Output, Parameter, ParameterType, Properties, Resource,
    };

    fn template_with_bucket() -> (Template, crate::template::ResourceId) {
        let mut template = Template::new("test");
        let bucket = template
            .declare_resource("Bucket", Resource::new("AWS::S3::Bucket", Properties::new()))
            .unwrap();
        (template, bucket)
    }

    #[test]
    fn test_sub_references() {
        assert_eq!(
            sub_references("a ${One} b ${!Literal} ${AWS::Region} ${Res.Arn}"),
            vec!["One", "AWS::Region", "Res.Arn"]
        );
        assert!(sub_references("no variables").is_empty());
        assert_eq!(sub_references("${Open"), Vec::<&str>::new());
    }

    #[test]
    fn test_check_passes_for_consistent_template() {
        let (mut template, bucket) = template_with_bucket();
        template
            .declare_output("BucketArn", Output::new("arn", get_att(&bucket, "Arn")))
            .unwrap();
        assert_eq!(check(&template), Ok(()));
    }

    #[test]
    fn test_check_rejects_dangling_resource_reference() {
        let (_, foreign) = template_with_bucket();
        let mut template = Template::new("test");
        template
            .declare_output("BucketArn", Output::new("arn", get_att(&foreign, "Arn")))
            .unwrap();
        assert_eq!(
            check(&template),
            Err(ReferentialIntegrityError::DanglingReference {
                owner: "Output \"BucketArn\"".to_string(),
                kind: "resource",
                target: "Bucket".to_string(),
            })
        );
    }

    #[test]
    fn test_check_rejects_dangling_sub_variable() {
        let mut template = Template::new("test");
        template
            .declare_resource(
                "Doc",
                Resource::new("AWS::SSM::Document", Properties::new().with("Content", sub("${Missing}"))),
            )
            .unwrap();
        assert!(matches!(
            check(&template),
            Err(ReferentialIntegrityError::DanglingReference { kind: "resource", .. })
        ));
    }

    #[test]
    fn test_check_rejects_unused_parameter() {
        let mut template = Template::new("test");
        template
            .declare_parameter("Lonely", Parameter::new(ParameterType::String, "nobody uses me"))
            .unwrap();
        assert_eq!(
            check(&template),
            Err(ReferentialIntegrityError::UnusedParameter("Lonely".to_string()))
        );
    }

    #[test]
    fn test_check_rejects_unknown_gate() {
        let (mut other, _) = template_with_bucket();
        let foreign = other
            .declare_condition("Elsewhere", Condition::new(Value::Bool(true)))
            .unwrap();
        let mut template = Template::new("test");
        template
            .declare_resource(
                "Bucket",
                Resource::new("AWS::S3::Bucket", Properties::new()).gated_by(&foreign),
            )
            .unwrap();
        assert!(matches!(
            check(&template),
            Err(ReferentialIntegrityError::UnknownCondition { .. })
        ));
    }

    #[test]
    fn test_check_gated_references() {
        let mut template = Template::new("test");
        let flag = template
            .declare_parameter("Create", Parameter::new(ParameterType::String, "create?"))
            .unwrap();
        let create = template
            .declare_condition("ShouldCreate", Condition::new(equals(reference(&flag), "Yes")))
            .unwrap();
        let bucket = template
            .declare_resource(
                "Bucket",
                Resource::new("AWS::S3::Bucket", Properties::new()).gated_by(&create),
            )
            .unwrap();

        // Guarded by Fn::If on the same condition: fine.
        template
            .declare_output("Guarded", Output::new("arn", when(&create, get_att(&bucket, "Arn"))))
            .unwrap();
        // Gated output: fine.
        template
            .declare_output(
                "Gated",
                Output::new("arn", get_att(&bucket, "Arn")).gated_by(&create),
            )
            .unwrap();
        assert_eq!(check(&template), Ok(()));

        template
            .declare_output("Unguarded", Output::new("arn", get_att(&bucket, "Arn")))
            .unwrap();
        assert_eq!(
            check(&template),
            Err(ReferentialIntegrityError::UngatedReference {
                owner: "Output \"Unguarded\"".to_string(),
                target: "Bucket".to_string(),
                condition: "ShouldCreate".to_string(),
            })
        );
    }

    #[test]
    fn test_check_mapping_keys() {
        let mut template = Template::new("test");
        let arch = template
            .declare_parameter(
                "Arch",
                Parameter::new(ParameterType::String, "arch").allowed_values(&["ARM64", "AMD64"]),
            )
            .unwrap();
        let loose = template
            .declare_parameter("Loose", Parameter::new(ParameterType::String, "anything"))
            .unwrap();
        let mapping = template
            .declare_mapping(
                "Architectures",
                Mapping::new()
                    .entry("ARM64", Properties::new().with("Arch", "ARM64"))
                    .entry("AMD64", Properties::new().with("Arch", "X86_64")),
            )
            .unwrap();

        let mut ok = template.clone();
        ok.declare_output("A", Output::new("a", find_in_map(&mapping, reference(&arch), "Arch")))
            .unwrap();
        ok.declare_output("B", Output::new("b", reference(&loose))).unwrap();
        assert_eq!(check(&ok), Ok(()));

        let mut bad_attribute = ok.clone();
        bad_attribute
            .declare_output("C", Output::new("c", find_in_map(&mapping, "ARM64", "ImageId")))
            .unwrap();
        assert!(matches!(
            check(&bad_attribute),
            Err(ReferentialIntegrityError::UndeclaredMappingKey { key, .. }) if key == "ImageId"
        ));

        let mut unresolvable = ok.clone();
        unresolvable
            .declare_output("D", Output::new("d", find_in_map(&mapping, reference(&loose), "Arch")))
            .unwrap();
        assert!(matches!(
            check(&unresolvable),
            Err(ReferentialIntegrityError::UnresolvableMappingKey { .. })
        ));
    }
}
