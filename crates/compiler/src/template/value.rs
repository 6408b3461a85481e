/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Property values and the reference expression algebra.
 *
 * A [`Value`] is either a literal (boolean, integer, string, list, ordered
 * map) or a deferred [`Expr`] that the CloudFormation interpreter resolves at
 * deploy time. Expressions never get evaluated here.
 */

use crate::template::ids::{ConditionId, MappingId, ParameterId, ResourceId};

/// A property value: literal data or a deferred expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(Properties),
    Expr(Box<Expr>),
}

impl Value {
    /// The string literal, if this value is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Self::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Properties> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Properties> for Value {
    fn from(value: Properties) -> Self {
        Self::Map(value)
    }
}

impl From<Expr> for Value {
    fn from(value: Expr) -> Self {
        Self::Expr(Box::new(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// An ordered property map. Absent optional values are never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, Value)>);

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a property, replacing an existing value in place.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a property only when a value is present.
    #[must_use]
    pub fn with_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.0.push((key.to_string(), value));
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pseudo parameters provided by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    AccountId,
    Region,
    StackName,
}

impl Pseudo {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::StackName => "AWS::StackName",
        }
    }
}

/// What a `Ref` points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Parameter(ParameterId),
    Resource(ResourceId),
    Pseudo(Pseudo),
}

impl Target {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Parameter(id) => id.as_str(),
            Self::Resource(id) => id.as_str(),
            Self::Pseudo(pseudo) => pseudo.name(),
        }
    }
}

impl From<&ParameterId> for Target {
    fn from(id: &ParameterId) -> Self {
        Self::Parameter(id.clone())
    }
}

impl From<&ResourceId> for Target {
    fn from(id: &ResourceId) -> Self {
        Self::Resource(id.clone())
    }
}

impl From<Pseudo> for Target {
    fn from(pseudo: Pseudo) -> Self {
        Self::Pseudo(pseudo)
    }
}

/// Deferred-value expression nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `Ref`
    Ref(Target),
    /// `Fn::GetAtt`
    GetAtt(ResourceId, String),
    /// `Fn::Join`; the parts are a list or an expression yielding one.
    Join(String, Value),
    /// `Fn::Select`
    Select(u32, Value),
    /// `Fn::FindInMap`
    FindInMap(MappingId, Value, Value),
    /// `Fn::Sub` with optional explicit variables.
    Sub(String, Vec<(String, Value)>),
    /// `Fn::Base64`
    Base64(Value),
    /// `Fn::GetAZs` for the current region.
    AvailabilityZones,
    /// `Fn::Not`
    Not(Value),
    /// `Fn::Equals`
    Equals(Value, Value),
    /// `Fn::And`
    And(Vec<Value>),
    /// `Fn::Or`
    Or(Vec<Value>),
    /// `Condition`: reference to a declared condition inside another condition.
    Condition(ConditionId),
    /// `Fn::If`; an absent branch means "no value".
    If {
        condition: ConditionId,
        then: Option<Value>,
        otherwise: Option<Value>,
    },
    /// Extension kind, encoded by a rule registered with the serializer.
    Custom { tag: String, payload: Value },
}

/// Tag of the allow-list membership test.
pub const CONTAINS: &str = "Contains";

/// `Ref` to a parameter, resource or pseudo parameter.
pub fn reference(target: impl Into<Target>) -> Value {
    Expr::Ref(target.into()).into()
}

pub fn get_att(resource: &ResourceId, attribute: &str) -> Value {
    Expr::GetAtt(resource.clone(), attribute.to_string()).into()
}

pub fn join(separator: &str, parts: impl Into<Value>) -> Value {
    Expr::Join(separator.to_string(), parts.into()).into()
}

pub fn select(index: u32, list: impl Into<Value>) -> Value {
    Expr::Select(index, list.into()).into()
}

pub fn find_in_map(mapping: &MappingId, key: impl Into<Value>, attribute: impl Into<Value>) -> Value {
    Expr::FindInMap(mapping.clone(), key.into(), attribute.into()).into()
}

pub fn sub(template: &str) -> Value {
    Expr::Sub(template.to_string(), Vec::new()).into()
}

pub fn base64(value: impl Into<Value>) -> Value {
    Expr::Base64(value.into()).into()
}

pub fn availability_zones() -> Value {
    Expr::AvailabilityZones.into()
}

pub fn not(value: impl Into<Value>) -> Value {
    Expr::Not(value.into()).into()
}

pub fn equals(left: impl Into<Value>, right: impl Into<Value>) -> Value {
    Expr::Equals(left.into(), right.into()).into()
}

/// `value == ""`, negated: the parameter was supplied.
pub fn not_empty(value: impl Into<Value>) -> Value {
    not(equals(value, ""))
}

pub fn condition(id: &ConditionId) -> Value {
    Expr::Condition(id.clone()).into()
}

/// `Fn::If` with both branches.
pub fn if_else(condition: &ConditionId, then: impl Into<Value>, otherwise: impl Into<Value>) -> Value {
    Expr::If {
        condition: condition.clone(),
        then: Some(then.into()),
        otherwise: Some(otherwise.into()),
    }
    .into()
}

/// `Fn::If` whose false branch removes the value entirely.
pub fn when(condition: &ConditionId, then: impl Into<Value>) -> Value {
    Expr::If {
        condition: condition.clone(),
        then: Some(then.into()),
        otherwise: None,
    }
    .into()
}

/// `Fn::If` whose true branch removes the value entirely.
pub fn unless(condition: &ConditionId, otherwise: impl Into<Value>) -> Value {
    Expr::If {
        condition: condition.clone(),
        then: None,
        otherwise: Some(otherwise.into()),
    }
    .into()
}

/// Membership of `value` in a static list, a custom expression kind.
pub fn contains<S: AsRef<str>>(list: &[S], value: impl Into<Value>) -> Value {
    let items: Vec<Value> = list.iter().map(|s| Value::from(s.as_ref())).collect();
    Expr::Custom {
        tag: CONTAINS.to_string(),
        payload: Value::List(vec![Value::List(items), value.into()]),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_keep_insertion_order() {
        let props = Properties::new()
            .with("Zeta", 1)
            .with("Alpha", 2)
            .with("Mid", 3);
        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_properties_drop_absent_values() {
        let props = Properties::new()
            .with("Present", "yes")
            .with_opt("Absent", None::<Value>)
            .with_opt("AlsoPresent", Some(5));
        assert_eq!(props.len(), 2);
        assert!(props.get("Absent").is_none());
        assert_eq!(props.get("AlsoPresent"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_properties_replace_in_place() {
        let props = Properties::new().with("A", 1).with("B", 2).with("A", 3);
        let entries: Vec<(&str, &Value)> = props.iter().collect();
        assert_eq!(entries, vec![("A", &Value::Int(3)), ("B", &Value::Int(2))]);
    }

    #[test]
    fn test_contains_payload_shape() {
        let value = contains(&["a", "b"], "x");
        match value.as_expr() {
            Some(Expr::Custom { tag, payload }) => {
                assert_eq!(tag, CONTAINS);
                let parts = payload.as_list().unwrap();
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].as_list().unwrap().len(), 2);
                assert_eq!(parts[1].as_str(), Some("x"));
            }
            other => panic!("Expected custom expression, got {other:?}"),
        }
    }

    #[test]
    fn test_pseudo_names() {
        assert_eq!(Target::from(Pseudo::StackName).name(), "AWS::StackName");
        assert_eq!(Pseudo::Region.name(), "AWS::Region");
        assert_eq!(Pseudo::AccountId.name(), "AWS::AccountId");
    }
}
