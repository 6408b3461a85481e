/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Reading catalog documents from YAML or JSON strings.
 * Works only with in-memory strings (no file I/O).
 */

use serde_json::Value;
use yaml_rust::{Yaml, YamlLoader};

use crate::error::CatalogError;

/// Parse YAML or JSON content from a string.
///
/// The format is picked from the file extension when a name is given;
/// otherwise JSON is tried first (it is the stricter of the two), then YAML.
///
/// # Errors
///
/// Returns `CatalogError::InvalidJson` or `CatalogError::InvalidYaml`.
pub fn parse_yaml_or_json(content: &str, file_name: Option<&str>) -> Result<Value, CatalogError> {
    if let Some(name) = file_name {
        let name = name.to_lowercase();
        if name.ends_with(".json") {
            return parse_json(content).map_err(CatalogError::InvalidJson);
        }
        if name.ends_with(".yaml") || name.ends_with(".yml") {
            return parse_yaml(content).map_err(CatalogError::InvalidYaml);
        }
    }

    match parse_json(content) {
        Ok(value) => Ok(value),
        Err(_) => parse_yaml(content).map_err(CatalogError::InvalidYaml),
    }
}

fn parse_json(content: &str) -> Result<Value, String> {
    serde_json::from_str(content).map_err(|e| format!("JSON parse error: {e}"))
}

fn parse_yaml(content: &str) -> Result<Value, String> {
    let docs = YamlLoader::load_from_str(content).map_err(|e| format!("YAML parse error: {e}"))?;

    let Some(doc) = docs.first() else {
        return Err("YAML document is empty".to_string());
    };

    yaml_to_json_value(doc).ok_or_else(|| "Failed to convert YAML to JSON value".to_string())
}

/// Convert a YAML value to a `serde_json::Value`, so the schema validator and
/// serde can work on it.
fn yaml_to_json_value(yaml: &Yaml) -> Option<Value> {
    match yaml {
        Yaml::Real(s) => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .or_else(|| Some(Value::String(s.clone()))),
        Yaml::Integer(i) => Some(Value::Number((*i).into())),
        Yaml::String(s) => Some(Value::String(s.clone())),
        Yaml::Boolean(b) => Some(Value::Bool(*b)),
        Yaml::Array(items) => Some(Value::Array(
            items.iter().filter_map(yaml_to_json_value).collect(),
        )),
        Yaml::Hash(hash) => {
            let mut map = serde_json::Map::new();
            for (k, v) in hash {
                if let (Some(key), Some(value)) = (yaml_key(k), yaml_to_json_value(v)) {
                    map.insert(key, value);
                }
            }
            Some(Value::Object(map))
        }
        Yaml::Null => Some(Value::Null),
        Yaml::BadValue | Yaml::Alias(_) => None,
    }
}

fn yaml_key(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
version: "1.0.0"
count: 42
negative: -3
enabled: true
items:
  - c7g.medium
"#;
        let result = parse_yaml(yaml).unwrap();
        assert_eq!(result["version"], "1.0.0");
        assert_eq!(result["count"], 42);
        assert_eq!(result["negative"], -3);
        assert_eq!(result["enabled"], true);
        assert_eq!(result["items"][0], "c7g.medium");
    }

    #[test]
    fn test_parse_yaml_or_json_detects_by_extension() {
        let result = parse_yaml_or_json(r#"{"test": "value"}"#, Some("catalog.JSON")).unwrap();
        assert_eq!(result["test"], "value");

        let result = parse_yaml_or_json("test: value", Some("catalog.yml")).unwrap();
        assert_eq!(result["test"], "value");
    }

    #[test]
    fn test_parse_yaml_or_json_falls_back_to_yaml() {
        let result = parse_yaml_or_json(r#"{"test": "value"}"#, None).unwrap();
        assert_eq!(result["test"], "value");

        let result = parse_yaml_or_json("test: value", None).unwrap();
        assert_eq!(result["test"], "value");
    }

    #[test]
    fn test_parse_invalid_documents() {
        assert!(matches!(
            parse_yaml_or_json(r#"{"key": unclosed"#, Some("x.json")),
            Err(CatalogError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_yaml_or_json("key: [unclosed", None),
            Err(CatalogError::InvalidYaml(_))
        ));
        assert!(matches!(
            parse_yaml_or_json("", Some("x.yaml")),
            Err(CatalogError::InvalidYaml(_))
        ));
    }
}
