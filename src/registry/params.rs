//! Tool parameter definitions — typed metadata and validation.
//!
//! Each tool declares the parameters its engine understands; values arrive
//! as JSON from the settings controls and are validated before dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    Enum(Vec<String>),
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            ParamType::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {}", value_type_name(value)))
                }
            }
            ParamType::Int => {
                if value.is_i64() || value.is_u64() {
                    Ok(())
                } else {
                    Err(format!("expected integer, got {}", value_type_name(value)))
                }
            }
            ParamType::Float => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("expected number, got {}", value_type_name(value)))
                }
            }
            ParamType::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected boolean, got {}", value_type_name(value)))
                }
            }
            ParamType::Enum(variants) => {
                if let Some(s) = value.as_str() {
                    if variants.iter().any(|v| v == s) {
                        Ok(())
                    } else {
                        Err(format!(
                            "invalid value '{}', expected one of: {}",
                            s,
                            variants.join(", ")
                        ))
                    }
                } else {
                    Err(format!(
                        "expected string for enum, got {}",
                        value_type_name(value)
                    ))
                }
            }
            ParamType::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                }
            }
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn new(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            default,
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }
}

/// Validate parameters against a tool's definitions.
///
/// Returns a list of validation errors (empty = valid).
pub fn validate_params(defs: &[ParamDef], params: &Value) -> Vec<String> {
    let Some(param_map) = params.as_object() else {
        return vec!["parameters must be a JSON object".to_string()];
    };

    let mut errors = Vec::new();

    // Check required parameters are present
    for def in defs {
        if def.is_required() && !param_map.contains_key(&def.name) {
            errors.push(format!("missing required parameter: {}", def.name));
        }
    }

    // Build param name lookup for checking unknown params
    let known_names: HashMap<&str, &ParamDef> =
        defs.iter().map(|d| (d.name.as_str(), d)).collect();

    // Validate types of provided parameters
    for (key, value) in param_map {
        if let Some(def) = known_names.get(key.as_str()) {
            if let Err(e) = def.param_type.validate(value) {
                errors.push(format!("parameter '{key}': {e}"));
            }
        } else {
            errors.push(format!("unknown parameter: {key}"));
        }
    }

    errors
}

/// Fill in default values for missing parameters.
pub fn fill_defaults(defs: &[ParamDef], params: &mut Value) {
    if let Some(map) = params.as_object_mut() {
        for def in defs {
            if !map.contains_key(&def.name) {
                if let Some(default) = &def.default {
                    map.insert(def.name.clone(), default.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defs() -> Vec<ParamDef> {
        vec![
            ParamDef::new(
                "quality",
                ParamType::Enum(vec!["high".into(), "medium".into(), "low".into()]),
                "Encoder quality preset",
                Some(json!("medium")),
            ),
            ParamDef::new(
                "bitrate_kbps",
                ParamType::Int,
                "Target bitrate in kb/s",
                Some(json!(2500)),
            ),
            ParamDef::new(
                "language",
                ParamType::Optional(Box::new(ParamType::String)),
                "Spoken language hint",
                None,
            ),
        ]
    }

    #[test]
    fn valid_params_pass() {
        let errors = validate_params(&defs(), &json!({"quality": "high", "bitrate_kbps": 1200}));
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn wrong_type_is_reported() {
        let errors = validate_params(&defs(), &json!({"bitrate_kbps": "fast"}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("expected integer"));
    }

    #[test]
    fn bad_enum_value_is_reported() {
        let errors = validate_params(&defs(), &json!({"quality": "ultra"}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("expected one of"));
    }

    #[test]
    fn unknown_param_is_reported() {
        let errors = validate_params(&defs(), &json!({"bogus": true}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unknown parameter: bogus"));
    }

    #[test]
    fn optional_params_accept_null_or_absence() {
        assert!(validate_params(&defs(), &json!({})).is_empty());
        assert!(validate_params(&defs(), &json!({"language": null})).is_empty());
        assert!(validate_params(&defs(), &json!({"language": "Spanish"})).is_empty());
    }

    #[test]
    fn fill_defaults_leaves_provided_values() {
        let mut params = json!({"quality": "low"});
        fill_defaults(&defs(), &mut params);
        assert_eq!(params["quality"], "low");
        assert_eq!(params["bitrate_kbps"], 2500);
        assert!(params.get("language").is_none());
    }

    #[test]
    fn non_object_params_rejected() {
        let errors = validate_params(&defs(), &json!([1, 2, 3]));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("JSON object"));
    }
}
