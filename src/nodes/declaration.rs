//! Node declarations in the host's terms: typed inputs with defaults and
//! bounds, output types, and whether the node is a terminal output node.

use serde_json::{Map, Value, json};

use crate::{Error, Result};

/// Type and constraints of one input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    /// Drop-down of fixed labels.
    Choice {
        options: Vec<String>,
        default: Option<String>,
    },
    Boolean {
        default: bool,
    },
    Int {
        default: u64,
        min: u64,
        max: u64,
        step: Option<u64>,
    },
    Float {
        default: f64,
        min: f64,
        max: f64,
        step: Option<f64>,
    },
    String {
        default: String,
        multiline: bool,
    },
    /// Connection carrying another node's output type.
    Link(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputDecl {
    pub name: &'static str,
    pub required: bool,
    pub kind: InputKind,
}

impl InputDecl {
    pub fn required(name: &'static str, kind: InputKind) -> Self {
        Self {
            name,
            required: true,
            kind,
        }
    }

    pub fn optional(name: &'static str, kind: InputKind) -> Self {
        Self {
            name,
            required: false,
            kind,
        }
    }

    /// `[type, {options}]` as the host expects it.
    fn to_host_json(&self) -> Value {
        match &self.kind {
            InputKind::Choice { options, default } => match default {
                Some(default) => json!([options, { "default": default }]),
                None => json!([options]),
            },
            InputKind::Boolean { default } => json!(["BOOLEAN", { "default": default }]),
            InputKind::Int {
                default,
                min,
                max,
                step,
            } => {
                let mut opts = json!({ "default": default, "min": min, "max": max });
                if let Some(step) = step {
                    opts["step"] = json!(step);
                }
                json!(["INT", opts])
            }
            InputKind::Float {
                default,
                min,
                max,
                step,
            } => {
                let mut opts = json!({ "default": default, "min": min, "max": max });
                if let Some(step) = step {
                    opts["step"] = json!(step);
                }
                json!(["FLOAT", opts])
            }
            InputKind::String { default, multiline } => {
                let mut opts = json!({ "default": default });
                if *multiline {
                    opts["multiline"] = json!(true);
                }
                json!(["STRING", opts])
            }
            InputKind::Link(type_name) => json!([type_name]),
        }
    }
}

/// Everything the host needs to render and wire a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition {
    pub class_name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    /// Entry point name the host calls.
    pub function: &'static str,
    pub inputs: Vec<InputDecl>,
    pub return_types: Vec<&'static str>,
    pub return_names: Vec<&'static str>,
    /// Terminal node whose only result is a UI payload.
    pub output_node: bool,
}

impl NodeDefinition {
    pub fn input(&self, name: &str) -> Option<&InputDecl> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Reject an integer outside the declared bounds of `name`.
    pub fn check_int(&self, name: &str, value: u64) -> Result<()> {
        match self.input(name).map(|i| &i.kind) {
            Some(InputKind::Int { min, max, .. }) if (*min..=*max).contains(&value) => Ok(()),
            Some(InputKind::Int { min, max, .. }) => Err(Error::InvalidInput(format!(
                "{name}={value} is outside [{min}, {max}]"
            ))),
            _ => Err(Error::InvalidInput(format!(
                "{} has no integer input '{name}'",
                self.class_name
            ))),
        }
    }

    /// Reject a float outside the declared bounds of `name`.
    pub fn check_float(&self, name: &str, value: f64) -> Result<()> {
        match self.input(name).map(|i| &i.kind) {
            Some(InputKind::Float { min, max, .. }) if (*min..=*max).contains(&value) => Ok(()),
            Some(InputKind::Float { min, max, .. }) => Err(Error::InvalidInput(format!(
                "{name}={value} is outside [{min}, {max}]"
            ))),
            _ => Err(Error::InvalidInput(format!(
                "{} has no float input '{name}'",
                self.class_name
            ))),
        }
    }

    /// Serialize in the host's object-info shape.
    pub fn to_host_json(&self) -> Value {
        let mut required = Map::new();
        let mut optional = Map::new();
        for input in &self.inputs {
            let target = if input.required {
                &mut required
            } else {
                &mut optional
            };
            target.insert(input.name.to_string(), input.to_host_json());
        }
        let mut input = Map::new();
        input.insert("required".into(), Value::Object(required));
        if !optional.is_empty() {
            input.insert("optional".into(), Value::Object(optional));
        }
        json!({
            "name": self.class_name,
            "display_name": self.display_name,
            "category": self.category,
            "function": self.function,
            "input": input,
            "output": self.return_types,
            "output_name": self.return_names,
            "output_node": self.output_node,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NodeDefinition {
        NodeDefinition {
            class_name: "Sample",
            display_name: "Sample",
            category: "Test",
            function: "run",
            inputs: vec![
                InputDecl::required(
                    "count",
                    InputKind::Int {
                        default: 5,
                        min: 1,
                        max: 10,
                        step: Some(1),
                    },
                ),
                InputDecl::required(
                    "gain",
                    InputKind::Float {
                        default: 1.0,
                        min: 0.1,
                        max: 2.0,
                        step: None,
                    },
                ),
                InputDecl::optional(
                    "label",
                    InputKind::String {
                        default: "x".into(),
                        multiline: false,
                    },
                ),
            ],
            return_types: vec![],
            return_names: vec![],
            output_node: true,
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let def = sample();
        assert!(def.check_int("count", 1).is_ok());
        assert!(def.check_int("count", 10).is_ok());
        assert!(def.check_int("count", 0).is_err());
        assert!(def.check_float("gain", 0.1).is_ok());
        assert!(def.check_float("gain", 0.05).is_err());
        assert!(def.check_float("count", 1.0).is_err());
        assert!(def.check_int("missing", 1).is_err());
    }

    #[test]
    fn host_json_splits_required_and_optional() {
        let value = sample().to_host_json();
        assert_eq!(value["input"]["required"]["count"][0], "INT");
        assert_eq!(value["input"]["required"]["count"][1]["max"], 10);
        assert_eq!(value["input"]["required"]["gain"][1].get("step"), None);
        assert_eq!(value["input"]["optional"]["label"][1]["default"], "x");
        assert_eq!(value["output_node"], true);
    }
}
