//! Beam schedule data model and the ingestion boundary for model output.
//!
//! The model's JSON is schema-less from our point of view: keys go missing,
//! numbers arrive as strings, a list arrives as one `"2-T12 + 1-T16"` string.
//! [`BeamFragment::from_json`] is the one place that looks at raw
//! [`serde_json::Value`]s; it checks every field's type explicitly and turns
//! "possibly absent" into `Option`/empty lists. Everything downstream works on
//! typed fragments and records only.

use crate::error::ResponseError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// The document written to `<name>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeamSchedule {
    pub beams: Vec<BeamRecord>,
}

/// One structural beam, merged and normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamRecord {
    pub beam_id: String,
    pub size: BeamSize,
    /// Canonical bar callouts such as `7-T25`, deduplicated and ordered.
    pub reinforcement: Vec<String>,
    pub stirrups: Stirrups,
}

impl BeamRecord {
    /// An empty schedule row: no width and no bars.
    pub fn is_placeholder(&self) -> bool {
        self.size.width.is_none() && self.reinforcement.is_empty()
    }
}

/// Section size. `null` dimensions mark empty or placeholder rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeamSize {
    pub width: Option<Number>,
    pub depth: Option<Number>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stirrups {
    pub dia: Vec<String>,
    pub spacing: Vec<String>,
}

/// What one image or slice said about one beam, before merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeamFragment {
    pub beam_id: Option<String>,
    pub size: BeamSize,
    pub reinforcement: Vec<String>,
    pub stirrups: Stirrups,
}

impl BeamFragment {
    /// Validate one element of the reply's `beams` array.
    pub fn from_json(value: &Value) -> Result<Self, ResponseError> {
        let obj = value
            .as_object()
            .ok_or_else(|| schema(format!("beam entry is {}, not an object", kind(value))))?;

        let stirrups = match obj.get("stirrups") {
            None | Some(Value::Null) => Stirrups::default(),
            Some(Value::Object(s)) => Stirrups {
                dia: string_list(s, "stirrups.dia", "dia")?,
                spacing: string_list(s, "stirrups.spacing", "spacing")?,
            },
            Some(other) => return Err(schema(format!("stirrups is {}", kind(other)))),
        };

        Ok(Self {
            beam_id: beam_id(obj)?,
            size: size(obj.get("size"))?,
            reinforcement: string_list(obj, "reinforcement", "reinforcement")?,
            stirrups,
        })
    }
}

fn schema(detail: String) -> ResponseError {
    ResponseError::Schema { detail }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn beam_id(obj: &Map<String, Value>) -> Result<Option<String>, ResponseError> {
    match obj.get("beam_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(schema(format!("beam_id is {}", kind(other)))),
    }
}

fn size(value: Option<&Value>) -> Result<BeamSize, ResponseError> {
    match value {
        None | Some(Value::Null) => Ok(BeamSize::default()),
        Some(Value::Object(s)) => Ok(BeamSize {
            width: s.get("width").and_then(dimension),
            depth: s.get("depth").and_then(dimension),
        }),
        // "300x600" written into the size cell as one string.
        Some(Value::String(s)) => {
            let mut dims = s.split(['x', 'X', '×', '*']).map(parse_number);
            Ok(BeamSize {
                width: dims.next().flatten(),
                depth: dims.next().flatten(),
            })
        }
        Some(other) => Err(schema(format!("size is {}", kind(other)))),
    }
}

/// A size dimension: a number, a numeric string, or nothing.
fn dimension(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim().trim_end_matches("mm").trim();
    if let Ok(n) = s.parse::<u64>() {
        return Some(Number::from(n));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// A list-of-strings field that may be absent, null, a single string, or an
/// array of strings and numbers.
fn string_list(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Vec<String>, ResponseError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(schema(format!("{path} contains {}", kind(other)))),
            })
            .collect(),
        Some(other) => Err(schema(format!("{path} is {}", kind(other)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_fragment() {
        let f = BeamFragment::from_json(&json!({
            "beam_id": " B1 ",
            "size": {"width": 300, "depth": "600"},
            "reinforcement": ["2-T12", "1-T16"],
            "stirrups": {"dia": ["T8"], "spacing": ["150"]}
        }))
        .unwrap();
        assert_eq!(f.beam_id.as_deref(), Some("B1"));
        assert_eq!(f.size.width, Some(Number::from(300)));
        assert_eq!(f.size.depth, Some(Number::from(600)));
        assert_eq!(f.reinforcement, vec!["2-T12", "1-T16"]);
        assert_eq!(f.stirrups.spacing, vec!["150"]);
    }

    #[test]
    fn absent_fields_become_empty() {
        let f = BeamFragment::from_json(&json!({"beam_id": "B2"})).unwrap();
        assert_eq!(f.size, BeamSize::default());
        assert!(f.reinforcement.is_empty());
        assert_eq!(f.stirrups, Stirrups::default());
    }

    #[test]
    fn single_string_list_and_numbers() {
        let f = BeamFragment::from_json(&json!({
            "beam_id": 12,
            "reinforcement": "2-T12 + 1-T16",
            "stirrups": {"dia": null, "spacing": [150, null]}
        }))
        .unwrap();
        assert_eq!(f.beam_id.as_deref(), Some("12"));
        assert_eq!(f.reinforcement, vec!["2-T12 + 1-T16"]);
        assert!(f.stirrups.dia.is_empty());
        assert_eq!(f.stirrups.spacing, vec!["150"]);
    }

    #[test]
    fn size_written_as_one_string() {
        let f = BeamFragment::from_json(&json!({"beam_id": "CB1a", "size": "300x600"})).unwrap();
        assert_eq!(f.size.width, Some(Number::from(300)));
        assert_eq!(f.size.depth, Some(Number::from(600)));
    }

    #[test]
    fn unreadable_dimension_is_null() {
        let f = BeamFragment::from_json(&json!({
            "beam_id": "B3",
            "size": {"width": "-", "depth": 450.5}
        }))
        .unwrap();
        assert_eq!(f.size.width, None);
        assert!(f.size.depth.is_some());
    }

    #[test]
    fn wrong_types_are_schema_errors() {
        for bad in [
            json!("B1"),
            json!({"beam_id": ["B1"]}),
            json!({"beam_id": "B1", "reinforcement": {"top": "2-T12"}}),
            json!({"beam_id": "B1", "stirrups": ["T8"]}),
            json!({"beam_id": "B1", "stirrups": {"dia": [["T8"]]}}),
        ] {
            let err = BeamFragment::from_json(&bad).unwrap_err();
            assert!(matches!(err, ResponseError::Schema { .. }), "{bad}");
        }
    }

    #[test]
    fn placeholder_row() {
        let row = BeamRecord {
            beam_id: "B6".into(),
            size: BeamSize::default(),
            reinforcement: vec![],
            stirrups: Stirrups::default(),
        };
        assert!(row.is_placeholder());
    }

    #[test]
    fn record_serialises_null_dimensions() {
        let row = BeamRecord {
            beam_id: "B7".into(),
            size: BeamSize {
                width: Some(Number::from(230)),
                depth: None,
            },
            reinforcement: vec!["2-T12".into()],
            stirrups: Stirrups::default(),
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["size"], json!({"width": 230, "depth": null}));
        assert_eq!(v["stirrups"], json!({"dia": [], "spacing": []}));
    }
}
