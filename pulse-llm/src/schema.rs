//! Declarative output contracts and their validator.
//!
//! An [`OutputSchema`] names the fields a structured response must carry and
//! the JSON shape of each. The same schema is sent to the model as a
//! response-shape constraint ([`OutputSchema::to_response_schema`]) and
//! checked against the decoded reply ([`SchemaValidator::validate`]).
//! Decoding is not the validator's job: it only ever sees a `serde_json::Value`.
//!
//! Unknown extra fields are accepted. Optional fields may be absent or `null`;
//! required fields may be neither.

use std::fmt;

use serde_json::{json, Map, Value};

/// The JSON shape expected for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A string drawn from a fixed set.
    Enum(Vec<String>),
    /// An array whose every element has the given shape.
    Array(Box<FieldKind>),
    /// A nested object with its own fields.
    Object(Vec<FieldSpec>),
}

impl FieldKind {
    /// Shorthand for `Array(Box::new(kind))`.
    #[must_use]
    pub fn array_of(kind: FieldKind) -> Self {
        Self::Array(Box::new(kind))
    }

    /// Shorthand for an enum over string literals.
    #[must_use]
    pub fn one_of(values: &[&str]) -> Self {
        Self::Enum(values.iter().map(|v| (*v).to_string()).collect())
    }

    fn describe(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Number => "number".into(),
            Self::Integer => "integer".into(),
            Self::Boolean => "boolean".into(),
            Self::Enum(values) => format!("one of [{}]", values.join(", ")),
            Self::Array(inner) => format!("array of {}", inner.describe()),
            Self::Object(_) => "object".into(),
        }
    }

    fn to_response_schema(&self) -> Value {
        match self {
            Self::String => json!({ "type": "STRING" }),
            Self::Number => json!({ "type": "NUMBER" }),
            Self::Integer => json!({ "type": "INTEGER" }),
            Self::Boolean => json!({ "type": "BOOLEAN" }),
            Self::Enum(values) => json!({ "type": "STRING", "enum": values }),
            Self::Array(inner) => json!({ "type": "ARRAY", "items": inner.to_response_schema() }),
            Self::Object(fields) => object_schema(fields),
        }
    }
}

/// One named field of a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name in the JSON object.
    pub name: String,
    /// Expected shape.
    pub kind: FieldKind,
    /// Whether the field must be present and non-null.
    pub required: bool,
}

impl FieldSpec {
    /// A required field.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// An optional field.
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// A named structural contract for a model response. The root is always a
/// JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl OutputSchema {
    /// Start an empty contract.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a required field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::required(name, kind));
        self
    }

    /// Add an optional field.
    #[must_use]
    pub fn optional_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::optional(name, kind));
        self
    }

    /// Contract name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Render as the OpenAPI-subset schema accepted by the Gemini
    /// `generationConfig.responseSchema` parameter.
    #[must_use]
    pub fn to_response_schema(&self) -> Value {
        object_schema(&self.fields)
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| {
            let mut schema = f.kind.to_response_schema();
            if !f.required {
                schema["nullable"] = Value::Bool(true);
            }
            (f.name.clone(), schema)
        })
        .collect();
    let required: Vec<&str> = fields
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name.as_str())
        .collect();
    let ordering: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": ordering,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path to the offending value (`$` is the root).
    pub path: String,
    /// What the contract expected.
    pub expected: String,
    /// What was actually found.
    pub found: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.path, self.expected, self.found)
    }
}

/// Result of validating a value against an [`OutputSchema`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    /// `true` when no field failed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Field-level diagnostics.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "valid");
        }
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Checks decoded JSON against an [`OutputSchema`].
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validate `value` and collect every field-level failure.
    #[must_use]
    pub fn validate(schema: &OutputSchema, value: &Value) -> ValidationReport {
        let mut errors = Vec::new();
        match value {
            Value::Object(map) => check_fields(&schema.fields, map, "", &mut errors),
            other => errors.push(FieldError {
                path: "$".into(),
                expected: "object".into(),
                found: json_kind(other).into(),
            }),
        }
        ValidationReport { errors }
    }
}

fn check_fields(fields: &[FieldSpec], map: &Map<String, Value>, prefix: &str, errors: &mut Vec<FieldError>) {
    for spec in fields {
        let path = if prefix.is_empty() {
            spec.name.clone()
        } else {
            format!("{prefix}.{}", spec.name)
        };
        match map.get(&spec.name) {
            None | Some(Value::Null) if !spec.required => {}
            None => errors.push(FieldError {
                path,
                expected: spec.kind.describe(),
                found: "missing".into(),
            }),
            Some(value) => check_value(&spec.kind, value, &path, errors),
        }
    }
}

fn check_value(kind: &FieldKind, value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    let ok = match (kind, value) {
        (FieldKind::String, Value::String(_))
        | (FieldKind::Number, Value::Number(_))
        | (FieldKind::Boolean, Value::Bool(_)) => true,
        (FieldKind::Integer, Value::Number(n)) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        (FieldKind::Enum(allowed), Value::String(s)) => allowed.iter().any(|a| a == s),
        (FieldKind::Array(inner), Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_value(inner, item, &format!("{path}[{i}]"), errors);
            }
            true
        }
        (FieldKind::Object(fields), Value::Object(map)) => {
            check_fields(fields, map, path, errors);
            true
        }
        _ => false,
    };

    if !ok {
        let found = match value {
            Value::String(s) if matches!(kind, FieldKind::Enum(_)) => format!("\"{s}\""),
            other => json_kind(other).to_string(),
        };
        errors.push(FieldError {
            path: path.to_string(),
            expected: kind.describe(),
            found,
        });
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
