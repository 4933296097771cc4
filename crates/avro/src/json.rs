//! Avro JSON encoding to native Avro values.
//!
//! Records and unions are walked with the schema so that union values written
//! in the Avro JSON encoding (`null` or `{"<branch>": value}`) land on the
//! right branch. Numbers are range-checked against their Avro type, and
//! `bytes`/`fixed` strings carry one byte per code point. Everything else is
//! converted generically and checked later by
//! [`Value::resolve`](apache_avro::types::Value::resolve).

use std::collections::HashMap;

use apache_avro::schema::{Name, Schema, UnionSchema};
use apache_avro::types::Value;
use serde_json::Value as JsonValue;

use crate::error::{CodecError, Result};

/// Convert a JSON document into an Avro value shaped by `schema`.
///
/// `names` holds the named types of the enclosing schema so that references
/// (`Schema::Ref`) can be followed.
pub fn json_to_value(
    json: JsonValue,
    schema: &Schema,
    names: &HashMap<Name, &Schema>,
) -> Result<Value> {
    match schema {
        Schema::Record(record) => {
            let mut object = match json {
                JsonValue::Object(object) => object,
                other => {
                    return Err(CodecError::MessageParse(format!(
                        "record '{}' expects a JSON object, got {}",
                        record.name.fullname(None),
                        json_kind(&other)
                    )));
                }
            };

            // Absent fields are left out so that resolution can apply defaults
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                if let Some(field_json) = object.remove(&field.name) {
                    let value = json_to_value(field_json, &field.schema, names).map_err(|e| {
                        CodecError::MessageParse(format!("field '{}': {e}", field.name))
                    })?;
                    fields.push((field.name.clone(), value));
                }
            }

            if !object.is_empty() {
                let unknown: Vec<&str> = object.keys().map(String::as_str).collect();
                return Err(CodecError::MessageParse(format!(
                    "record '{}' has no field named {}",
                    record.name.fullname(None),
                    unknown.join(", ")
                )));
            }
            Ok(Value::Record(fields))
        }
        Schema::Union(union) => union_to_value(json, union, names),
        Schema::Ref { name } => match names.get(name) {
            Some(named) => json_to_value(json, named, names),
            None => Ok(Value::from(json)),
        },
        Schema::Int => {
            let n = integer(&json, "int")?;
            i32::try_from(n)
                .map(Value::Int)
                .map_err(|_| CodecError::MessageParse(format!("{n} is out of range for int")))
        }
        Schema::Long => integer(&json, "long").map(Value::Long),
        Schema::Float => {
            let n = number(&json, "float")?;
            let narrowed = n as f32;
            if !narrowed.is_finite() {
                return Err(CodecError::MessageParse(format!(
                    "{n} is out of range for float"
                )));
            }
            Ok(Value::Float(narrowed))
        }
        Schema::Double => number(&json, "double").map(Value::Double),
        Schema::Bytes => code_point_bytes(&json, "bytes").map(Value::Bytes),
        Schema::Fixed(fixed) => {
            let bytes = code_point_bytes(&json, "fixed")?;
            if bytes.len() != fixed.size {
                return Err(CodecError::MessageParse(format!(
                    "fixed '{}' expects {} bytes, got {}",
                    fixed.name.fullname(None),
                    fixed.size,
                    bytes.len()
                )));
            }
            Ok(Value::Fixed(fixed.size, bytes))
        }
        _ => Ok(Value::from(json)),
    }
}

fn integer(json: &JsonValue, kind: &str) -> Result<i64> {
    match json {
        JsonValue::Number(n) => n.as_i64().ok_or_else(|| {
            CodecError::MessageParse(format!("{n} is not a valid {kind}"))
        }),
        other => Err(CodecError::MessageParse(format!(
            "{kind} expects an integer, got {}",
            json_kind(other)
        ))),
    }
}

fn number(json: &JsonValue, kind: &str) -> Result<f64> {
    json.as_f64().ok_or_else(|| {
        CodecError::MessageParse(format!(
            "{kind} expects a number, got {}",
            json_kind(json)
        ))
    })
}

/// Bytes in the Avro JSON encoding: one code point in U+0000..=U+00FF per
/// byte.
fn code_point_bytes(json: &JsonValue, kind: &str) -> Result<Vec<u8>> {
    let JsonValue::String(text) = json else {
        return Err(CodecError::MessageParse(format!(
            "{kind} expects a string, got {}",
            json_kind(json)
        )));
    };

    text.chars()
        .map(|c| {
            u8::try_from(c).map_err(|_| {
                CodecError::MessageParse(format!(
                    "{kind} value contains U+{:04X}, above U+00FF",
                    c as u32
                ))
            })
        })
        .collect()
}

fn union_to_value(
    json: JsonValue,
    union: &UnionSchema,
    names: &HashMap<Name, &Schema>,
) -> Result<Value> {
    let variants = union.variants();

    if json.is_null() {
        return match variants.iter().position(|v| matches!(v, Schema::Null)) {
            Some(index) => Ok(Value::Union(index as u32, Box::new(Value::Null))),
            None => Err(CodecError::MessageParse(
                "null is not a member of the union".to_string(),
            )),
        };
    }

    let wrapped = json
        .as_object()
        .filter(|object| object.len() == 1)
        .and_then(|object| object.iter().next())
        .and_then(|(branch, inner)| {
            variants
                .iter()
                .position(|variant| branch_matches(variant, branch))
                .map(|index| (index, inner.clone()))
        });

    match wrapped {
        Some((index, inner)) => {
            let value = json_to_value(inner, &variants[index], names)?;
            Ok(Value::Union(index as u32, Box::new(value)))
        }
        // Bare union values are resolved against the branches later
        None => Ok(Value::from(json)),
    }
}

/// Whether `branch` names this union member in the Avro JSON encoding.
fn branch_matches(variant: &Schema, branch: &str) -> bool {
    if let Some(name) = variant.name() {
        return name.name == branch || name.fullname(None) == branch;
    }

    match serde_json::to_value(variant) {
        Ok(JsonValue::String(kind)) => kind == branch,
        Ok(JsonValue::Object(object)) => {
            object.get("type").and_then(JsonValue::as_str) == Some(branch)
        }
        _ => false,
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_names() -> HashMap<Name, &'static Schema> {
        HashMap::new()
    }

    #[test]
    fn test_record_requires_object() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "User", "fields": [{"name": "id", "type": "long"}]}"#,
        )
        .unwrap();
        let err = json_to_value(json!([1, 2]), &schema, &no_names()).unwrap_err();
        assert!(err.to_string().contains("expects a JSON object, got an array"));
    }

    #[test]
    fn test_union_null_branch() {
        let schema = Schema::parse_str(r#"["null", "string"]"#).unwrap();
        let value = json_to_value(JsonValue::Null, &schema, &no_names()).unwrap();
        assert_eq!(value, Value::Union(0, Box::new(Value::Null)));
    }

    #[test]
    fn test_union_wrapped_branch() {
        let schema = Schema::parse_str(r#"["null", "string", "long"]"#).unwrap();
        let value = json_to_value(json!({"long": 7}), &schema, &no_names()).unwrap();
        assert!(matches!(value, Value::Union(2, _)));
    }

    #[test]
    fn test_union_without_null_rejects_null() {
        let schema = Schema::parse_str(r#"["string", "long"]"#).unwrap();
        let err = json_to_value(JsonValue::Null, &schema, &no_names()).unwrap_err();
        assert!(matches!(err, CodecError::MessageParse(_)));
    }

    #[test]
    fn test_int_out_of_range() {
        let err = json_to_value(json!(3_000_000_000_i64), &Schema::Int, &no_names()).unwrap_err();
        assert!(err.to_string().contains("out of range for int"));

        let value = json_to_value(json!(-2_147_483_648_i64), &Schema::Int, &no_names()).unwrap();
        assert_eq!(value, Value::Int(i32::MIN));
    }

    #[test]
    fn test_long_rejects_fractions_and_overflow() {
        assert!(json_to_value(json!(1.5), &Schema::Long, &no_names()).is_err());
        assert!(json_to_value(json!(u64::MAX), &Schema::Long, &no_names()).is_err());
        assert!(json_to_value(json!("7"), &Schema::Long, &no_names()).is_err());
    }

    #[test]
    fn test_float_out_of_range() {
        let err = json_to_value(json!(1e300), &Schema::Float, &no_names()).unwrap_err();
        assert!(matches!(err, CodecError::MessageParse(_)));

        let value = json_to_value(json!(2), &Schema::Float, &no_names()).unwrap();
        assert_eq!(value, Value::Float(2.0));
    }

    #[test]
    fn test_bytes_use_one_code_point_per_byte() {
        let value = json_to_value(json!("\u{00ff}A\u{0000}"), &Schema::Bytes, &no_names()).unwrap();
        assert_eq!(value, Value::Bytes(vec![0xFF, b'A', 0x00]));

        let err = json_to_value(json!("\u{20ac}"), &Schema::Bytes, &no_names()).unwrap_err();
        assert!(err.to_string().contains("U+20AC"));
    }

    #[test]
    fn test_fixed_length_is_checked() {
        let schema = Schema::parse_str(r#"{"type": "fixed", "name": "Pair", "size": 2}"#).unwrap();

        let value = json_to_value(json!("\u{0001}\u{00fe}"), &schema, &no_names()).unwrap();
        assert_eq!(value, Value::Fixed(2, vec![0x01, 0xFE]));

        let err = json_to_value(json!("abc"), &schema, &no_names()).unwrap_err();
        assert!(err.to_string().contains("expects 2 bytes, got 3"));
    }

    #[test]
    fn test_record_rejects_unknown_fields() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "User", "fields": [
                {"name": "plan", "type": "string", "default": "FREE"}
            ]}"#,
        )
        .unwrap();

        let err = json_to_value(json!({"Plan": "PRO"}), &schema, &no_names()).unwrap_err();
        assert!(matches!(err, CodecError::MessageParse(_)));
        assert!(err.to_string().contains("has no field named Plan"));
    }

    #[test]
    fn test_branch_matches_named_type() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "Address", "namespace": "com.acme", "fields": []}"#,
        )
        .unwrap();
        assert!(branch_matches(&schema, "com.acme.Address"));
        assert!(branch_matches(&schema, "Address"));
        assert!(!branch_matches(&schema, "record"));
    }
}
