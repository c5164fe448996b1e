//! Coercion of raw wire values against schema nodes.
//!
//! Text values (path, query, header) are parsed; structured values (body)
//! must already have the right JSON shape. Every failure is recorded in the
//! caller's [`FieldErrors`] and coercion carries on with the next field.

use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{FieldErrors, TypedValue};
use crate::config::{ExtrasPolicy, ValidationConfig};
use crate::ir::{
    AdditionalProperties, EnumValue, ObjectSchema, PrimitiveKind, PropertySchema, SchemaDefinitions,
    SchemaNode,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_REFERENCE_HOPS: usize = 32;

/// Coerces values against schemas of one frozen definition set.
pub(crate) struct Coercer<'a> {
    definitions: &'a SchemaDefinitions,
    config: &'a ValidationConfig,
}

impl<'a> Coercer<'a> {
    pub(crate) fn new(definitions: &'a SchemaDefinitions, config: &'a ValidationConfig) -> Self {
        Self { definitions, config }
    }

    /// Coerces text values. Arrays take every value, splitting each on
    /// `delimiter` when one is given; scalars take the first value.
    pub(crate) fn text(
        &self,
        schema: &SchemaNode,
        values: &[String],
        delimiter: Option<char>,
        path: &str,
        errors: &mut FieldErrors,
    ) -> Option<TypedValue> {
        match self.deref(schema, path, errors)? {
            SchemaNode::Array(inner) => {
                let items: Vec<&str> = values.iter().flat_map(|v| split(v, delimiter)).collect();
                let mut out = Vec::with_capacity(items.len());
                let mut ok = true;
                for (i, item) in items.iter().enumerate() {
                    match self.scalar_text(inner, item, &index(path, i), errors) {
                        Some(value) => out.push(value),
                        None => ok = false,
                    }
                }
                ok.then_some(TypedValue::Array(out))
            }
            SchemaNode::Union(members) => self.first_match(members, path, errors, text_value(values), |this, member, scratch| {
                this.text(member, values, delimiter, path, scratch)
            }),
            other => {
                let first = values.first()?;
                self.scalar_text(other, first, path, errors)
            }
        }
    }

    fn scalar_text(&self, schema: &SchemaNode, text: &str, path: &str, errors: &mut FieldErrors) -> Option<TypedValue> {
        match self.deref(schema, path, errors)? {
            SchemaNode::Primitive(kind) => self.text_primitive(*kind, text, path, errors),
            SchemaNode::Enum(values) => match enum_from_text(values, text) {
                Some(value) => Some(value),
                None => invalid(errors, path, enum_message(values), Value::String(text.to_string())),
            },
            SchemaNode::Union(members) => {
                self.first_match(members, path, errors, Value::String(text.to_string()), |this, member, scratch| {
                    this.scalar_text(member, text, path, scratch)
                })
            }
            // Structured schemas in a text slot must carry JSON.
            structured => match serde_json::from_str::<Value>(text) {
                Ok(value) => self.json(structured, &value, path, errors),
                Err(_) => invalid(
                    errors,
                    path,
                    format!("not a valid {}", describe(structured)),
                    Value::String(text.to_string()),
                ),
            },
        }
    }

    fn text_primitive(&self, kind: PrimitiveKind, text: &str, path: &str, errors: &mut FieldErrors) -> Option<TypedValue> {
        let raw = || Value::String(text.to_string());
        match kind {
            PrimitiveKind::String | PrimitiveKind::Any => Some(TypedValue::String(text.to_string())),
            PrimitiveKind::Number => match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Some(TypedValue::Number(n)),
                _ => invalid(errors, path, "not a valid number", raw()),
            },
            PrimitiveKind::Integer => match parse_integer(text.trim()) {
                Some(i) => Some(TypedValue::Integer(i)),
                None => invalid(errors, path, "not a valid integer", raw()),
            },
            PrimitiveKind::Boolean => {
                let trimmed = text.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(TypedValue::Boolean(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(TypedValue::Boolean(false))
                } else {
                    invalid(errors, path, "not a valid boolean", raw())
                }
            }
            PrimitiveKind::Date => parse_date(text, path, errors),
            PrimitiveKind::DateTime => parse_datetime(text, path, errors),
            PrimitiveKind::Buffer => Some(TypedValue::Bytes(text.as_bytes().to_vec())),
            PrimitiveKind::Null => match text {
                "null" => Some(TypedValue::Null),
                _ => invalid(errors, path, "not a valid null", raw()),
            },
            PrimitiveKind::Void => Some(TypedValue::Null),
            PrimitiveKind::Object => match serde_json::from_str::<Value>(text) {
                Ok(value @ Value::Object(_)) => Some(TypedValue::Any(value)),
                _ => invalid(errors, path, "not a valid object", raw()),
            },
        }
    }

    /// Coerces a structured (JSON) value.
    pub(crate) fn json(&self, schema: &SchemaNode, value: &Value, path: &str, errors: &mut FieldErrors) -> Option<TypedValue> {
        match self.deref(schema, path, errors)? {
            SchemaNode::Primitive(kind) => self.json_primitive(*kind, value, path, errors),
            SchemaNode::Enum(values) => match enum_from_json(values, value) {
                Some(typed) => Some(typed),
                None => invalid(errors, path, enum_message(values), value.clone()),
            },
            SchemaNode::Array(inner) => {
                let Value::Array(items) = value else {
                    return invalid(errors, path, "not a valid array", value.clone());
                };
                let mut out = Vec::with_capacity(items.len());
                let mut ok = true;
                for (i, item) in items.iter().enumerate() {
                    match self.json(inner, item, &index(path, i), errors) {
                        Some(typed) => out.push(typed),
                        None => ok = false,
                    }
                }
                ok.then_some(TypedValue::Array(out))
            }
            SchemaNode::Object(object) => match value {
                Value::Object(map) => self.object(object, map, path, errors),
                _ => invalid(errors, path, "not a valid object", value.clone()),
            },
            SchemaNode::Union(members) => {
                self.first_match(members, path, errors, value.clone(), |this, member, scratch| {
                    this.json(member, value, path, scratch)
                })
            }
            SchemaNode::Intersection(members) => self.intersection(members, value, path, errors),
            SchemaNode::Reference(name) => invalid(errors, path, format!("unknown schema '{}'", name), value.clone()),
        }
    }

    fn json_primitive(&self, kind: PrimitiveKind, value: &Value, path: &str, errors: &mut FieldErrors) -> Option<TypedValue> {
        match (kind, value) {
            (PrimitiveKind::String, Value::String(s)) => Some(TypedValue::String(s.clone())),
            (PrimitiveKind::Number, Value::Number(n)) => n.as_f64().map(TypedValue::Number),
            (PrimitiveKind::Integer, Value::Number(n)) => match n.as_i64().or_else(|| n.as_f64().and_then(integral)) {
                Some(i) => Some(TypedValue::Integer(i)),
                None => invalid(errors, path, "not a valid integer", value.clone()),
            },
            (PrimitiveKind::Boolean, Value::Bool(b)) => Some(TypedValue::Boolean(*b)),
            (PrimitiveKind::Date, Value::String(s)) => parse_date(s, path, errors),
            (PrimitiveKind::DateTime, Value::String(s)) => parse_datetime(s, path, errors),
            (PrimitiveKind::Buffer, Value::String(s)) => Some(TypedValue::Bytes(s.as_bytes().to_vec())),
            (PrimitiveKind::Buffer, Value::Array(items)) => {
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect();
                match bytes {
                    Some(bytes) => Some(TypedValue::Bytes(bytes)),
                    None => invalid(errors, path, "not a valid buffer", value.clone()),
                }
            }
            (PrimitiveKind::Any, _) => Some(TypedValue::Any(value.clone())),
            (PrimitiveKind::Object, Value::Object(_)) => Some(TypedValue::Any(value.clone())),
            (PrimitiveKind::Null, Value::Null) | (PrimitiveKind::Void, _) => Some(TypedValue::Null),
            (kind, _) => invalid(errors, path, format!("not a valid {}", kind.as_str()), value.clone()),
        }
    }

    fn object(
        &self,
        object: &ObjectSchema,
        map: &Map<String, Value>,
        path: &str,
        errors: &mut FieldErrors,
    ) -> Option<TypedValue> {
        let (out, ok) = self.fields(object, map, path, errors);
        ok.then_some(TypedValue::Object(out))
    }

    /// Coerces each declared property and applies the extras policy. Returns
    /// every field that coerced, plus whether the object as a whole is valid.
    pub(crate) fn fields(
        &self,
        object: &ObjectSchema,
        map: &Map<String, Value>,
        path: &str,
        errors: &mut FieldErrors,
    ) -> (IndexMap<String, TypedValue>, bool) {
        let mut out = IndexMap::new();
        let mut ok = true;

        for (name, prop) in &object.properties {
            let field = child(path, name);
            let coerced = match (map.get(name), &prop.default) {
                (Some(raw), _) => self.json(&prop.schema, raw, &field, errors),
                (None, Some(default)) => self.json(&prop.schema, default, &field, errors),
                (None, None) => {
                    if prop.required {
                        errors.add(&field, format!("'{}' is required", name), None);
                        ok = false;
                    }
                    continue;
                }
            };
            match coerced {
                Some(value) => {
                    out.insert(name.clone(), value);
                }
                None => ok = false,
            }
        }

        for (key, raw) in map {
            if object.properties.contains_key(key) {
                continue;
            }
            let field = child(path, key);
            match &object.additional_properties {
                AdditionalProperties::Any => {
                    out.insert(key.clone(), TypedValue::Any(raw.clone()));
                }
                AdditionalProperties::Schema(schema) => match self.json(schema, raw, &field, errors) {
                    Some(value) => {
                        out.insert(key.clone(), value);
                    }
                    None => ok = false,
                },
                AdditionalProperties::Implicit => match self.config.additional_properties {
                    ExtrasPolicy::Reject => {
                        errors.add(
                            &field,
                            format!("'{}' is an excess property and therefore is not allowed", key),
                            Some(raw.clone()),
                        );
                        ok = false;
                    }
                    ExtrasPolicy::Drop => {}
                    ExtrasPolicy::Keep => {
                        out.insert(key.clone(), TypedValue::Any(raw.clone()));
                    }
                },
            }
        }

        (out, ok)
    }

    /// Object intersections validate as one merged object, so extras are
    /// judged against every member's properties. Other intersections must
    /// satisfy each member in turn.
    fn intersection(&self, members: &[SchemaNode], value: &Value, path: &str, errors: &mut FieldErrors) -> Option<TypedValue> {
        let mut merged = ObjectSchema::new();
        let mut all_objects = true;
        for member in members {
            match self.deref(member, path, errors)? {
                SchemaNode::Object(object) => merge_into(&mut merged, object),
                _ => all_objects = false,
            }
        }

        if all_objects {
            return self.json(&SchemaNode::Object(merged), value, path, errors);
        }

        let mut result = None;
        let mut failed = false;
        for member in members {
            match self.json(member, value, path, errors) {
                Some(typed) => result = Some(typed),
                None => failed = true,
            }
        }
        if failed {
            None
        } else {
            result
        }
    }

    /// Tries each member on a scratch error set; the first clean match wins.
    fn first_match<F>(
        &self,
        members: &[SchemaNode],
        path: &str,
        errors: &mut FieldErrors,
        raw: Value,
        attempt: F,
    ) -> Option<TypedValue>
    where
        F: Fn(&Self, &SchemaNode, &mut FieldErrors) -> Option<TypedValue>,
    {
        for member in members {
            let mut scratch = FieldErrors::new();
            if let Some(value) = attempt(self, member, &mut scratch) {
                if scratch.is_empty() {
                    return Some(value);
                }
            }
        }
        let expected: Vec<String> = members.iter().map(|m| m.to_string()).collect();
        invalid(errors, path, format!("does not match any of: {}", expected.join(" | ")), raw)
    }

    /// Follows references to the definition they name.
    fn deref<'s>(&'s self, schema: &'s SchemaNode, path: &str, errors: &mut FieldErrors) -> Option<&'s SchemaNode> {
        let mut current = schema;
        for _ in 0..MAX_REFERENCE_HOPS {
            let SchemaNode::Reference(name) = current else {
                return Some(current);
            };
            match self.definitions.get(name) {
                Some(definition) => current = &definition.schema,
                None => {
                    errors.add(path, format!("unknown schema '{}'", name), None);
                    return None;
                }
            }
        }
        errors.add(path, "schema reference chain is too deep", None);
        None
    }
}

fn invalid(errors: &mut FieldErrors, path: &str, message: impl Into<String>, raw: Value) -> Option<TypedValue> {
    errors.add(path, message, Some(raw));
    None
}

fn parse_date(text: &str, path: &str, errors: &mut FieldErrors) -> Option<TypedValue> {
    match NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
        Ok(date) => Some(TypedValue::Date(date)),
        Err(_) => invalid(errors, path, "not a valid date (expected YYYY-MM-DD)", Value::String(text.to_string())),
    }
}

fn parse_datetime(text: &str, path: &str, errors: &mut FieldErrors) -> Option<TypedValue> {
    match DateTime::parse_from_rfc3339(text.trim()) {
        Ok(dt) => Some(TypedValue::DateTime(dt)),
        Err(_) => invalid(errors, path, "not a valid datetime (expected RFC 3339)", Value::String(text.to_string())),
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(integral))
}

fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64).then_some(n as i64)
}

fn enum_number(n: f64) -> TypedValue {
    integral(n).map_or(TypedValue::Number(n), TypedValue::Integer)
}

fn enum_from_text(values: &[EnumValue], text: &str) -> Option<TypedValue> {
    let number = text.trim().parse::<f64>().ok();
    values.iter().find_map(|v| match v {
        EnumValue::String(s) if s == text => Some(TypedValue::String(s.clone())),
        EnumValue::Number(n) if number == Some(n.0) => Some(enum_number(n.0)),
        _ => None,
    })
}

fn enum_from_json(values: &[EnumValue], value: &Value) -> Option<TypedValue> {
    values.iter().find_map(|v| match (v, value) {
        (EnumValue::String(s), Value::String(raw)) if s == raw => Some(TypedValue::String(s.clone())),
        (EnumValue::Number(n), Value::Number(raw)) if raw.as_f64() == Some(n.0) => Some(enum_number(n.0)),
        _ => None,
    })
}

fn enum_message(values: &[EnumValue]) -> String {
    let allowed: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("should be one of the following; [{}]", allowed.join(","))
}

fn merge_into(merged: &mut ObjectSchema, object: &ObjectSchema) {
    for (name, prop) in &object.properties {
        let required = prop.required || merged.properties.get(name).map_or(false, |p| p.required);
        merged.properties.insert(
            name.clone(),
            PropertySchema {
                required,
                ..prop.clone()
            },
        );
    }
    if object.additional_properties != AdditionalProperties::Implicit {
        merged.additional_properties = object.additional_properties.clone();
    }
}

fn describe(schema: &SchemaNode) -> &'static str {
    match schema {
        SchemaNode::Array(_) => "array",
        SchemaNode::Primitive(kind) => kind.as_str(),
        _ => "object",
    }
}

fn split(value: &str, delimiter: Option<char>) -> Vec<&str> {
    match delimiter {
        Some(d) => value.split(d).map(str::trim).filter(|s| !s.is_empty()).collect(),
        None => vec![value],
    }
}

fn text_value(values: &[String]) -> Value {
    match values {
        [single] => Value::String(single.clone()),
        many => Value::Array(many.iter().cloned().map(Value::String).collect()),
    }
}

fn child(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{}[{}]", path, i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prim(kind: PrimitiveKind) -> SchemaNode {
        SchemaNode::primitive(kind)
    }

    fn text(schema: &SchemaNode, raw: &str) -> (Option<TypedValue>, FieldErrors) {
        let definitions = SchemaDefinitions::default();
        let config = ValidationConfig::default();
        let mut errors = FieldErrors::new();
        let value = Coercer::new(&definitions, &config).text(schema, &[raw.to_string()], None, "p", &mut errors);
        (value, errors)
    }

    fn json(schema: &SchemaNode, raw: Value, config: &ValidationConfig) -> (Option<TypedValue>, FieldErrors) {
        let definitions = SchemaDefinitions::default();
        let mut errors = FieldErrors::new();
        let value = Coercer::new(&definitions, config).json(schema, &raw, "body", &mut errors);
        (value, errors)
    }

    fn object(props: &[(&str, SchemaNode, bool)]) -> SchemaNode {
        let mut object = ObjectSchema::new();
        for (name, schema, required) in props {
            object.properties.insert(
                name.to_string(),
                PropertySchema {
                    schema: schema.clone(),
                    required: *required,
                    default: None,
                    description: None,
                },
            );
        }
        SchemaNode::Object(object)
    }

    #[test]
    fn test_text_numbers() {
        assert_eq!(text(&prim(PrimitiveKind::Integer), "42").0, Some(TypedValue::Integer(42)));
        assert_eq!(text(&prim(PrimitiveKind::Number), "2.5").0, Some(TypedValue::Number(2.5)));

        let (value, errors) = text(&prim(PrimitiveKind::Integer), "4.2");
        assert_eq!(value, None);
        assert_eq!(errors.get("p").unwrap().message, "not a valid integer");

        let (_, errors) = text(&prim(PrimitiveKind::Number), "abc");
        assert_eq!(errors.get("p").unwrap().message, "not a valid number");
    }

    #[test]
    fn test_text_booleans_are_case_insensitive() {
        assert_eq!(text(&prim(PrimitiveKind::Boolean), "TRUE").0, Some(TypedValue::Boolean(true)));
        assert_eq!(text(&prim(PrimitiveKind::Boolean), "false").0, Some(TypedValue::Boolean(false)));
        assert_eq!(text(&prim(PrimitiveKind::Boolean), "yes").1.len(), 1);
    }

    #[test]
    fn test_body_booleans_must_be_structured() {
        let config = ValidationConfig::default();
        assert_eq!(
            json(&prim(PrimitiveKind::Boolean), json!(true), &config).0,
            Some(TypedValue::Boolean(true))
        );
        assert_eq!(json(&prim(PrimitiveKind::Boolean), json!("true"), &config).1.len(), 1);
    }

    #[test]
    fn test_dates() {
        let (value, _) = text(&prim(PrimitiveKind::Date), "2024-03-01");
        assert_eq!(value, Some(TypedValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())));

        let (value, _) = text(&prim(PrimitiveKind::DateTime), "2024-03-01T10:00:00Z");
        assert!(matches!(value, Some(TypedValue::DateTime(_))));

        let (value, errors) = text(&prim(PrimitiveKind::Date), "03/01/2024");
        assert_eq!(value, None);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_enum_membership() {
        let schema = SchemaNode::Enum(vec![
            EnumValue::String("open".into()),
            EnumValue::String("closed".into()),
        ]);
        assert_eq!(text(&schema, "open").0, Some(TypedValue::String("open".into())));

        let (value, errors) = text(&schema, "pending");
        assert_eq!(value, None);
        assert_eq!(
            errors.get("p").unwrap().message,
            "should be one of the following; ['open','closed']"
        );
    }

    #[test]
    fn test_array_errors_are_indexed() {
        let config = ValidationConfig::default();
        let schema = SchemaNode::array(prim(PrimitiveKind::Integer));
        let (value, errors) = json(&schema, json!([1, "two", 3, 4.5]), &config);
        assert_eq!(value, None);
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["body[1]", "body[3]"]);
    }

    #[test]
    fn test_text_array_with_delimiter() {
        let definitions = SchemaDefinitions::default();
        let config = ValidationConfig::default();
        let mut errors = FieldErrors::new();
        let schema = SchemaNode::array(prim(PrimitiveKind::Integer));
        let values = vec!["1,2".to_string(), "3".to_string()];
        let value = Coercer::new(&definitions, &config).text(&schema, &values, Some(','), "ids", &mut errors);
        assert_eq!(
            value,
            Some(TypedValue::Array(vec![
                TypedValue::Integer(1),
                TypedValue::Integer(2),
                TypedValue::Integer(3),
            ]))
        );
    }

    #[test]
    fn test_nested_object_errors_use_dotted_paths() {
        let config = ValidationConfig::default();
        let address = object(&[("city", prim(PrimitiveKind::String), true)]);
        let user = object(&[
            ("name", prim(PrimitiveKind::String), true),
            ("address", address, true),
        ]);

        let (value, errors) = json(&user, json!({ "address": {} }), &config);
        assert_eq!(value, None);
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["body.name", "body.address.city"]);
        assert_eq!(errors.get("body.name").unwrap().message, "'name' is required");
    }

    #[test]
    fn test_extras_policies() {
        let schema = object(&[("id", prim(PrimitiveKind::Integer), true)]);
        let raw = json!({ "id": 1, "extra": true });

        let drop = ValidationConfig::default();
        let (value, errors) = json(&schema, raw.clone(), &drop);
        assert!(errors.is_empty());
        assert!(value.unwrap().get("extra").is_none());

        let keep = ValidationConfig { additional_properties: ExtrasPolicy::Keep, ..ValidationConfig::default() };
        let (value, _) = json(&schema, raw.clone(), &keep);
        assert_eq!(value.unwrap().get("extra"), Some(&TypedValue::Any(json!(true))));

        let reject = ValidationConfig { additional_properties: ExtrasPolicy::Reject, ..ValidationConfig::default() };
        let (value, errors) = json(&schema, raw, &reject);
        assert_eq!(value, None);
        assert!(errors.contains("body.extra"));
    }

    #[test]
    fn test_union_first_match_wins() {
        let config = ValidationConfig::default();
        let schema = SchemaNode::Union(vec![prim(PrimitiveKind::Integer), prim(PrimitiveKind::String)]);
        assert_eq!(json(&schema, json!(5), &config).0, Some(TypedValue::Integer(5)));
        assert_eq!(json(&schema, json!("five"), &config).0, Some(TypedValue::String("five".into())));

        let (value, errors) = json(&schema, json!(false), &config);
        assert_eq!(value, None);
        assert_eq!(errors.get("body").unwrap().message, "does not match any of: integer | string");
    }

    #[test]
    fn test_integral_stays_within_i64() {
        assert_eq!(integral(2f64.powi(62)), Some(1_i64 << 62));
        assert_eq!(integral(2f64.powi(63)), None);
        assert_eq!(integral(-(2f64.powi(63))), Some(i64::MIN));

        let (value, errors) = text(&prim(PrimitiveKind::Integer), "9223372036854775808");
        assert_eq!(value, None);
        assert_eq!(errors.get("p").unwrap().message, "not a valid integer");
    }

    #[test]
    fn test_mixed_intersection_reports_every_member() {
        let config = ValidationConfig::default();
        let schema = SchemaNode::Intersection(vec![
            object(&[("a", prim(PrimitiveKind::String), true)]),
            SchemaNode::array(prim(PrimitiveKind::String)),
        ]);

        let (value, errors) = json(&schema, json!({ "a": 1 }), &config);
        assert_eq!(value, None);
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["body.a", "body"]);
        assert_eq!(errors.get("body").unwrap().message, "not a valid array");
    }

    #[test]
    fn test_intersection_checks_extras_against_all_members() {
        let reject = ValidationConfig { additional_properties: ExtrasPolicy::Reject, ..ValidationConfig::default() };
        let schema = SchemaNode::Intersection(vec![
            object(&[("a", prim(PrimitiveKind::String), true)]),
            object(&[("b", prim(PrimitiveKind::String), true)]),
        ]);

        let (value, errors) = json(&schema, json!({ "a": "x", "b": "y" }), &reject);
        assert!(errors.is_empty());
        assert_eq!(value.unwrap().get("b"), Some(&TypedValue::String("y".into())));
    }
}
