//! Canonical schema nodes.

use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Serialize;

/// Primitive schema kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Any,
    Void,
    Date,
    DateTime,
    Buffer,
    /// An untyped object.
    Object,
    Null,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Any => "any",
            PrimitiveKind::Void => "void",
            PrimitiveKind::Date => "date",
            PrimitiveKind::DateTime => "datetime",
            PrimitiveKind::Buffer => "buffer",
            PrimitiveKind::Object => "object",
            PrimitiveKind::Null => "null",
        }
    }
}

/// A member of an enum schema. Only string and numeric literals qualify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum EnumValue {
    String(String),
    Number(OrderedFloat<f64>),
}

impl EnumValue {
    fn same_kind(&self, other: &EnumValue) -> bool {
        matches!(
            (self, other),
            (EnumValue::String(_), EnumValue::String(_)) | (EnumValue::Number(_), EnumValue::Number(_))
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            EnumValue::String(s) => serde_json::Value::String(s.clone()),
            EnumValue::Number(n) => serde_json::Number::from_f64(n.0)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::String(s) => write!(f, "'{}'", s),
            EnumValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// How an object treats properties it does not declare.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "policy", content = "schema", rename_all = "lowercase")]
pub enum AdditionalProperties {
    /// Nothing declared; the validator applies its configured extras policy.
    Implicit,
    /// Any extra property is accepted as-is.
    Any,
    /// Extra properties must match this schema.
    Schema(Box<SchemaNode>),
}

/// A resolved property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    pub schema: SchemaNode,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An object schema with ordered properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSchema {
    pub properties: IndexMap<String, PropertySchema>,
    pub additional_properties: AdditionalProperties,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self {
            properties: IndexMap::new(),
            additional_properties: AdditionalProperties::Implicit,
        }
    }

    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|(_, p)| p.required)
            .map(|(name, _)| name.as_str())
    }
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// A canonical, closed-world representation of a resolved type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SchemaNode {
    Primitive(PrimitiveKind),
    Array(Box<SchemaNode>),
    Enum(Vec<EnumValue>),
    Object(ObjectSchema),
    Union(Vec<SchemaNode>),
    Intersection(Vec<SchemaNode>),
    /// A named definition in the registry.
    Reference(String),
}

impl SchemaNode {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        SchemaNode::Primitive(kind)
    }

    pub fn array(element: SchemaNode) -> Self {
        SchemaNode::Array(Box::new(element))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        SchemaNode::Reference(name.into())
    }

    /// Builds a union, flattening nested unions and dropping duplicates.
    ///
    /// A union whose members are all enums of one literal kind collapses to a
    /// single enum; a single remaining member is returned as-is.
    pub fn union(members: Vec<SchemaNode>) -> Self {
        let mut flat: Vec<SchemaNode> = Vec::new();
        for member in members {
            match member {
                SchemaNode::Union(nested) => {
                    for n in nested {
                        if !flat.contains(&n) {
                            flat.push(n);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }

        if flat.len() == 1 {
            return flat.remove(0);
        }

        if let Some(values) = collapse_enums(&flat) {
            return SchemaNode::Enum(values);
        }

        SchemaNode::Union(flat)
    }

    /// Every reference name mentioned by this node, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SchemaNode::Reference(name) => out.push(name),
            SchemaNode::Array(inner) => inner.collect_references(out),
            SchemaNode::Union(members) | SchemaNode::Intersection(members) => {
                for m in members {
                    m.collect_references(out);
                }
            }
            SchemaNode::Object(obj) => {
                for prop in obj.properties.values() {
                    prop.schema.collect_references(out);
                }
                if let AdditionalProperties::Schema(extra) = &obj.additional_properties {
                    extra.collect_references(out);
                }
            }
            SchemaNode::Primitive(_) | SchemaNode::Enum(_) => {}
        }
    }
}

fn collapse_enums(members: &[SchemaNode]) -> Option<Vec<EnumValue>> {
    let mut values: Vec<EnumValue> = Vec::new();
    for member in members {
        let SchemaNode::Enum(vals) = member else {
            return None;
        };
        for v in vals {
            if let Some(first) = values.first() {
                if !first.same_kind(v) {
                    return None;
                }
            }
            if !values.contains(v) {
                values.push(v.clone());
            }
        }
    }
    Some(values)
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaNode::Primitive(kind) => f.write_str(kind.as_str()),
            SchemaNode::Array(inner) => write!(f, "{}[]", inner),
            SchemaNode::Enum(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(" | "))
            }
            SchemaNode::Object(_) => f.write_str("object"),
            SchemaNode::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                f.write_str(&parts.join(" | "))
            }
            SchemaNode::Intersection(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                f.write_str(&parts.join(" & "))
            }
            SchemaNode::Reference(name) => f.write_str(name),
        }
    }
}

/// A named, registered definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub schema: SchemaNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The declaration (with type arguments) this definition was resolved from.
    pub origin: String,
}

/// Read-only, insertion-ordered view of every registered definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SchemaDefinitions {
    entries: IndexMap<String, Definition>,
}

impl SchemaDefinitions {
    pub(crate) fn from_entries(entries: IndexMap<String, Definition>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> SchemaNode {
        SchemaNode::Enum(vec![EnumValue::String(v.to_string())])
    }

    #[test]
    fn test_string_literal_union_collapses_to_enum() {
        let node = SchemaNode::union(vec![s("open"), s("closed"), s("open")]);
        assert_eq!(
            node,
            SchemaNode::Enum(vec![
                EnumValue::String("open".into()),
                EnumValue::String("closed".into()),
            ])
        );
    }

    #[test]
    fn test_mixed_literal_kinds_stay_a_union() {
        let node = SchemaNode::union(vec![
            s("a"),
            SchemaNode::Enum(vec![EnumValue::Number(OrderedFloat(1.0))]),
        ]);
        assert!(matches!(node, SchemaNode::Union(ref m) if m.len() == 2));
    }

    #[test]
    fn test_single_member_union_unwraps() {
        let node = SchemaNode::union(vec![SchemaNode::primitive(PrimitiveKind::String)]);
        assert_eq!(node, SchemaNode::primitive(PrimitiveKind::String));
    }

    #[test]
    fn test_collects_nested_references() {
        let mut obj = ObjectSchema::new();
        obj.properties.insert(
            "children".into(),
            PropertySchema {
                schema: SchemaNode::array(SchemaNode::reference("TreeNode")),
                required: true,
                default: None,
                description: None,
            },
        );
        obj.additional_properties = AdditionalProperties::Schema(Box::new(SchemaNode::reference("Extra")));

        let node = SchemaNode::Object(obj);
        assert_eq!(node.references(), vec!["TreeNode", "Extra"]);
    }

    #[test]
    fn test_schema_serializes_with_kind_tag() {
        let node = SchemaNode::array(SchemaNode::primitive(PrimitiveKind::Integer));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "array");
        assert_eq!(json["value"]["kind"], "primitive");
        assert_eq!(json["value"]["value"], "integer");
    }
}
