//! Request-time validation of raw values against an operation's parameters.

mod coerce;
mod errors;
mod request;
mod value;

pub use errors::{FieldError, FieldErrors};
pub use request::RawRequest;
pub use value::TypedValue;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ValidationConfig;
use crate::ir::{BindingSource, ObjectSchema, ParameterDescriptor, PropertySchema, SchemaDefinitions};
use coerce::Coercer;

/// Error key for a request body that is not an object when the operation
/// reads discrete fields from it.
pub const IMPLICIT_BODY_KEY: &str = "body";

/// Result of validating one request: every argument that coerced cleanly,
/// plus every field that did not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationOutcome {
    /// Typed arguments keyed by method parameter name.
    pub args: IndexMap<String, TypedValue>,
    pub errors: FieldErrors,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<IndexMap<String, TypedValue>, FieldErrors> {
        if self.errors.is_empty() {
            Ok(self.args)
        } else {
            Err(self.errors)
        }
    }
}

enum RawValue<'r> {
    Text(&'r [String], Option<char>),
    Json(&'r Value),
}

/// Validates and coerces a request against a parameter list.
///
/// All parameters are checked; errors never stop the remaining fields.
/// Request-context and injected parameters are skipped. Implicit body fields
/// are checked together as one object, so the extras policy covers the body.
pub fn validate_request(
    parameters: &[ParameterDescriptor],
    request: &RawRequest,
    definitions: &SchemaDefinitions,
    config: &ValidationConfig,
) -> ValidationOutcome {
    let coercer = Coercer::new(definitions, config);
    let mut outcome = ValidationOutcome::default();
    let mut implicit: Option<IndexMap<String, TypedValue>> = None;

    for param in parameters {
        if !param.source.is_validated() {
            continue;
        }
        let Some(schema) = &param.schema else {
            continue;
        };
        let key = param.name.as_str();

        if param.source == BindingSource::ImplicitBodyField {
            let fields = implicit
                .get_or_insert_with(|| implicit_body(&coercer, parameters, request, &mut outcome.errors));
            if let Some(value) = fields.shift_remove(&param.wire_name) {
                outcome.args.insert(param.name.clone(), value);
            }
            continue;
        }

        let errors = &mut outcome.errors;
        let coerced = match raw_value(param, request, config) {
            Some(RawValue::Text(values, delimiter)) => coercer.text(schema, values, delimiter, key, errors),
            Some(RawValue::Json(value)) => coercer.json(schema, value, key, errors),
            None => match &param.default {
                Some(default) => coercer.json(schema, default, key, errors),
                None => {
                    if param.required {
                        errors.add(key, format!("'{}' is required", param.name), None);
                    }
                    None
                }
            },
        };

        if let Some(value) = coerced {
            outcome.args.insert(param.name.clone(), value);
        }
    }

    if !outcome.is_valid() {
        tracing::debug!(errors = outcome.errors.len(), "request failed validation");
    }
    outcome
}

/// Validates the body against the object formed by every implicit body
/// field. Returns the coerced fields keyed by wire name.
fn implicit_body(
    coercer: &Coercer,
    parameters: &[ParameterDescriptor],
    request: &RawRequest,
    errors: &mut FieldErrors,
) -> IndexMap<String, TypedValue> {
    let mut object = ObjectSchema::new();
    for param in parameters {
        if param.source != BindingSource::ImplicitBodyField {
            continue;
        }
        let Some(schema) = &param.schema else {
            continue;
        };
        object.properties.insert(
            param.wire_name.clone(),
            PropertySchema {
                schema: schema.clone(),
                required: param.required,
                default: param.default.clone(),
                description: None,
            },
        );
    }

    let empty = Map::new();
    let map = match request.body() {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(other) => {
            errors.add(IMPLICIT_BODY_KEY, "not a valid object", Some(other.clone()));
            return IndexMap::new();
        }
    };
    coercer.fields(&object, map, "", errors).0
}

fn raw_value<'r>(param: &ParameterDescriptor, request: &'r RawRequest, config: &ValidationConfig) -> Option<RawValue<'r>> {
    let wire = param.wire_name.as_str();
    let text = |values: &'r [String], delimiter| (!values.is_empty()).then_some(RawValue::Text(values, delimiter));
    match param.source {
        BindingSource::Path => text(request.path_values(wire), None),
        BindingSource::Query => text(request.query_values(wire), config.query_array_delimiter),
        BindingSource::Header => text(request.header_values(wire), Some(config.header_array_delimiter)),
        BindingSource::Body => request.body().filter(|body| !body.is_null()).map(RawValue::Json),
        BindingSource::ImplicitBodyField | BindingSource::RequestContext | BindingSource::Injected => None,
    }
}
