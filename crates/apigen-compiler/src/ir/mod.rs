//! Language-agnostic intermediate representation.
//!
//! The IR is the output of a generation run: every named schema definition
//! reachable from a controller, plus one [`Operation`] per route method. It is
//! immutable once built and can be shared across request-handling threads.

mod operation;
mod schema;

pub use operation::{
    BindingSource, Operation, ParameterDescriptor, ResponseDescriptor, SecurityRequirement,
};
pub use schema::{
    AdditionalProperties, Definition, EnumValue, ObjectSchema, PrimitiveKind, PropertySchema,
    SchemaDefinitions, SchemaNode,
};

use serde::Serialize;

use crate::config::ValidationConfig;
use crate::decl::HttpVerb;
use crate::validate::{self, RawRequest, ValidationOutcome};

/// The complete API description produced by one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiIR {
    pub definitions: SchemaDefinitions,
    pub operations: Vec<Operation>,
}

impl ApiIR {
    /// Finds an operation by verb and normalized path template.
    pub fn operation(&self, verb: HttpVerb, path: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.verb == verb && op.path == path)
    }

    pub fn operation_by_id(&self, operation_id: &str) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.operation_id == operation_id)
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Validates a raw request against one of this IR's operations.
    pub fn validate(
        &self,
        operation: &Operation,
        request: &RawRequest,
        config: &ValidationConfig,
    ) -> ValidationOutcome {
        validate::validate_request(&operation.parameters, request, &self.definitions, config)
    }

    /// Serializes the IR as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
