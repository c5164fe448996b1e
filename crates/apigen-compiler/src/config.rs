//! Compiler configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for the apigen compiler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Directory containing controller and model source files.
    pub source_dir: PathBuf,

    /// Source language (default: "typescript").
    pub language: String,

    /// How multiple security annotations on one operation combine.
    pub security: SecurityCombination,

    /// Request validation behaviour.
    pub validation: ValidationConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            language: "typescript".to_string(),
            security: SecurityCombination::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// How multiple `@Security` annotations on the same operation combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecurityCombination {
    /// Each annotation is an alternative; satisfying one is enough.
    #[default]
    AnyOf,
    /// All annotations merge into a single requirement.
    AllOf,
}

/// What to do with object properties the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtrasPolicy {
    /// Report each extra property as a field error.
    Reject,
    /// Silently remove extras from the output.
    #[default]
    Drop,
    /// Pass extras through unvalidated.
    Keep,
}

/// Request validation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Policy for undeclared object properties.
    pub additional_properties: ExtrasPolicy,

    /// Splits single query values into arrays (e.g. `ids=1,2,3`). Repeated
    /// keys always form arrays.
    pub query_array_delimiter: Option<char>,

    /// Separator for array-typed header values.
    pub header_array_delimiter: char,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            additional_properties: ExtrasPolicy::default(),
            query_array_delimiter: None,
            header_array_delimiter: ',',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.language, "typescript");
        assert_eq!(config.security, SecurityCombination::AnyOf);
        assert_eq!(config.validation.additional_properties, ExtrasPolicy::Drop);
        assert_eq!(config.validation.header_array_delimiter, ',');
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: CompilerConfig = serde_json::from_str(
            r#"{ "sourceDir": "app", "security": "allOf", "validation": { "additionalProperties": "reject" } }"#,
        )
        .unwrap();

        assert_eq!(config.source_dir, PathBuf::from("app"));
        assert_eq!(config.security, SecurityCombination::AllOf);
        assert_eq!(config.validation.additional_properties, ExtrasPolicy::Reject);
        assert_eq!(config.validation.query_array_delimiter, None);
        assert_eq!(config.language, "typescript");
    }
}
