//! Common utilities shared across tool definitions.
//!
//! Argument decoding, schema generation, shape validation of identifiers
//! and the text rendering of platform records.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

use crate::clients::{Process, Service};
use crate::domains::tools::{ToolError, ToolResult};

/// Longest accepted identifier.
const MAX_ID_LENGTH: usize = 64;

/// Longest accepted service hostname.
const MAX_HOSTNAME_LENGTH: usize = 25;

/// Upper bound for every `limit` argument.
pub const MAX_LIMIT: u32 = 100;

/// Decode tool arguments into a parameter struct.
///
/// A missing argument object is treated as empty so that tools without
/// required parameters can be called bare.
pub fn parse_params<T: DeserializeOwned>(arguments: Value) -> ToolResult<T> {
    let arguments = match arguments {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| {
        warn!("Rejected tool arguments: {}", e);
        ToolError::invalid_arguments(e.to_string())
    })
}

/// JSON schema of a parameter struct, as advertised by `tools/list`.
pub fn schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        object
            .entry("properties")
            .or_insert_with(|| json!({}));
    }
    value
}

/// Check the shape of an opaque platform identifier.
pub fn validate_id<'a>(field: &str, value: &'a str, lookup_tool: &str) -> ToolResult<&'a str> {
    let valid = !value.is_empty()
        && value.len() <= MAX_ID_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(value)
    } else {
        Err(ToolError::invalid_arguments(format!(
            "{field} '{value}' is not a valid identifier (expected 1-{MAX_ID_LENGTH} ASCII \
             letters, digits, '-' or '_'); use {lookup_tool} to find the right value"
        )))
    }
}

/// Check the shape of a service hostname.
pub fn validate_hostname(value: &str) -> ToolResult<&str> {
    let mut chars = value.chars();
    let valid = value.len() <= MAX_HOSTNAME_LENGTH
        && chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    if valid {
        Ok(value)
    } else {
        Err(ToolError::invalid_arguments(format!(
            "hostname '{value}' is invalid: use 1-{MAX_HOSTNAME_LENGTH} lowercase letters or \
             digits, starting with a letter (for example 'api' or 'db1')"
        )))
    }
}

/// Check the shape of an environment variable name.
pub fn validate_env_key(value: &str) -> ToolResult<&str> {
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(value)
    } else {
        Err(ToolError::invalid_arguments(format!(
            "key '{value}' is not a valid environment variable name (letters, digits and '_', \
             not starting with a digit)"
        )))
    }
}

/// Require a non-blank string argument.
pub fn require_text<'a>(field: &str, value: &'a str) -> ToolResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ToolError::invalid_arguments(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

/// Clamp an optional limit into `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

/// Validate a container range.
pub fn validate_scaling(min: u32, max: u32) -> ToolResult<()> {
    if min == 0 {
        return Err(ToolError::invalid_arguments(
            "minContainers must be at least 1",
        ));
    }
    if min > max {
        return Err(ToolError::invalid_arguments(format!(
            "minContainers ({min}) must not exceed maxContainers ({max})"
        )));
    }
    Ok(())
}

/// Destructive operations only run with an explicit confirmation.
pub fn require_confirmation(confirm: bool, operation: &str) -> ToolResult<()> {
    if confirm {
        Ok(())
    } else {
        Err(ToolError::invalid_arguments(format!(
            "{operation} cannot be undone; call the tool again with \"confirm\": true to proceed"
        )))
    }
}

/// Text shown after a mutating call started a platform process.
pub fn describe_process(process: &Process) -> String {
    let mut text = format!(
        "Process {} ({}) is {}.",
        process.id, process.action, process.status
    );
    if let Some(message) = &process.message {
        text.push_str(&format!(" {message}"));
    }
    if !process.status.is_terminal() {
        text.push_str(&format!(
            "\nPoll process_status with processId=\"{}\" until it finishes.",
            process.id
        ));
    }
    text
}

/// One-line summary of a service.
pub fn describe_service(service: &Service) -> String {
    let mut line = format!(
        "- {} [{}] type={}",
        service.hostname, service.id, service.service_type
    );
    if let Some(status) = &service.status {
        line.push_str(&format!(" status={status}"));
    }
    if let (Some(min), Some(max)) = (service.min_containers, service.max_containers) {
        line.push_str(&format!(" containers={min}..{max}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ProcessStatus;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        /// The project.
        project_id: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    #[test]
    fn test_parse_params() {
        let sample: Sample = parse_params(json!({"projectId": "p1"})).unwrap();
        assert_eq!(sample.project_id, "p1");
        assert_eq!(sample.limit, None);

        let err = parse_params::<Sample>(Value::Null).unwrap_err();
        assert!(err.to_string().contains("projectId"));

        let err = parse_params::<Sample>(json!({"projectId": 5})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_schema_for_is_clean_object_schema() {
        let schema = schema_for::<Sample>();
        assert_eq!(schema["type"], "object");
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert_eq!(schema["properties"]["projectId"]["description"], "The project.");
        assert_eq!(schema["required"], json!(["projectId"]));
    }

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id("projectId", "p_1-A", "project_list").unwrap(), "p_1-A");
        assert!(validate_id("projectId", "", "project_list").is_err());
        assert!(validate_id("projectId", &"a".repeat(65), "project_list").is_err());

        let err = validate_id("serviceId", "../etc", "service_list").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("serviceId"));
        assert!(message.contains("../etc"));
        assert!(message.contains("service_list"));
    }

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("api").is_ok());
        assert!(validate_hostname("db1").is_ok());
        assert!(validate_hostname("1db").is_err());
        assert!(validate_hostname("Api").is_err());
        assert!(validate_hostname("my-api").is_err());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname(&"a".repeat(26)).is_err());
    }

    #[test]
    fn test_validate_env_key() {
        assert!(validate_env_key("DATABASE_URL").is_ok());
        assert!(validate_env_key("_private").is_ok());
        assert!(validate_env_key("1ABC").is_err());
        assert!(validate_env_key("A-B").is_err());
        assert!(validate_env_key("").is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50), 50);
        assert_eq!(clamp_limit(Some(0), 50), 1);
        assert_eq!(clamp_limit(Some(500), 5), MAX_LIMIT);
        assert_eq!(clamp_limit(Some(7), 5), 7);
    }

    #[test]
    fn test_validate_scaling() {
        assert!(validate_scaling(1, 3).is_ok());
        assert!(validate_scaling(0, 3).is_err());
        assert!(validate_scaling(4, 3).is_err());
    }

    #[test]
    fn test_require_confirmation() {
        assert!(require_confirmation(true, "Deleting project p1").is_ok());
        let err = require_confirmation(false, "Deleting project p1").unwrap_err();
        assert!(err.to_string().contains("\"confirm\": true"));
    }

    #[test]
    fn test_describe_process_hints_polling_until_terminal() {
        let mut process = Process {
            id: "proc-1".to_string(),
            action: "restart".to_string(),
            status: ProcessStatus::Running,
            project_id: None,
            service_id: Some("s1".to_string()),
            message: None,
            created: None,
            finished: None,
        };
        assert!(describe_process(&process).contains("process_status"));

        process.status = ProcessStatus::Finished;
        let text = describe_process(&process);
        assert_eq!(text, "Process proc-1 (restart) is finished.");
    }
}
