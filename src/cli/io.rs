//! JSON I/O handling for CLI
//!
//! - Input: field values as one JSON object via stdin
//! - Output: one JSON object per invocation via stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::codec::FormData;
use crate::engine::EngineError;

/// Read form data from a JSON object.
///
/// String values are taken verbatim, numbers and booleans by their JSON
/// text and `null` as blank.
pub fn read_form(mut input: impl Read) -> CliResult<FormData> {
    let mut content = String::new();
    input.read_to_string(&mut content)?;

    if content.trim().is_empty() {
        return Err(CliError::invalid_input("Empty input"));
    }

    let value: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::invalid_input(format!("Invalid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| CliError::invalid_input("Expected a JSON object of field values"))?;

    object
        .iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(CliError::invalid_input(format!(
                        "Field '{}' must be a string, number, boolean or null",
                        name
                    )))
                }
            };
            Ok((name.clone(), text))
        })
        .collect()
}

/// Success response body
pub fn ok_response(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Error response body
pub fn error_response(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Error response for an engine failure; rejections list every problem.
pub fn engine_error_response(err: &EngineError) -> Value {
    let mut response = error_response(err.code(), &err.to_string());

    if let Some(rejection) = err.rejection() {
        response["errors"] = json!(rejection.errors);
        if let Some(current) = &rejection.current {
            response["current"] = json!(current);
        }
    }

    response
}

/// Write a response to stdout
pub fn write_json(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Rejection;
    use crate::schema::ValidationError;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    #[test]
    fn test_read_form() {
        let input = Cursor::new(r#"{"model": "Niva", "year": 1999, "address": null}"#);
        let form = read_form(input).unwrap();

        assert_eq!(form["model"], "Niva");
        assert_eq!(form["year"], "1999");
        assert_eq!(form["address"], "");
    }

    #[test]
    fn test_read_form_rejects_non_objects() {
        assert!(read_form(Cursor::new("[1, 2]")).is_err());
        assert!(read_form(Cursor::new("")).is_err());
        assert!(read_form(Cursor::new(r#"{"a": {"b": 1}}"#)).is_err());
    }

    #[test]
    fn test_engine_error_response() {
        let mut current = BTreeMap::new();
        current.insert("year".to_string(), "2010".to_string());

        let err = EngineError::Rejected(Rejection {
            errors: ValidationError::range_violation("year", "between 1900 and 2030", "1800").into(),
            current: Some(current),
        });

        let response = engine_error_response(&err);
        assert_eq!(response["status"], "error");
        assert_eq!(response["code"], "ROADBOOK_VALIDATION_FAILED");
        assert_eq!(response["errors"][0]["field"], "year");
        assert_eq!(response["errors"][0]["kind"], "RangeViolation");
        assert_eq!(response["current"]["year"], "2010");
    }

    #[test]
    fn test_ok_response_shape() {
        let response = ok_response(json!({"id": 1}));
        assert_eq!(response["status"], "ok");
        assert_eq!(response["data"]["id"], 1);
    }
}
