use async_trait::async_trait;
use serde_json::Value;

use fill_protocol::{Operator, OperatorError, OperatorInput, OperatorName, OperatorOutput, StructuredOutputOutput};

/// If a schema is supplied, the operator must validate against it before
/// returning; schema violation is a failure (spec.md §4.5). Supports the
/// common subset of JSON Schema actually exercised by column
/// `operatorConfig` in practice: `type: "object"` with `properties` and
/// `required`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredOutputOperator;

#[async_trait]
impl Operator for StructuredOutputOperator {
    fn name(&self) -> OperatorName {
        OperatorName::StructuredOutput
    }

    async fn operate(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let OperatorInput::StructuredOutput(input) = input else {
            return Err(OperatorError::InvalidInput("expected structured_output input".to_owned()));
        };

        let structured_data = coerce(&input.raw_data, input.prompt.as_deref());

        if let Err(violation) = validate_against_schema(&structured_data, &input.output_schema) {
            return Err(OperatorError::SchemaViolation(violation));
        }

        Ok(OperatorOutput::StructuredOutput(StructuredOutputOutput {
            structured_data,
            confidence: 0.9,
            raw_response: input.prompt,
        }))
    }
}

/// Produce a single-field object wrapping `raw_data` under `"value"` when
/// it isn't already an object, so downstream single-field extraction
/// (spec.md §4.3.2) has something to extract.
fn coerce(raw_data: &Value, prompt: Option<&str>) -> Value {
    match raw_data {
        Value::Object(_) => raw_data.clone(),
        Value::Null => serde_json::json!({ "value": prompt.unwrap_or_default() }),
        other => serde_json::json!({ "value": other }),
    }
}

/// Minimal `type: "object"` / `properties` / `required` schema check.
/// Anything beyond that subset is accepted without further inspection.
fn validate_against_schema(data: &Value, schema: &Value) -> Result<(), String> {
    let Value::Object(schema_obj) = schema else { return Ok(()) };

    if let Some(Value::String(kind)) = schema_obj.get("type")
        && kind == "object"
        && !data.is_object()
    {
        return Err(format!("expected an object, got {data}"));
    }

    if let Some(Value::Array(required)) = schema_obj.get("required") {
        let Value::Object(data_obj) = data else {
            return Err("schema requires fields but data is not an object".to_owned());
        };
        for field in required {
            if let Value::String(name) = field
                && !data_obj.contains_key(name)
            {
                return Err(format!("missing required field: {name}"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_data_satisfying_required_fields() {
        let schema = serde_json::json!({ "type": "object", "required": ["name"] });
        let data = serde_json::json!({ "name": "Acme" });
        assert!(validate_against_schema(&data, &schema).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = serde_json::json!({ "type": "object", "required": ["name"] });
        let data = serde_json::json!({ "other": 1 });
        assert!(validate_against_schema(&data, &schema).is_err());
    }
}
