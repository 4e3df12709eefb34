use async_trait::async_trait;

use fill_protocol::{
    FunctionCallResult, FunctionCallingOutput, Operator, OperatorError, OperatorInput, OperatorName, OperatorOutput,
};

/// Must not actually execute — execution is an external concern (spec.md
/// §4.5, §6). The stub always reports `requires_execution: true` and
/// leaves `args` as an echo of the declared function's schema shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionCallingOperator;

#[async_trait]
impl Operator for FunctionCallingOperator {
    fn name(&self) -> OperatorName {
        OperatorName::FunctionCalling
    }

    async fn operate(&self, input: OperatorInput) -> Result<OperatorOutput, OperatorError> {
        let OperatorInput::FunctionCalling(input) = input else {
            return Err(OperatorError::InvalidInput("expected function_calling input".to_owned()));
        };
        let Some(chosen) = input.available_functions.first() else {
            return Err(OperatorError::InvalidInput("no available functions declared".to_owned()));
        };

        let function_calls = vec![FunctionCallResult {
            name: chosen.name.clone(),
            args: chosen.parameters.clone(),
        }];

        Ok(OperatorOutput::FunctionCalling(FunctionCallingOutput {
            function_calls,
            response: Some(format!("selected function '{}' for prompt", chosen.name)),
            requires_execution: true,
        }))
    }
}
