use martlens_warehouse::{QueryGuardrails, Warehouse};

use crate::cli::SqlArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(
    args: &SqlArgs,
    warehouse: &Warehouse,
    guardrails: QueryGuardrails,
) -> Result<CommandResult, CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let result = warehouse
        .execute_query(query, guardrails, args.write)
        .map_err(|e| CliError::Command(format!("query execution failed: {e}")))?;

    let mut command_result = CommandResult::ok(serde_json::to_value(&result)?);
    if result.truncated {
        command_result = command_result.with_warning(format!(
            "result truncated at {} rows (use --max-rows to increase limit)",
            result.row_count
        ));
    }

    Ok(command_result)
}
