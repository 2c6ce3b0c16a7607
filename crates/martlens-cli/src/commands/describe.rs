use martlens_reports::{Report, ReportContext, TableColumns};

use crate::cli::DescribeArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &DescribeArgs, context: &ReportContext) -> Result<CommandResult, CliError> {
    let table = args.table.trim();
    if table.is_empty() {
        return Err(CliError::Validation(String::from("table name must not be empty")));
    }

    let result = TableColumns::parse(table).run(context)?;
    Ok(CommandResult::ok(serde_json::to_value(&result)?))
}
