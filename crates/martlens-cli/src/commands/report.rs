use martlens_reports::{run_entries, run_entries_parallel, Catalogue, ReportContext};
use serde_json::json;

use crate::cli::ReportArgs;
use crate::envelope::EnvelopeError;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &ReportArgs, context: ReportContext) -> Result<CommandResult, CliError> {
    let entries = Catalogue::standard().select(args.entries.as_slice())?;
    let context = match args.as_of {
        Some(as_of) => context.with_as_of(as_of),
        None => context,
    };

    let outcomes = if args.parallel {
        run_entries_parallel(entries, &context).await
    } else {
        run_entries(&entries, &context)
    };

    let mut results = Vec::with_capacity(outcomes.len());
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(result) => {
                if result.truncated {
                    warnings.push(format!(
                        "{}: result truncated at {} rows (use --max-rows to increase limit)",
                        result.name, result.row_count
                    ));
                }
                results.push(result);
            }
            Err(error) => errors.push(
                EnvelopeError::new("report_failed", error.to_string()).with_target(outcome.name),
            ),
        }
    }

    let mut command_result = CommandResult::ok(json!({
        "as_of": context.as_of,
        "results": results,
    }));
    for warning in warnings {
        command_result = command_result.with_warning(warning);
    }
    for error in errors {
        command_result = command_result.with_error(error);
    }
    Ok(command_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use martlens_warehouse::{CalendarDate, Warehouse, WarehouseConfig};
    use serde_json::Value;

    fn context() -> ReportContext {
        ReportContext::new(Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse"))
    }

    #[tokio::test]
    async fn selected_entries_run_in_catalogue_order() {
        let args = ReportArgs {
            entries: vec![String::from("total-orders"), String::from("tables")],
            as_of: CalendarDate::parse("2024-06-30").ok(),
            parallel: true,
        };

        let result = run(&args, context()).await.expect("report");

        assert!(result.errors.is_empty());
        assert_eq!(result.data.get("as_of"), Some(&Value::from("2024-06-30")));
        assert_eq!(result.data.pointer("/results/0/name"), Some(&Value::from("tables")));
        assert_eq!(
            result.data.pointer("/results/1/name"),
            Some(&Value::from("total-orders"))
        );
    }

    #[tokio::test]
    async fn unknown_entry_fails_the_command() {
        let args = ReportArgs {
            entries: vec![String::from("no-such-entry")],
            as_of: None,
            parallel: false,
        };

        let error = run(&args, context()).await.err().expect("unknown entry");
        assert_eq!(error.exit_code(), 2);
    }
}
