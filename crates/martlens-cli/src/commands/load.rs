use martlens_warehouse::{LoadSources, Warehouse};
use tracing::info;

use crate::cli::LoadArgs;
use crate::envelope::EnvelopeError;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &LoadArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    if args.recreate {
        warehouse.reset_schema()?;
        info!("star schema recreated before load");
    }

    let sources = LoadSources::from_paths(&args.customers, &args.products, &args.sales);
    let report = warehouse.load_star(&sources);

    let mut result = CommandResult::ok(serde_json::to_value(&report)?);
    for outcome in &report.tables {
        if let Some(message) = &outcome.error {
            result = result.with_error(
                EnvelopeError::new("load_failed", message.clone())
                    .with_target(outcome.table.qualified_name()),
            );
        }
    }

    Ok(result)
}
