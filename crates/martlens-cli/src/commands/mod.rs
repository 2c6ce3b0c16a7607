mod catalogue;
mod describe;
mod load;
mod report;
mod sql;

use std::time::Instant;

use martlens_reports::ReportContext;
use martlens_warehouse::{Warehouse, WarehouseConfig};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::envelope::{Envelope, EnvelopeError, SCHEMA_VERSION};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_error(mut self, error: EnvelopeError) -> Self {
        self.errors.push(error);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let config = warehouse_config(cli);
    let database = config.storage.label();

    let command_result = match &cli.command {
        Command::Load(args) => load::run(args, &open_warehouse(config)?)?,
        Command::Report(args) => {
            let context =
                ReportContext::new(open_warehouse(config)?).with_guardrails(cli.report_guardrails());
            report::run(args, context).await?
        }
        Command::Catalogue => catalogue::run()?,
        Command::Describe(args) => {
            let context =
                ReportContext::new(open_warehouse(config)?).with_guardrails(cli.report_guardrails());
            describe::run(args, &context)?
        }
        Command::Sql(args) => sql::run(args, &open_warehouse(config)?, cli.sql_guardrails())?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut metadata = Metadata::new(database, latency_ms);
    for warning in warnings {
        metadata.push_warning(warning);
    }

    Envelope::with_errors(metadata.into_envelope_meta(SCHEMA_VERSION), data, errors)
}

fn warehouse_config(cli: &Cli) -> WarehouseConfig {
    match &cli.db_path {
        Some(path) => WarehouseConfig::with_db_path(path.clone()),
        None => WarehouseConfig::default(),
    }
}

/// Only commands that read or write tables open the database, so listing
/// the catalogue never creates a database file.
fn open_warehouse(config: WarehouseConfig) -> Result<Warehouse, CliError> {
    let database = config.storage.label();
    let warehouse = Warehouse::open(config).map_err(|error| {
        CliError::Command(format!("failed to open warehouse: {error}"))
    })?;
    debug!(%database, "warehouse opened");
    Ok(warehouse)
}
